use crate::dns::types::{DnsClass, RecordType, ResponseCode};
use std::fmt;
use std::net::Ipv4Addr;

/// Raw DNS packet parser - full binary level parsing per RFC 1035
/// No external DNS library used - everything is hand-parsed from &[u8]

/// Longest label, in bytes (RFC 1035 §2.3.4)
pub const MAX_LABEL_LEN: usize = 63;
/// Longest name in wire form, length bytes and root included
pub const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone)]
pub struct DnsHeader {
    pub id: u16,
    pub qr: bool,           // Query/Response flag
    pub aa: bool,           // Authoritative Answer
    pub tc: bool,           // Truncated
    pub rd: bool,           // Recursion Desired
    pub rcode: ResponseCode,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

#[derive(Debug, Clone)]
pub struct DnsQuestion {
    pub name: String,
    pub qtype: RecordType,
    pub qclass: DnsClass,
}

/// A resource record as read off the wire. TTLs are skipped: nothing here
/// outlives a single run.
#[derive(Debug, Clone)]
pub struct DnsRecord {
    pub name: String,
    pub rtype: RecordType,
    pub rclass: DnsClass,
    pub rdata: Vec<u8>,
    /// Start of rdata inside the packet, for compression pointers in names
    pub rdata_offset: usize,
}

impl DnsRecord {
    /// The address carried by an A record. `None` for other types or a
    /// malformed rdata length.
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        match (self.rtype, self.rdata.as_slice()) {
            (RecordType::A, [a, b, c, d]) => Some(Ipv4Addr::new(*a, *b, *c, *d)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DnsPacket {
    pub header: DnsHeader,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsRecord>,
    pub authorities: Vec<DnsRecord>,
    pub additionals: Vec<DnsRecord>,
    pub raw: Vec<u8>,
}

impl DnsPacket {
    /// Decode the domain name held in the rdata of an NS or CNAME record.
    pub fn rdata_name(&self, record: &DnsRecord) -> anyhow::Result<String> {
        parse_name_at_offset(&self.raw, record.rdata_offset)
    }
}

impl fmt::Display for DnsPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.questions.first() {
            Some(q) => write!(
                f,
                "{} {} {}{} (an:{} ns:{} ar:{})",
                q.name,
                q.qtype.name(),
                self.header.rcode,
                if self.header.aa { " aa" } else { "" },
                self.header.ancount,
                self.header.nscount,
                self.header.arcount
            ),
            None => write!(f, "(no question) {}", self.header.rcode),
        }
    }
}

/// Parse a DNS name from raw bytes with label compression support (RFC 1035 §4.1.4)
pub fn parse_name(data: &[u8], offset: &mut usize) -> anyhow::Result<String> {
    let mut labels = Vec::new();
    let mut jumped = false;
    let mut pos = *offset;
    let mut jumps_performed = 0;
    const MAX_JUMPS: usize = 10; // Prevent infinite loops

    loop {
        if pos >= data.len() {
            return Err(anyhow::anyhow!("DNS name parse: unexpected end of data at offset {}", pos));
        }

        let len_byte = data[pos];

        // Check for pointer (compression) - top 2 bits are 11
        if (len_byte & 0xC0) == 0xC0 {
            if pos + 1 >= data.len() {
                return Err(anyhow::anyhow!("DNS name parse: truncated pointer at offset {}", pos));
            }
            if !jumped {
                // Save where we need to continue reading after this name
                *offset = pos + 2;
                jumped = true;
            }
            let pointer = ((len_byte as u16 & 0x3F) << 8) | data[pos + 1] as u16;
            pos = pointer as usize;
            jumps_performed += 1;
            if jumps_performed > MAX_JUMPS {
                return Err(anyhow::anyhow!("DNS name parse: too many jumps (possible loop)"));
            }
            continue;
        }

        if len_byte == 0 {
            if !jumped {
                *offset = pos + 1;
            }
            break;
        }

        let label_len = len_byte as usize;
        pos += 1;

        if pos + label_len > data.len() {
            return Err(anyhow::anyhow!("DNS name parse: label extends beyond packet"));
        }

        labels.push(String::from_utf8_lossy(&data[pos..pos + label_len]).to_string());
        pos += label_len;
    }

    Ok(labels.join("."))
}

/// Parse a domain name from a known offset within the full packet.
pub fn parse_name_at_offset(full_packet: &[u8], offset: usize) -> anyhow::Result<String> {
    let mut pos = offset;
    parse_name(full_packet, &mut pos)
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

/// Parse a complete DNS packet from raw bytes
pub fn parse_packet(data: &[u8]) -> anyhow::Result<DnsPacket> {
    if data.len() < 12 {
        return Err(anyhow::anyhow!("DNS packet too short: {} bytes (minimum 12)", data.len()));
    }

    let flags = read_u16(data, 2);
    let bit = |n: u16| (flags >> n) & 1 == 1;
    let header = DnsHeader {
        id: read_u16(data, 0),
        qr: bit(15),
        aa: bit(10),
        tc: bit(9),
        rd: bit(8),
        rcode: ResponseCode::from((flags & 0xF) as u8),
        qdcount: read_u16(data, 4),
        ancount: read_u16(data, 6),
        nscount: read_u16(data, 8),
        arcount: read_u16(data, 10),
    };

    let mut offset = 12;
    let mut questions = Vec::with_capacity(header.qdcount as usize);
    for _ in 0..header.qdcount {
        let name = parse_name(data, &mut offset)?;
        if offset + 4 > data.len() {
            return Err(anyhow::anyhow!("DNS question section truncated"));
        }
        questions.push(DnsQuestion {
            name,
            qtype: RecordType::from(read_u16(data, offset)),
            qclass: DnsClass::from(read_u16(data, offset + 2)),
        });
        offset += 4;
    }

    let answers = parse_records(data, &mut offset, header.ancount)?;
    let authorities = parse_records(data, &mut offset, header.nscount)?;
    let additionals = parse_records(data, &mut offset, header.arcount)?;

    Ok(DnsPacket {
        header,
        questions,
        answers,
        authorities,
        additionals,
        raw: data.to_vec(),
    })
}

/// Fixed part of a resource record after its owner name: type, class, TTL,
/// rdlength.
const RR_FIXED_LEN: usize = 10;

fn parse_records(data: &[u8], offset: &mut usize, count: u16) -> anyhow::Result<Vec<DnsRecord>> {
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = parse_name(data, offset)?;
        let fixed = *offset;
        if fixed + RR_FIXED_LEN > data.len() {
            return Err(anyhow::anyhow!("DNS record truncated at offset {}", fixed));
        }
        let rdata_offset = fixed + RR_FIXED_LEN;
        let rdata_end = rdata_offset + read_u16(data, fixed + 8) as usize;
        if rdata_end > data.len() {
            return Err(anyhow::anyhow!("DNS rdata of {} extends beyond packet", name));
        }
        records.push(DnsRecord {
            rtype: RecordType::from(read_u16(data, fixed)),
            rclass: DnsClass::from(read_u16(data, fixed + 2)),
            rdata: data[rdata_offset..rdata_end].to_vec(),
            rdata_offset,
            name,
        });
        *offset = rdata_end;
    }
    Ok(records)
}

/// Encode a DNS name into wire format. One trailing dot is accepted; "."
/// and "" both encode the root. Empty labels, labels over 63 bytes and names
/// over 255 bytes are errors rather than being mangled on the wire.
pub fn encode_name(name: &str) -> anyhow::Result<Vec<u8>> {
    let relative = name.strip_suffix('.').unwrap_or(name);
    let mut result = Vec::with_capacity(relative.len() + 2);
    if !relative.is_empty() {
        for label in relative.split('.') {
            if label.is_empty() {
                anyhow::bail!("empty label in '{}'", name);
            }
            if label.len() > MAX_LABEL_LEN {
                anyhow::bail!("label of {} bytes in '{}' (max {})", label.len(), name, MAX_LABEL_LEN);
            }
            result.push(label.len() as u8);
            result.extend_from_slice(label.as_bytes());
        }
    }
    result.push(0);
    if result.len() > MAX_NAME_LEN {
        anyhow::bail!("'{}' is {} bytes on the wire (max {})", name, result.len(), MAX_NAME_LEN);
    }
    Ok(result)
}

/// Check that `name` can be sent as a question, without building one.
pub fn validate_name(name: &str) -> anyhow::Result<()> {
    encode_name(name).map(|_| ())
}

/// Same name as written in a question, ignoring case and a trailing dot.
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim_end_matches('.').eq_ignore_ascii_case(b.trim_end_matches('.'))
}

/// Build a single-question query packet
pub fn build_query(id: u16, name: &str, qtype: RecordType, rd: bool) -> anyhow::Result<Vec<u8>> {
    let qname = encode_name(name)?;
    let mut packet = Vec::with_capacity(12 + qname.len() + 4);

    // Header
    packet.extend_from_slice(&id.to_be_bytes());
    let flags: u16 = if rd { 0x0100 } else { 0x0000 }; // RD=1
    packet.extend_from_slice(&flags.to_be_bytes());
    packet.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT=1
    packet.extend_from_slice(&[0; 6]); // AN/NS/AR counts

    // Question
    packet.extend_from_slice(&qname);
    packet.extend_from_slice(&qtype.to_u16().to_be_bytes());
    packet.extend_from_slice(&DnsClass::IN.to_u16().to_be_bytes());

    Ok(packet)
}

/// Response construction for tests: uncompressed names, class IN, TTL 300.
#[cfg(test)]
pub mod fixtures {
    use super::*;

    #[derive(Debug, Clone)]
    pub struct Rr {
        pub name: String,
        pub rtype: RecordType,
        pub rdata: Vec<u8>,
    }

    pub fn a(name: &str, ip: &str) -> Rr {
        let ip: Ipv4Addr = ip.parse().unwrap();
        Rr { name: name.into(), rtype: RecordType::A, rdata: ip.octets().to_vec() }
    }

    pub fn ns(zone: &str, target: &str) -> Rr {
        Rr { name: zone.into(), rtype: RecordType::NS, rdata: encode_name(target).unwrap() }
    }

    pub fn cname(name: &str, target: &str) -> Rr {
        Rr { name: name.into(), rtype: RecordType::CNAME, rdata: encode_name(target).unwrap() }
    }

    pub fn soa(zone: &str) -> Rr {
        let mut rdata = encode_name(&format!("ns.{}", zone)).unwrap();
        rdata.extend(encode_name(&format!("hostmaster.{}", zone)).unwrap());
        for v in [1u32, 7200, 3600, 1_209_600, 300] {
            rdata.extend_from_slice(&v.to_be_bytes());
        }
        Rr { name: zone.into(), rtype: RecordType::SOA, rdata }
    }

    /// Response to an A question for `qname`.
    pub fn response(
        id: u16,
        qname: &str,
        rcode: ResponseCode,
        answers: &[Rr],
        authorities: &[Rr],
        additionals: &[Rr],
    ) -> Vec<u8> {
        response_for(id, qname, RecordType::A, rcode, answers, authorities, additionals)
    }

    /// Response echoing the id and question of the raw `query`.
    pub fn reply(query: &[u8], rcode: ResponseCode, answers: &[Rr], authorities: &[Rr], additionals: &[Rr]) -> Vec<u8> {
        let parsed = parse_packet(query).unwrap();
        let question = &parsed.questions[0];
        response_for(parsed.header.id, &question.name, question.qtype, rcode, answers, authorities, additionals)
    }

    pub fn response_for(
        id: u16,
        qname: &str,
        qtype: RecordType,
        rcode: ResponseCode,
        answers: &[Rr],
        authorities: &[Rr],
        additionals: &[Rr],
    ) -> Vec<u8> {
        let mut packet = Vec::with_capacity(512);
        packet.extend_from_slice(&id.to_be_bytes());
        let flags: u16 = 0x8000 | rcode.to_u8() as u16;
        packet.extend_from_slice(&flags.to_be_bytes());
        packet.extend_from_slice(&1u16.to_be_bytes());
        packet.extend_from_slice(&(answers.len() as u16).to_be_bytes());
        packet.extend_from_slice(&(authorities.len() as u16).to_be_bytes());
        packet.extend_from_slice(&(additionals.len() as u16).to_be_bytes());
        packet.extend_from_slice(&encode_name(qname).unwrap());
        packet.extend_from_slice(&qtype.to_u16().to_be_bytes());
        packet.extend_from_slice(&1u16.to_be_bytes());
        for rr in answers.iter().chain(authorities).chain(additionals) {
            packet.extend_from_slice(&encode_name(&rr.name).unwrap());
            packet.extend_from_slice(&rr.rtype.to_u16().to_be_bytes());
            packet.extend_from_slice(&1u16.to_be_bytes());
            packet.extend_from_slice(&300u32.to_be_bytes());
            packet.extend_from_slice(&(rr.rdata.len() as u16).to_be_bytes());
            packet.extend_from_slice(&rr.rdata);
        }
        packet
    }

    /// Same as `response` but already parsed.
    pub fn packet(qname: &str, answers: &[Rr], authorities: &[Rr], additionals: &[Rr]) -> DnsPacket {
        parse_packet(&response(0x4242, qname, ResponseCode::NoError, answers, authorities, additionals)).unwrap()
    }
}
