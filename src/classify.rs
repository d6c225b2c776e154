use std::fmt;
use std::net::Ipv4Addr;
use tracing::debug;

use crate::dns::packet::DnsPacket;
use crate::dns::types::{RecordType, ResponseCode};

/// Terminal result of a lookup. A CNAME target is reported as-is and never
/// chased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Address(Ipv4Addr),
    Alias(String),
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Address(ip) => write!(f, "{}", ip),
            Answer::Alias(target) => write!(f, "{}.", target),
        }
    }
}

/// Additional-section address for one of the referred nameservers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glue {
    pub name: String,
    pub addr: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Answer(Answer),
    Referral {
        zone: String,
        ns_names: Vec<String>,
        glue: Vec<Glue>,
    },
    /// Nothing usable; `rcode` is kept for diagnostics only.
    Empty { rcode: ResponseCode },
}

/// Decide what a response means for the walk.
///
/// Precedence: any A record in the answer section (first one wins), then
/// the first CNAME, then NS records in the authority section. Anything else
/// is `Empty`, including NXDOMAIN and NODATA.
pub fn classify(response: &DnsPacket) -> Classification {
    if let Some(addr) = response.answers.iter().find_map(|r| r.ipv4()) {
        return Classification::Answer(Answer::Address(addr));
    }

    for record in response.answers.iter().filter(|r| r.rtype == RecordType::CNAME) {
        match response.rdata_name(record) {
            Ok(target) => return Classification::Answer(Answer::Alias(target)),
            Err(e) => debug!("Skipping unreadable CNAME for {}: {}", record.name, e),
        }
    }

    let mut zone = None;
    let mut ns_names: Vec<String> = Vec::new();
    for record in response.authorities.iter().filter(|r| r.rtype == RecordType::NS) {
        match response.rdata_name(record) {
            Ok(name) => {
                zone.get_or_insert_with(|| record.name.clone());
                if !ns_names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
                    ns_names.push(name);
                }
            }
            Err(e) => debug!("Skipping unreadable NS in {}: {}", record.name, e),
        }
    }

    if ns_names.is_empty() {
        return Classification::Empty { rcode: response.header.rcode };
    }

    let glue = response
        .additionals
        .iter()
        .filter(|r| ns_names.iter().any(|n| n.eq_ignore_ascii_case(&r.name)))
        .filter_map(|r| r.ipv4().map(|addr| Glue { name: r.name.to_lowercase(), addr }))
        .collect();

    Classification::Referral {
        zone: zone.unwrap_or_default(),
        ns_names,
        glue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::packet::{fixtures, parse_packet};

    #[test]
    fn test_first_a_record_wins() {
        let packet = fixtures::packet(
            "example.com",
            &[fixtures::a("example.com", "1.1.1.1"), fixtures::a("example.com", "2.2.2.2")],
            &[],
            &[],
        );
        assert_eq!(classify(&packet), Classification::Answer(Answer::Address(Ipv4Addr::new(1, 1, 1, 1))));
    }

    #[test]
    fn test_a_beats_cname_regardless_of_order() {
        let packet = fixtures::packet(
            "www.example.com",
            &[
                fixtures::cname("www.example.com", "example.com"),
                fixtures::a("example.com", "93.184.216.34"),
            ],
            &[],
            &[],
        );
        assert_eq!(
            classify(&packet),
            Classification::Answer(Answer::Address(Ipv4Addr::new(93, 184, 216, 34)))
        );
    }

    #[test]
    fn test_cname_only_is_terminal_alias() {
        let packet = fixtures::packet(
            "www.example.com",
            &[fixtures::cname("www.example.com", "edge.example.net")],
            &[fixtures::ns("example.net", "ns1.example.net")],
            &[],
        );
        let result = classify(&packet);
        assert_eq!(result, Classification::Answer(Answer::Alias("edge.example.net".into())));
        if let Classification::Answer(answer) = result {
            assert_eq!(answer.to_string(), "edge.example.net.");
        }
    }

    #[test]
    fn test_referral_without_glue() {
        let packet = fixtures::packet(
            "example.com",
            &[],
            &[
                fixtures::ns("com", "a.gtld-servers.net"),
                fixtures::ns("com", "b.gtld-servers.net"),
                fixtures::ns("com", "A.GTLD-SERVERS.NET"),
            ],
            &[],
        );
        assert_eq!(
            classify(&packet),
            Classification::Referral {
                zone: "com".into(),
                ns_names: vec!["a.gtld-servers.net".into(), "b.gtld-servers.net".into()],
                glue: vec![],
            }
        );
    }

    #[test]
    fn test_referral_collects_matching_glue_only() {
        let packet = fixtures::packet(
            "example.com",
            &[],
            &[fixtures::ns("example.com", "ns1.example.com")],
            &[
                fixtures::a("NS1.example.com", "192.0.2.53"),
                fixtures::a("unrelated.example.org", "192.0.2.99"),
            ],
        );
        match classify(&packet) {
            Classification::Referral { glue, .. } => {
                assert_eq!(glue, vec![Glue { name: "ns1.example.com".into(), addr: Ipv4Addr::new(192, 0, 2, 53) }]);
            }
            other => panic!("expected referral, got {:?}", other),
        }
    }

    #[test]
    fn test_nxdomain_with_soa_is_empty() {
        let raw = fixtures::response(1, "nope.example", ResponseCode::NxDomain, &[], &[fixtures::soa("example")], &[]);
        let packet = parse_packet(&raw).unwrap();
        assert_eq!(classify(&packet), Classification::Empty { rcode: ResponseCode::NxDomain });
    }

    #[test]
    fn test_answer_without_a_or_cname_is_empty() {
        let packet = fixtures::packet("example.com", &[fixtures::soa("example.com")], &[], &[]);
        assert_eq!(classify(&packet), Classification::Empty { rcode: ResponseCode::NoError });
    }
}
