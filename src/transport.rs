use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use rand::rngs::OsRng;
use rand::Rng;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::config::Config;
use crate::dns::packet::{self, DnsPacket};
use crate::dns::types::RecordType;

/// Reads per query before giving up on datagrams with a foreign id
const MAX_READS: usize = 3;
const RECV_BUF_SIZE: usize = 4096;

/// Why a single query produced no usable response. Callers abandon the
/// server either way; the variants only differ for diagnostics.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query to {server} timed out")]
    Timeout { server: SocketAddr },

    #[error("query to {server} failed: {source}")]
    Io {
        server: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed response from {server}: {reason}")]
    Malformed { server: SocketAddr, reason: String },

    #[error("cannot ask for {name}: {reason}")]
    InvalidName { name: String, reason: String },
}

impl QueryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, QueryError::Timeout { .. })
    }
}

/// Sends one A query to one server. The iterative engine only ever talks
/// to the network through this.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn query(&self, server: Ipv4Addr, domain: &str) -> Result<DnsPacket, QueryError>;
}

/// Plain UDP, fresh socket per query.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    port: u16,
    timeout: Duration,
}

impl UdpTransport {
    pub fn new(config: &Config) -> Self {
        Self::with_port(config.port, config.timeout())
    }

    pub fn with_port(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }
}

impl Transport for UdpTransport {
    async fn query(&self, server: Ipv4Addr, domain: &str) -> Result<DnsPacket, QueryError> {
        let addr = SocketAddr::from((server, self.port));
        let result = exchange(addr, domain, RecordType::A, false, self.timeout).await;
        match &result {
            Ok(response) => debug!("{} answered: {}", addr, response),
            Err(e) if e.is_timeout() => debug!("{}", e),
            Err(e) => warn!("{}", e),
        }
        result
    }
}

/// One request/response exchange over UDP.
///
/// The socket is connected to `server`, so datagrams from other hosts are
/// dropped by the kernel and ICMP unreachable surfaces as an I/O error
/// instead of a timeout. `timeout` bounds the whole exchange, including
/// reads discarded for a mismatched id. A reply whose question differs from
/// the one asked is rejected as malformed.
pub async fn exchange(
    server: SocketAddr,
    qname: &str,
    qtype: RecordType,
    rd: bool,
    timeout: Duration,
) -> Result<DnsPacket, QueryError> {
    let query_id: u16 = OsRng.gen();
    let query = packet::build_query(query_id, qname, qtype, rd).map_err(|e| QueryError::InvalidName {
        name: qname.to_string(),
        reason: e.to_string(),
    })?;
    let io = |source| QueryError::Io { server, source };

    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.map_err(io)?;
    socket.connect(server).await.map_err(io)?;
    socket.send(&query).await.map_err(io)?;

    let deadline = tokio::time::Instant::now() + timeout;
    let mut buf = vec![0u8; RECV_BUF_SIZE];
    for _ in 0..MAX_READS {
        let len = tokio::time::timeout_at(deadline, socket.recv(&mut buf))
            .await
            .map_err(|_| QueryError::Timeout { server })?
            .map_err(io)?;

        if len < 2 || u16::from_be_bytes([buf[0], buf[1]]) != query_id {
            debug!("Discarding {} byte datagram with foreign id from {}", len, server);
            continue;
        }

        let response = packet::parse_packet(&buf[..len]).map_err(|e| QueryError::Malformed {
            server,
            reason: e.to_string(),
        })?;
        if !response.header.qr {
            return Err(QueryError::Malformed { server, reason: "QR bit clear in reply".to_string() });
        }
        // Servers may drop the question on error rcodes; only a present one is checked
        if let Some(question) = response.questions.first() {
            if !packet::same_name(&question.name, qname) || question.qtype != qtype {
                return Err(QueryError::Malformed {
                    server,
                    reason: format!("reply is for {} {}, asked {} {}", question.name, question.qtype, qname, qtype),
                });
            }
        }
        if response.header.tc {
            debug!("Truncated response from {} for {}, using what arrived", server, qname);
        }
        return Ok(response);
    }

    Err(QueryError::Malformed {
        server,
        reason: format!("no response with id {:#06x} after {} reads", query_id, MAX_READS),
    })
}
