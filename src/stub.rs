use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dns::packet::{self, DnsPacket};
use crate::dns::types::{RecordType, ResponseCode};
use crate::transport;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("The DNS query name does not exist: {name}")]
    NxDomain { name: String },

    #[error("The DNS response does not contain an answer to the question: {name} IN {rtype}")]
    NoAnswer { name: String, rtype: RecordType },

    #[error("{name} IN {rtype}: nameserver answered {rcode}")]
    ServerFailure { name: String, rtype: RecordType, rcode: ResponseCode },

    #[error("All nameservers failed to answer the query {name} IN {rtype}")]
    Unreachable { name: String, rtype: RecordType },

    #[error("no nameservers configured")]
    NoNameservers,

    #[error("invalid domain name {name}: {reason}")]
    InvalidName { name: String, reason: String },
}

/// Forward A lookup used for nameserver hostnames. Never routed back into
/// the iterative walk.
#[allow(async_fn_in_trait)]
pub trait HostLookup {
    async fn lookup_a(&self, name: &str) -> Result<Vec<Ipv4Addr>, LookupError>;
}

/// Stub resolver: hands the whole question to the system's recursive
/// nameservers (RD=1) and reads back the answer section.
#[derive(Debug, Clone)]
pub struct StubResolver {
    nameservers: Vec<Ipv4Addr>,
    port: u16,
    timeout: Duration,
}

impl StubResolver {
    pub fn new(nameservers: Vec<Ipv4Addr>, port: u16, timeout: Duration) -> Self {
        Self { nameservers, port, timeout }
    }

    /// Nameservers come from the config if pinned, else from resolv.conf,
    /// else from the configured fallbacks.
    pub fn from_config(config: &Config) -> Self {
        let resolver = &config.resolver;
        let nameservers = if !resolver.nameservers.is_empty() {
            resolver.nameservers.clone()
        } else {
            let from_file = match std::fs::read_to_string(&resolver.resolv_conf) {
                Ok(content) => parse_resolv_conf(&content),
                Err(e) => {
                    debug!("Cannot read {}: {}", resolver.resolv_conf, e);
                    Vec::new()
                }
            };
            if from_file.is_empty() {
                info!("No IPv4 nameserver in {}, using fallbacks", resolver.resolv_conf);
                resolver.fallback_nameservers.clone()
            } else {
                from_file
            }
        };
        Self::new(nameservers, config.port, config.timeout())
    }

    pub fn nameservers(&self) -> &[Ipv4Addr] {
        &self.nameservers
    }

    /// Ask each nameserver in turn until one gives a definitive answer.
    async fn query(&self, name: &str, rtype: RecordType) -> Result<DnsPacket, LookupError> {
        packet::validate_name(name).map_err(|e| LookupError::InvalidName {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        if self.nameservers.is_empty() {
            return Err(LookupError::NoNameservers);
        }

        let mut last_error = None;
        for ns in &self.nameservers {
            let addr = SocketAddr::from((*ns, self.port));
            let response = match transport::exchange(addr, name, rtype, true, self.timeout).await {
                Ok(r) => r,
                Err(e) => {
                    warn!("Nameserver {} failed for {} {}: {}", addr, name, rtype, e);
                    continue;
                }
            };
            match response.header.rcode {
                ResponseCode::NoError => return Ok(response),
                ResponseCode::NxDomain => return Err(LookupError::NxDomain { name: name.to_string() }),
                rcode => {
                    debug!("Nameserver {} answered {} for {} {}", addr, rcode, name, rtype);
                    last_error = Some(LookupError::ServerFailure {
                        name: name.to_string(),
                        rtype,
                        rcode,
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LookupError::Unreachable { name: name.to_string(), rtype }))
    }

    /// Nameserver names for `name`, fully qualified with a trailing dot.
    pub async fn lookup_ns(&self, name: &str) -> Result<Vec<String>, LookupError> {
        let response = self.query(name, RecordType::NS).await?;
        let names: Vec<String> = response
            .answers
            .iter()
            .filter(|r| r.rtype == RecordType::NS)
            .filter_map(|r| response.rdata_name(r).ok())
            .map(|n| format!("{}.", n))
            .collect();
        if names.is_empty() {
            return Err(LookupError::NoAnswer { name: name.to_string(), rtype: RecordType::NS });
        }
        Ok(names)
    }
}

impl HostLookup for StubResolver {
    /// Addresses for `name`. Recursive servers put the CNAME chain in the
    /// answer section, so every A record there counts.
    async fn lookup_a(&self, name: &str) -> Result<Vec<Ipv4Addr>, LookupError> {
        let response = self.query(name, RecordType::A).await?;
        let addrs: Vec<Ipv4Addr> = response.answers.iter().filter_map(|r| r.ipv4()).collect();
        if addrs.is_empty() {
            return Err(LookupError::NoAnswer { name: name.to_string(), rtype: RecordType::A });
        }
        Ok(addrs)
    }
}

/// IPv4 `nameserver` entries of a resolv.conf, in file order.
pub fn parse_resolv_conf(content: &str) -> Vec<Ipv4Addr> {
    let mut nameservers = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let mut parts = line.split_whitespace();
        if parts.next() != Some("nameserver") {
            continue;
        }
        if let Some(Ok(ip)) = parts.next().map(str::parse::<Ipv4Addr>) {
            if !nameservers.contains(&ip) {
                nameservers.push(ip);
            }
        }
    }
    nameservers
}
