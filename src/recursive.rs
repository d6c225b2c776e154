use std::net::Ipv4Addr;
use tracing::info;

use crate::journey::Journey;
use crate::stub::{HostLookup, LookupError, StubResolver};

/// What the system resolver said about a domain. The two lookups are
/// independent: one failing does not stop the other.
#[derive(Debug)]
pub struct RecursiveReport {
    pub ns: Result<Vec<String>, LookupError>,
    pub a: Result<Vec<Ipv4Addr>, LookupError>,
}

impl RecursiveReport {
    pub fn is_success(&self) -> bool {
        self.ns.is_ok() || self.a.is_ok()
    }
}

/// Baseline path: ask the configured recursive resolver for NS, then A.
pub async fn recursive_lookup(domain: &str, resolver: &StubResolver, journey: &mut Journey) -> RecursiveReport {
    journey.say(format!("[Recursive DNS Lookup] Resolving {}", domain));
    info!("📡 Recursive lookup for {} via {:?}", domain, resolver.nameservers());

    let ns = resolver.lookup_ns(domain).await;
    report(domain, &ns, journey);

    let a = resolver.lookup_a(domain).await;
    report(domain, &a, journey);

    RecursiveReport { ns, a }
}

fn report<T: std::fmt::Display>(domain: &str, result: &Result<Vec<T>, LookupError>, journey: &mut Journey) {
    match result {
        Ok(records) => {
            for record in records {
                journey.say(format!("[SUCCESS] {} -> {}", domain, record));
            }
        }
        Err(e) => journey.say(format!("[ERROR] Recursive lookup failed: {}", e)),
    }
}
