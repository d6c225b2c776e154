use std::collections::VecDeque;
use std::fmt;
use std::net::Ipv4Addr;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classify::{classify, Answer, Classification};
use crate::config::Config;
use crate::dns::packet;
use crate::journey::{Action, Journey};
use crate::nameservers;
use crate::roots;
use crate::stub::{HostLookup, StubResolver};
use crate::transport::{Transport, UdpTransport};

/// Level of the delegation tree the candidate list belongs to.
/// Ordered so that a run's stages can be compared; it only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Root,
    Tld,
    Auth,
}

impl Stage {
    /// Stage after a referral. AUTH refers to AUTH.
    pub fn next(self) -> Self {
        match self {
            Stage::Root => Stage::Tld,
            Stage::Tld | Stage::Auth => Stage::Auth,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Root => f.write_str("ROOT"),
            Stage::Tld => f.write_str("TLD"),
            Stage::Auth => f.write_str("AUTH"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no candidates responded at stage {stage}")]
    Exhausted { stage: Stage },

    #[error("gave up after {referrals} referrals at stage {stage}")]
    TooManyReferrals { stage: Stage, referrals: u32 },

    #[error("invalid domain name {name}: {reason}")]
    InvalidName { name: String, reason: String },
}

/// Successful end of an iterative run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub answer: Answer,
    /// Stage of the server that answered
    pub stage: Stage,
    pub queries: u32,
    pub referrals: u32,
}

/// Walks ROOT -> TLD -> AUTH for one name at a time.
///
/// Every call to `resolve` starts from the root list with fresh state;
/// nothing learned in one run is visible to the next.
pub struct IterativeResolver<T, L> {
    transport: T,
    lookup: L,
    roots: Vec<Ipv4Addr>,
    use_glue: bool,
    max_referrals: u32,
}

impl IterativeResolver<UdpTransport, StubResolver> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(UdpTransport::new(config), StubResolver::from_config(config), config.roots())
            .with_glue(config.use_glue)
            .with_max_referrals(config.max_referrals)
    }
}

impl<T: Transport, L: HostLookup> IterativeResolver<T, L> {
    pub fn new(transport: T, lookup: L, roots: Vec<Ipv4Addr>) -> Self {
        let defaults = Config::default();
        Self {
            transport,
            lookup,
            roots,
            use_glue: defaults.use_glue,
            max_referrals: defaults.max_referrals,
        }
    }

    pub fn with_glue(mut self, use_glue: bool) -> Self {
        self.use_glue = use_glue;
        self
    }

    pub fn with_max_referrals(mut self, max_referrals: u32) -> Self {
        self.max_referrals = max_referrals;
        self
    }

    /// Resolve `domain` to an address, or to a CNAME target if that is what
    /// an authoritative server hands back first.
    ///
    /// Only the front candidate is ever queried. A failed or useless
    /// candidate is dropped and the next one tried at the same stage; a
    /// referral replaces the whole list and advances the stage.
    pub async fn resolve(&self, domain: &str, journey: &mut Journey) -> Result<Resolution, ResolveError> {
        journey.say(format!("[Iterative DNS Lookup] Resolving {}", domain));
        info!("🌲 Iterative resolve: {} from {} roots", domain, self.roots.len());

        if let Err(e) = packet::validate_name(domain) {
            let err = ResolveError::InvalidName { name: domain.to_string(), reason: e.to_string() };
            journey.say(format!("[ERROR] {}", err));
            journey.add_step(Stage::Root, Action::Failed, err.to_string(), "[ERROR] Resolution failed.");
            return Err(err);
        }

        let mut candidates: VecDeque<Ipv4Addr> = self.roots.iter().copied().collect();
        let mut stage = Stage::Root;
        let mut queries = 0u32;
        let mut referrals = 0u32;

        while let Some(&server) = candidates.front() {
            let label = match (stage, roots::label_of(server)) {
                (Stage::Root, Some(label)) => label.to_string(),
                _ => server.to_string(),
            };
            journey.add_step(stage, Action::Query, label, format!("[DEBUG] Querying {} server ({})", stage, server));
            queries += 1;

            let response = match self.transport.query(server, domain).await {
                Ok(response) => response,
                Err(e) => {
                    candidates.pop_front();
                    let line = if candidates.is_empty() {
                        format!("[ERROR] Query failed for {} {}", stage, server)
                    } else {
                        format!("[ERROR] Query failed for {} {} - Moving to next NS", stage, server)
                    };
                    journey.add_step(stage, Action::QueryFailed, e.to_string(), line);
                    continue;
                }
            };

            match classify(&response) {
                Classification::Answer(answer) => {
                    journey.add_step(
                        stage,
                        Action::Answer,
                        answer.to_string(),
                        format!("[SUCCESS] {} -> {}", domain, answer),
                    );
                    info!("🌲 Resolved {} -> {} at {} after {} queries", domain, answer, stage, queries);
                    return Ok(Resolution { answer, stage, queries, referrals });
                }
                Classification::Referral { zone, ns_names, glue } => {
                    if referrals >= self.max_referrals {
                        warn!("🌲 Referral limit {} reached for {} (zone {})", self.max_referrals, domain, zone);
                        let err = ResolveError::TooManyReferrals { stage, referrals };
                        journey.add_step(stage, Action::Failed, err.to_string(), "[ERROR] Resolution failed.");
                        return Err(err);
                    }
                    referrals += 1;

                    for ns in &ns_names {
                        journey.add_step(stage, Action::NsExtracted, ns.clone(), format!("Extracted NS hostname: {}", ns));
                    }
                    let resolved =
                        nameservers::resolve_hostnames(&ns_names, &glue, self.use_glue, &self.lookup, stage, journey).await;

                    let next = stage.next();
                    let zone = if zone.is_empty() { ".".to_string() } else { zone };
                    debug!(
                        "🌲 Referral from {} to {} ({}): {} of {} NS addressed",
                        server, zone, next, resolved.addrs.len(), ns_names.len()
                    );
                    journey.add_step(
                        stage,
                        Action::Referral,
                        format!("{} -> {} ({} servers)", zone, next, resolved.addrs.len()),
                        format!("[DEBUG] Referred to {} ({} servers for {})", zone, resolved.addrs.len(), next),
                    );

                    candidates = resolved.addrs.into();
                    stage = next;
                }
                Classification::Empty { rcode } => {
                    candidates.pop_front();
                    debug!("🌲 {} gave nothing usable for {} ({})", server, domain, rcode);
                    journey.add_step(
                        stage,
                        Action::NoUsableAnswer,
                        rcode.to_string(),
                        format!("[ERROR] No A or CNAME records found for {} on {}", domain, server),
                    );
                    if !candidates.is_empty() {
                        journey.say("Trying another nameserver...");
                    }
                }
            }
        }

        warn!("🌲 All {} candidates exhausted for {}", stage, domain);
        let err = ResolveError::Exhausted { stage };
        journey.add_step(stage, Action::Failed, err.to_string(), "[ERROR] Resolution failed.");
        Err(err)
    }
}
