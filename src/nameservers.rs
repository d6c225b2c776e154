use std::net::Ipv4Addr;
use tracing::{debug, warn};

use crate::classify::Glue;
use crate::iterative::Stage;
use crate::journey::{Action, Journey};
use crate::stub::HostLookup;

/// Addresses found for a referral's nameservers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolvedNameservers {
    /// In the order of the NS names they came from, without duplicates
    pub addrs: Vec<Ipv4Addr>,
    /// NS names that produced no address
    pub failed: Vec<String>,
}

/// Turn NS hostnames into addresses, one independent lookup per name.
///
/// A name that cannot be resolved is reported and skipped. With `use_glue`,
/// a name that has glue in `glue` takes the glue address and is not looked
/// up at all.
pub async fn resolve_hostnames<L: HostLookup>(
    ns_names: &[String],
    glue: &[Glue],
    use_glue: bool,
    lookup: &L,
    stage: Stage,
    journey: &mut Journey,
) -> ResolvedNameservers {
    let mut resolved = ResolvedNameservers::default();

    for ns in ns_names {
        if use_glue {
            if let Some(g) = glue.iter().find(|g| g.name.eq_ignore_ascii_case(ns)) {
                journey.add_step(
                    stage,
                    Action::NsResolved,
                    format!("{} {} glue", ns, g.addr),
                    format!("Resolved {} -> {} [Additional Section]", ns, g.addr),
                );
                push_unique(&mut resolved.addrs, g.addr);
                continue;
            }
        }

        match lookup.lookup_a(ns).await {
            Ok(addrs) => match addrs.first() {
                Some(&addr) => {
                    debug!("{} has {} address(es), using {}", ns, addrs.len(), addr);
                    journey.add_step(stage, Action::NsResolved, format!("{} {}", ns, addr), format!("Resolved {} -> {}", ns, addr));
                    push_unique(&mut resolved.addrs, addr);
                }
                None => {
                    journey.add_step(stage, Action::NsFailed, ns.clone(), format!("[ERROR] Failed to resolve {}", ns));
                    resolved.failed.push(ns.clone());
                }
            },
            Err(e) => {
                warn!("Nameserver {} did not resolve: {}", ns, e);
                journey.add_step(
                    stage,
                    Action::NsFailed,
                    format!("{}: {}", ns, e),
                    format!("[ERROR] Failed to resolve {}: {}", ns, e),
                );
                resolved.failed.push(ns.clone());
            }
        }
    }

    resolved
}

fn push_unique(addrs: &mut Vec<Ipv4Addr>, addr: Ipv4Addr) {
    if !addrs.contains(&addr) {
        addrs.push(addr);
    }
}
