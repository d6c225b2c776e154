use std::net::Ipv4Addr;

/// A root name server the iterative walk starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootServer {
    pub label: &'static str,
    pub addr: Ipv4Addr,
}

/// Starting set for every iterative run, tried in this order.
pub const ROOT_SERVERS: [RootServer; 5] = [
    RootServer { label: "Root (a.root-servers.net)", addr: Ipv4Addr::new(198, 41, 0, 4) },
    RootServer { label: "Root (b.root-servers.net)", addr: Ipv4Addr::new(199, 9, 14, 201) },
    RootServer { label: "Root (c.root-servers.net)", addr: Ipv4Addr::new(192, 33, 4, 12) },
    RootServer { label: "Root (d.root-servers.net)", addr: Ipv4Addr::new(199, 7, 91, 13) },
    RootServer { label: "Root (e.root-servers.net)", addr: Ipv4Addr::new(192, 203, 230, 10) },
];

pub fn root_addrs() -> Vec<Ipv4Addr> {
    ROOT_SERVERS.iter().map(|r| r.addr).collect()
}

/// Label for a known root address, for progress output.
pub fn label_of(addr: Ipv4Addr) -> Option<&'static str> {
    ROOT_SERVERS.iter().find(|r| r.addr == addr).map(|r| r.label)
}
