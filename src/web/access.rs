use std::net::SocketAddr;

/// Only an exact textual match of the peer IP is let through; `::1`,
/// IPv4-mapped addresses and unknown peers are all refused.
pub fn is_allowed(remote: Option<SocketAddr>, allowed_origin: &str) -> bool {
    match remote {
        Some(addr) => addr.ip().to_string() == allowed_origin,
        None => false,
    }
}
