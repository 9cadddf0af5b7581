use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// First hop of `X-Forwarded-For` when it is a valid address, else the peer
/// address. Forwarded headers are client-controlled; the result is only good
/// for approximate visitor counting.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(parse_hop);

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

/// Accepts a bare address or one with a port.
fn parse_hop(hop: &str) -> Option<IpAddr> {
    let hop = hop.trim();
    hop.parse::<IpAddr>()
        .ok()
        .or_else(|| hop.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.7:52100".parse().unwrap())
    }

    #[test]
    fn prefers_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static("203.0.113.9, 70.41.3.18, 150.172.238.178"));
        assert_eq!(client_ip(&headers, peer()), "203.0.113.9");
    }

    #[test]
    fn falls_back_to_peer_address() {
        assert_eq!(client_ip(&HeaderMap::new(), peer()), "10.0.0.7");
    }

    #[test]
    fn blank_forwarded_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static(" , 70.41.3.18"));
        assert_eq!(client_ip(&headers, peer()), "10.0.0.7");
    }

    #[test]
    fn garbage_or_oversized_hop_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        let long = "a".repeat(300);
        headers.insert(FORWARDED_FOR, HeaderValue::from_str(&long).unwrap());
        assert_eq!(client_ip(&headers, peer()), "10.0.0.7");

        headers.insert(FORWARDED_FOR, HeaderValue::from_static("not-an-ip, 70.41.3.18"));
        assert_eq!(client_ip(&headers, None), "unknown");
    }

    #[test]
    fn forwarded_hop_may_carry_a_port() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static("203.0.113.9:4711"));
        assert_eq!(client_ip(&headers, peer()), "203.0.113.9");

        headers.insert(FORWARDED_FOR, HeaderValue::from_static("2001:db8::1"));
        assert_eq!(client_ip(&headers, peer()), "2001:db8::1");
    }

    #[test]
    fn unknown_without_any_source() {
        assert_eq!(client_ip(&HeaderMap::new(), None), "unknown");
    }
}
