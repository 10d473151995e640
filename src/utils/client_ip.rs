//! Client IP resolution for rate limiting and the click ledger.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Resolves the client IP address of a request.
///
/// When `behind_proxy` is set, `X-Real-IP` is preferred, then the first
/// `X-Forwarded-For` entry. The peer socket address is the fallback, and the
/// only source when the service is exposed directly.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr, behind_proxy: bool) -> String {
    if behind_proxy {
        if let Some(ip) = header_value(headers, "x-real-ip") {
            return ip.to_string();
        }

        if let Some(ip) = header_value(headers, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return ip.to_string();
        }
    }

    peer.ip().to_string()
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "10.0.0.7:40000".parse().unwrap()
    }

    #[test]
    fn test_peer_address_when_not_behind_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("1.2.3.4"));

        assert_eq!(client_ip(&headers, peer(), false), "10.0.0.7");
    }

    #[test]
    fn test_real_ip_preferred_behind_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("1.2.3.4"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("5.6.7.8"));

        assert_eq!(client_ip(&headers, peer(), true), "1.2.3.4");
    }

    #[test]
    fn test_first_forwarded_for_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("5.6.7.8, 172.16.0.1"),
        );

        assert_eq!(client_ip(&headers, peer(), true), "5.6.7.8");
    }

    #[test]
    fn test_falls_back_to_peer_without_headers() {
        assert_eq!(client_ip(&HeaderMap::new(), peer(), true), "10.0.0.7");
    }

    #[test]
    fn test_ipv6_peer() {
        let peer: SocketAddr = "[::1]:8080".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), peer, false), "::1");
    }
}
