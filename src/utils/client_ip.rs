//! Client identification for per-client rate limiting.

use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Key shared by requests whose client address cannot be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Returns the key identifying the client that sent `req`.
///
/// Uses the socket peer IP. When `behind_proxy` is set, the first
/// `X-Forwarded-For` entry (or `X-Real-IP`) takes priority; enable that only
/// behind a trusted reverse proxy, since clients control those headers.
pub fn client_key(req: &Request, behind_proxy: bool) -> String {
    if behind_proxy && let Some(ip) = forwarded_ip(req.headers()) {
        return ip;
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let from_forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let from_real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    from_forwarded_for.or_else(from_real_ip).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(headers: &[(&str, &str)]) -> Request {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_peer_address_is_used() {
        let mut req = request_with(&[]);
        req.extensions_mut()
            .insert(ConnectInfo("203.0.113.7:51234".parse::<SocketAddr>().unwrap()));

        assert_eq!(client_key(&req, false), "203.0.113.7");
    }

    #[test]
    fn test_missing_peer_address_falls_back() {
        let req = request_with(&[]);
        assert_eq!(client_key(&req, false), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_forwarded_headers_ignored_without_proxy() {
        let req = request_with(&[("x-forwarded-for", "198.51.100.1")]);
        assert_eq!(client_key(&req, false), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_first_forwarded_for_entry_wins() {
        let req = request_with(&[("x-forwarded-for", " 198.51.100.1 , 10.0.0.1")]);
        assert_eq!(client_key(&req, true), "198.51.100.1");
    }

    #[test]
    fn test_real_ip_fallback() {
        let req = request_with(&[("x-real-ip", "198.51.100.9")]);
        assert_eq!(client_key(&req, true), "198.51.100.9");
    }

    #[test]
    fn test_proxy_without_headers_uses_peer() {
        let mut req = request_with(&[]);
        req.extensions_mut()
            .insert(ConnectInfo("[2001:db8::1]:443".parse::<SocketAddr>().unwrap()));

        assert_eq!(client_key(&req, true), "2001:db8::1");
    }
}
