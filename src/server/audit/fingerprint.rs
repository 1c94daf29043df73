use std::net::{IpAddr, SocketAddr};

use actix_web::http::header::HeaderMap;
use sha2::{Digest, Sha256};

/// Proxy headers checked for the client address, highest priority first.
const IP_HEADERS: [&str; 8] = [
    "x-forwarded-for",
    "x-real-ip",
    "x-client-ip",
    "cf-connecting-ip",
    "true-client-ip",
    "x-cluster-client-ip",
    "forwarded-for",
    "forwarded",
];

const FINGERPRINT_LEN: usize = 16;

pub const UNKNOWN_IP: &str = "unknown";

/// Stable, one-way client token over (ip, user-agent, accept-language,
/// accept-encoding, accept).
pub fn fingerprint(
    ip: &str,
    user_agent: &str,
    accept_language: &str,
    accept_encoding: &str,
    accept: &str,
) -> String {
    let joined = [ip, user_agent, accept_language, accept_encoding, accept].join("|");
    let digest = Sha256::digest(joined.as_bytes());
    let mut hex = format!("{digest:x}");
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// First valid address from the proxy headers, then the peer address, else
/// [`UNKNOWN_IP`].
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    for name in IP_HEADERS {
        let value = match headers.get(name).and_then(|v| v.to_str().ok()) {
            Some(value) => value,
            None => continue,
        };
        let first = match value.split(',').next() {
            Some(first) => first.trim(),
            None => continue,
        };
        if let Some(ip) = parse_ip(first) {
            return ip.to_string();
        }
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => String::from(UNKNOWN_IP),
    }
}

/// Accepts a bare address, or the `for=` element of a `Forwarded` header.
fn parse_ip(value: &str) -> Option<IpAddr> {
    let value = value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("for="))
        .unwrap_or(value);
    let value = value.trim_matches('"');
    let value = value
        .strip_prefix('[')
        .and_then(|v| v.split(']').next())
        .unwrap_or(value);
    value.parse::<IpAddr>().ok()
}
