//! ACS v1 (HMAC-SHA1) request signing.

use std::collections::BTreeMap;

use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::source::SourceError;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 encoding as ACS expects it.
pub(crate) fn percent_encode(s: &str) -> String {
    urlencoding::encode(s)
        .replace('+', "%20")
        .replace('*', "%2A")
        .replace("%7E", "~")
}

/// Sorted, encoded `k=v&k=v` query. `BTreeMap` iteration keeps the order.
pub(crate) fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) fn string_to_sign(params: &BTreeMap<String, String>) -> String {
    format!(
        "GET&{}&{}",
        percent_encode("/"),
        percent_encode(&canonical_query(params))
    )
}

/// Base64 HMAC-SHA1 of the string-to-sign, keyed with `secret&`.
pub(crate) fn sign(secret: &str, params: &BTreeMap<String, String>) -> Result<String, SourceError> {
    let key = format!("{}&", secret);
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| SourceError::Config(format!("HMAC key error: {e}")))?;
    mac.update(string_to_sign(params).as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BTreeMap<String, String> {
        let mut p = BTreeMap::new();
        p.insert("Version".to_string(), "2014-05-26".to_string());
        p.insert("Action".to_string(), "DescribeInstanceTypes".to_string());
        p.insert("Timestamp".to_string(), "2024-01-01T00:00:00Z".to_string());
        p
    }

    #[test]
    fn percent_encode_reserved() {
        assert_eq!(percent_encode("hello world"), "hello%20world");
        assert_eq!(percent_encode("a*b"), "a%2Ab");
        assert_eq!(percent_encode("a~b"), "a~b");
        assert_eq!(percent_encode("2024-01-01T00:00:00Z"), "2024-01-01T00%3A00%3A00Z");
    }

    #[test]
    fn canonical_query_is_sorted() {
        assert_eq!(
            canonical_query(&params()),
            "Action=DescribeInstanceTypes&Timestamp=2024-01-01T00%3A00%3A00Z&Version=2014-05-26"
        );
    }

    #[test]
    fn string_to_sign_double_encodes() {
        let s = string_to_sign(&params());
        assert!(s.starts_with("GET&%2F&Action%3DDescribeInstanceTypes%26"));
        assert!(s.contains("Timestamp%3D2024-01-01T00%253A00%253A00Z"));
    }

    #[test]
    fn signature_is_deterministic_sha1_digest() {
        let a = sign("secret", &params()).unwrap();
        let b = sign("secret", &params()).unwrap();
        let c = sign("other", &params()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        // 20 byte digest → 28 base64 chars
        assert_eq!(a.len(), 28);
    }
}
