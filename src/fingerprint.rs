use crate::headers::HeaderMap;

/// The fixed, ordered subset of request headers that determines the cache
/// key (§3). This subset is a compile-time policy, not a runtime option.
const FINGERPRINT_HEADERS: [&str; 5] = ["host", "path", "method", "scheme", "user-agent"];

/// Deterministic, pure derivation of a cache key from a request header map.
///
/// Missing headers contribute an empty string rather than shortening the
/// key, so two requests that differ only in which headers are *present*
/// (as opposed to their values) still fingerprint distinctly when that
/// matters and identically when it doesn't — concatenation never
/// re-aligns fields.
pub type Fingerprint = Vec<u8>;

/// Computes the [`Fingerprint`] for a request's headers.
///
/// `path` is supplied separately because, unlike the other four fields, the
/// request path is carried out-of-band from the header map by most host
/// proxy frameworks (it is a pseudo-header, `:path`); implementations that
/// expose it through `headers.get("path")` may pass an empty string here
/// and rely on the header lookup instead — the function is total either
/// way.
pub fn compute_fingerprint(headers: &dyn HeaderMap, path: &str) -> Fingerprint {
    let mut key = Vec::new();
    for name in FINGERPRINT_HEADERS {
        let value = if name == "path" && !path.is_empty() {
            path
        } else {
            headers.get(name).unwrap_or("")
        };
        key.extend_from_slice(value.as_bytes());
        // A zero byte cannot appear in a valid header value, so it is a
        // safe field separator that keeps e.g. ("ab", "c") from
        // fingerprinting identically to ("a", "bc").
        key.push(0);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::OwnedHeaderMap;

    #[test]
    fn missing_headers_contribute_empty_strings() {
        let headers = OwnedHeaderMap::new();
        let fp = compute_fingerprint(&headers, "");
        assert_eq!(fp, vec![0, 0, 0, 0, 0]);
    }

    #[test]
    fn is_pure_and_deterministic() {
        let mut headers = OwnedHeaderMap::new();
        headers.push("host", "a.example");
        headers.push("method", "GET");
        headers.push("scheme", "https");
        headers.push("user-agent", "t");

        let fp1 = compute_fingerprint(&headers, "/path");
        let fp2 = compute_fingerprint(&headers, "/path");
        assert_eq!(fp1, fp2);
    }

    #[test]
    fn distinguishes_field_boundaries() {
        let mut h1 = OwnedHeaderMap::new();
        h1.push("host", "ab");
        h1.push("path", "c");

        let mut h2 = OwnedHeaderMap::new();
        h2.push("host", "a");
        h2.push("path", "bc");

        // Both encode "host" then "path"; without separators these would
        // collide as "abc".
        let fp1 = compute_fingerprint(&h1, "");
        let fp2 = compute_fingerprint(&h2, "");
        assert_ne!(fp1, fp2);
    }
}
