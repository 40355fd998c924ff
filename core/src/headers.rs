//! Case-insensitive header store.
//!
//! # Design
//! Names are stored in canonical MIME form (`content-type` becomes
//! `Content-Type`) so lookups ignore case and iteration prints the way the
//! headers are usually written. Values stay plain `String`s until the request
//! is dispatched; validation against the wire grammar happens once, in
//! `to_header_map`, which keeps the chaining setters on `Request` infallible.

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{Error, Result};

/// Ordered mapping from canonical header name to one or more values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderStore {
    entries: BTreeMap<String, Vec<String>>,
}

impl HeaderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every value of `key` with `value`.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(canonical_key(key), vec![value.into()]);
    }

    /// Add `value` after the existing values of `key`.
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .entry(canonical_key(key))
            .or_default()
            .push(value.into());
    }

    /// Merge `other` into this store, value by value.
    ///
    /// Each of `other`'s values is `set` in turn, so a key present in `other`
    /// ends up with only its last value there. Keys that only exist here are
    /// left alone.
    pub fn merge(&mut self, other: &HeaderStore) {
        for (key, values) in &other.entries {
            for value in values {
                self.set(key, value.as_str());
            }
        }
    }

    /// First value of `key`, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.entries
            .get(&canonical_key(key))
            .and_then(|values| values.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries
            .get(&canonical_key(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.entries.remove(&canonical_key(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&canonical_key(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, values)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Convert into a wire header map, rejecting names or values the HTTP
    /// grammar does not allow.
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (key, values) in &self.entries {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| Error::InvalidHeader {
                name: key.clone(),
                reason: e.to_string(),
            })?;
            for value in values {
                let value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
                    name: key.clone(),
                    reason: e.to_string(),
                })?;
                map.append(name.clone(), value);
            }
        }
        Ok(map)
    }

    /// Build a store from received headers. Non-UTF-8 bytes are replaced.
    pub fn from_header_map(map: &HeaderMap) -> Self {
        let mut store = Self::new();
        for (name, value) in map {
            store.append(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
        store
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for HeaderStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (key, value) in iter {
            store.append(key.as_ref(), value);
        }
        store
    }
}

/// Canonical MIME form of a header name: the first letter and every letter
/// following a hyphen are upper-cased, the rest lower-cased. Names containing
/// bytes outside the token grammar are returned unchanged.
pub fn canonical_key(key: &str) -> String {
    if !key.bytes().all(is_token_byte) {
        return key.to_string();
    }
    let mut out = String::with_capacity(key.len());
    let mut upper = true;
    for c in key.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_key_normalizes_case() {
        assert_eq!(canonical_key("content-type"), "Content-Type");
        assert_eq!(canonical_key("X-FORWARDED-FOR"), "X-Forwarded-For");
        assert_eq!(canonical_key("accept"), "Accept");
        assert_eq!(canonical_key("bad header"), "bad header");
    }

    #[test]
    fn get_is_case_insensitive_and_defaults_to_empty() {
        let mut h = HeaderStore::new();
        h.set("user-agent", "httpreq-test/1.0");
        assert_eq!(h.get("USER-AGENT"), "httpreq-test/1.0");
        assert_eq!(h.get("Referer"), "");
    }

    #[test]
    fn set_overwrites_all_values() {
        let mut h = HeaderStore::new();
        h.append("Accept", "text/html");
        h.append("accept", "application/json");
        assert_eq!(h.get_all("Accept").len(), 2);
        h.set("ACCEPT", "*/*");
        assert_eq!(h.get_all("accept"), ["*/*".to_string()]);
    }

    #[test]
    fn merge_sets_each_value_and_keeps_unrelated_keys() {
        let mut h = HeaderStore::new();
        h.set("Referer", "https://a.example");
        h.set("Accept", "text/html");

        let incoming: HeaderStore = [("accept", "application/json"), ("X-Trace", "1"), ("x-trace", "2")]
            .into_iter()
            .collect();
        h.merge(&incoming);

        assert_eq!(h.get("Referer"), "https://a.example");
        assert_eq!(h.get_all("Accept"), ["application/json".to_string()]);
        assert_eq!(h.get_all("X-Trace"), ["2".to_string()]);
    }

    #[test]
    fn clone_is_independent() {
        let mut h = HeaderStore::new();
        h.set("A", "1");
        let snapshot = h.clone();
        h.set("A", "2");
        assert_eq!(snapshot.get("A"), "1");
    }

    #[test]
    fn to_header_map_keeps_every_value() {
        let mut h = HeaderStore::new();
        h.append("X-Multi", "one");
        h.append("X-Multi", "two");
        let map = h.to_header_map().unwrap();
        let values: Vec<_> = map.get_all("x-multi").iter().collect();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn to_header_map_rejects_bad_value() {
        let mut h = HeaderStore::new();
        h.set("X-Bad", "line\nbreak");
        let err = h.to_header_map().unwrap_err();
        assert!(matches!(err, Error::InvalidHeader { ref name, .. } if name == "X-Bad"));
    }

    #[test]
    fn from_header_map_canonicalizes() {
        let mut map = HeaderMap::new();
        map.insert("content-length", HeaderValue::from_static("2"));
        let h = HeaderStore::from_header_map(&map);
        assert_eq!(h.iter().next().unwrap().0, "Content-Length");
    }
}
