//! Verify parameter encoding against JSON test vectors stored in `test-vectors/`.
//!
//! Each case names a parameter shape, the input for it, and the exact bytes
//! the encoder must produce. Shapes are rebuilt from JSON so the same file can
//! drive any binding of the encoder.

use std::collections::HashMap;

use httpreq_core::{Body, Params};
use serde_json::Value;

/// Build `Params` of the shape named by `kind` from a JSON input.
fn params_from(kind: &str, input: &Value) -> Params {
    match kind {
        "none" => Params::None,
        "text" => Params::from(input.as_str().unwrap()),
        "pairs" => {
            let items: Vec<String> = serde_json::from_value(input.clone()).unwrap();
            Params::from(items)
        }
        "bytes" => {
            let bytes: Vec<u8> = serde_json::from_value(input.clone()).unwrap();
            Params::from(bytes)
        }
        "map" => {
            let map: HashMap<String, String> = serde_json::from_value(input.clone()).unwrap();
            Params::from(map)
        }
        "query" => {
            let pairs: Vec<(String, String)> = serde_json::from_value(input.clone()).unwrap();
            Params::from(pairs)
        }
        other => panic!("unknown kind: {other}"),
    }
}

fn body_bytes(body: Body) -> Vec<u8> {
    match body {
        Body::Bytes(bytes) => bytes,
        Body::Reader(_) => panic!("expected a buffered body"),
    }
}

#[test]
fn params_test_vectors() {
    let raw = include_str!("../../test-vectors/params.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let kind = case["kind"].as_str().unwrap();
        let encoded = params_from(kind, &case["input"]).encode();

        if let Some(expected) = case.get("expected_bytes") {
            let expected: Vec<u8> = serde_json::from_value(expected.clone()).unwrap();
            let body = encoded.unwrap_or_else(|| panic!("{name}: expected a body"));
            assert_eq!(body_bytes(body), expected, "{name}: body bytes");
            continue;
        }

        match case["expected"].as_str() {
            None => assert!(encoded.is_none(), "{name}: expected no body"),
            Some(expected) => {
                let body = encoded.unwrap_or_else(|| panic!("{name}: expected a body"));
                let text = String::from_utf8(body_bytes(body)).unwrap();
                assert_eq!(text, expected, "{name}: body text");
            }
        }
    }
}

#[test]
fn vector_names_are_unique() {
    let raw = include_str!("../../test-vectors/params.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let mut names: Vec<&str> = vectors["cases"]
        .as_array()
        .unwrap()
        .iter()
        .map(|case| case["name"].as_str().unwrap())
        .collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), total);
}
