//! Verify lookup build/parse against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector describes raw user input, the expected request, a simulated
//! response, and either the expected address or the expected error kind.
//! Results are compared as parsed JSON mappings so field order never matters.

use postcode_core::{
    normalize_number, normalize_postcode, ClientConfig, ErrorKind, HttpResponse, MemoryCache,
    PostcodeClient, USER_AGENT,
};
use serde_json::Value;
use std::sync::Arc;

fn client() -> PostcodeClient {
    PostcodeClient::new(&ClientConfig::default(), Arc::new(MemoryCache::new()))
}

/// Parse the error kind name used in test vectors.
fn parse_kind(s: &str) -> ErrorKind {
    match s {
        "Api" => ErrorKind::Api,
        "AuthenticationFailure" => ErrorKind::AuthenticationFailure,
        "NotFound" => ErrorKind::NotFound,
        other => panic!("unknown error kind: {other}"),
    }
}

#[test]
fn lookup_test_vectors() {
    let raw = include_str!("../../test-vectors/lookup.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let postcode = normalize_postcode(case["input"]["postcode"].as_str().unwrap()).unwrap();
        let number = normalize_number(case["input"]["number"].as_str().unwrap()).unwrap();
        let expected_req = &case["expected_request"];

        // Verify build
        let req = c.build_lookup(&postcode, &number);
        assert_eq!(
            req.url,
            format!("{}{}", c.base_url(), expected_req["path"].as_str().unwrap()),
            "{name}: url"
        );
        assert_eq!(
            req.header("X-API-Key"),
            expected_req["api_key"].as_str(),
            "{name}: api key"
        );
        assert_eq!(req.header("User-Agent"), Some(USER_AGENT), "{name}: user agent");

        // Verify parse
        let sim = &case["simulated_response"];
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            reason: sim["reason"].as_str().unwrap().to_string(),
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().to_string(),
        };
        let result = c.parse_lookup(req.clone(), response);

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            assert_eq!(
                err.kind(),
                parse_kind(expected_error.as_str().unwrap()),
                "{name}: error kind"
            );
            let failure = err.api_failure().unwrap();
            assert_eq!(
                failure.message,
                case["expected_message"].as_str().unwrap(),
                "{name}: message"
            );
            assert_eq!(failure.request, req, "{name}: request kept for diagnostics");
        } else {
            let address = result.unwrap();
            assert_eq!(
                Value::Object(address.to_mapping()),
                case["expected_result"],
                "{name}: parsed result"
            );
        }
    }
}
