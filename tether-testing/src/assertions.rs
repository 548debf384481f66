// Test assertions for responses

use crate::TestResponse;

/// Assert that a response has a specific status code
pub fn assert_status(response: &TestResponse, expected: u16) {
    assert_eq!(
        response.status, expected,
        "Expected status {}, got {} (body: {:?})",
        expected,
        response.status,
        response.text()
    );
}

/// Assert that a response has a specific header value
pub fn assert_header(response: &TestResponse, key: &str, expected: &str) {
    let actual = response.header(key);
    assert_eq!(
        actual,
        Some(expected),
        "Expected header '{}' to be '{}', got {:?}",
        key,
        expected,
        actual
    );
}

/// Assert that a response body is exactly `expected`
pub fn assert_body(response: &TestResponse, expected: impl AsRef<[u8]>) {
    let expected = expected.as_ref();
    assert_eq!(
        &response.body[..],
        expected,
        "Expected body {:?}, got {:?}",
        String::from_utf8_lossy(expected),
        response.text()
    );
}

/// Assert that a response body contains JSON matching expected value
pub fn assert_json<T>(response: &TestResponse, expected: &T)
where
    T: serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let actual: T = response
        .json()
        .unwrap_or_else(|e| panic!("Failed to deserialize response body: {}", e));
    assert_eq!(actual, *expected, "JSON bodies do not match");
}
