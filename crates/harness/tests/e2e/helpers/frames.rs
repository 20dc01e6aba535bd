//! Wire-frame factories for scenario payloads.

use forwarder_harness::{LogFrame, Value};

/// A well-formed frame carrying a double value for the given source.
pub fn double_frame(source: &str, value: f64) -> Vec<u8> {
    LogFrame {
        timestamp_ns: 1_700_000_000_000_000_000,
        source_name: source.to_owned(),
        value: Value::Double(value),
    }
    .encode()
    .expect("frame should encode")
}

/// A well-formed frame carrying an int value for the given source.
pub fn int_frame(source: &str, value: i32) -> Vec<u8> {
    LogFrame {
        timestamp_ns: 1_700_000_000_000_000_000,
        source_name: source.to_owned(),
        value: Value::Int(value),
    }
    .encode()
    .expect("frame should encode")
}

/// Bytes that fail schema validation (truncated mid-name).
pub fn malformed_frame() -> Vec<u8> {
    let mut bytes = double_frame("SIM:VALUE1", 1.0);
    bytes.truncate(12);
    bytes
}
