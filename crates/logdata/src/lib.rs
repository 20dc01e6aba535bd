//! Fixed-layout binary schema for forwarded sample messages.
//!
//! The forwarder publishes one sample per broker record. The payload is a
//! fixed little-endian layout, decoded here into a [`LogFrame`]:
//!
//! ```text
//! [0..8)      u64  timestamp (nanoseconds since epoch)
//! [8..10)     u16  source name length n (1..=256)
//! [10..10+n)  UTF-8 source name
//! [10+n]      u8   value tag (0 = Int, 1 = Long, 2 = Double)
//! ...         value bytes per tag (4 or 8, little-endian)
//! ```
//!
//! Decoding fails closed: truncated input, an out-of-range name length,
//! invalid UTF-8, an unknown tag, or trailing bytes after the value all
//! return a [`SchemaError`] rather than a partial frame.

mod frame;

pub use frame::{LogFrame, SchemaError, Value, MAX_SOURCE_NAME_LEN};
