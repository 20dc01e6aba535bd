//! Frame encoding and fail-closed decoding.

/// Maximum permitted source name length in bytes.
pub const MAX_SOURCE_NAME_LEN: usize = 256;

/// Value tags on the wire.
const TAG_INT: u8 = 0;
const TAG_LONG: u8 = 1;
const TAG_DOUBLE: u8 = 2;

/// Schema decoding error.
///
/// `offset` is the byte position at which decoding could no longer
/// proceed; `reason` describes why.
#[derive(Debug, thiserror::Error)]
#[error("schema error at offset {offset}: {reason}")]
pub struct SchemaError {
    /// Byte offset of the failure.
    pub offset: usize,
    /// Failure description.
    pub reason: String,
}

impl SchemaError {
    fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
        }
    }
}

/// A typed sample value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Double(f64),
}

impl Value {
    fn tag(&self) -> u8 {
        match self {
            Value::Int(_) => TAG_INT,
            Value::Long(_) => TAG_LONG,
            Value::Double(_) => TAG_DOUBLE,
        }
    }
}

/// One decoded sample message.
///
/// Read-only and derived; a `LogFrame` is never written back to the
/// broker by the harness except through [`LogFrame::encode`] in tests
/// and fixtures.
#[derive(Debug, Clone, PartialEq)]
pub struct LogFrame {
    /// Sample timestamp, nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
    /// Name of the input that produced the sample.
    pub source_name: String,
    /// The sample value.
    pub value: Value,
}

/// Bounds-checked little-endian reader over a payload.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], SchemaError> {
        let end = self.pos.checked_add(n).ok_or_else(|| {
            SchemaError::new(self.pos, format!("length overflow reading {what}"))
        })?;
        let slice = self.buf.get(self.pos..end).ok_or_else(|| {
            SchemaError::new(
                self.pos,
                format!(
                    "truncated input reading {what}: need {n} bytes, have {}",
                    self.buf.len().saturating_sub(self.pos)
                ),
            )
        })?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self, what: &str) -> Result<u8, SchemaError> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &str) -> Result<u16, SchemaError> {
        let b = self.take(2, what)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, what: &str) -> Result<u32, SchemaError> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self, what: &str) -> Result<u64, SchemaError> {
        let b = self.take(8, what)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }
}

impl LogFrame {
    /// Decode a frame from raw payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] on truncation, an out-of-range or zero
    /// source name length, invalid UTF-8, an unknown value tag, or
    /// trailing bytes after the value. No partial frame is ever
    /// returned.
    pub fn decode(payload: &[u8]) -> Result<Self, SchemaError> {
        let mut r = Reader::new(payload);

        let timestamp_ns = r.u64("timestamp")?;

        let name_len = r.u16("source name length")? as usize;
        let name_len_offset = r.pos - 2;
        if name_len == 0 {
            return Err(SchemaError::new(name_len_offset, "empty source name"));
        }
        if name_len > MAX_SOURCE_NAME_LEN {
            return Err(SchemaError::new(
                name_len_offset,
                format!("source name length {name_len} exceeds {MAX_SOURCE_NAME_LEN}"),
            ));
        }

        let name_offset = r.pos;
        let name_bytes = r.take(name_len, "source name")?;
        let source_name = std::str::from_utf8(name_bytes)
            .map_err(|e| SchemaError::new(name_offset + e.valid_up_to(), "invalid UTF-8 in source name"))?
            .to_owned();

        let tag_offset = r.pos;
        let tag = r.u8("value tag")?;
        let value = match tag {
            TAG_INT => Value::Int(r.u32("int value")? as i32),
            TAG_LONG => Value::Long(r.u64("long value")? as i64),
            TAG_DOUBLE => Value::Double(f64::from_bits(r.u64("double value")?)),
            other => {
                return Err(SchemaError::new(
                    tag_offset,
                    format!("unknown value tag {other}"),
                ));
            }
        };

        if r.pos != payload.len() {
            return Err(SchemaError::new(
                r.pos,
                format!("{} trailing bytes after value", payload.len() - r.pos),
            ));
        }

        Ok(Self {
            timestamp_ns,
            source_name,
            value,
        })
    }

    /// Encode the frame into its wire layout.
    ///
    /// Used by tests and fixtures; the harness itself only decodes.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the source name is empty or longer
    /// than [`MAX_SOURCE_NAME_LEN`] bytes.
    pub fn encode(&self) -> Result<Vec<u8>, SchemaError> {
        let name = self.source_name.as_bytes();
        if name.is_empty() {
            return Err(SchemaError::new(8, "empty source name"));
        }
        if name.len() > MAX_SOURCE_NAME_LEN {
            return Err(SchemaError::new(
                8,
                format!("source name length {} exceeds {MAX_SOURCE_NAME_LEN}", name.len()),
            ));
        }

        let mut out = Vec::with_capacity(8 + 2 + name.len() + 1 + 8);
        out.extend_from_slice(&self.timestamp_ns.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(name);
        out.push(self.value.tag());
        match self.value {
            Value::Int(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Long(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Double(v) => out.extend_from_slice(&v.to_bits().to_le_bytes()),
        }
        Ok(out)
    }
}
