use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::Result;

const TABLE_INDENT: &[u8] = b" ";
const RECORD_INDENT: &[u8] = b"  ";

/// Decodes a base64 transport body. The remote wraps long bodies with line
/// breaks, so ASCII whitespace is skipped.
pub fn decode(body: &str) -> Result<Vec<u8>> {
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// An empty body is a freshly created file and reads as `[]`.
pub fn parse_json_body(bytes: &[u8]) -> Result<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Array(Vec::new()));
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Whole-table files use one space of indentation.
pub fn stringify_table<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    stringify(value, TABLE_INDENT)
}

/// Record files use two spaces of indentation.
pub fn stringify_record<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    stringify(value, RECORD_INDENT)
}

fn stringify<T: Serialize + ?Sized>(value: &T, indent: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent));
    value.serialize(&mut ser)?;
    Ok(out)
}
