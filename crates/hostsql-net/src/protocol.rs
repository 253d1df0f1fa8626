//! Wire format: framing and message shapes.

use std::io::{Read, Write};

use hostsql::{HostError, QueryOutput, Result};
use serde::{Deserialize, Serialize};

/// Upper bound on a single frame's payload. Oversized frames fail the
/// read instead of exhausting memory.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// A query request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub sql: String,
}

/// A query response; either columns and rows, or an error message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Vec<String>>,
    #[serde(default)]
    pub row_count: usize,
}

impl Response {
    #[must_use]
    pub fn ok(out: QueryOutput) -> Self {
        let row_count = out.rows.len();
        Self {
            success: true,
            error: None,
            columns: out.columns,
            rows: out.rows,
            row_count,
        }
    }

    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Write one length-prefixed frame.
pub fn write_frame(w: &mut impl Write, payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(HostError::protocol(format!(
            "frame of {} bytes exceeds the {MAX_FRAME_LEN}-byte limit",
            payload.len()
        )));
    }
    w.write_all(&(payload.len() as u32).to_be_bytes())?;
    w.write_all(payload)?;
    w.flush()?;
    Ok(())
}

/// Read one length-prefixed frame. `Ok(None)` means the peer closed the
/// connection cleanly before a new frame began.
pub fn read_frame(r: &mut impl Read) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match r.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(HostError::protocol(format!(
            "peer announced a {len}-byte frame, limit is {MAX_FRAME_LEN}"
        )));
    }
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload)?;
    Ok(Some(payload))
}

pub(crate) fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(msg).map_err(|e| HostError::protocol(e.to_string()))
}

pub(crate) fn decode<T: for<'de> Deserialize<'de>>(payload: &[u8]) -> Result<T> {
    serde_json::from_slice(payload).map_err(|e| HostError::protocol(e.to_string()))
}
