use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{is_truthy, SahayakApiError};

/// Record separator in the generation stream.
pub const RECORD_SEPARATOR: &str = "\n\n";

const DATA_PREFIX: &str = "data:";

/// Incremental decoder for the `data: {"text": ...}\n\n` generation stream.
///
/// Bytes are appended with [`feed`](Self::feed) and tokens are pulled one at a
/// time with [`next_token`](Self::next_token), so nothing past a failing record
/// is ever decoded. After [`finish`](Self::finish) the unterminated tail of the
/// buffer is treated as one last record.
#[derive(Debug, Default)]
pub struct TextStreamDecoder {
    buffer: String,
    /// Trailing bytes of a UTF-8 sequence split across reads.
    pending: Vec<u8>,
    finished: bool,
    records: usize,
}

impl TextStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes from the source.
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.finished {
            debug!("ignoring {} bytes fed after end of stream", bytes.len());
            return;
        }

        self.pending.extend_from_slice(bytes);
        let mut consumed = 0;
        loop {
            match std::str::from_utf8(&self.pending[consumed..]) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    consumed = self.pending.len();
                    break;
                }
                Err(error) => {
                    let valid = consumed + error.valid_up_to();
                    // Validated just above, so the lossy call never substitutes here.
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending[consumed..valid]));
                    match error.error_len() {
                        Some(invalid) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            consumed = valid + invalid;
                        }
                        None => {
                            consumed = valid;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..consumed);
    }

    /// Mark the source as exhausted.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        if !self.pending.is_empty() {
            self.buffer
                .push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of non-empty records decoded so far.
    pub fn records_decoded(&self) -> usize {
        self.records
    }

    /// True when no undecoded text or bytes remain.
    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty() && self.pending.is_empty()
    }

    /// Pull the next token from the buffered text.
    ///
    /// Returns `None` when more input is needed (or, after [`finish`](Self::finish),
    /// when the stream is exhausted). Empty records are skipped.
    pub fn next_token(&mut self) -> Option<Result<String, SahayakApiError>> {
        loop {
            let record = if let Some(split) = self.buffer.find(RECORD_SEPARATOR) {
                let record = self.buffer[..split].to_string();
                self.buffer.drain(..split + RECORD_SEPARATOR.len());
                record
            } else if self.finished && !self.buffer.is_empty() {
                std::mem::take(&mut self.buffer)
            } else {
                return None;
            };

            let payload = record_payload(&record);
            if payload.is_empty() {
                continue;
            }

            self.records += 1;
            debug!("stream record #{}: {} bytes", self.records, payload.len());
            return Some(decode_record(payload));
        }
    }

    /// Decode a complete body in one shot, stopping at the first failure.
    pub fn decode_all(input: &str) -> Result<Vec<String>, SahayakApiError> {
        let mut decoder = Self::new();
        decoder.feed(input.as_bytes());
        decoder.finish();

        let mut tokens = Vec::new();
        while let Some(token) = decoder.next_token() {
            tokens.push(token?);
        }
        Ok(tokens)
    }
}

fn record_payload(record: &str) -> &str {
    let trimmed = record.trim();
    trimmed
        .strip_prefix(DATA_PREFIX)
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Records must be JSON objects; `null`, arrays and scalars are malformed.
fn decode_record(payload: &str) -> Result<String, SahayakApiError> {
    let value: Map<String, Value> = serde_json::from_str(payload).map_err(|error| {
        warn!("malformed stream record: {error}");
        SahayakApiError::malformed(payload, error)
    })?;

    if let Some(error) = value.get("error").filter(|error| is_truthy(error)) {
        let error = SahayakApiError::upstream(error);
        warn!("upstream error record: {error}");
        return Err(error);
    }

    Ok(match value.get("text") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    })
}
