//! Echo streamed tokens to a writer as they arrive.

use std::io::{self, Write};

/// Writes each token and flushes it. The first I/O failure is kept and every
/// later token is dropped, so a closed pipe surfaces once the reply ends.
#[derive(Debug)]
pub struct TokenEcho<W> {
    writer: W,
    error: Option<io::Error>,
}

impl<W: Write> TokenEcho<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
        }
    }

    pub fn write_token(&mut self, token: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(error) = self
            .writer
            .write_all(token.as_bytes())
            .and_then(|()| self.writer.flush())
        {
            self.error = Some(error);
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the writer, or the first write error.
    pub fn finish(self) -> io::Result<W> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.writer),
        }
    }
}
