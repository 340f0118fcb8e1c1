use crate::error::{AishError, Result};
use std::io::Write;

/// Maximum response size (1MB)
pub const MAX_RESPONSE_SIZE: usize = 1_048_576;

/// Handles SSE stream processing with buffer management and size limits.
/// Bytes are buffered raw and only whole events are decoded, so a multibyte
/// character split across network chunks survives intact.
pub struct SseProcessor {
    buffer: Vec<u8>,
    full_response: String,
    max_size: usize,
}

impl SseProcessor {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            full_response: String::new(),
            max_size: MAX_RESPONSE_SIZE,
        }
    }

    /// Returns the accumulated full response
    pub fn into_response(self) -> String {
        self.full_response
    }

    /// Append a chunk to the buffer. Carriage returns are dropped so that
    /// `\r\n\r\n` framing splits the same way as `\n\n`.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.buffer.extend(chunk.iter().filter(|&&b| b != b'\r'));
    }

    fn next_event(&mut self) -> Option<String> {
        let event_end = self.buffer.windows(2).position(|w| w == b"\n\n")?;
        let event: Vec<u8> = self.buffer.drain(..event_end + 2).collect();
        Some(String::from_utf8_lossy(&event).into_owned())
    }

    /// Process complete SSE events from the buffer.
    /// Calls the provided closure for each `data:` line (excluding [DONE]).
    /// Returns Err if the closure returns an error or if response size exceeds limit.
    pub fn process_events<F>(&mut self, mut handler: F) -> Result<()>
    where
        F: FnMut(&str) -> Result<Option<String>>,
    {
        while let Some(event_data) = self.next_event() {
            for line in event_data.lines() {
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim_start();
                if data == "[DONE]" {
                    continue;
                }

                if let Some(text) = handler(data)? {
                    self.full_response.push_str(&text);

                    if self.full_response.len() > self.max_size {
                        return Err(AishError::Stream(format!(
                            "Response too large (>{} bytes)",
                            self.max_size
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Handles whatever is left once the stream has closed. Some servers
    /// omit the blank line after the last event.
    pub fn finish_with_output<F>(
        &mut self,
        output: &mut (dyn Write + Send),
        handler: F,
    ) -> Result<()>
    where
        F: FnMut(&str) -> Result<Option<String>>,
    {
        if self.buffer.iter().all(u8::is_ascii_whitespace) {
            self.buffer.clear();
            return Ok(());
        }

        tracing::debug!(bytes = self.buffer.len(), "stream ended mid-event");
        self.buffer.extend_from_slice(b"\n\n");
        self.process_events_with_output(output, handler)
    }

    /// Convenience method to process events and write text to output
    pub fn process_events_with_output<F>(
        &mut self,
        output: &mut (dyn Write + Send),
        handler: F,
    ) -> Result<()>
    where
        F: FnMut(&str) -> Result<Option<String>>,
    {
        let response_before = self.full_response.len();
        self.process_events(handler)?;

        if self.full_response.len() > response_before {
            let new_text = &self.full_response[response_before..];
            output.write_all(new_text.as_bytes())?;
            output.flush()?;
        }
        Ok(())
    }
}
