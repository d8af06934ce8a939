//! Incremental UTF-8 Decoding
//!
//! Transport chunk boundaries are arbitrary, so a multi-byte character can
//! arrive split across two reads. The decoder holds back the incomplete tail
//! of each chunk and prepends it to the next one.

use crate::error::FetchError;

/// Longest possible incomplete UTF-8 sequence
const MAX_PENDING: usize = 3;

/// Streaming UTF-8 decoder that carries partial-byte state between chunks
#[derive(Clone, Debug, Default)]
pub struct Utf8Decoder {
    /// Bytes of an incomplete character held back from the previous chunk
    pending: Vec<u8>,
    /// Surface invalid bytes as errors instead of substituting U+FFFD
    strict: bool,
    /// Bytes consumed so far (for error offsets)
    consumed: usize,
}

impl Utf8Decoder {
    /// Decoder that replaces invalid sequences with U+FFFD
    #[must_use]
    pub fn lossy() -> Self {
        Self::default()
    }

    /// Decoder that rejects invalid sequences with `DecodeFailed`
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Decode the next chunk
    ///
    /// Returns the text that is complete so far; it may be empty when the
    /// chunk only continues a held-back character.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String, FetchError> {
        let held = self.pending.len();
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);
        // Absolute offset of `bytes[0]` within the whole stream
        let start = self.consumed - held;
        self.consumed += chunk.len();

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());

                    match e.error_len() {
                        None => {
                            // Incomplete sequence at the end: wait for more bytes
                            debug_assert!(after.len() <= MAX_PENDING);
                            self.pending.extend_from_slice(after);
                            break;
                        }
                        Some(_) if self.strict => {
                            let offset = start + (bytes.len() - rest.len()) + e.valid_up_to();
                            return Err(FetchError::DecodeFailed { offset });
                        }
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                    }
                }
            }
        }

        Ok(out)
    }

    /// Flush at end of stream
    ///
    /// A dangling incomplete character becomes one U+FFFD in lossy mode and
    /// a `DecodeFailed` in strict mode.
    pub fn finish(&mut self) -> Result<Option<String>, FetchError> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        let dangling = std::mem::take(&mut self.pending);
        if self.strict {
            return Err(FetchError::DecodeFailed {
                offset: self.consumed - dangling.len(),
            });
        }
        Ok(Some(char::REPLACEMENT_CHARACTER.to_string()))
    }

    /// Whether an incomplete character is being held back
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
