use bytes::{Buf, BytesMut};

/// Longest line kept in memory. Anything past it, up to the next `\n`, is
/// dropped.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

const READ_RESERVE: usize = 8 * 1024;

/// Splits an arbitrarily chunked byte stream into lines.
///
/// `\n` terminates a line and a trailing `\r` is stripped. Lines are decoded
/// as UTF-8 when valid and as Latin-1 otherwise, so decoding never fails.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: BytesMut,
    /// Inside the remainder of an overlong line.
    discarding: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Read target for `AsyncReadExt::read_buf`.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        self.buf.reserve(READ_RESERVE);
        &mut self.buf
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next complete line, if one is buffered.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let newline = self.buf.iter().position(|&b| b == b'\n');

            if self.discarding {
                match newline {
                    Some(pos) => {
                        self.buf.advance(pos + 1);
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        self.buf.clear();
                        return None;
                    }
                }
            }

            return match newline {
                Some(pos) if pos > MAX_LINE_BYTES => {
                    let line = self.buf.split_to(MAX_LINE_BYTES);
                    self.buf.advance(pos + 1 - MAX_LINE_BYTES);
                    Some(decode_line(&line))
                }
                Some(pos) => {
                    let line = self.buf.split_to(pos + 1);
                    Some(decode_line(trim_terminator(&line[..pos])))
                }
                None if self.buf.len() > MAX_LINE_BYTES => {
                    let line = self.buf.split_to(MAX_LINE_BYTES);
                    self.buf.clear();
                    self.discarding = true;
                    Some(decode_line(&line))
                }
                None => None,
            };
        }
    }

    /// Unterminated tail left at end of input.
    pub fn finish(&mut self) -> Option<String> {
        if self.discarding {
            self.discarding = false;
            self.buf.clear();
            return None;
        }
        if self.buf.is_empty() {
            return None;
        }
        let line = self.buf.split();
        Some(decode_line(trim_terminator(&line)))
    }
}

fn trim_terminator(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// UTF-8 when valid, otherwise one code point per byte.
pub fn decode_line(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}
