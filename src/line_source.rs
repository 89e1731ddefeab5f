//! Buffered, re-seekable line reader over an encoded byte stream.
//!
//! Lines are split on the raw code units before decoding, so every line start
//! has an exact byte offset. Bookmarks are (offset, line number) checkpoints
//! kept in an arena; restoring one seeks the stream and drops whatever the
//! buffer had read ahead.

use std::io::{self, Read, Seek, SeekFrom};

use tracing::debug;

use crate::encoding::{EncodingChoice, TextEncoding, detect_encoding, guess_encoding};
use crate::error::{Result, SieveError};

/// Bytes requested from the underlying stream per read.
const CHUNK_SIZE: usize = 64 * 1024;

/// Bytes inspected when guessing an encoding without a byte order mark.
const SNIFF_SIZE: usize = 16 * 1024;

/// Line terminator sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineEnding {
    /// Unix-style line ending (\n).
    Lf,
    /// Windows-style line ending (\r\n).
    CrLf,
    /// Old Mac-style line ending (\r).
    Cr,
}

impl LineEnding {
    /// Returns the character sequence for this line ending.
    pub const fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }

    /// Returns an escaped, printable representation.
    pub const fn escaped(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\\n",
            LineEnding::CrLf => "\\r\\n",
            LineEnding::Cr => "\\r",
        }
    }
}

/// One decoded physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Decoded text without its terminator.
    pub text: String,
    /// 1-based physical line number.
    pub number: u64,
    /// The terminator that ended the line, `None` at end of input.
    pub ending: Option<LineEnding>,
    /// Whether malformed byte sequences were replaced with U+FFFD.
    pub had_decode_errors: bool,
}

/// Saved read position handed out by [`LineSource::bookmark`].
///
/// Tokens stop being valid once released or once the source is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bookmark {
    slot: usize,
    generation: u32,
}

#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    offset: u64,
    line_number: u64,
}

/// Decoded line reader with encoding detection and bookmarks.
#[derive(Debug)]
pub struct LineSource<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    /// Absolute stream offset of `buf[0]`.
    buf_offset: u64,
    eof: bool,
    encoding: TextEncoding,
    signature_len: usize,
    lines_read: u64,
    first_ending: Option<LineEnding>,
    saw_lone_cr: bool,
    checkpoints: Vec<Option<Checkpoint>>,
    generation: u32,
    closed: bool,
}

impl<R: Read + Seek> LineSource<R> {
    /// Open a line source at the stream's current position.
    ///
    /// The encoding is resolved according to `choice` and the read position is
    /// advanced past any detected byte order mark.
    pub fn open(mut inner: R, choice: EncodingChoice) -> Result<Self> {
        let start = inner.stream_position()?;
        let mut source = Self {
            inner,
            buf: Vec::with_capacity(CHUNK_SIZE),
            pos: 0,
            buf_offset: start,
            eof: false,
            encoding: TextEncoding::utf8(),
            signature_len: 0,
            lines_read: 0,
            first_ending: None,
            saw_lone_cr: false,
            checkpoints: Vec::new(),
            generation: 0,
            closed: false,
        };

        let sniff_len = match choice {
            EncodingChoice::Auto => SNIFF_SIZE,
            _ => 4,
        };
        source.fill(sniff_len)?;
        let head = &source.buf[source.pos..];

        let (encoding, signature_len) = match choice {
            EncodingChoice::Auto => match detect_encoding(head, TextEncoding::utf8()) {
                (_, 0) => (guess_encoding(head), 0),
                detected => detected,
            },
            EncodingChoice::Hint(default) => detect_encoding(head, default),
            EncodingChoice::Override(forced) => match detect_encoding(head, forced) {
                (detected, len) if detected == forced => (forced, len),
                _ => (forced, 0),
            },
        };

        debug!(encoding = %encoding, signature_len, "resolved stream encoding");
        source.encoding = encoding;
        source.signature_len = signature_len;
        source.pos += signature_len;
        Ok(source)
    }

    /// The encoding used for decoding.
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Length of the byte order mark that was skipped, 0 if none.
    pub fn signature_len(&self) -> usize {
        self.signature_len
    }

    /// Number of physical lines returned so far (the last line's number).
    pub fn line_number(&self) -> u64 {
        self.lines_read
    }

    /// The first line terminator seen in the stream.
    pub fn line_ending(&self) -> Option<LineEnding> {
        self.first_ending
    }

    /// Whether a carriage return without a following line feed was seen.
    pub fn saw_lone_cr(&self) -> bool {
        self.saw_lone_cr
    }

    /// Absolute stream offset of the next unread byte.
    pub fn offset(&self) -> u64 {
        self.buf_offset + self.pos as u64
    }

    /// Read the next physical line, or `None` at end of input.
    ///
    /// LF, CRLF and a lone CR all terminate a line.
    pub fn read_line(&mut self) -> Result<Option<Line>> {
        if self.closed {
            return Ok(None);
        }

        let encoding = self.encoding;
        let width = encoding.code_unit_width();
        let mut bytes = Vec::new();
        let mut ending = None;
        let mut consumed_any = false;

        loop {
            if !self.fill(width)? {
                // Trailing bytes that do not form a full code unit
                if self.pos < self.buf.len() {
                    bytes.extend_from_slice(&self.buf[self.pos..]);
                    self.pos = self.buf.len();
                    consumed_any = true;
                }
                break;
            }

            let avail = &self.buf[self.pos..];
            let usable = avail.len() - avail.len() % width;
            match find_line_break(encoding, &avail[..usable], width) {
                None => {
                    bytes.extend_from_slice(&avail[..usable]);
                    self.pos += usable;
                    consumed_any = true;
                }
                Some((index, unit)) => {
                    bytes.extend_from_slice(&avail[..index]);
                    self.pos += index + width;
                    consumed_any = true;
                    ending = Some(if unit == b'\n' {
                        LineEnding::Lf
                    } else if self.fill(width)?
                        && encoding.line_break_unit(&self.buf[self.pos..self.pos + width])
                            == Some(b'\n')
                    {
                        self.pos += width;
                        LineEnding::CrLf
                    } else {
                        self.saw_lone_cr = true;
                        LineEnding::Cr
                    });
                    break;
                }
            }
        }

        if !consumed_any {
            return Ok(None);
        }

        self.lines_read += 1;
        if self.first_ending.is_none() {
            self.first_ending = ending;
        }
        let (text, had_decode_errors) = encoding.decode(&bytes);
        Ok(Some(Line {
            text,
            number: self.lines_read,
            ending,
            had_decode_errors,
        }))
    }

    /// Save the current read position.
    pub fn bookmark(&mut self) -> Bookmark {
        let checkpoint = Checkpoint {
            offset: self.offset(),
            line_number: self.lines_read,
        };
        let slot = match self.checkpoints.iter().position(Option::is_none) {
            Some(free) => {
                self.checkpoints[free] = Some(checkpoint);
                free
            }
            None => {
                self.checkpoints.push(Some(checkpoint));
                self.checkpoints.len() - 1
            }
        };
        Bookmark {
            slot,
            generation: self.generation,
        }
    }

    /// Resume reading at a bookmarked line boundary.
    ///
    /// The bookmark stays valid and can be restored again.
    pub fn restore(&mut self, bookmark: Bookmark) -> Result<()> {
        let checkpoint = self.checkpoint(bookmark)?;

        let buffered_end = self.buf_offset + self.buf.len() as u64;
        if (self.buf_offset..=buffered_end).contains(&checkpoint.offset) {
            self.pos = (checkpoint.offset - self.buf_offset) as usize;
        } else {
            self.inner.seek(SeekFrom::Start(checkpoint.offset))?;
            self.buf.clear();
            self.pos = 0;
            self.buf_offset = checkpoint.offset;
            self.eof = false;
        }
        self.lines_read = checkpoint.line_number;
        Ok(())
    }

    /// Give a bookmark's slot back to the arena.
    pub fn release(&mut self, bookmark: Bookmark) -> Result<()> {
        self.checkpoint(bookmark)?;
        self.checkpoints[bookmark.slot] = None;
        Ok(())
    }

    /// Stop reading. Every outstanding bookmark becomes invalid.
    pub fn close(&mut self) {
        self.closed = true;
        self.generation = self.generation.wrapping_add(1);
        self.checkpoints.clear();
        self.buf.clear();
        self.pos = 0;
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn checkpoint(&self, bookmark: Bookmark) -> Result<Checkpoint> {
        if self.closed || bookmark.generation != self.generation {
            return Err(SieveError::InvalidBookmark);
        }
        self.checkpoints
            .get(bookmark.slot)
            .copied()
            .flatten()
            .ok_or(SieveError::InvalidBookmark)
    }

    /// Make at least `need` unread bytes available unless the stream ends.
    ///
    /// Returns whether `need` bytes are available.
    fn fill(&mut self, need: usize) -> io::Result<bool> {
        while self.buf.len() - self.pos < need && !self.eof {
            if self.pos > 0 {
                self.buf.drain(..self.pos);
                self.buf_offset += self.pos as u64;
                self.pos = 0;
            }
            let old_len = self.buf.len();
            self.buf.resize(old_len + CHUNK_SIZE, 0);
            let read = loop {
                match self.inner.read(&mut self.buf[old_len..]) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        self.buf.truncate(old_len);
                        return Err(e);
                    }
                }
            };
            self.buf.truncate(old_len + read);
            if read == 0 {
                self.eof = true;
            }
        }
        Ok(self.buf.len() - self.pos >= need)
    }
}

/// Find the first line break code unit; returns its byte index and `\n`/`\r`.
#[inline]
fn find_line_break(encoding: TextEncoding, data: &[u8], width: usize) -> Option<(usize, u8)> {
    if width == 1 {
        return data
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
            .map(|i| (i, data[i]));
    }
    data.chunks_exact(width)
        .enumerate()
        .find_map(|(i, unit)| encoding.line_break_unit(unit).map(|b| (i * width, b)))
}
