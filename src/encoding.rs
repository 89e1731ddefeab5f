//! Encoding detection and line decoding using chardetng and `encoding_rs`.

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use std::fmt;

/// A text encoding the line source can decode.
///
/// `encoding_rs` covers everything the WHATWG Encoding Standard knows about,
/// which excludes UTF-32; those two variants are decoded here directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Any encoding provided by `encoding_rs`.
    Standard(&'static Encoding),
    /// UTF-32 little endian.
    Utf32Le,
    /// UTF-32 big endian.
    Utf32Be,
}

impl Default for TextEncoding {
    fn default() -> Self {
        TextEncoding::utf8()
    }
}

impl TextEncoding {
    pub fn utf8() -> Self {
        TextEncoding::Standard(encoding_rs::UTF_8)
    }

    pub fn utf16le() -> Self {
        TextEncoding::Standard(encoding_rs::UTF_16LE)
    }

    pub fn utf16be() -> Self {
        TextEncoding::Standard(encoding_rs::UTF_16BE)
    }

    /// Look up an encoding by label ("utf-8", "windows-1252", "utf-32le", ...).
    pub fn for_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "utf-32" | "utf-32le" | "utf32" | "utf32le" => Some(TextEncoding::Utf32Le),
            "utf-32be" | "utf32be" => Some(TextEncoding::Utf32Be),
            _ => Encoding::for_label(normalized.as_bytes()).map(TextEncoding::Standard),
        }
    }

    /// Canonical name of the encoding.
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Standard(enc) => enc.name(),
            TextEncoding::Utf32Le => "UTF-32LE",
            TextEncoding::Utf32Be => "UTF-32BE",
        }
    }

    /// Width in bytes of one code unit. Line breaks are always one code unit.
    pub fn code_unit_width(&self) -> usize {
        match self {
            TextEncoding::Standard(enc)
                if *enc == encoding_rs::UTF_16LE || *enc == encoding_rs::UTF_16BE =>
            {
                2
            }
            TextEncoding::Standard(_) => 1,
            TextEncoding::Utf32Le | TextEncoding::Utf32Be => 4,
        }
    }

    /// Returns `b'\n'` or `b'\r'` if the code unit encodes a line break.
    #[inline]
    pub(crate) fn line_break_unit(&self, unit: &[u8]) -> Option<u8> {
        let value = match (self, unit) {
            (TextEncoding::Standard(enc), [lo, 0]) if *enc == encoding_rs::UTF_16LE => *lo,
            (TextEncoding::Standard(enc), [0, lo]) if *enc == encoding_rs::UTF_16BE => *lo,
            (TextEncoding::Standard(_), [b]) => *b,
            (TextEncoding::Utf32Le, [lo, 0, 0, 0]) | (TextEncoding::Utf32Be, [0, 0, 0, lo]) => *lo,
            _ => return None,
        };
        matches!(value, b'\n' | b'\r').then_some(value)
    }

    /// Decode one line worth of bytes. Malformed sequences become U+FFFD.
    ///
    /// Returns the text and whether any replacement happened.
    pub fn decode(&self, bytes: &[u8]) -> (String, bool) {
        match self {
            TextEncoding::Standard(enc) => {
                let (text, had_errors) = enc.decode_without_bom_handling(bytes);
                (text.into_owned(), had_errors)
            }
            TextEncoding::Utf32Le => decode_utf32(bytes, u32::from_le_bytes),
            TextEncoding::Utf32Be => decode_utf32(bytes, u32::from_be_bytes),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the line source picks the encoding of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingChoice {
    /// Byte order mark first, then a guess from the leading bytes.
    #[default]
    Auto,
    /// Byte order mark first, falling back to the given encoding.
    Hint(TextEncoding),
    /// Always use the given encoding. A matching byte order mark is skipped.
    Override(TextEncoding),
}

fn decode_utf32(bytes: &[u8], to_u32: fn([u8; 4]) -> u32) -> (String, bool) {
    let mut had_errors = false;
    let mut text = String::with_capacity(bytes.len() / 4);
    let chunks = bytes.chunks_exact(4);
    if !chunks.remainder().is_empty() {
        had_errors = true;
    }
    for chunk in chunks {
        let unit = to_u32([chunk[0], chunk[1], chunk[2], chunk[3]]);
        match char::from_u32(unit) {
            Some(c) => text.push(c),
            None => {
                had_errors = true;
                text.push(char::REPLACEMENT_CHARACTER);
            }
        }
    }
    if had_errors && bytes.len() % 4 != 0 {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    (text, had_errors)
}

/// Byte order mark signatures in detection order.
///
/// UTF-32 LE must be checked before UTF-16 LE: `FF FE` is a prefix of `FF FE 00 00`.
fn signatures() -> [(&'static [u8], TextEncoding); 5] {
    [
        (&[0xFF, 0xFE, 0x00, 0x00], TextEncoding::Utf32Le),
        (&[0x00, 0x00, 0xFE, 0xFF], TextEncoding::Utf32Be),
        (&[0xEF, 0xBB, 0xBF], TextEncoding::utf8()),
        (&[0xFF, 0xFE], TextEncoding::utf16le()),
        (&[0xFE, 0xFF], TextEncoding::utf16be()),
    ]
}

/// Inspect up to 4 leading bytes for a byte order mark.
///
/// Returns the encoding and the signature length in bytes, or `(default, 0)`
/// when no signature matches.
pub fn detect_encoding(first_bytes: &[u8], default: TextEncoding) -> (TextEncoding, usize) {
    signatures()
        .into_iter()
        .find(|(sig, _)| first_bytes.starts_with(sig))
        .map_or((default, 0), |(sig, enc)| (enc, sig.len()))
}

/// Check if the given bytes are valid UTF-8.
///
/// Uses SIMD-accelerated validation for performance.
pub fn is_utf8(data: &[u8]) -> bool {
    simdutf8::basic::from_utf8(data).is_ok()
}

/// Like [`is_utf8`], but tolerates a multi-byte sequence cut off at the end
/// of a sample buffer.
fn is_utf8_prefix(data: &[u8]) -> bool {
    match simdutf8::compat::from_utf8(data) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

/// Guess the encoding of a sample that carries no byte order mark.
///
/// Text with many NUL bytes is treated as UTF-16, with the NUL position giving
/// the byte order. Then valid UTF-8 wins, and everything else goes to chardetng.
pub fn guess_encoding(sample: &[u8]) -> TextEncoding {
    if sample.is_empty() {
        return TextEncoding::utf8();
    }

    // NUL is valid UTF-8, so this has to run first
    let nul_count = bytecount::count(sample, 0);
    if nul_count * 4 > sample.len() {
        let even_nuls = sample.iter().step_by(2).filter(|&&b| b == 0).count();
        let odd_nuls = nul_count - even_nuls;
        return if even_nuls > odd_nuls {
            TextEncoding::utf16be()
        } else {
            TextEncoding::utf16le()
        };
    }

    if is_utf8_prefix(sample) {
        return TextEncoding::utf8();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(sample, false);
    TextEncoding::Standard(detector.guess(None, true))
}
