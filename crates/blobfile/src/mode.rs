//! Text and binary mode coercion
//!
//! A blob file always buffers raw bytes. The mode decides what callers see:
//! [`Binary`] hands bytes through untouched, [`Text`] encodes writes and
//! decodes reads with an [`Encoding`]. Read limits are counted in the mode's
//! units, bytes for binary and characters for text.

use crate::{BlobError, OpenOptions, Result};
use std::borrow::{Borrow, Cow};
use std::fmt;
use std::str::FromStr;

/// How caller data is converted to and from buffered bytes
pub trait Mode: fmt::Debug + Send + Sized {
    /// Data returned by reads
    type Owned: Borrow<Self::Borrowed> + fmt::Debug;
    /// Data accepted by writes
    type Borrowed: ?Sized;

    /// Build the mode from open options
    fn from_options(options: &OpenOptions) -> Result<Self>;

    /// Whether this is a text mode
    fn is_text(&self) -> bool;

    /// Encode caller data to bytes
    fn encode<'a>(&self, data: &'a Self::Borrowed) -> Result<Cow<'a, [u8]>>;

    /// Decode bytes to caller data
    fn decode(&self, bytes: &[u8]) -> Result<Self::Owned>;

    /// Number of bytes covering the first `units` units of `bytes`
    fn span(&self, bytes: &[u8], units: usize) -> usize;

    /// Size of caller data in units
    fn units(&self, data: &Self::Borrowed) -> usize;
}

/// Bytes in, bytes out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Binary;

impl Mode for Binary {
    type Owned = Vec<u8>;
    type Borrowed = [u8];

    fn from_options(_options: &OpenOptions) -> Result<Self> {
        Ok(Binary)
    }

    fn is_text(&self) -> bool {
        false
    }

    fn encode<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Borrowed(data))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }

    fn span(&self, bytes: &[u8], units: usize) -> usize {
        units.min(bytes.len())
    }

    fn units(&self, data: &[u8]) -> usize {
        data.len()
    }
}

/// Strings in, strings out, through an encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Text {
    encoding: Encoding,
}

impl Text {
    /// Text mode with the named encoding
    pub fn new(encoding: &str) -> Result<Self> {
        Ok(Self {
            encoding: encoding.parse()?,
        })
    }

    /// The configured encoding
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl From<Encoding> for Text {
    fn from(encoding: Encoding) -> Self {
        Self { encoding }
    }
}

impl Mode for Text {
    type Owned = String;
    type Borrowed = str;

    fn from_options(options: &OpenOptions) -> Result<Self> {
        Text::new(&options.encoding)
    }

    fn is_text(&self) -> bool {
        true
    }

    fn encode<'a>(&self, data: &'a str) -> Result<Cow<'a, [u8]>> {
        self.encoding.encode(data)
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        self.encoding.decode(bytes)
    }

    fn span(&self, bytes: &[u8], units: usize) -> usize {
        self.encoding.span(bytes, units)
    }

    fn units(&self, data: &str) -> usize {
        data.chars().count()
    }
}

/// Supported text encodings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// UTF-8
    #[default]
    Utf8,
    /// ISO-8859-1, one byte per code point up to U+00FF
    Latin1,
    /// 7-bit ASCII
    Ascii,
}

impl Encoding {
    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "latin-1",
            Encoding::Ascii => "ascii",
        }
    }

    /// Encode a string
    pub fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>> {
        match self {
            Encoding::Utf8 => Ok(Cow::Borrowed(text.as_bytes())),
            Encoding::Ascii => match text.char_indices().find(|(_, c)| !c.is_ascii()) {
                None => Ok(Cow::Borrowed(text.as_bytes())),
                Some((index, c)) => Err(unencodable(*self, c, index)),
            },
            Encoding::Latin1 => {
                if text.is_ascii() {
                    return Ok(Cow::Borrowed(text.as_bytes()));
                }
                text.char_indices()
                    .map(|(index, c)| u8::try_from(u32::from(c)).map_err(|_| unencodable(*self, c, index)))
                    .collect::<Result<Vec<u8>>>()
                    .map(Cow::Owned)
            }
        }
    }

    /// Decode bytes
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| {
                    BlobError::Codec(format!(
                        "'utf-8' codec can't decode byte at position {}",
                        e.valid_up_to()
                    ))
                }),
            Encoding::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
                Some(position) => Err(BlobError::Codec(format!(
                    "'ascii' codec can't decode byte 0x{:02x} at position {}",
                    bytes[position], position
                ))),
            },
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    /// Number of bytes covering the first `chars` characters of `bytes`
    ///
    /// Malformed UTF-8 lead bytes count as one byte so that the following
    /// decode reports them.
    pub fn span(&self, bytes: &[u8], chars: usize) -> usize {
        match self {
            Encoding::Latin1 | Encoding::Ascii => chars.min(bytes.len()),
            Encoding::Utf8 => {
                let mut offset = 0;
                for _ in 0..chars {
                    let Some(&lead) = bytes.get(offset) else {
                        break;
                    };
                    offset = (offset + utf8_width(lead)).min(bytes.len());
                }
                offset
            }
        }
    }
}

impl FromStr for Encoding {
    type Err = BlobError;

    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Ok(Encoding::Latin1),
            "ascii" | "us-ascii" => Ok(Encoding::Ascii),
            _ => Err(BlobError::Codec(format!("unknown encoding: {}", name))),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}

fn unencodable(encoding: Encoding, c: char, index: usize) -> BlobError {
    BlobError::Codec(format!(
        "'{}' codec can't encode character {:?} at position {}",
        encoding, c, index
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_names() {
        assert_eq!("UTF-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("utf8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("ISO-8859-1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert_eq!("latin_1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert_eq!("us-ascii".parse::<Encoding>().unwrap(), Encoding::Ascii);
        assert!("cp1252".parse::<Encoding>().is_err());
    }

    #[test]
    fn test_utf8_span_counts_characters() {
        let text = "héllo wörld";
        let bytes = text.as_bytes();
        assert_eq!(Encoding::Utf8.span(bytes, 2), "hé".len());
        assert_eq!(Encoding::Utf8.span(bytes, 0), 0);
        assert_eq!(Encoding::Utf8.span(bytes, 100), bytes.len());
    }

    #[test]
    fn test_latin1_roundtrip() {
        let encoded = Encoding::Latin1.encode("café").unwrap();
        assert_eq!(encoded.as_ref(), &[b'c', b'a', b'f', 0xe9]);
        assert_eq!(Encoding::Latin1.decode(&encoded).unwrap(), "café");
    }

    #[test]
    fn test_unencodable_characters() {
        assert!(matches!(Encoding::Ascii.encode("naïve"), Err(BlobError::Codec(_))));
        assert!(matches!(Encoding::Latin1.encode("€"), Err(BlobError::Codec(_))));
    }

    #[test]
    fn test_invalid_utf8_is_codec_error() {
        let err = Encoding::Utf8.decode(&[b'o', b'k', 0xff]).unwrap_err();
        assert!(err.to_string().contains("position 2"));
    }

    #[test]
    fn test_binary_mode_passthrough() {
        let bytes: Vec<u8> = (0..=255u8).collect();
        assert_eq!(Binary.encode(&bytes).unwrap().as_ref(), bytes.as_slice());
        assert_eq!(Binary.decode(&bytes).unwrap(), bytes);
        assert_eq!(Binary.span(&bytes, 10), 10);
        assert_eq!(Binary.span(&bytes, 1000), 256);
    }

    #[test]
    fn test_text_mode_from_options() {
        let options = OpenOptions::default().with_encoding("latin-1");
        let mode = Text::from_options(&options).unwrap();
        assert_eq!(mode.encoding(), Encoding::Latin1);
        assert!(mode.is_text());
        assert_eq!(mode.units("año"), 3);
    }
}
