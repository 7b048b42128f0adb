//! Domain names.
//!
//! This module provides [`Name`], an absolute domain name kept in
//! uncompressed wire format. Names are created either from their textual
//! representation via [`FromStr`] or by parsing them out of a DNS message,
//! in which case compression pointers are resolved.
//!
//! [`FromStr`]: core::str::FromStr

use core::{fmt, hash, str};

use bytes::Bytes;
use octseq::builder::OctetsBuilder;
use octseq::parse::Parser;

use super::wire::{FormError, ParseError};

/// The maximum length of a domain name in wire format.
const MAX_NAME_LEN: usize = 255;

/// The maximum length of a single label.
const MAX_LABEL_LEN: usize = 63;

//------------ Name ----------------------------------------------------------

/// An absolute domain name in uncompressed wire format.
///
/// The octets are guaranteed to be a valid sequence of labels ending in the
/// root label. Comparison and hashing ignore ASCII case.
#[derive(Clone)]
pub struct Name(Bytes);

impl Name {
    /// Returns the root name.
    #[must_use]
    pub fn root() -> Self {
        Name(Bytes::from_static(b"\0"))
    }

    /// Creates a name from octets in uncompressed wire format.
    pub fn from_octets(octets: Bytes) -> Result<Self, NameError> {
        Self::check_octets(octets.as_ref())?;
        Ok(Name(octets))
    }

    fn check_octets(mut octets: &[u8]) -> Result<(), NameError> {
        if octets.len() > MAX_NAME_LEN {
            return Err(NameError::LongName);
        }
        loop {
            let (&len, rest) =
                octets.split_first().ok_or(NameError::RelativeName)?;
            let len = usize::from(len);
            if len > MAX_LABEL_LEN {
                return Err(NameError::LongLabel);
            }
            if len == 0 {
                return if rest.is_empty() {
                    Ok(())
                } else {
                    Err(NameError::TrailingData)
                };
            }
            if rest.len() < len {
                return Err(NameError::ShortInput);
            }
            octets = &rest[len..];
        }
    }

    /// Takes a possibly compressed name from the beginning of a parser.
    ///
    /// Compression pointers must point backwards in the message, so a
    /// pointer loop can never be followed.
    pub fn parse<Octs: AsRef<[u8]> + ?Sized>(
        parser: &mut Parser<'_, Octs>,
    ) -> Result<Self, ParseError> {
        let mut buf = std::vec::Vec::new();

        // Labels in place. Ends with either the root label or a pointer.
        let ptr = loop {
            match Self::parse_label(parser, &mut buf)? {
                Some(Label::Root) => return Ok(Name(buf.into())),
                Some(Label::Normal) => {}
                None => break Self::parse_ptr(parser)?,
            }
        };

        // Follow the pointer on a copy of the parser so the original is
        // left right behind the name.
        let mut tmp = *parser;
        let mut ptr = ptr;
        loop {
            if ptr >= tmp.pos() - 2 {
                return Err(FormError::new("compression pointer loop").into());
            }
            tmp.seek(ptr)?;
            loop {
                match Self::parse_label(&mut tmp, &mut buf)? {
                    Some(Label::Root) => return Ok(Name(buf.into())),
                    Some(Label::Normal) => {}
                    None => {
                        ptr = Self::parse_ptr(&mut tmp)?;
                        break;
                    }
                }
            }
        }
    }

    /// Parses one label and appends it to `buf`.
    ///
    /// Returns `None` without consuming anything if the next label is a
    /// compression pointer.
    fn parse_label<Octs: AsRef<[u8]> + ?Sized>(
        parser: &mut Parser<'_, Octs>,
        buf: &mut std::vec::Vec<u8>,
    ) -> Result<Option<Label>, ParseError> {
        let len = parser.peek(1)?[0];
        match len & 0xC0 {
            0x00 => {
                let len = usize::from(len);
                if buf.len() + len + 1 > MAX_NAME_LEN {
                    return Err(FormError::new("long domain name").into());
                }
                buf.push(parser.parse_u8()?);
                let start = buf.len();
                buf.resize(start + len, 0);
                parser.parse_buf(&mut buf[start..])?;
                Ok(Some(if len == 0 { Label::Root } else { Label::Normal }))
            }
            0xC0 => Ok(None),
            _ => Err(FormError::new("invalid label type").into()),
        }
    }

    fn parse_ptr<Octs: AsRef<[u8]> + ?Sized>(
        parser: &mut Parser<'_, Octs>,
    ) -> Result<usize, ParseError> {
        Ok(usize::from(parser.parse_u16_be()? & 0x3FFF))
    }

    /// Returns the length of the name in wire format.
    #[must_use]
    pub fn compose_len(&self) -> usize {
        self.0.len()
    }

    /// Appends the uncompressed wire format of the name to a target.
    pub fn compose<Target: OctetsBuilder + ?Sized>(
        &self,
        target: &mut Target,
    ) -> Result<(), Target::AppendError> {
        target.append_slice(self.0.as_ref())
    }

    /// Returns whether this is the root name.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Returns the wire format octets of the name.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Returns an iterator over the non-root labels of the name.
    fn labels(&self) -> impl Iterator<Item = &[u8]> {
        let mut octets = self.0.as_ref();
        core::iter::from_fn(move || {
            let (&len, rest) = octets.split_first()?;
            if len == 0 {
                return None;
            }
            let (label, rest) = rest.split_at(usize::from(len));
            octets = rest;
            Some(label)
        })
    }
}

enum Label {
    Root,
    Normal,
}

//--- FromStr

impl str::FromStr for Name {
    type Err = NameError;

    /// Creates a name from its presentation format.
    ///
    /// The name is always taken as absolute, a final dot is optional.
    /// Characters can be escaped either as `\c` or as `\DDD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(NameError::EmptyLabel);
        }
        if s == "." {
            return Ok(Self::root());
        }
        let mut buf = std::vec::Vec::with_capacity(s.len() + 2);
        let mut label_start = 0;
        buf.push(0);
        let mut chars = s.bytes();
        let mut last_was_dot = false;
        while let Some(ch) = chars.next() {
            let ch = match ch {
                b'.' => {
                    let len = buf.len() - label_start - 1;
                    if len == 0 {
                        return Err(NameError::EmptyLabel);
                    }
                    buf[label_start] = len as u8;
                    label_start = buf.len();
                    buf.push(0);
                    last_was_dot = true;
                    continue;
                }
                b'\\' => unescape(&mut chars)?,
                ch => ch,
            };
            last_was_dot = false;
            buf.push(ch);
            if buf.len() - label_start - 1 > MAX_LABEL_LEN {
                return Err(NameError::LongLabel);
            }
        }
        if !last_was_dot {
            let len = buf.len() - label_start - 1;
            buf[label_start] = len as u8;
            buf.push(0);
        }
        if buf.len() > MAX_NAME_LEN {
            return Err(NameError::LongName);
        }
        Ok(Name(buf.into()))
    }
}

fn unescape(chars: &mut str::Bytes) -> Result<u8, NameError> {
    let first = chars.next().ok_or(NameError::BadEscape)?;
    if !first.is_ascii_digit() {
        return Ok(first);
    }
    let mut value = u16::from(first - b'0');
    for _ in 0..2 {
        match chars.next() {
            Some(ch) if ch.is_ascii_digit() => {
                value = value * 10 + u16::from(ch - b'0');
            }
            _ => return Err(NameError::BadEscape),
        }
    }
    u8::try_from(value).map_err(|_| NameError::BadEscape)
}

//--- PartialEq, Eq, and Hash

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(other.0.as_ref())
    }
}

impl Eq for Name {}

impl hash::Hash for Name {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        for ch in self.0.iter() {
            ch.to_ascii_lowercase().hash(state)
        }
    }
}

//--- Display and Debug

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        for label in self.labels() {
            for &ch in label {
                if ch == b'.' || ch == b'\\' {
                    write!(f, "\\{}", ch as char)?;
                } else if ch.is_ascii_graphic() {
                    write!(f, "{}", ch as char)?;
                } else {
                    write!(f, "\\{:03}", ch)?;
                }
            }
            f.write_str(".")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}

//------------ NameError -----------------------------------------------------

/// A domain name could not be created.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NameError {
    /// A label other than the root label was empty.
    EmptyLabel,

    /// A label was longer than 63 octets.
    LongLabel,

    /// The name was longer than 255 octets.
    LongName,

    /// The wire format did not end in the root label.
    RelativeName,

    /// There was data after the root label.
    TrailingData,

    /// A label extended beyond the end of the octets.
    ShortInput,

    /// An illegal escape sequence was encountered.
    BadEscape,
}

//--- Display and Error

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            NameError::EmptyLabel => "empty label",
            NameError::LongLabel => "label too long",
            NameError::LongName => "domain name too long",
            NameError::RelativeName => "missing root label",
            NameError::TrailingData => "trailing data after root label",
            NameError::ShortInput => "unexpected end of input",
            NameError::BadEscape => "illegal escape sequence",
        })
    }
}

impl std::error::Error for NameError {}

//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn from_str() {
        let name = Name::from_str("www.example.com").unwrap();
        assert_eq!(name.as_slice(), b"\x03www\x07example\x03com\x00");
        assert_eq!(name, Name::from_str("WWW.Example.COM.").unwrap());
        assert_eq!(name.compose_len(), 17);
        assert_eq!(name.to_string(), "www.example.com.");

        assert!(Name::from_str(".").unwrap().is_root());
        assert_eq!(Name::from_str("a..b"), Err(NameError::EmptyLabel));
        assert_eq!(
            Name::from_str(&"x".repeat(64)),
            Err(NameError::LongLabel)
        );
        assert_eq!(
            Name::from_str(r"a\.b.c").unwrap().as_slice(),
            b"\x03a.b\x01c\x00"
        );
        assert_eq!(
            Name::from_str(r"\065.c").unwrap().as_slice(),
            b"\x01A\x01c\x00"
        );
    }

    #[test]
    fn from_octets() {
        assert!(Name::from_octets(Bytes::from_static(b"\x01a\x00")).is_ok());
        assert_eq!(
            Name::from_octets(Bytes::from_static(b"\x01a")),
            Err(NameError::RelativeName)
        );
        assert_eq!(
            Name::from_octets(Bytes::from_static(b"\x00\x00")),
            Err(NameError::TrailingData)
        );
        assert_eq!(
            Name::from_octets(Bytes::from_static(b"\x05a\x00")),
            Err(NameError::ShortInput)
        );
    }

    #[test]
    fn parse_compressed() {
        // "example.com." at offset 0, then "www" plus a pointer to it.
        let msg = b"\x07example\x03com\x00\x03www\xC0\x00\xFF";
        let mut parser = Parser::from_ref(msg.as_slice());
        let apex = Name::parse(&mut parser).unwrap();
        assert_eq!(apex.to_string(), "example.com.");
        let www = Name::parse(&mut parser).unwrap();
        assert_eq!(www.to_string(), "www.example.com.");
        assert_eq!(parser.remaining(), 1);
    }

    #[test]
    fn parse_pointer_loop() {
        let msg = b"\xC0\x00";
        let mut parser = Parser::from_ref(msg.as_slice());
        assert!(Name::parse(&mut parser).is_err());
    }
}
