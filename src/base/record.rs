//! Resource Records.
//!
//! This module defines [`Record`], a complete resource record whose data is
//! kept in its raw, encoded form. Zone transfers never need to look inside
//! the record data, they only need to know how large each record is on the
//! wire and which records are SOA records.

use core::fmt;

use bytes::Bytes;
use octseq::builder::OctetsBuilder;
use octseq::parse::Parser;

use super::iana::{Class, Rtype};
use super::name::Name;
use super::wire::ParseError;

//------------ Record --------------------------------------------------------

/// A DNS resource record.
///
/// All information available through the DNS is stored in resource records.
/// They have a three part key of a domain name, resource record type, and
/// class. The domain name is called the *owner* of the record. In addition
/// each record has a TTL and its record data.
///
/// The record data is opaque to this type. It is kept as the octets of its
/// uncompressed wire format, so any name embedded in the data must not
/// contain compression pointers.
///
/// Cloning a record is cheap as both the owner and the data are reference
/// counted octets.
#[derive(Clone, Eq, PartialEq)]
pub struct Record {
    /// The owner of the record.
    owner: Name,

    /// The type of the record.
    rtype: Rtype,

    /// The class of the record.
    class: Class,

    /// The time-to-live value of the record.
    ttl: Ttl,

    /// The record data in wire format.
    data: Bytes,
}

/// # Creation and Element Access
///
impl Record {
    /// Creates a new record from its parts.
    ///
    /// Returns an error if the record data is too long to be expressed in
    /// the sixteen bit RDLEN field.
    pub fn new(
        owner: Name,
        class: Class,
        ttl: Ttl,
        rtype: Rtype,
        data: Bytes,
    ) -> Result<Self, LongRecordData> {
        if data.len() > usize::from(u16::MAX) {
            return Err(LongRecordData(()));
        }
        Ok(Record {
            owner,
            rtype,
            class,
            ttl,
            data,
        })
    }

    /// Returns a reference to the owner domain name.
    #[must_use]
    pub fn owner(&self) -> &Name {
        &self.owner
    }

    /// Returns the record type.
    #[must_use]
    pub fn rtype(&self) -> Rtype {
        self.rtype
    }

    /// Returns the class of the record.
    #[must_use]
    pub fn class(&self) -> Class {
        self.class
    }

    /// Returns the record’s time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    /// Return a reference to the record data in wire format.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns whether this is an SOA record.
    #[must_use]
    pub fn is_soa(&self) -> bool {
        self.rtype == Rtype::SOA
    }
}

/// # Parsing and Composing
///
impl Record {
    /// The length of the fixed part between owner and record data.
    const FIXED_LEN: usize =
        Rtype::COMPOSE_LEN + Class::COMPOSE_LEN + Ttl::COMPOSE_LEN + 2;

    /// Returns the length of the record in uncompressed wire format.
    #[must_use]
    pub fn compose_len(&self) -> usize {
        self.owner.compose_len() + Self::FIXED_LEN + self.data.len()
    }

    /// Appends the wire format of the record to a target.
    pub fn compose<Target: OctetsBuilder + ?Sized>(
        &self,
        target: &mut Target,
    ) -> Result<(), Target::AppendError> {
        self.owner.compose(target)?;
        self.rtype.compose(target)?;
        self.class.compose(target)?;
        self.ttl.compose(target)?;
        // Length checked in `new` and `parse`.
        target.append_slice(&(self.data.len() as u16).to_be_bytes())?;
        target.append_slice(self.data.as_ref())
    }

    /// Takes a record from the beginning of a parser.
    ///
    /// The record data is copied out as is, so compression pointers inside
    /// it are not resolved.
    pub fn parse<Octs: AsRef<[u8]> + ?Sized>(
        parser: &mut Parser<'_, Octs>,
    ) -> Result<Self, ParseError> {
        let owner = Name::parse(parser)?;
        let rtype = Rtype::parse(parser)?;
        let class = Class::parse(parser)?;
        let ttl = Ttl::parse(parser)?;
        let rdlen = usize::from(parser.parse_u16_be()?);
        if parser.remaining() < rdlen {
            return Err(ParseError::form_error("record data exceeds message"));
        }
        let mut data = std::vec![0; rdlen];
        parser.parse_buf(&mut data)?;
        Ok(Record {
            owner,
            rtype,
            class,
            ttl,
            data: data.into(),
        })
    }
}

//--- Debug

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Record")
            .field("owner", &self.owner)
            .field("rtype", &self.rtype)
            .field("class", &self.class)
            .field("ttl", &self.ttl)
            .field("rdlen", &self.data.len())
            .finish()
    }
}

//------------ Ttl -----------------------------------------------------------

/// A span of time, typically used to describe the time a given DNS record is
/// valid.
///
/// The value is a number of seconds kept as the unsigned 32 bit integer
/// used on the wire.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Ttl(u32);

impl Ttl {
    /// The length of a TTL in wire format.
    pub const COMPOSE_LEN: usize = 4;

    /// Creates a new `Ttl` from the specified number of seconds.
    #[must_use]
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    /// Returns the total time to live in seconds.
    #[must_use]
    pub const fn as_secs(&self) -> u32 {
        self.0
    }

    fn parse<Octs: AsRef<[u8]> + ?Sized>(
        parser: &mut Parser<'_, Octs>,
    ) -> Result<Self, ParseError> {
        Ok(Ttl(parser.parse_u32_be()?))
    }

    fn compose<Target: OctetsBuilder + ?Sized>(
        &self,
        target: &mut Target,
    ) -> Result<(), Target::AppendError> {
        target.append_slice(&self.0.to_be_bytes())
    }
}

//------------ LongRecordData ------------------------------------------------

/// The record data was longer than 65,535 octets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LongRecordData(());

impl fmt::Display for LongRecordData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("record data too long")
    }
}

impl std::error::Error for LongRecordData {}

//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn compose_and_parse() {
        let record = Record::new(
            Name::from_str("example.com").unwrap(),
            Class::IN,
            Ttl::from_secs(3600),
            Rtype::A,
            Bytes::from_static(&[192, 0, 2, 1]),
        )
        .unwrap();
        assert_eq!(record.compose_len(), 13 + 10 + 4);
        assert_eq!(record.ttl().as_secs(), 3600);
        assert_eq!(record.data().as_ref(), &[192, 0, 2, 1]);

        let mut buf = std::vec::Vec::new();
        record.compose(&mut buf).unwrap();
        assert_eq!(buf.len(), record.compose_len());
        assert_eq!(
            &buf[13..],
            &[0, 1, 0, 1, 0, 0, 0x0E, 0x10, 0, 4, 192, 0, 2, 1]
        );

        let mut parser = Parser::from_ref(buf.as_slice());
        assert_eq!(Record::parse(&mut parser).unwrap(), record);
        assert_eq!(parser.remaining(), 0);
    }

    #[test]
    fn long_record_data() {
        let data = Bytes::from(std::vec![0u8; usize::from(u16::MAX) + 1]);
        assert!(Record::new(
            Name::root(),
            Class::IN,
            Ttl::default(),
            Rtype::TXT,
            data
        )
        .is_err());
    }

    #[test]
    fn truncated_record_data() {
        let buf = b"\x00\x00\x01\x00\x01\x00\x00\x00\x00\x00\x04\x01";
        let mut parser = Parser::from_ref(buf.as_slice());
        assert!(Record::parse(&mut parser).is_err());
    }
}
