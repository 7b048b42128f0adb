//! Accessing existing DNS messages.
//!
//! This module defines [`Message`], a DNS message in wire format. It is
//! used for the queries a server receives as well as, in tests and
//! clients, for inspecting the responses sent back.

use core::fmt;

use octseq::parse::Parser;

use super::header::{Header, HeaderCounts};
use super::question::Question;
use super::record::Record;
use super::wire::ParseError;

//------------ Message -------------------------------------------------------

/// A DNS message.
///
/// This type wraps an octets sequence containing the complete wire format
/// of a DNS message, without the two octet length prefix used by stream
/// transports. Only the header is checked on creation. The sections are
/// parsed lazily by the various accessor methods which consequently may
/// fail.
#[derive(Clone)]
pub struct Message<Octs> {
    octets: Octs,
}

/// # Creation and Conversion
///
impl<Octs: AsRef<[u8]>> Message<Octs> {
    /// The length of the header section of a message.
    const HEADER_LEN: usize = Header::COMPOSE_LEN + HeaderCounts::COMPOSE_LEN;

    /// Creates a message from an octets sequence.
    ///
    /// This fails if the slice is too short to even contain a complete
    /// header section. No further checks are done, though, so if this
    /// function returns `Ok`, the message may still be broken with other
    /// methods returning `Err(_)`.
    pub fn from_octets(octets: Octs) -> Result<Self, ShortMessage> {
        if octets.as_ref().len() < Self::HEADER_LEN {
            Err(ShortMessage(()))
        } else {
            Ok(Message { octets })
        }
    }

    /// Creates a message from octets known to contain a header.
    pub(super) fn from_octets_unchecked(octets: Octs) -> Self {
        Message { octets }
    }

    /// Returns a reference to the underlying octets sequence.
    pub fn as_octets(&self) -> &Octs {
        &self.octets
    }

    /// Converts the message into the underlying octets sequence.
    pub fn into_octets(self) -> Octs {
        self.octets
    }

    /// Returns a reference to the underlying byte slice.
    pub fn as_slice(&self) -> &[u8] {
        self.octets.as_ref()
    }
}

/// # Header Section
///
impl<Octs: AsRef<[u8]>> Message<Octs> {
    /// Returns the message header.
    pub fn header(&self) -> Header {
        let mut parser = Parser::from_ref(self.as_slice());
        // The length was checked in `from_octets`.
        Header::parse(&mut parser).unwrap_or_default()
    }

    /// Returns the header counts of the message.
    pub fn header_counts(&self) -> HeaderCounts {
        let mut parser = Parser::from_ref(self.as_slice());
        let _ = parser.advance(Header::COMPOSE_LEN);
        HeaderCounts::parse(&mut parser).unwrap_or_default()
    }
}

/// # Sections
///
impl<Octs: AsRef<[u8]>> Message<Octs> {
    /// Returns all questions of the message.
    pub fn question(&self) -> Result<std::vec::Vec<Question>, ParseError> {
        let mut parser = self.section_parser();
        (0..self.header_counts().qdcount())
            .map(|_| Question::parse(&mut parser))
            .collect()
    }

    /// Returns the sole question of the message.
    ///
    /// This is like [`question`][Self::question] but returns an error
    /// unless there is exactly one question in the message. Queries for
    /// zone transfers always contain exactly one question.
    pub fn sole_question(&self) -> Result<Question, ParseError> {
        match self.header_counts().qdcount() {
            0 => Err(ParseError::form_error("no question")),
            1 => {
                let mut parser = self.section_parser();
                Question::parse(&mut parser)
            }
            _ => Err(ParseError::form_error("multiple questions")),
        }
    }

    /// Returns the records of the answer section.
    pub fn answer(&self) -> Result<std::vec::Vec<Record>, ParseError> {
        let counts = self.header_counts();
        let mut parser = self.section_parser();
        for _ in 0..counts.qdcount() {
            Question::parse(&mut parser)?;
        }
        (0..counts.ancount())
            .map(|_| Record::parse(&mut parser))
            .collect()
    }

    fn section_parser(&self) -> Parser<'_, [u8]> {
        let mut parser = Parser::from_ref(self.as_slice());
        // The length was checked in `from_octets`.
        let _ = parser.advance(Self::HEADER_LEN);
        parser
    }
}

//--- Debug

impl<Octs: AsRef<[u8]>> fmt::Debug for Message<Octs> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Message")
            .field("header", &self.header())
            .field("counts", &self.header_counts())
            .finish()
    }
}

//------------ ShortMessage --------------------------------------------------

/// A message was too short to even contain the header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ShortMessage(());

impl fmt::Display for ShortMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("short message")
    }
}

impl std::error::Error for ShortMessage {}
