//! Building a new DNS message.
//!
//! The types in this module build a DNS message section by section into a
//! [`StreamTarget`], an octets buffer that keeps two octets at its
//! beginning for the length prefix used when messages are sent over stream
//! transports such as TCP ([RFC 1035, section 4.2.2]).
//!
//! A [`MessageBuilder`] takes care of the header and the question section.
//! Starting an answer converts it into an [`AnswerBuilder`] which accepts
//! records until the push limit is reached. Finally, `finish()` writes the
//! header, the section counts, and the length prefix and returns the
//! target.
//!
//! [RFC 1035, section 4.2.2]: https://tools.ietf.org/html/rfc1035#section-4.2.2

use core::fmt;

use bytes::{Bytes, BytesMut};

use super::header::{Header, HeaderCounts};
use super::iana::Rcode;
use super::message::Message;
use super::question::Question;
use super::record::Record;

/// The offset of the DNS header in a stream target.
const HEADER_OFFSET: usize = 2;

/// The offset of the first question in a stream target.
const QUESTION_OFFSET: usize =
    HEADER_OFFSET + Header::COMPOSE_LEN + HeaderCounts::COMPOSE_LEN;

//------------ MessageBuilder ------------------------------------------------

/// Starts building a DNS message.
///
/// The builder can be given a push limit via
/// [`set_push_limit`][Self::set_push_limit]. Any attempt to push data that
/// would make the message exceed that limit fails with
/// [`PushError::ShortBuf`]. Without an explicit limit, messages are limited
/// to 65,535 octets, the most that a stream transport length prefix can
/// express.
#[derive(Clone, Debug)]
pub struct MessageBuilder {
    /// The target to compose into.
    target: StreamTarget,

    /// The header of the message.
    header: Header,

    /// The section counts of the message.
    counts: HeaderCounts,

    /// The maximum length of the message, excluding the length prefix.
    limit: usize,
}

impl MessageBuilder {
    /// Creates a new, empty message builder.
    #[must_use]
    pub fn new() -> Self {
        MessageBuilder {
            target: StreamTarget::new(),
            header: Header::new(),
            counts: HeaderCounts::new(),
            limit: usize::from(u16::MAX),
        }
    }

    /// Limits how large the message may become.
    ///
    /// The limit applies to the message itself, not counting the stream
    /// length prefix. It cannot be raised above 65,535.
    pub fn set_push_limit(&mut self, limit: usize) {
        self.limit = limit.min(usize::from(u16::MAX));
    }

    /// Returns a mutable reference to the message header.
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Appends a question to the question section.
    pub fn push_question(
        &mut self,
        question: &Question,
    ) -> Result<(), PushError> {
        self.check_space(question.compose_len())?;
        self.counts.set_qdcount(
            self.counts
                .qdcount()
                .checked_add(1)
                .ok_or(PushError::CountOverflow)?,
        );
        question
            .compose(&mut self.target.buf)
            .map_err(|_| PushError::ShortBuf)
    }

    /// Starts creating an answer for the given message.
    ///
    /// Copies the ID, the opcode, and the RD flag from the message, sets the
    /// QR flag and the given rcode, and attempts to push the message’s
    /// questions to the builder. If parsing the questions fails, the
    /// question section is left empty.
    ///
    /// The method converts the message builder into an answer builder ready
    /// to receive the answer for the question.
    pub fn start_answer<Octs: AsRef<[u8]>>(
        mut self,
        msg: &Message<Octs>,
        rcode: Rcode,
    ) -> Result<AnswerBuilder, PushError> {
        {
            let req_header = msg.header();
            let header = self.header_mut();
            header.set_id(req_header.id());
            header.set_qr(true);
            header.set_opcode(req_header.opcode());
            header.set_rd(req_header.rd());
            header.set_rcode(rcode);
        }
        for question in msg.question().unwrap_or_default() {
            self.push_question(&question)?;
        }
        Ok(AnswerBuilder { builder: self })
    }

    /// Finishes the message and returns the target.
    #[must_use]
    pub fn finish(mut self) -> StreamTarget {
        let mut head = [0u8; QUESTION_OFFSET];
        let len = (self.target.buf.len() - HEADER_OFFSET) as u16;
        head[..HEADER_OFFSET].copy_from_slice(&len.to_be_bytes());
        head[HEADER_OFFSET..HEADER_OFFSET + Header::COMPOSE_LEN]
            .copy_from_slice(self.header.as_slice());
        let mut counts =
            std::vec::Vec::with_capacity(HeaderCounts::COMPOSE_LEN);
        let _ = self.counts.compose(&mut counts);
        head[HEADER_OFFSET + Header::COMPOSE_LEN..].copy_from_slice(&counts);
        self.target.buf[..QUESTION_OFFSET].copy_from_slice(&head);
        self.target
    }

    /// Checks that `len` more octets fit under the push limit.
    fn check_space(&self, len: usize) -> Result<(), PushError> {
        if self.target.buf.len() - HEADER_OFFSET + len > self.limit {
            Err(PushError::ShortBuf)
        } else {
            Ok(())
        }
    }
}

//--- Default

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//------------ AnswerBuilder -------------------------------------------------

/// Builds the answer section of a DNS message.
#[derive(Clone, Debug)]
pub struct AnswerBuilder {
    builder: MessageBuilder,
}

impl AnswerBuilder {
    /// Appends a record to the answer section.
    ///
    /// Fails with [`PushError::ShortBuf`] if the record would make the
    /// message exceed the push limit. The message is left unchanged in this
    /// case.
    pub fn push(&mut self, record: &Record) -> Result<(), PushError> {
        self.builder.check_space(record.compose_len())?;
        let ancount = self
            .builder
            .counts
            .ancount()
            .checked_add(1)
            .ok_or(PushError::CountOverflow)?;
        record
            .compose(&mut self.builder.target.buf)
            .map_err(|_| PushError::ShortBuf)?;
        self.builder.counts.set_ancount(ancount);
        Ok(())
    }

    /// Returns a mutable reference to the message header.
    pub fn header_mut(&mut self) -> &mut Header {
        self.builder.header_mut()
    }

    /// Returns the current section counts.
    #[must_use]
    pub fn counts(&self) -> HeaderCounts {
        self.builder.counts
    }

    /// Finishes the message and returns the target.
    #[must_use]
    pub fn finish(self) -> StreamTarget {
        self.builder.finish()
    }
}

//------------ StreamTarget --------------------------------------------------

/// A message buffer prefixed with the two octet stream length.
#[derive(Clone, Debug)]
pub struct StreamTarget {
    buf: BytesMut,
}

impl StreamTarget {
    fn new() -> Self {
        let mut buf = BytesMut::with_capacity(512);
        buf.resize(QUESTION_OFFSET, 0);
        StreamTarget { buf }
    }

    /// Returns the message including the length prefix.
    #[must_use]
    pub fn as_stream_slice(&self) -> &[u8] {
        self.buf.as_ref()
    }

    /// Returns the message without the length prefix.
    #[must_use]
    pub fn as_dgram_slice(&self) -> &[u8] {
        &self.buf[HEADER_OFFSET..]
    }

    /// Converts the target into the framed message octets.
    #[must_use]
    pub fn into_stream_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// Converts the target into a message without the length prefix.
    #[must_use]
    pub fn into_message(self) -> Message<Bytes> {
        // A finished target always contains a complete header.
        Message::from_octets_unchecked(
            self.into_stream_bytes().slice(HEADER_OFFSET..),
        )
    }
}

//------------ PushError -----------------------------------------------------

/// Data could not be added to a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PushError {
    /// A section count would have overflowed.
    CountOverflow,

    /// The data does not fit under the push limit.
    ShortBuf,
}

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PushError::CountOverflow => f.write_str("counter overflow"),
            PushError::ShortBuf => f.write_str("buffer size exceeded"),
        }
    }
}

impl std::error::Error for PushError {}

//============ Testing =======================================================
