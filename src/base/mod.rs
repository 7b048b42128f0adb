//! Basics.
//!
//! This module provides the types for working with the DNS data involved in
//! zone transfers: extracting the question from a received query and
//! assembling the response messages that carry a zone’s records back to
//! the client.
//!
//!
//! ## Parsing and Composing Messages
//!
//! In order to easily distinguish the process of creating and disecting
//! wire-format messages other forms of representation conversion, we use
//! the term *parsing* for extracting data from a wire-format representation
//! and *composing* for producing such a representation. Parsing is done
//! via the [`Parser`][octseq::parse::Parser] type of the `octseq` crate,
//! composing into anything implementing its
//! [`OctetsBuilder`][octseq::builder::OctetsBuilder] trait.
//!
//! The types [`Message`] and [`MessageBuilder`] make parsing and
//! constructing DNS messages easy. A [`Message`] takes the binary data of a
//! DNS message and gives access to its header, questions, and answer
//! records. A [`MessageBuilder`] creates a response for a given query
//! step-by-step.
//!
//!
//! # Types for DNS Data
//!
//! * [header] for the header of DNS messages,
//! * [iana] for the various registries of DNS parameters,
//! * [name] for domain names,
//! * [question] for questions, and
//! * [record] for DNS resource records with opaque record data.

pub use self::header::{Header, HeaderCounts};
pub use self::iana::{Class, Opcode, Rcode, Rtype};
pub use self::message::Message;
pub use self::message_builder::{
    AnswerBuilder, MessageBuilder, PushError, StreamTarget,
};
pub use self::name::Name;
pub use self::question::Question;
pub use self::record::{Record, Ttl};

pub mod header;
pub mod iana;
pub mod message;
pub mod message_builder;
pub mod name;
pub mod question;
pub mod record;
pub mod wire;
