//! A single question in a DNS message.

use core::fmt;

use octseq::builder::OctetsBuilder;
use octseq::parse::Parser;

use super::iana::{Class, Rtype};
use super::name::Name;
use super::wire::ParseError;

//------------ Question ------------------------------------------------------

/// A question in a DNS message.
///
/// In DNS, a question describes what is requested in a query. It consists
/// of three elements: a domain name, a record type, and a class.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Question {
    /// The domain name of the question.
    qname: Name,

    /// The record type of the question.
    qtype: Rtype,

    /// The class of the quesiton.
    qclass: Class,
}

/// # Creation and Conversion
///
impl Question {
    /// Creates a new question from its three componets.
    #[must_use]
    pub fn new(qname: Name, qtype: Rtype, qclass: Class) -> Self {
        Question {
            qname,
            qtype,
            qclass,
        }
    }

    /// Creates a new question from a name and record type, assuming class IN.
    #[must_use]
    pub fn new_in(qname: Name, qtype: Rtype) -> Self {
        Self::new(qname, qtype, Class::IN)
    }
}

/// # Field Access
///
impl Question {
    /// Returns a reference to the domain nmae in the question,
    #[must_use]
    pub fn qname(&self) -> &Name {
        &self.qname
    }

    /// Returns the record type of the question.
    #[must_use]
    pub fn qtype(&self) -> Rtype {
        self.qtype
    }

    /// Returns the class of the question.
    #[must_use]
    pub fn qclass(&self) -> Class {
        self.qclass
    }
}

/// # Parsing and Composing
///
impl Question {
    /// Takes a question from the beginning of a parser.
    pub fn parse<Octs: AsRef<[u8]> + ?Sized>(
        parser: &mut Parser<'_, Octs>,
    ) -> Result<Self, ParseError> {
        Ok(Question::new(
            Name::parse(parser)?,
            Rtype::parse(parser)?,
            Class::parse(parser)?,
        ))
    }

    /// Returns the length of the question in wire format.
    #[must_use]
    pub fn compose_len(&self) -> usize {
        self.qname.compose_len() + Rtype::COMPOSE_LEN + Class::COMPOSE_LEN
    }

    /// Appends the wire format of the question to a target.
    pub fn compose<Target: OctetsBuilder + ?Sized>(
        &self,
        target: &mut Target,
    ) -> Result<(), Target::AppendError> {
        self.qname.compose(target)?;
        self.qtype.compose(target)?;
        self.qclass.compose(target)
    }
}

//--- Display

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.qname, self.qclass, self.qtype)
    }
}
