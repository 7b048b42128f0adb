//! The header of a DNS message.
//!
//! Each DNS message starts with a twelve octet long header section
//! containing some general information related to the message as well as
//! the number of records in each of the four sections that follow the header.
//! Its content and format are defined in section 4.1.1 of [RFC 1035].
//!
//! The header is split into two separate types: [`Header`] contains the
//! safely modifyable part at the beginning and [`HeaderCounts`] contains the
//! section counts.
//!
//! [RFC 1035]: https://tools.ietf.org/html/rfc1035

use octseq::builder::OctetsBuilder;
use octseq::parse::Parser;

use super::iana::{Opcode, Rcode};
use super::wire::ParseError;

//------------ Header --------------------------------------------------

/// The first part of the header of a DNS message.
///
/// This type represents the information contained in the first four octets
/// of the header: the message ID, opcode, rcode, and the various flags. It
/// keeps those four octets in wire representation, i.e., in network byte
/// order. The data is layed out like this:
///
/// ```text
///                                 1  1  1  1  1  1
///   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      ID                       |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |QR|   Opcode  |AA|TC|RD|RA|Z |AD|CD|   RCODE   |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Header {
    /// The actual header in its wire format representation.
    inner: [u8; 4],
}

/// # Creation and Conversion
///
impl Header {
    /// The length of the header in wire format.
    pub const COMPOSE_LEN: usize = 4;

    /// Creates a new header.
    ///
    /// The new header has all fields as either zero or false. Thus, the
    /// opcode will be [`Opcode::QUERY`] and the response code will be
    /// [`Rcode::NOERROR`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reference to the underlying octets slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.inner
    }

    /// Takes a header from the beginning of a parser.
    pub fn parse<Octs: AsRef<[u8]> + ?Sized>(
        parser: &mut Parser<'_, Octs>,
    ) -> Result<Self, ParseError> {
        let mut res = Self::default();
        parser.parse_buf(&mut res.inner)?;
        Ok(res)
    }

    /// Appends the wire format of the header to a target.
    pub fn compose<Target: OctetsBuilder + ?Sized>(
        &self,
        target: &mut Target,
    ) -> Result<(), Target::AppendError> {
        target.append_slice(&self.inner)
    }
}

/// # Field Access
///
impl Header {
    /// Returns the value of the ID field.
    ///
    /// The ID field is an identifier chosen by whoever created a query
    /// and is copied into a response by a server.
    #[must_use]
    pub fn id(self) -> u16 {
        u16::from_be_bytes([self.inner[0], self.inner[1]])
    }

    /// Sets the value of the ID field.
    pub fn set_id(&mut self, value: u16) {
        self.inner[..2].copy_from_slice(&value.to_be_bytes())
    }

    /// Returns whether the QR bit is set.
    ///
    /// The bit is set in responses and cleared in queries.
    #[must_use]
    pub fn qr(self) -> bool {
        self.get_bit(2, 7)
    }

    /// Sets the value of the QR bit.
    pub fn set_qr(&mut self, set: bool) {
        self.set_bit(2, 7, set)
    }

    /// Returns the value of the Opcode field.
    #[must_use]
    pub fn opcode(self) -> Opcode {
        Opcode::from_int((self.inner[2] >> 3) & 0x0F)
    }

    /// Sets the value of the opcode field.
    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.inner[2] =
            self.inner[2] & 0x87 | ((opcode.to_int() & 0x0F) << 3);
    }

    /// Returns whether the AA bit is set.
    #[must_use]
    pub fn aa(self) -> bool {
        self.get_bit(2, 2)
    }

    /// Sets the value of the AA bit.
    pub fn set_aa(&mut self, set: bool) {
        self.set_bit(2, 2, set)
    }

    /// Returns whether the TC bit is set.
    #[must_use]
    pub fn tc(self) -> bool {
        self.get_bit(2, 1)
    }

    /// Sets the value of the TC bit.
    pub fn set_tc(&mut self, set: bool) {
        self.set_bit(2, 1, set)
    }

    /// Returns whether the RD bit is set.
    #[must_use]
    pub fn rd(self) -> bool {
        self.get_bit(2, 0)
    }

    /// Sets the value of the RD bit.
    pub fn set_rd(&mut self, set: bool) {
        self.set_bit(2, 0, set)
    }

    /// Returns whether the RA bit is set.
    #[must_use]
    pub fn ra(self) -> bool {
        self.get_bit(3, 7)
    }

    /// Sets the value of the RA bit.
    pub fn set_ra(&mut self, set: bool) {
        self.set_bit(3, 7, set)
    }

    /// Sets the value of the reserved Z bit.
    pub fn set_z(&mut self, set: bool) {
        self.set_bit(3, 6, set)
    }

    /// Returns whether the AD bit is set.
    #[must_use]
    pub fn ad(self) -> bool {
        self.get_bit(3, 5)
    }

    /// Sets the value of the AD bit.
    pub fn set_ad(&mut self, set: bool) {
        self.set_bit(3, 5, set)
    }

    /// Returns whether the CD bit is set.
    #[must_use]
    pub fn cd(self) -> bool {
        self.get_bit(3, 4)
    }

    /// Sets the value of the CD bit.
    pub fn set_cd(&mut self, set: bool) {
        self.set_bit(3, 4, set)
    }

    /// Returns the value of the RCODE field.
    #[must_use]
    pub fn rcode(self) -> Rcode {
        Rcode::from_int(self.inner[3] & 0x0F)
    }

    /// Sets the value of the RCODE field.
    ///
    /// Only the lower four bits of the code fit into the header.
    pub fn set_rcode(&mut self, rcode: Rcode) {
        self.inner[3] = self.inner[3] & 0xF0 | (rcode.to_int() & 0x0F);
    }

    fn get_bit(self, offset: usize, bit: usize) -> bool {
        self.inner[offset] & (1 << bit) != 0
    }

    fn set_bit(&mut self, offset: usize, bit: usize, set: bool) {
        if set {
            self.inner[offset] |= 1 << bit
        } else {
            self.inner[offset] &= !(1 << bit)
        }
    }
}

//------------ HeaderCounts -------------------------------------------------

/// The section count part of the header section of a DNS message.
///
/// This part consists of four 16 bit counters for the number of entries in
/// the four sections of a DNS message.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HeaderCounts {
    qdcount: u16,
    ancount: u16,
    nscount: u16,
    arcount: u16,
}

impl HeaderCounts {
    /// The length of the section counts in wire format.
    pub const COMPOSE_LEN: usize = 8;

    /// Creates a new value with all counters set to zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the counts from the beginning of a parser.
    pub fn parse<Octs: AsRef<[u8]> + ?Sized>(
        parser: &mut Parser<'_, Octs>,
    ) -> Result<Self, ParseError> {
        Ok(HeaderCounts {
            qdcount: parser.parse_u16_be()?,
            ancount: parser.parse_u16_be()?,
            nscount: parser.parse_u16_be()?,
            arcount: parser.parse_u16_be()?,
        })
    }

    /// Appends the wire format of the counts to a target.
    pub fn compose<Target: OctetsBuilder + ?Sized>(
        &self,
        target: &mut Target,
    ) -> Result<(), Target::AppendError> {
        target.append_slice(&self.qdcount.to_be_bytes())?;
        target.append_slice(&self.ancount.to_be_bytes())?;
        target.append_slice(&self.nscount.to_be_bytes())?;
        target.append_slice(&self.arcount.to_be_bytes())
    }

    /// Returns the number of questions in the message.
    #[must_use]
    pub fn qdcount(self) -> u16 {
        self.qdcount
    }

    /// Sets the number of questions in the message.
    pub fn set_qdcount(&mut self, value: u16) {
        self.qdcount = value
    }

    /// Returns the number of records in the answer section.
    #[must_use]
    pub fn ancount(self) -> u16 {
        self.ancount
    }

    /// Sets the number of records in the answer section.
    pub fn set_ancount(&mut self, value: u16) {
        self.ancount = value
    }

    /// Returns the number of records in the authority section.
    #[must_use]
    pub fn nscount(self) -> u16 {
        self.nscount
    }

    /// Returns the number of records in the additional section.
    #[must_use]
    pub fn arcount(self) -> u16 {
        self.arcount
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flags() {
        let mut header = Header::new();
        header.set_id(0xBEEF);
        header.set_qr(true);
        header.set_aa(true);
        header.set_rd(true);
        header.set_rcode(Rcode::SERVFAIL);
        assert_eq!(header.as_slice(), &[0xBE, 0xEF, 0x85, 0x02]);
        assert_eq!(header.id(), 0xBEEF);
        assert!(header.qr() && header.aa() && header.rd());
        assert!(!header.tc() && !header.ra() && !header.ad() && !header.cd());
        assert_eq!(header.opcode(), Opcode::QUERY);
        assert_eq!(header.rcode(), Rcode::SERVFAIL);

        header.set_opcode(Opcode::NOTIFY);
        header.set_aa(false);
        assert_eq!(header.opcode(), Opcode::NOTIFY);
        assert_eq!(header.as_slice(), &[0xBE, 0xEF, 0xA1, 0x02]);
    }
}
