//! The zones a transfer session is serving.
//!
//! A transfer session needs three things from a zone: its apex name for
//! logging, a decision whether a given client may transfer it, and a
//! snapshot of all its records. These are provided via the [`XfrZone`]
//! trait. The in-memory [`Zone`] is a simple implementation of it.

use core::fmt;
use core::ops::Deref;
use core::str::FromStr;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::vec::Vec;

use parking_lot::RwLock;

use crate::base::{Name, Record};

//------------ Transport -----------------------------------------------------

/// The transport a request was received over.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Transport {
    /// A datagram transport, i.e., UDP.
    Udp,

    /// A stream transport, i.e., TCP or TLS.
    Tcp,
}

//------------ RequestInfo ---------------------------------------------------

/// Information about the circumstances a request was received in.
#[derive(Clone, Copy, Debug)]
pub struct RequestInfo {
    /// Where the request came from.
    client_addr: SocketAddr,

    /// How the request was received.
    transport: Transport,
}

impl RequestInfo {
    /// Creates a new value from the client address and transport.
    #[must_use]
    pub fn new(client_addr: SocketAddr, transport: Transport) -> Self {
        Self {
            client_addr,
            transport,
        }
    }

    /// Creates a new value for a request received over TCP.
    #[must_use]
    pub fn tcp(client_addr: SocketAddr) -> Self {
        Self::new(client_addr, Transport::Tcp)
    }

    /// From which IP address and port number was this request received?
    #[must_use]
    pub fn client_addr(&self) -> SocketAddr {
        self.client_addr
    }

    /// Over which transport was this request received?
    #[must_use]
    pub fn transport(&self) -> Transport {
        self.transport
    }
}

//------------ XfrZone -------------------------------------------------------

/// A zone that can be transferred.
pub trait XfrZone: Send + Sync + 'static {
    /// Returns the apex name of the zone.
    fn origin(&self) -> &Name;

    /// Returns whether the client described by `info` may transfer the zone.
    fn transfer_allowed(&self, info: &RequestInfo) -> bool;

    /// Returns a snapshot of all records of the zone.
    ///
    /// If the zone has content, the first record must be its SOA record
    /// and no other SOA record may follow. If the zone has no content, the
    /// snapshot is empty. The snapshot must not change while a transfer is
    /// using it, later updates to the zone should produce new snapshots.
    fn all(&self) -> Arc<[Record]>;
}

//--- impl XfrZone for Deref<XfrZone>

impl<T, U> XfrZone for U
where
    T: XfrZone,
    U: Deref<Target = T> + Send + Sync + 'static,
{
    fn origin(&self) -> &Name {
        (**self).origin()
    }

    fn transfer_allowed(&self, info: &RequestInfo) -> bool {
        (**self).transfer_allowed(info)
    }

    fn all(&self) -> Arc<[Record]> {
        (**self).all()
    }
}

//------------ AclEntry ------------------------------------------------------

/// A single entry of a [`TransferAcl`].
///
/// In presentation format, an entry is either `*` for any client, an IP
/// address, or an IP prefix in the form `addr/len`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AclEntry {
    /// Any client matches.
    Any,

    /// Clients with an address in the given prefix match.
    Prefix {
        /// The address of the prefix. Bits beyond `len` are ignored.
        addr: IpAddr,

        /// The number of significant leading bits of `addr`.
        len: u8,
    },
}

impl AclEntry {
    /// Creates an entry for exactly one address.
    #[must_use]
    pub fn addr(addr: IpAddr) -> Self {
        let len = if addr.is_ipv4() { 32 } else { 128 };
        AclEntry::Prefix { addr, len }
    }

    /// Returns whether `client` is covered by this entry.
    #[must_use]
    pub fn matches(&self, client: IpAddr) -> bool {
        match *self {
            AclEntry::Any => true,
            AclEntry::Prefix { addr, len } => match (addr, client) {
                (IpAddr::V4(addr), IpAddr::V4(client)) => {
                    prefix_eq(&addr.octets(), &client.octets(), len)
                }
                (IpAddr::V6(addr), IpAddr::V6(client)) => {
                    prefix_eq(&addr.octets(), &client.octets(), len)
                }
                (IpAddr::V6(addr), IpAddr::V4(client)) => {
                    match addr.to_ipv4_mapped() {
                        Some(addr) if len >= 96 => prefix_eq(
                            &addr.octets(),
                            &client.octets(),
                            len - 96,
                        ),
                        _ => false,
                    }
                }
                (IpAddr::V4(_), IpAddr::V6(client)) => {
                    match client.to_ipv4_mapped() {
                        Some(client) => AclEntry::Prefix { addr, len }
                            .matches(client.into()),
                        None => false,
                    }
                }
            },
        }
    }
}

/// Compares the first `len` bits of two addresses.
fn prefix_eq(left: &[u8], right: &[u8], len: u8) -> bool {
    let len = usize::from(len);
    let full = len / 8;
    if left[..full] != right[..full] {
        return false;
    }
    match len % 8 {
        0 => true,
        bits => {
            let mask = 0xFFu8 << (8 - bits);
            left[full] & mask == right[full] & mask
        }
    }
}

//--- FromStr

impl FromStr for AclEntry {
    type Err = AclEntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            return Ok(AclEntry::Any);
        }
        match s.split_once('/') {
            None => {
                let addr = s.parse().map_err(|_| AclEntryError(()))?;
                Ok(AclEntry::addr(addr))
            }
            Some((addr, len)) => {
                let addr: IpAddr =
                    addr.parse().map_err(|_| AclEntryError(()))?;
                let len: u8 = len.parse().map_err(|_| AclEntryError(()))?;
                let max = if addr.is_ipv4() { 32 } else { 128 };
                if len > max {
                    return Err(AclEntryError(()));
                }
                Ok(AclEntry::Prefix { addr, len })
            }
        }
    }
}

//--- Display

impl fmt::Display for AclEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AclEntry::Any => f.write_str("*"),
            AclEntry::Prefix { addr, len } => write!(f, "{addr}/{len}"),
        }
    }
}

//------------ TransferAcl ---------------------------------------------------

/// The clients allowed to transfer a zone.
///
/// Transfers are only ever allowed over stream transports: a request
/// received over UDP is never allowed, regardless of the entries.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TransferAcl {
    entries: Vec<AclEntry>,
}

impl TransferAcl {
    /// Creates an ACL that doesn't allow any client.
    #[must_use]
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Creates an ACL that allows every client.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            entries: vec![AclEntry::Any],
        }
    }

    /// Adds an entry to the ACL.
    pub fn allow(&mut self, entry: AclEntry) {
        self.entries.push(entry);
    }

    /// Returns the entries of the ACL.
    #[must_use]
    pub fn entries(&self) -> &[AclEntry] {
        &self.entries
    }

    /// Returns whether the request described by `info` is allowed.
    #[must_use]
    pub fn allows(&self, info: &RequestInfo) -> bool {
        info.transport() == Transport::Tcp
            && self
                .entries
                .iter()
                .any(|entry| entry.matches(info.client_addr().ip()))
    }
}

//--- FromIterator

impl FromIterator<AclEntry> for TransferAcl {
    fn from_iter<T: IntoIterator<Item = AclEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

//------------ Zone ----------------------------------------------------------

/// A zone kept in memory.
///
/// The content of the zone can be replaced at any time via
/// [`replace`][Self::replace]. Transfers that have already taken their
/// snapshot keep transferring the content they started with.
#[derive(Debug)]
pub struct Zone {
    /// The apex name.
    origin: Name,

    /// The clients allowed to transfer the zone.
    acl: TransferAcl,

    /// The current content.
    records: RwLock<Arc<[Record]>>,
}

impl Zone {
    /// Creates a new zone.
    ///
    /// The records must either be empty or start with the SOA record of
    /// the zone, and contain no further SOA records.
    pub fn new(
        origin: Name,
        records: Vec<Record>,
        acl: TransferAcl,
    ) -> Result<Self, ZoneError> {
        check_records(&origin, &records)?;
        Ok(Self {
            origin,
            acl,
            records: RwLock::new(records.into()),
        })
    }

    /// Creates a new zone without content.
    #[must_use]
    pub fn empty(origin: Name, acl: TransferAcl) -> Self {
        Self {
            origin,
            acl,
            records: RwLock::new(Vec::new().into()),
        }
    }

    /// Returns the ACL of the zone.
    #[must_use]
    pub fn acl(&self) -> &TransferAcl {
        &self.acl
    }

    /// Replaces the content of the zone.
    ///
    /// The same rules as for [`new`][Self::new] apply to the records.
    pub fn replace(&self, records: Vec<Record>) -> Result<(), ZoneError> {
        check_records(&self.origin, &records)?;
        *self.records.write() = records.into();
        Ok(())
    }
}

fn check_records(origin: &Name, records: &[Record]) -> Result<(), ZoneError> {
    let Some((first, rest)) = records.split_first() else {
        return Ok(());
    };
    if !first.is_soa() {
        return Err(ZoneError::MissingSoa);
    }
    if first.owner() != origin {
        return Err(ZoneError::SoaNotAtApex);
    }
    if rest.iter().any(Record::is_soa) {
        return Err(ZoneError::MultipleSoa);
    }
    Ok(())
}

//--- XfrZone

impl XfrZone for Zone {
    fn origin(&self) -> &Name {
        &self.origin
    }

    fn transfer_allowed(&self, info: &RequestInfo) -> bool {
        self.acl.allows(info)
    }

    fn all(&self) -> Arc<[Record]> {
        self.records.read().clone()
    }
}

//============ Error Types ===================================================

//------------ AclEntryError -------------------------------------------------

/// An ACL entry could not be parsed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AclEntryError(());

impl fmt::Display for AclEntryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid ACL entry")
    }
}

impl std::error::Error for AclEntryError {}

//------------ ZoneError -----------------------------------------------------

/// The content given for a zone is not valid.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ZoneError {
    /// The first record is not an SOA record.
    MissingSoa,

    /// The SOA record is not owned by the apex.
    SoaNotAtApex,

    /// There is more than one SOA record.
    MultipleSoa,
}

impl fmt::Display for ZoneError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ZoneError::MissingSoa => {
                f.write_str("zone doesn't start with SOA")
            }
            ZoneError::SoaNotAtApex => f.write_str("SOA not at zone apex"),
            ZoneError::MultipleSoa => f.write_str("multiple SOA records"),
        }
    }
}

impl std::error::Error for ZoneError {}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{Class, Rtype, Ttl};
    use bytes::Bytes;
    use rstest::rstest;

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn rec(owner: &str, rtype: Rtype) -> Record {
        Record::new(
            name(owner),
            Class::IN,
            Ttl::from_secs(3600),
            rtype,
            Bytes::from_static(b"\x01\x02\x03\x04"),
        )
        .unwrap()
    }

    fn info(addr: &str, transport: Transport) -> RequestInfo {
        RequestInfo::new(addr.parse().unwrap(), transport)
    }

    #[rstest]
    #[case("*", "198.51.100.7:5353", true)]
    #[case("*", "[2001:db8::1]:53", true)]
    #[case("192.0.2.1", "192.0.2.1:53", true)]
    #[case("192.0.2.1", "192.0.2.2:53", false)]
    #[case("192.0.2.0/24", "192.0.2.200:53", true)]
    #[case("192.0.2.0/24", "192.0.3.1:53", false)]
    #[case("192.0.2.128/25", "192.0.2.127:53", false)]
    #[case("192.0.2.128/25", "192.0.2.129:53", true)]
    #[case("2001:db8::/32", "[2001:db8:1::1]:53", true)]
    #[case("2001:db8::/32", "[2001:db9::1]:53", false)]
    #[case("192.0.2.1", "[::ffff:192.0.2.1]:53", true)]
    #[case("::ffff:192.0.2.0/120", "192.0.2.9:53", true)]
    #[case("192.0.2.1", "[2001:db8::1]:53", false)]
    #[case("0.0.0.0/0", "203.0.113.1:53", true)]
    fn acl_matches(
        #[case] entry: &str,
        #[case] client: &str,
        #[case] expected: bool,
    ) {
        let acl: TransferAcl = [entry.parse().unwrap()].into_iter().collect();
        assert_eq!(acl.allows(&info(client, Transport::Tcp)), expected);
    }

    #[test]
    fn acl_never_allows_udp() {
        let acl = TransferAcl::allow_all();
        assert!(acl.allows(&info("192.0.2.1:53", Transport::Tcp)));
        assert!(!acl.allows(&info("192.0.2.1:53", Transport::Udp)));
    }

    #[test]
    fn acl_deny_all() {
        let acl = TransferAcl::deny_all();
        assert!(!acl.allows(&info("192.0.2.1:53", Transport::Tcp)));
    }

    #[rstest]
    #[case("")]
    #[case("**")]
    #[case("192.0.2.1/33")]
    #[case("2001:db8::/129")]
    #[case("192.0.2/24")]
    #[case("example.com")]
    fn acl_entry_errors(#[case] s: &str) {
        assert_eq!(AclEntry::from_str(s), Err(AclEntryError(())));
    }

    #[test]
    fn acl_entry_display() {
        assert_eq!(AclEntry::Any.to_string(), "*");
        assert_eq!(
            AclEntry::from_str("192.0.2.1").unwrap().to_string(),
            "192.0.2.1/32"
        );
    }

    #[test]
    fn zone_content_is_checked() {
        let origin = name("example.com");
        let acl = TransferAcl::allow_all;
        assert_eq!(
            Zone::new(
                origin.clone(),
                vec![rec("example.com", Rtype::A)],
                acl(),
            )
            .unwrap_err(),
            ZoneError::MissingSoa
        );
        assert_eq!(
            Zone::new(
                origin.clone(),
                vec![rec("www.example.com", Rtype::SOA)],
                acl(),
            )
            .unwrap_err(),
            ZoneError::SoaNotAtApex
        );
        assert_eq!(
            Zone::new(
                origin.clone(),
                vec![
                    rec("example.com", Rtype::SOA),
                    rec("example.com", Rtype::SOA)
                ],
                acl(),
            )
            .unwrap_err(),
            ZoneError::MultipleSoa
        );
        assert!(Zone::new(origin, vec![], acl()).is_ok());
    }

    #[test]
    fn snapshots_survive_replace() {
        let zone = Zone::new(
            name("example.com"),
            vec![
                rec("example.com", Rtype::SOA),
                rec("a.example.com", Rtype::A),
            ],
            TransferAcl::allow_all(),
        )
        .unwrap();
        let before = zone.all();
        zone.replace(vec![rec("EXAMPLE.com", Rtype::SOA)]).unwrap();
        assert_eq!(before.len(), 2);
        assert_eq!(zone.all().len(), 1);
        assert!(zone.replace(vec![rec("a.example.com", Rtype::A)]).is_err());
        assert_eq!(zone.all().len(), 1);
    }

    #[test]
    fn arc_zone_is_xfr_zone() {
        fn origin_of<Z: XfrZone>(zone: &Z) -> String {
            zone.origin().to_string()
        }
        let zone = Arc::new(Zone::empty(
            name("example.com"),
            TransferAcl::deny_all(),
        ));
        assert_eq!(origin_of(&zone), "example.com.");
        assert!(zone.all().is_empty());
    }
}
