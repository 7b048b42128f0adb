//! Resource Record (RR) TYPEs

//------------ Rtype ---------------------------------------------------------

int_enum! {
    /// Resource Record Types.
    ///
    /// Each resource records has a 16 bit type value indicating what kind of
    /// information is represented by the record. Normal query includes the
    /// type of record information is requested for. A few aditional types,
    /// called query types, are defined as well and can only be used in
    /// questions. This type represents both these types.
    ///
    /// Only the types commonly found in zones and the transfer query types
    /// have named constants. Any other value can still be represented via
    /// [`Rtype::from_int`].
    ///
    /// The currently assigned values are maintained in an [IANA registry].
    ///
    /// [IANA registry]: http://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-4
    =>
    Rtype, u16;

    /// A host address.
    (A => 1, "A")

    /// An authoritative name server.
    (NS => 2, "NS")

    /// The canonical name for an alias
    (CNAME => 5, "CNAME")

    /// Marks the start of a zone of authority.
    (SOA => 6, "SOA")

    /// A domain name pointer.
    (PTR => 12, "PTR")

    /// Mail exchange.
    (MX => 15, "MX")

    /// Text strings.
    (TXT => 16, "TXT")

    /// IPv6 address.
    (AAAA => 28, "AAAA")

    /// Server selection.
    (SRV => 33, "SRV")

    /// Delegation signer.
    (DS => 43, "DS")

    /// RRSIG.
    (RRSIG => 46, "RRSIG")

    /// NSEC.
    (NSEC => 47, "NSEC")

    /// DNSKEY.
    (DNSKEY => 48, "DNSKEY")

    /// NSEC3.
    (NSEC3 => 50, "NSEC3")

    /// NSEC3PARAM.
    (NSEC3PARAM => 51, "NSEC3PARAM")

    /// Incremental transfer.
    ///
    /// See [RFC 1995].
    ///
    /// [RFC 1995]: https://tools.ietf.org/html/rfc1995
    (IXFR => 251, "IXFR")

    /// Transfer of entire zone.
    ///
    /// See [RFC 1035] and [RFC 5936].
    ///
    /// [RFC 1035]: https://tools.ietf.org/html/rfc1035
    /// [RFC 5936]: https://tools.ietf.org/html/rfc5936
    (AXFR => 252, "AXFR")

    /// A request for all records the server/cache has available.
    (ANY => 255, "ANY")
}

int_enum_str_with_prefix!(Rtype, "TYPE", u16, "unknown record type");

impl Rtype {
    /// Returns true if this record type is a zone transfer query type.
    #[must_use]
    pub fn is_xfr(self) -> bool {
        matches!(self, Rtype::AXFR | Rtype::IXFR)
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::Rtype;
    use core::str::FromStr;

    #[test]
    fn xfr_types() {
        assert!(Rtype::AXFR.is_xfr());
        assert!(Rtype::IXFR.is_xfr());
        assert!(!Rtype::SOA.is_xfr());
        assert!(!Rtype::from_int(0).is_xfr());
    }

    #[test]
    fn mnemonics() {
        assert_eq!(Rtype::from_str("axfr"), Ok(Rtype::AXFR));
        assert_eq!(Rtype::from_str("TYPE252"), Ok(Rtype::AXFR));
        assert_eq!(Rtype::from_int(65534).to_string(), "TYPE65534");
        assert_eq!(format!("{:?}", Rtype::MX), "Rtype::MX");
    }
}
