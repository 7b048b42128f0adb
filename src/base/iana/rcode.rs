//! DNS response codes.
//!
//! The DNS as defined in [RFC 1035] reserves four bits of the
//! message header as response code. The type [`Rcode`] defined herein
//! represents these codes. Extended response codes carried in an OPT record
//! are never produced when serving zone transfers and so are not supported.
//!
//! [RFC 1035]: https://tools.ietf.org/html/rfc1035

//------------ Rcode --------------------------------------------------------

int_enum! {
    /// DNS Response Codes.
    ///
    /// The response code of a response indicates what happend on the server
    /// when trying to answer the query. The code is a 4 bit value and part
    /// of the header of a DNS message.
    ///
    /// The currently assigned values are maintained in the
    /// [IANA DNS RCODEs] registry.
    ///
    /// [IANA DNS RCODEs]: http://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-6
    =>
    Rcode, u8;

    /// No error condition.
    ///
    /// (Otherwise known as success.)
    (NOERROR => 0, "NOERROR")

    /// Format error.
    ///
    /// The name server was unable to interpret the query.
    (FORMERR => 1, "FORMERR")

    /// Server failure.
    ///
    /// The name server was unable to process this query due to a problem
    /// with the name server.
    (SERVFAIL => 2, "SERVFAIL")

    /// Name error.
    ///
    /// The domain name given in the query does not exist at the name
    /// server.
    (NXDOMAIN => 3, "NXDOMAIN")

    /// Not implemented.
    ///
    /// The name server does not support the requested kind of query.
    (NOTIMP => 4, "NOTIMP")

    /// Query refused.
    ///
    /// The name server refused to perform the operation requested by the
    /// query for policy reasons.
    (REFUSED => 5, "REFUSED")

    /// Server not authoritative for zone or client not authorized.
    ///
    /// Defined in [RFC 2136] and [RFC 8945].
    ///
    /// [RFC 2136]: https://tools.ietf.org/html/rfc2136
    /// [RFC 8945]: https://tools.ietf.org/html/rfc8945
    (NOTAUTH => 9, "NOTAUTH")
}

int_enum_str_with_prefix!(Rcode, "RCODE", u8, "unknown rcode");

impl Rcode {
    /// Returns whether the value fits into the four bits of a header.
    #[must_use]
    pub const fn is_header_rcode(self) -> bool {
        self.0 < 16
    }
}

//============ Tests =========================================================
