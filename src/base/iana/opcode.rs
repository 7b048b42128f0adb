//! DNS OpCodes

//------------ Opcode --------------------------------------------------------

int_enum! {
    /// DNS OpCodes.
    ///
    /// The opcode specifies the kind of query to be performed. It is a four
    /// bit value carried in the message header. Values that do not fit into
    /// four bits are truncated when placed into a header.
    ///
    /// The currently assigned values are maintained in an [IANA registry].
    ///
    /// [IANA registry]: http://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-5
    =>
    Opcode, u8;

    /// A standard query (0).
    ///
    /// This is the only opcode used by zone transfers.
    (QUERY => 0, "QUERY")

    /// An inverse query (IQUERY) (1, obsolete).
    (IQUERY => 1, "IQUERY")

    /// A server status request (2).
    (STATUS => 2, "STATUS")

    /// A NOTIFY query (4).
    ///
    /// Defined in RFC 1996.
    (NOTIFY => 4, "NOTIFY")

    /// An UPDATE query (5).
    ///
    /// Defined in RFC 2136.
    (UPDATE => 5, "UPDATE")
}

int_enum_str_mnemonics_only!(Opcode, "unknown opcode");
