//! Outgoing DNS zone transfers.
//!
//! This crate provides the server side of AXFR zone transfers: given a
//! zone and a stream connection a transfer request was received on, it
//! streams the zone’s records to the client as a sequence of DNS messages
//! and closes the connection afterwards.
//!
//! # Modules
//!
//! * [base] contains the minimal set of DNS types needed for this: domain
//!   names, records, and messages as well as a builder for the latter.
//! * [net] contains the transfer machinery proper. Start with
//!   [`net::server::xfr`] which describes how the parts fit together.
//!
//! # Logging
//!
//! All diagnostics are emitted via the [tracing] crate. Each transfer
//! session runs in an `xfr` span carrying the zone and client address. The
//! start of every transfer is logged at info level, refused and failed
//! transfers at warn level. Enable trace level to see the individual
//! envelopes and a `text2pcap` compatible dump of each response message.

#![allow(renamed_and_removed_lints)]
#![allow(clippy::unknown_clippy_lints)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod base;
pub mod net;
pub(crate) mod utils;
