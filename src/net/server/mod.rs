//! Asynchronous DNS serving of zone transfers.
//!
//! This module is based on the [Tokio](https://tokio.rs/) async runtime.
//! It doesn’t accept connections or read requests itself. Instead, a
//! server hands a transfer request it has received together with the
//! connection it arrived on to an [`XfrHandler`][xfr::XfrHandler] which
//! takes over from there.
//!
//! ```text
//!    --> network source      - reads the request from the client
//!       --> XfrHandler       - checks the request, splits the zone
//!          --> delivery task - writes responses to the client
//!       <-- XfrHandler       - closes the connection
//! ```
//!
//! * [`xfr`] contains the transfer session itself.
//! * [`connection`] contains the guard closing connections after a
//!   transfer.
//! * [`util`] contains helpers for reading and writing length prefixed
//!   messages on stream connections.

pub mod connection;
pub mod util;
pub mod xfr;
