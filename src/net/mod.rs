//! Sending DNS messages over the network.
//!
//! Currently, the module only provides the [`server`] sub-module with the
//! server side of outgoing zone transfers.

pub mod server;
