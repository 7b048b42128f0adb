//! Outgoing zone transfers.
//!
//! This module implements the server side of AXFR ([RFC 5936]) for zones
//! served from memory. A transfer session is run by an [`XfrHandler`] for
//! a single request. The session splits a snapshot of the zone into
//! [`Envelope`]s of bounded size and hands them to a [`DeliveryEngine`]
//! which writes them to the client while the next envelope is assembled.
//!
//! IXFR requests are answered with a full transfer as permitted by
//! [RFC 1995, section 4].
//!
//! # Usage
//!
//! ```no_run
//! use std::str::FromStr;
//! use std::sync::Arc;
//!
//! use tokio::net::TcpListener;
//! use xfrout::base::{Message, Name};
//! use xfrout::net::server::util::read_stream_message;
//! use xfrout::net::server::xfr::{
//!     RequestInfo, StreamTransfer, TransferAcl, XfrHandler, Zone,
//! };
//!
//! # async fn run(
//! #     records: Vec<xfrout::base::Record>,
//! # ) -> std::io::Result<()> {
//! let zone = Zone::new(
//!     Name::from_str("example.com").unwrap(),
//!     records,
//!     TransferAcl::allow_all(),
//! )
//! .unwrap();
//! let handler = Arc::new(XfrHandler::new(zone, StreamTransfer::new()));
//!
//! let listener = TcpListener::bind("127.0.0.1:8053").await?;
//! loop {
//!     let (mut sock, addr) = listener.accept().await?;
//!     let handler = handler.clone();
//!     tokio::spawn(async move {
//!         let Ok(buf) = read_stream_message(&mut sock).await else {
//!             return;
//!         };
//!         let Ok(req) = Message::from_octets(buf) else {
//!             return;
//!         };
//!         let info = RequestInfo::tcp(addr);
//!         let _ = handler.serve(info, Arc::new(req), sock).await;
//!     });
//! }
//! # }
//! ```
//!
//! [RFC 5936]: https://www.rfc-editor.org/rfc/rfc5936
//! [RFC 1995, section 4]: https://www.rfc-editor.org/rfc/rfc1995#section-4

pub use self::engine::{DeliveryEngine, DeliveryError, StreamTransfer};
pub use self::envelope::{xfr_out, Envelope, EnvelopeSplitter, XfrRecords};
pub use self::handler::{Config, XfrError, XfrHandler};
pub use self::zone::{
    AclEntry, AclEntryError, RequestInfo, TransferAcl, Transport, XfrZone,
    Zone, ZoneError,
};

pub mod engine;
pub mod envelope;
pub mod handler;
pub mod zone;
