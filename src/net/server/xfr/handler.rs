//! The transfer session controller.
//!
//! [`XfrHandler`] serves a single zone. Each call to
//! [`serve`][XfrHandler::serve] runs one transfer session for a request:
//! it checks that the client may transfer the zone and that the request
//! actually asks for a transfer, takes a snapshot of the zone, and then
//! streams the snapshot to the client as a sequence of envelopes.
//!
//! During a session two parties run concurrently. The session itself splits
//! the snapshot into envelopes and feeds them into a bounded channel. A
//! [`DeliveryEngine`] running in a task of its own receives them and writes
//! them to the client’s connection. The connection belongs to the delivery
//! task while it runs and is handed back when it finishes. The session
//! waits for that before it closes the connection, so the connection is
//! never closed while messages are still being written.
use core::fmt;

use std::io;
use std::sync::Arc;

use arc_swap::ArcSwap;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::base::iana::{Rcode, Rtype};
use crate::base::wire::ParseError;
use crate::base::Message;
use crate::net::server::connection::{ConnectionGuard, XfrConnection};
use crate::net::server::util::{mk_error_response, write_stream_message};
use crate::utils::config::DefMinMax;

use super::engine::{DeliveryEngine, DeliveryError};
use super::envelope::{xfr_out, EnvelopeSplitter, XfrRecords};
use super::zone::{RequestInfo, XfrZone};

//----------- Config ---------------------------------------------------------

/// Limit on the size of an envelope in octets.
///
/// An envelope can be bigger if it consists of a single record that is
/// bigger than this limit. The value has to be between 1 and 65,535. The
/// default value is 1,000.
const ENVELOPE_BYTE_LIMIT: DefMinMax<usize> = DefMinMax::new(1000, 1, 65535);

/// Limit on the number of envelopes waiting for delivery.
///
/// The value has to be between 1 and 1,024. The default value is 1 which
/// means that the next envelope is only assembled once the previous one
/// has been picked up for delivery.
const MAX_QUEUED_ENVELOPES: DefMinMax<usize> = DefMinMax::new(1, 1, 1024);

/// Configuration for an [`XfrHandler`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Limit on the size of an envelope.
    envelope_byte_limit: usize,

    /// Limit on the number of envelopes waiting for delivery.
    max_queued_envelopes: usize,

    /// Whether to answer failed sessions with an error response.
    error_responses: bool,
}

impl Config {
    /// Creates a new, default config.
    #[must_use]
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the limit on the size of an envelope.
    ///
    /// The value is silently limited to the range given for
    /// [`ENVELOPE_BYTE_LIMIT`].
    pub fn set_envelope_byte_limit(&mut self, value: usize) {
        self.envelope_byte_limit = ENVELOPE_BYTE_LIMIT.limit(value);
    }

    /// Returns the limit on the size of an envelope.
    #[must_use]
    pub fn envelope_byte_limit(&self) -> usize {
        self.envelope_byte_limit
    }

    /// Set the limit on the number of envelopes waiting for delivery.
    ///
    /// The value is silently limited to the range given for
    /// [`MAX_QUEUED_ENVELOPES`].
    pub fn set_max_queued_envelopes(&mut self, value: usize) {
        self.max_queued_envelopes = MAX_QUEUED_ENVELOPES.limit(value);
    }

    /// Returns the limit on the number of envelopes waiting for delivery.
    #[must_use]
    pub fn max_queued_envelopes(&self) -> usize {
        self.max_queued_envelopes
    }

    /// Set whether a SERVFAIL response is written before closing.
    ///
    /// If enabled, a session that ends with [`Rcode::SERVFAIL`] writes a
    /// response with that rcode to the connection before closing it.
    /// Otherwise, the connection is closed without a response.
    pub fn set_error_responses(&mut self, value: bool) {
        self.error_responses = value;
    }

    /// Returns whether a SERVFAIL response is written before closing.
    #[must_use]
    pub fn error_responses(&self) -> bool {
        self.error_responses
    }
}

//--- Default

impl Default for Config {
    fn default() -> Self {
        Self {
            envelope_byte_limit: ENVELOPE_BYTE_LIMIT.default(),
            max_queued_envelopes: MAX_QUEUED_ENVELOPES.default(),
            error_responses: true,
        }
    }
}

//------------ XfrHandler ----------------------------------------------------

/// Serves outgoing transfers of a zone.
pub struct XfrHandler<Z, E> {
    /// The zone to transfer.
    zone: Z,

    /// The engine delivering envelopes to clients.
    engine: Arc<E>,

    /// The current config.
    ///
    /// Each session works with the config current when it started.
    config: ArcSwap<Config>,
}

impl<Z: XfrZone, E> XfrHandler<Z, E> {
    /// Creates a new handler with the default config.
    #[must_use]
    pub fn new(zone: Z, engine: E) -> Self {
        Self::with_config(zone, engine, Config::default())
    }

    /// Creates a new handler with the given config.
    #[must_use]
    pub fn with_config(zone: Z, engine: E, config: Config) -> Self {
        Self {
            zone,
            engine: Arc::new(engine),
            config: ArcSwap::from_pointee(config),
        }
    }

    /// Replaces the config.
    ///
    /// Sessions already running keep using the config they started with.
    pub fn reconfigure(&self, config: Config) {
        self.config.store(Arc::new(config));
    }

    /// Returns the current config.
    #[must_use]
    pub fn config(&self) -> Config {
        **self.config.load()
    }

    /// Returns the zone served by the handler.
    #[must_use]
    pub fn zone(&self) -> &Z {
        &self.zone
    }

    /// Returns the delivery engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<Z: XfrZone, E> XfrHandler<Z, E> {
    /// Runs a transfer session for a request.
    ///
    /// The session takes ownership of the connection the request was
    /// received on and always closes it before returning, no matter the
    /// outcome.
    ///
    /// Returns the rcode describing the outcome of the session:
    ///
    /// - [`Rcode::SERVFAIL`] if the client may not transfer the zone or the
    ///   zone has no content. No envelope has been produced in this case.
    /// - [`Rcode::NOERROR`] once all envelopes have been produced and the
    ///   delivery engine has finished. Errors during delivery are logged
    ///   but not reported here: the session has done all it can and the
    ///   client will notice the incomplete transfer on its own.
    ///
    /// Returns an error if the request is not a transfer request at all.
    /// This indicates that the handler has been wired up incorrectly.
    pub async fn serve<C>(
        &self,
        info: RequestInfo,
        req: Arc<Message<Bytes>>,
        conn: C,
    ) -> Result<Rcode, XfrError>
    where
        C: XfrConnection,
        E: DeliveryEngine<C>,
    {
        let config = self.config();
        let span = info_span!(
            "xfr",
            zone = %self.zone.origin(),
            client = %info.client_addr()
        );

        async move {
            let mut conn = ConnectionGuard::new(conn, info.client_addr());
            let res =
                self.transfer(&info, req.clone(), &mut conn, &config).await;

            if config.error_responses()
                && matches!(res, Ok(Rcode::SERVFAIL))
            {
                if let Some(stream) = conn.get_mut() {
                    self.write_servfail(stream, &req).await;
                }
            }

            conn.close().await;
            res
        }
        .instrument(span)
        .await
    }

    async fn transfer<C>(
        &self,
        info: &RequestInfo,
        req: Arc<Message<Bytes>>,
        conn: &mut ConnectionGuard<C>,
        config: &Config,
    ) -> Result<Rcode, XfrError>
    where
        C: XfrConnection,
        E: DeliveryEngine<C>,
    {
        let origin = self.zone.origin();
        let client = info.client_addr();

        if !self.zone.transfer_allowed(info) {
            warn!("Outgoing transfer of zone {origin} to {client} refused");
            return Ok(Rcode::SERVFAIL);
        }

        let qtype = req
            .sole_question()
            .map_err(XfrError::MalformedQuery)?
            .qtype();
        if !qtype.is_xfr() {
            return Err(XfrError::NotTransferType(qtype));
        }

        let snapshot = self.zone.all();
        if snapshot.is_empty() {
            warn!(
                "Outgoing transfer of zone {origin} to {client} failed: \
                 zone has no records"
            );
            return Ok(Rcode::SERVFAIL);
        }

        let Some(mut stream) = conn.take() else {
            error!("Internal error: connection to {client} not available");
            return Ok(Rcode::SERVFAIL);
        };

        let (envelope_tx, envelope_rx) =
            mpsc::channel(config.max_queued_envelopes());
        let (done_tx, done_rx) = oneshot::channel();
        let engine = self.engine.clone();
        tokio::spawn(
            async move {
                let res = engine.deliver(&mut stream, req, envelope_rx).await;
                // The session only goes away before us if it was cancelled.
                let _ = done_tx.send((stream, res));
            }
            .in_current_span(),
        );

        let records = XfrRecords::new(snapshot);
        info!(
            "Outgoing transfer of {} records of zone {origin} to {client} \
             started",
            records.total()
        );
        let splitter =
            EnvelopeSplitter::new(records, config.envelope_byte_limit());
        let sent = xfr_out(splitter, envelope_tx).await;

        match done_rx.await {
            Ok((stream, res)) => {
                conn.restore(stream);
                match res {
                    Ok(()) => {
                        info!(
                            "Outgoing transfer of zone {origin} to {client} \
                             finished after {sent} envelopes"
                        );
                    }
                    Err(err) => Self::log_delivery_error(&err),
                }
            }
            Err(_) => {
                error!("Delivery of zone {origin} to {client} aborted");
            }
        }

        Ok(Rcode::NOERROR)
    }

    fn log_delivery_error(err: &DeliveryError) {
        match err {
            DeliveryError::Io(err) => {
                warn!("Outgoing transfer failed: {err}")
            }
            DeliveryError::Push(err) => {
                error!("Internal error: Outgoing transfer failed: {err}")
            }
        }
    }

    async fn write_servfail<C>(&self, stream: &mut C, req: &Message<Bytes>)
    where
        C: XfrConnection,
        E: DeliveryEngine<C>,
    {
        let response = mk_error_response(req, Rcode::SERVFAIL);
        let write_timeout = self.engine.response_write_timeout();
        let res = match write_stream_message(stream, &response, write_timeout)
            .await
        {
            Ok(()) => match timeout(write_timeout, stream.flush()).await {
                Ok(res) => res,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("flush timed out (>{write_timeout:?})"),
                )),
            },
            Err(err) => Err(err),
        };
        if let Err(err) = res {
            debug!("Failed to write SERVFAIL response: {err}");
        }
    }
}

//============ Error Types ===================================================

//------------ XfrError ------------------------------------------------------

/// A request that should never have reached the transfer handler.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum XfrError {
    /// The request is for a type other than AXFR or IXFR.
    NotTransferType(Rtype),

    /// The request doesn't have exactly one well-formed question.
    MalformedQuery(ParseError),
}

//--- Display and Error

impl fmt::Display for XfrError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            XfrError::NotTransferType(rtype) => {
                write!(f, "xfr called with non transfer type: {rtype}")
            }
            XfrError::MalformedQuery(err) => {
                write!(f, "xfr called with malformed query: {err}")
            }
        }
    }
}

impl std::error::Error for XfrError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            XfrError::NotTransferType(_) => None,
            XfrError::MalformedQuery(err) => Some(err),
        }
    }
}
