//! Delivering envelopes to the client.
//!
//! The delivery engine is the consuming side of a transfer session. It
//! receives envelopes from the session in order and turns them into DNS
//! messages written to the client’s connection. The session only relies on
//! the [`DeliveryEngine`] trait, [`StreamTransfer`] is the engine for
//! regular stream connections.
use core::fmt;
use core::future::Future;
use core::mem;
use core::pin::Pin;
use core::time::Duration;

use std::boxed::Box;
use std::io;
use std::sync::Arc;
use std::vec::Vec;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::Receiver;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, trace};

use crate::base::iana::{Opcode, Rcode};
use crate::base::message_builder::{AnswerBuilder, MessageBuilder, PushError};
use crate::base::{Header, Message, StreamTarget};
use crate::net::server::connection::XfrConnection;
use crate::net::server::util::write_stream_message;
use crate::utils::config::DefMinMax;

use super::envelope::Envelope;

//----------- Config ---------------------------------------------------------

/// Limit on the amount of time to allow when writing a response.
///
/// The value has to be between 1 millisecond and 1 hour. The default value
/// is 30 seconds.
const RESPONSE_WRITE_TIMEOUT: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(30),
    Duration::from_millis(1),
    Duration::from_secs(60 * 60),
);

/// Configuration for a [`StreamTransfer`] engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Limit on the amount of time to wait for writing a message or
    /// flushing the connection to complete.
    response_write_timeout: Duration,
}

impl Config {
    /// Creates a new, default config.
    #[must_use]
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the maximum time to wait for a response to be written.
    ///
    /// The value is silently limited to the range described for
    /// [`RESPONSE_WRITE_TIMEOUT`].
    pub fn set_response_write_timeout(&mut self, value: Duration) {
        self.response_write_timeout = RESPONSE_WRITE_TIMEOUT.limit(value);
    }

    /// Returns the maximum time to wait for a response to be written.
    #[must_use]
    pub fn response_write_timeout(&self) -> Duration {
        self.response_write_timeout
    }
}

//--- Default

impl Default for Config {
    fn default() -> Self {
        Self {
            response_write_timeout: RESPONSE_WRITE_TIMEOUT.default(),
        }
    }
}

//------------ DeliveryEngine ------------------------------------------------

/// The consumer of the envelopes of a transfer session.
///
/// [`deliver`][Self::deliver] is run in a task of its own with exclusive
/// access to the connection. It should receive envelopes until the channel
/// is closed and write each of them to the connection in order. Once it
/// returns, the session regains the connection and closes it.
///
/// Returning early, either with an error or not, drops the receiver which
/// makes the session stop producing envelopes.
pub trait DeliveryEngine<C>: Send + Sync + 'static {
    /// Delivers all envelopes received from `envelopes` over `conn`.
    #[allow(clippy::type_complexity)]
    fn deliver<'a>(
        &'a self,
        conn: &'a mut C,
        req: Arc<Message<Bytes>>,
        envelopes: Receiver<Envelope>,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>;

    /// Returns the time allowed for writing a single response.
    ///
    /// The session uses this for the responses it writes itself, i.e., the
    /// SERVFAIL response of a failed session.
    fn response_write_timeout(&self) -> Duration {
        RESPONSE_WRITE_TIMEOUT.default()
    }
}

//------------ StreamTransfer ------------------------------------------------

/// Delivers envelopes as AXFR response messages over a stream connection.
///
/// Each envelope becomes a single response message if it fits into one,
/// i.e., into 65,535 octets. Larger envelopes are spread over as many
/// messages as needed. The connection is flushed after each envelope.
#[derive(Clone, Debug, Default)]
pub struct StreamTransfer {
    config: Config,
}

impl StreamTransfer {
    /// Creates a new engine with the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new engine with the given config.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Returns the config of the engine.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Composes the response messages for one envelope.
    ///
    /// Fails if a single record doesn't fit into a message.
    pub fn compose_envelope<Octs: AsRef<[u8]>>(
        req: &Message<Octs>,
        envelope: &Envelope,
    ) -> Result<Vec<StreamTarget>, PushError> {
        let mut messages = Vec::new();
        if envelope.is_empty() {
            return Ok(messages);
        }
        let mut answer = Self::start_message(req)?;
        for record in envelope.records() {
            match answer.push(record) {
                Ok(()) => continue,
                Err(PushError::ShortBuf)
                    if answer.counts().ancount() > 0 => {}
                Err(err) => return Err(err),
            }
            let full = mem::replace(&mut answer, Self::start_message(req)?);
            messages.push(full.finish());
            answer.push(record)?;
        }
        messages.push(answer.finish());
        Ok(messages)
    }

    fn start_message<Octs: AsRef<[u8]>>(
        req: &Message<Octs>,
    ) -> Result<AnswerBuilder, PushError> {
        let mut answer =
            MessageBuilder::new().start_answer(req, Rcode::NOERROR)?;
        Self::set_axfr_header(req, answer.header_mut());
        Ok(answer)
    }

    fn set_axfr_header<Octs: AsRef<[u8]>>(
        req: &Message<Octs>,
        header: &mut Header,
    ) {
        // https://datatracker.ietf.org/doc/html/rfc5936#section-2.2.1
        // 2.2.1: Header Values
        //
        // "These are the DNS message header values for AXFR responses.
        //
        //     ID          MUST be copied from request -- see Note a)
        //
        //     QR          MUST be 1 (Response)
        //
        //     OPCODE      MUST be 0 (Standard Query)
        //
        //     Flags:
        //        AA       normally 1 -- see Note b)
        //        TC       MUST be 0 (Not truncated)
        //        RD       RECOMMENDED: copy request's value; MAY be set to 0
        //        RA       SHOULD be 0 -- see Note c)
        //        Z        "mbz" -- see Note d)
        //        AD       "mbz" -- see Note d)
        //        CD       "mbz" -- see Note d)"
        header.set_id(req.header().id());
        header.set_qr(true);
        header.set_opcode(Opcode::QUERY);
        header.set_aa(true);
        header.set_tc(false);
        header.set_rd(req.header().rd());
        header.set_ra(false);
        header.set_z(false);
        header.set_ad(false);
        header.set_cd(false);
        header.set_rcode(Rcode::NOERROR);
    }
}

//--- DeliveryEngine

impl<C: XfrConnection> DeliveryEngine<C> for StreamTransfer {
    fn deliver<'a>(
        &'a self,
        conn: &'a mut C,
        req: Arc<Message<Bytes>>,
        envelopes: Receiver<Envelope>,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>
    {
        Box::pin(async move {
            let write_timeout = self.config.response_write_timeout;
            let mut envelopes = ReceiverStream::new(envelopes);
            let mut delivered = 0usize;

            while let Some(envelope) = envelopes.next().await {
                let messages = Self::compose_envelope(&*req, &envelope)?;
                for msg in &messages {
                    write_stream_message(conn, msg, write_timeout).await?;
                }
                match timeout(write_timeout, conn.flush()).await {
                    Ok(res) => res?,
                    Err(_) => {
                        return Err(DeliveryError::Io(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("flush timed out (>{write_timeout:?})"),
                        )))
                    }
                }
                delivered += 1;
                trace!(
                    "Delivered envelope #{delivered} with {} records \
                     in {} messages",
                    envelope.len(),
                    messages.len()
                );
            }

            debug!("Delivered {delivered} envelopes");
            Ok(())
        })
    }

    fn response_write_timeout(&self) -> Duration {
        self.config.response_write_timeout
    }
}

//============ Error Types ===================================================

//------------ DeliveryError -------------------------------------------------

/// Delivering the envelopes of a transfer failed.
#[derive(Debug)]
pub enum DeliveryError {
    /// A response could not be written to the connection.
    Io(io::Error),

    /// A response could not be composed.
    Push(PushError),
}

//--- From

impl From<io::Error> for DeliveryError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<PushError> for DeliveryError {
    fn from(err: PushError) -> Self {
        Self::Push(err)
    }
}

//--- Display and Error

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeliveryError::Io(err) => write!(f, "write failed: {err}"),
            DeliveryError::Push(err) => {
                write!(f, "cannot compose response: {err}")
            }
        }
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeliveryError::Io(err) => Some(err),
            DeliveryError::Push(err) => Some(err),
        }
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{Class, Name, Question, Record, Rtype, Ttl};
    use crate::net::server::util::read_stream_message;
    use core::str::FromStr;
    use tokio::sync::mpsc;

    fn query(id: u16, rd: bool) -> Message<Bytes> {
        let mut builder = MessageBuilder::new();
        builder.header_mut().set_id(id);
        builder.header_mut().set_rd(rd);
        builder.header_mut().set_ad(true);
        builder
            .push_question(&Question::new_in(
                Name::from_str("example.com").unwrap(),
                Rtype::AXFR,
            ))
            .unwrap();
        builder.finish().into_message()
    }

    fn rec(rtype: Rtype, rdlen: usize) -> Record {
        Record::new(
            Name::from_str("example.com").unwrap(),
            Class::IN,
            Ttl::from_secs(3600),
            rtype,
            Bytes::from(vec![7u8; rdlen]),
        )
        .unwrap()
    }

    #[test]
    fn config_is_limited() {
        let mut config = Config::new();
        assert_eq!(config.response_write_timeout(), Duration::from_secs(30));
        config.set_response_write_timeout(Duration::ZERO);
        assert_eq!(config.response_write_timeout(), Duration::from_millis(1));
        config.set_response_write_timeout(Duration::from_secs(86400));
        assert_eq!(
            config.response_write_timeout(),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn one_message_per_envelope() {
        let req = query(1234, true);
        let envelope: Envelope =
            [rec(Rtype::SOA, 20), rec(Rtype::A, 4), rec(Rtype::SOA, 20)]
                .into_iter()
                .collect();
        let messages =
            StreamTransfer::compose_envelope(&req, &envelope).unwrap();
        assert_eq!(messages.len(), 1);

        let msg = messages[0].clone().into_message();
        let header = msg.header();
        assert_eq!(header.id(), 1234);
        assert!(header.qr());
        assert_eq!(header.opcode(), Opcode::QUERY);
        assert!(header.aa());
        assert!(!header.tc());
        assert!(header.rd());
        assert!(!header.ra());
        assert!(!header.ad());
        assert!(!header.cd());
        assert_eq!(header.rcode(), Rcode::NOERROR);
        assert_eq!(msg.header_counts().qdcount(), 1);
        assert_eq!(msg.answer().unwrap(), envelope.records());
    }

    #[test]
    fn large_envelope_is_spread() {
        let req = query(1, false);
        let envelope: Envelope =
            (0..5).map(|_| rec(Rtype::TXT, 20_000)).collect();
        let messages =
            StreamTransfer::compose_envelope(&req, &envelope).unwrap();
        // Three 20k records fit into 64k, the other two don't.
        assert_eq!(messages.len(), 2);
        let mut records = Vec::new();
        for msg in messages {
            assert!(msg.as_dgram_slice().len() <= usize::from(u16::MAX));
            let msg = msg.into_message();
            assert!(!msg.header().rd());
            records.extend(msg.answer().unwrap());
        }
        assert_eq!(records, envelope.records());
    }

    #[test]
    fn empty_envelope_has_no_messages() {
        let req = query(1, false);
        let messages =
            StreamTransfer::compose_envelope(&req, &Envelope::new()).unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn deliver_writes_all_envelopes() {
        let (mut client, mut server) = tokio::io::duplex(64 * 1024);
        let req = Arc::new(query(77, false));
        let (tx, rx) = mpsc::channel(1);

        let client_side = tokio::spawn(async move {
            let mut answers = Vec::new();
            while let Ok(buf) = read_stream_message(&mut client).await {
                let msg = Message::from_octets(buf).unwrap();
                assert_eq!(msg.header().id(), 77);
                answers.push(msg.answer().unwrap().len());
            }
            answers
        });

        let engine = StreamTransfer::new();
        let delivery = engine.deliver(&mut server, req, rx);
        let producer = async move {
            for len in [3, 1, 2] {
                let envelope: Envelope =
                    (0..len).map(|_| rec(Rtype::A, 4)).collect();
                tx.send(envelope).await.unwrap();
            }
        };
        let (res, ()) = tokio::join!(delivery, producer);
        res.unwrap();
        drop(server);

        assert_eq!(client_side.await.unwrap(), [3, 1, 2]);
    }

    #[tokio::test]
    async fn deliver_reports_write_errors() {
        let mut conn = tokio_test::io::Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let (tx, rx) = mpsc::channel(1);
        tx.send([rec(Rtype::A, 4)].into_iter().collect())
            .await
            .unwrap();
        drop(tx);

        let engine = StreamTransfer::new();
        let err = engine
            .deliver(&mut conn, Arc::new(query(1, false)), rx)
            .await
            .unwrap_err();
        match err {
            DeliveryError::Io(err) => {
                assert_eq!(err.kind(), io::ErrorKind::BrokenPipe)
            }
            err => panic!("unexpected error: {err}"),
        }
    }
}
