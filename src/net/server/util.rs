//! Small helpers for DNS servers using stream transports.
use core::time::Duration;

use std::io;
use std::string::String;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{enabled, trace, Level};

use crate::base::iana::Rcode;
use crate::base::message_builder::{MessageBuilder, StreamTarget};
use crate::base::Message;

//----------- mk_error_response() --------------------------------------------

/// Creates an error response for the given request.
///
/// The response copies the question of the request and has no records.
#[must_use]
pub fn mk_error_response<Octs: AsRef<[u8]>>(
    msg: &Message<Octs>,
    rcode: Rcode,
) -> StreamTarget {
    match MessageBuilder::new().start_answer(msg, rcode) {
        Ok(answer) => answer.finish(),
        Err(_) => {
            // The question alone didn't fit. Answer without it.
            let mut builder = MessageBuilder::new();
            let header = builder.header_mut();
            header.set_id(msg.header().id());
            header.set_qr(true);
            header.set_opcode(msg.header().opcode());
            header.set_rcode(rcode);
            builder.finish()
        }
    }
}

//----------- read_stream_message() ------------------------------------------

/// Reads one length prefixed DNS message from a stream.
pub async fn read_stream_message<R>(reader: &mut R) -> io::Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let len = usize::from(reader.read_u16().await?);
    let mut buf = BytesMut::new();
    buf.resize(len, 0);
    reader.read_exact(buf.as_mut()).await?;
    Ok(buf.freeze())
}

//----------- write_stream_message() -----------------------------------------

/// Writes a length prefixed DNS message to a stream.
///
/// The write fails with [`io::ErrorKind::TimedOut`] if it doesn't complete
/// within `write_timeout`. The stream is not flushed.
pub async fn write_stream_message<W>(
    writer: &mut W,
    msg: &StreamTarget,
    write_timeout: Duration,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if enabled!(Level::TRACE) {
        let bytes = msg.as_dgram_slice();
        let pcap_text = to_pcap_text(bytes, bytes.len());
        trace!(pcap_text, "Sending response");
    }

    match timeout(write_timeout, writer.write_all(msg.as_stream_slice()))
        .await
    {
        Ok(res) => res,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("write timed out (>{write_timeout:?})"),
        )),
    }
}

//----------- to_pcap_text() -------------------------------------------------

/// Formats octets the way `text2pcap` expects them.
pub(crate) fn to_pcap_text<T: AsRef<[u8]>>(
    bytes: T,
    num_bytes: usize,
) -> String {
    let mut formatted = "000000".to_string();
    let hex_encoded = hex::encode(&bytes.as_ref()[..num_bytes]);
    let mut chars = hex_encoded.chars();
    loop {
        match (chars.next(), chars.next()) {
            (None, None) => break,
            (Some(a), Some(b)) => {
                formatted.push(' ');
                formatted.push(a);
                formatted.push(b);
            }
            _ => unreachable!(),
        }
    }
    formatted
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{Name, Question, Rtype};
    use core::str::FromStr;

    fn query() -> Message<Bytes> {
        let mut builder = MessageBuilder::new();
        builder.header_mut().set_id(7);
        builder
            .push_question(&Question::new_in(
                Name::from_str("example.com").unwrap(),
                Rtype::AXFR,
            ))
            .unwrap();
        builder.finish().into_message()
    }

    #[test]
    fn error_response() {
        let resp =
            mk_error_response(&query(), Rcode::SERVFAIL).into_message();
        assert_eq!(resp.header().id(), 7);
        assert!(resp.header().qr());
        assert_eq!(resp.header().rcode(), Rcode::SERVFAIL);
        assert_eq!(resp.header_counts().qdcount(), 1);
        assert_eq!(resp.header_counts().ancount(), 0);
    }

    #[tokio::test]
    async fn stream_round_trip() {
        let msg = mk_error_response(&query(), Rcode::SERVFAIL);
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_stream_message(&mut server, &msg, Duration::from_secs(1))
            .await
            .unwrap();
        let read = read_stream_message(&mut client).await.unwrap();
        assert_eq!(read.as_ref(), msg.as_dgram_slice());
    }

    #[test]
    fn pcap_text() {
        assert_eq!(to_pcap_text([0x01u8, 0xab, 0x00], 2), "000000 01 ab");
        assert_eq!(to_pcap_text([0xffu8, 0x10, 0x00], 3), "000000 ff 10 00");
        assert_eq!(to_pcap_text([0x01u8], 0), "000000");
    }
}
