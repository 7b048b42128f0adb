use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use xfrout::base::iana::{Class, Rcode, Rtype};
use xfrout::base::{Message, MessageBuilder, Name, Question, Record, Ttl};
use xfrout::net::server::util::read_stream_message;
use xfrout::net::server::xfr::{
    AclEntry, Config, RequestInfo, StreamTransfer, TransferAcl, XfrHandler,
    Zone,
};

fn name(s: &str) -> Name {
    Name::from_str(s).unwrap()
}

fn zone_records(hosts: u16) -> Vec<Record> {
    let mut soa = Vec::new();
    soa.extend_from_slice(b"\x02ns\x07example\x03com\x00");
    soa.extend_from_slice(b"\x04root\x07example\x03com\x00");
    for value in [2024010101u32, 7200, 3600, 1209600, 300] {
        soa.extend_from_slice(&value.to_be_bytes());
    }
    let mut records = vec![Record::new(
        name("example.com"),
        Class::IN,
        Ttl::from_secs(3600),
        Rtype::SOA,
        Bytes::from(soa),
    )
    .unwrap()];
    records.extend((0..hosts).map(|i| {
        Record::new(
            name(&format!("host{i}.example.com")),
            Class::IN,
            Ttl::from_secs(300),
            Rtype::A,
            Bytes::copy_from_slice(&[192, 0, 2, (i % 256) as u8]),
        )
        .unwrap()
    }));
    records
}

async fn serve_one(
    listener: TcpListener,
    handler: Arc<XfrHandler<Zone, StreamTransfer>>,
) -> Rcode {
    let (mut sock, addr) = listener.accept().await.unwrap();
    let buf = read_stream_message(&mut sock).await.unwrap();
    let req = Message::from_octets(buf).unwrap();
    handler
        .serve(RequestInfo::tcp(addr), Arc::new(req), sock)
        .await
        .unwrap()
}

async fn request(
    addr: std::net::SocketAddr,
    qtype: Rtype,
) -> Vec<Message<Bytes>> {
    let mut builder = MessageBuilder::new();
    builder.header_mut().set_id(0xbeef);
    builder
        .push_question(&Question::new_in(name("example.com"), qtype))
        .unwrap();
    let query = builder.finish();

    let mut sock = TcpStream::connect(addr).await.unwrap();
    sock.write_all(query.as_stream_slice()).await.unwrap();

    let mut responses = Vec::new();
    while let Ok(buf) = read_stream_message(&mut sock).await {
        responses.push(Message::from_octets(buf).unwrap());
    }
    responses
}

#[tokio::test(flavor = "multi_thread")]
async fn axfr_over_tcp() {
    let records = zone_records(500);
    let zone = Zone::new(
        name("example.com"),
        records.clone(),
        TransferAcl::allow_all(),
    )
    .unwrap();
    let handler = Arc::new(XfrHandler::new(zone, StreamTransfer::new()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_one(listener, handler));

    let responses = request(addr, Rtype::AXFR).await;
    assert_eq!(server.await.unwrap(), Rcode::NOERROR);

    assert!(responses.len() > 1);
    let mut received = Vec::new();
    for msg in &responses {
        let header = msg.header();
        assert_eq!(header.id(), 0xbeef);
        assert!(header.qr());
        assert!(header.aa());
        assert_eq!(header.rcode(), Rcode::NOERROR);
        received.extend(msg.answer().unwrap());
    }

    let mut expected = records.clone();
    expected.push(records[0].clone());
    assert_eq!(received, expected);
}

#[tokio::test(flavor = "multi_thread")]
async fn larger_envelopes_mean_fewer_messages() {
    let records = zone_records(500);
    let zone =
        Zone::new(name("example.com"), records, TransferAcl::allow_all())
            .unwrap();
    let mut config = Config::new();
    config.set_envelope_byte_limit(65_535);
    config.set_max_queued_envelopes(8);
    let handler = Arc::new(XfrHandler::with_config(
        zone,
        StreamTransfer::new(),
        config,
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_one(listener, handler));

    let responses = request(addr, Rtype::AXFR).await;
    assert_eq!(server.await.unwrap(), Rcode::NOERROR);
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].header_counts().ancount(), 502);
}

#[tokio::test(flavor = "multi_thread")]
async fn refused_transfer_over_tcp() {
    let acl: TransferAcl =
        [AclEntry::from_str("192.0.2.0/24").unwrap()].into_iter().collect();
    let zone = Zone::new(name("example.com"), zone_records(10), acl).unwrap();
    let handler = Arc::new(XfrHandler::new(zone, StreamTransfer::new()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_one(listener, handler));

    let responses = request(addr, Rtype::AXFR).await;
    assert_eq!(server.await.unwrap(), Rcode::SERVFAIL);
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].header().rcode(), Rcode::SERVFAIL);
    assert_eq!(responses[0].header_counts().ancount(), 0);
}
