//! Splitting the records of a zone into envelopes.
//!
//! An AXFR response is a sequence of DNS messages each carrying a part of
//! the zone ([RFC 5936, section 2.2]). The records are grouped into
//! [`Envelope`]s by an [`EnvelopeSplitter`], each envelope becoming the
//! unit in which the delivery engine composes and sends messages.
//!
//! The split is greedy and looks at each record exactly once: records are
//! added to the current envelope until adding the next one would make the
//! envelope’s size exceed the byte limit. That record then starts the next
//! envelope. A record larger than the limit on its own still ends up in an
//! envelope of its own, records are never split or dropped. Because the
//! splitter is an iterator, at most one envelope is being assembled at any
//! time.
//!
//! [RFC 5936, section 2.2]: https://www.rfc-editor.org/rfc/rfc5936#section-2.2

use core::iter::Fuse;
use core::mem;

use std::sync::Arc;
use std::vec::Vec;

use tokio::sync::mpsc::Sender;
use tracing::{debug, trace};

use crate::base::Record;

//------------ Envelope ------------------------------------------------------

/// A group of records delivered to the client together.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    /// The records in transfer order.
    records: Vec<Record>,

    /// The sum of the wire format lengths of `records`.
    byte_len: usize,
}

impl Envelope {
    /// Creates a new, empty envelope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record to the envelope.
    pub fn push(&mut self, record: Record) {
        self.byte_len += record.compose_len();
        self.records.push(record);
    }

    /// Returns the records of the envelope.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Converts the envelope into its records.
    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Returns the number of records in the envelope.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns whether the envelope contains no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the size of all records in uncompressed wire format.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }
}

//--- FromIterator

impl FromIterator<Record> for Envelope {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        let mut res = Self::new();
        for record in iter {
            res.push(record);
        }
        res
    }
}

//------------ EnvelopeSplitter ----------------------------------------------

/// Partitions an ordered sequence of records into envelopes.
///
/// Iterating over the splitter yields the envelopes in order. Concatenating
/// their records reproduces the input sequence exactly. No envelope is ever
/// empty, so empty input yields no envelopes at all.
#[derive(Clone, Debug)]
pub struct EnvelopeSplitter<I: Iterator> {
    /// The records not yet looked at.
    records: Fuse<I>,

    /// The maximum size of an envelope unless it has only one record.
    byte_limit: usize,

    /// The envelope currently being filled.
    current: Envelope,
}

impl<I: Iterator<Item = Record>> EnvelopeSplitter<I> {
    /// Creates a new splitter for the given records and size limit.
    pub fn new<R>(records: R, byte_limit: usize) -> Self
    where
        R: IntoIterator<IntoIter = I>,
    {
        Self {
            records: records.into_iter().fuse(),
            byte_limit,
            current: Envelope::new(),
        }
    }

    /// Returns the size limit of this splitter.
    #[must_use]
    pub fn byte_limit(&self) -> usize {
        self.byte_limit
    }
}

impl<I: Iterator<Item = Record>> Iterator for EnvelopeSplitter<I> {
    type Item = Envelope;

    fn next(&mut self) -> Option<Self::Item> {
        for record in self.records.by_ref() {
            let len = record.compose_len();
            if !self.current.is_empty()
                && self.current.byte_len() + len > self.byte_limit
            {
                let full = mem::take(&mut self.current);
                self.current.push(record);
                return Some(full);
            }
            self.current.push(record);
        }
        if self.current.is_empty() {
            None
        } else {
            Some(mem::take(&mut self.current))
        }
    }
}

//------------ XfrRecords ----------------------------------------------------

/// The records of a zone in transfer order.
///
/// An AXFR response starts and ends with the SOA record of the zone
/// ([RFC 5936, section 2.2]). A zone snapshot starts with its SOA record,
/// this iterator yields all records of the snapshot followed by a copy of
/// that first record.
///
/// [RFC 5936, section 2.2]: https://www.rfc-editor.org/rfc/rfc5936#section-2.2
#[derive(Clone, Debug)]
pub struct XfrRecords {
    /// The snapshot of the zone.
    snapshot: Arc<[Record]>,

    /// The index of the next record to yield.
    ///
    /// Index `snapshot.len()` stands for the closing SOA.
    pos: usize,
}

impl XfrRecords {
    /// Creates the transfer sequence for a zone snapshot.
    #[must_use]
    pub fn new(snapshot: Arc<[Record]>) -> Self {
        Self { snapshot, pos: 0 }
    }

    /// Returns the total number of records, including the closing SOA.
    ///
    /// An empty snapshot has no closing SOA either.
    #[must_use]
    pub fn total(&self) -> usize {
        match self.snapshot.len() {
            0 => 0,
            len => len + 1,
        }
    }
}

impl Iterator for XfrRecords {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let res = match self.snapshot.get(self.pos) {
            Some(record) => record.clone(),
            None if self.pos == self.snapshot.len() => {
                self.snapshot.first()?.clone()
            }
            None => return None,
        };
        self.pos += 1;
        Some(res)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total().saturating_sub(self.pos);
        (left, Some(left))
    }
}

impl ExactSizeIterator for XfrRecords {}

//------------ xfr_out() -----------------------------------------------------

/// Feeds the envelopes of a splitter into a delivery channel.
///
/// Each envelope is sent as soon as it has been assembled. If the channel
/// is full, this waits until the receiving side has made room, so only a
/// bounded number of envelopes exist at any time. The sender is dropped
/// once the last envelope has been sent which signals the end of the
/// sequence to the receiver.
///
/// If the receiver goes away early, the remaining envelopes are not
/// produced at all.
///
/// Returns the number of envelopes sent.
pub async fn xfr_out<I>(
    splitter: EnvelopeSplitter<I>,
    sender: Sender<Envelope>,
) -> usize
where
    I: Iterator<Item = Record>,
{
    let mut sent = 0;
    for envelope in splitter {
        trace!(
            "Sending envelope #{sent} with {} records ({} bytes)",
            envelope.len(),
            envelope.byte_len()
        );
        if sender.send(envelope).await.is_err() {
            debug!(
                "Envelope receiver dropped after {sent} envelopes, abandoning"
            );
            return sent;
        }
        sent += 1;
    }
    sent
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{Class, Name, Rtype, Ttl};
    use bytes::Bytes;
    use core::str::FromStr;
    use rstest::rstest;
    use tokio::sync::mpsc;

    /// Creates a record with the given type and wire format length.
    ///
    /// The owner is `example.com.` which takes 13 octets, the fixed part of
    /// the record another 10.
    fn rec(rtype: Rtype, len: usize) -> Record {
        assert!(len >= 23);
        Record::new(
            Name::from_str("example.com").unwrap(),
            Class::IN,
            Ttl::from_secs(3600),
            rtype,
            Bytes::from(vec![0u8; len - 23]),
        )
        .unwrap()
    }

    fn lens(envelopes: &[Envelope]) -> Vec<Vec<usize>> {
        envelopes
            .iter()
            .map(|env| {
                env.records().iter().map(Record::compose_len).collect()
            })
            .collect()
    }

    fn split(input: &[usize], limit: usize) -> Vec<Vec<usize>> {
        let records = input.iter().map(|len| rec(Rtype::TXT, *len));
        let envelopes: Vec<_> =
            EnvelopeSplitter::new(records, limit).collect();
        lens(&envelopes)
    }

    #[test]
    fn five_records_of_300_octets_with_closing_soa() {
        let mut zone = vec![rec(Rtype::SOA, 300)];
        zone.extend((0..4).map(|_| rec(Rtype::A, 300)));
        let records = XfrRecords::new(zone.into());
        assert_eq!(records.total(), 6);

        let envelopes: Vec<_> =
            EnvelopeSplitter::new(records, 1000).collect();
        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0].len(), 3);
        assert_eq!(envelopes[0].byte_len(), 900);
        assert_eq!(envelopes[1].len(), 3);
        assert_eq!(envelopes[1].byte_len(), 900);
        assert!(envelopes[0].records()[0].is_soa());
        assert!(envelopes[1].records()[2].is_soa());
    }

    #[rstest]
    #[case::exactly_at_limit(
        &[500, 500, 100], 1000, &[&[500, 500][..], &[100]]
    )]
    #[case::one_over(&[500, 501, 100], 1000, &[&[500][..], &[501, 100]])]
    #[case::oversized_first(
        &[2000, 100, 100], 1000, &[&[2000][..], &[100, 100]]
    )]
    #[case::oversized_middle(
        &[100, 2000, 100], 1000, &[&[100][..], &[2000], &[100]]
    )]
    #[case::oversized_last(&[100, 2000], 1000, &[&[100][..], &[2000]])]
    #[case::all_oversized(&[2000, 3000], 1000, &[&[2000][..], &[3000]])]
    #[case::single(&[100], 1000, &[&[100][..]])]
    #[case::below_limit(&[100, 200, 300], 1000, &[&[100, 200, 300][..]])]
    fn boundaries(
        #[case] input: &[usize],
        #[case] limit: usize,
        #[case] expected: &[&[usize]],
    ) {
        let expected: Vec<Vec<usize>> =
            expected.iter().map(|env| env.to_vec()).collect();
        assert_eq!(split(input, limit), expected);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(split(&[], 1000).is_empty());
        let records = XfrRecords::new(Vec::new().into());
        assert_eq!(records.total(), 0);
        assert_eq!(EnvelopeSplitter::new(records, 1000).count(), 0);
    }

    #[rstest]
    fn order_and_size_are_preserved(
        #[values(1, 100, 450, 1000, 65535)] limit: usize,
    ) {
        let input: Vec<_> = (0..200)
            .map(|i| {
                rec(Rtype::from_int(i + 1), 23 + (usize::from(i) * 37) % 400)
            })
            .collect();
        let envelopes: Vec<_> =
            EnvelopeSplitter::new(input.clone(), limit).collect();
        for envelope in &envelopes {
            assert!(!envelope.is_empty());
            assert!(
                envelope.len() == 1 || envelope.byte_len() <= limit,
                "{} records of {} octets",
                envelope.len(),
                envelope.byte_len()
            );
        }
        let output: Vec<_> = envelopes
            .into_iter()
            .flat_map(Envelope::into_records)
            .collect();
        assert_eq!(output, input);
    }

    #[test]
    fn closing_soa_is_appended() {
        let zone = vec![
            rec(Rtype::SOA, 50),
            rec(Rtype::A, 30),
            rec(Rtype::MX, 40),
        ];
        let records = XfrRecords::new(zone.clone().into());
        assert_eq!(records.len(), 4);
        let types: Vec<_> = records.map(|rec| rec.rtype()).collect();
        assert_eq!(types, [Rtype::SOA, Rtype::A, Rtype::MX, Rtype::SOA]);

        let envelopes: Vec<_> =
            EnvelopeSplitter::new(XfrRecords::new(zone.into()), 1000)
                .collect();
        assert_eq!(envelopes.iter().map(Envelope::len).sum::<usize>(), 4);
    }

    #[tokio::test]
    async fn xfr_out_closes_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let records = (0..5).map(|_| rec(Rtype::A, 300));
        let sent = xfr_out(EnvelopeSplitter::new(records, 600), tx).await;
        assert_eq!(sent, 3);
        let mut received = vec![];
        while let Some(envelope) = rx.recv().await {
            received.push(envelope.len());
        }
        assert_eq!(received, [2, 2, 1]);
    }

    #[tokio::test]
    async fn xfr_out_waits_for_receiver() {
        let (tx, mut rx) = mpsc::channel(1);
        let records: Vec<_> = (0..4).map(|_| rec(Rtype::A, 300)).collect();
        let producer = tokio::spawn(xfr_out(
            EnvelopeSplitter::new(records, 300),
            tx,
        ));

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        // One envelope in the channel, the producer suspended on the next.
        assert!(!producer.is_finished());
        assert_eq!(rx.len(), 1);

        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 4);
        assert_eq!(producer.await.unwrap(), 4);
    }

    #[tokio::test]
    async fn xfr_out_stops_without_receiver() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let records = (0..5).map(|_| rec(Rtype::A, 300));
        assert_eq!(xfr_out(EnvelopeSplitter::new(records, 300), tx).await, 0);
    }
}
