use ipcperf_common::Result;

use crate::codec;

/// Default size of the scratch area payload filler is drained into.
pub const DEFAULT_SCRATCH_LEN: usize = 10_000;

/// Frozen (send, arrival) timestamp pairs in arrival order.
///
/// `sent_at[i]` and `received_at[i]` belong to the same message; both vectors
/// always have the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    pub sent_at: Vec<i64>,
    pub received_at: Vec<i64>,
    /// Stamped arrivals rejected because the buffers were full.
    pub dropped: u64,
    /// Arrivals with no payload attached (publisher size below the timestamp width).
    pub unstamped: u64,
    /// Length of the last payload seen.
    pub payload_size: usize,
}

impl SampleSet {
    pub fn len(&self) -> usize {
        self.sent_at.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent_at.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// Capacity exhausted; the sample was discarded.
    Dropped,
    Unstamped,
}

/// Fixed-capacity sample buffers filled from the delivery callback.
///
/// All memory is allocated up front and [`record`](SampleRecorder::record)
/// never allocates. A full recorder drops samples; it never grows.
pub struct SampleRecorder {
    sent_at: Vec<i64>,
    received_at: Vec<i64>,
    count: usize,
    scratch: Vec<u8>,
    dropped: u64,
    unstamped: u64,
    payload_size: usize,
}

impl SampleRecorder {
    pub fn with_capacity(capacity: usize, scratch_len: usize) -> Self {
        Self {
            sent_at: vec![0; capacity],
            received_at: vec![0; capacity],
            count: 0,
            scratch: vec![b' '; scratch_len],
            dropped: 0,
            unstamped: 0,
            payload_size: 0,
        }
    }

    /// Record one arrival stamped at `received_at`.
    ///
    /// Returns `Err` only for a malformed payload (non-empty but shorter than
    /// the timestamp); the recorder is left unchanged in that case.
    pub fn record(&mut self, received_at: i64, payload: &[u8]) -> Result<RecordOutcome> {
        if payload.is_empty() {
            self.payload_size = 0;
            self.unstamped += 1;
            return Ok(RecordOutcome::Unstamped);
        }

        let sent_at = codec::decode(payload)?;
        self.payload_size = payload.len();
        codec::drain_filler(payload, &mut self.scratch);

        if self.count == self.sent_at.len() {
            self.dropped += 1;
            return Ok(RecordOutcome::Dropped);
        }

        self.sent_at[self.count] = sent_at;
        self.received_at[self.count] = received_at;
        self.count += 1;
        Ok(RecordOutcome::Recorded)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.sent_at.len()
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Hand the recorded samples over for analysis.
    ///
    /// The recorder keeps no buffers afterwards: any later arrival is counted
    /// as dropped rather than written into the frozen set.
    pub fn freeze(&mut self) -> SampleSet {
        let mut sent_at = std::mem::take(&mut self.sent_at);
        let mut received_at = std::mem::take(&mut self.received_at);
        sent_at.truncate(self.count);
        received_at.truncate(self.count);
        self.count = 0;

        SampleSet {
            sent_at,
            received_at,
            dropped: self.dropped,
            unstamped: self.unstamped,
            payload_size: self.payload_size,
        }
    }
}
