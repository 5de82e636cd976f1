//! Fixed-size benchmark payload.
//!
//! Layout: bytes `[0, 8)` hold the send timestamp as a big-endian `i64`;
//! the rest is filler. Filler is 4-byte big-endian integers whose value is
//! their word offset (the first filler word, at byte 8, holds 2), followed by
//! `len % 4` ascending byte values. The filler carries no meaning but is
//! always written and read in full so every message costs what a real one would.

use ipcperf_common::{IpcPerfError, Result, TIMESTAMP_LEN};

/// Write `send_ts` and the filler pattern into `buf` and return the bytes to send.
///
/// A buffer shorter than [`TIMESTAMP_LEN`] cannot carry a timestamp, so nothing
/// is attached and the returned payload is empty.
pub fn encode(buf: &mut [u8], send_ts: i64) -> &[u8] {
    if buf.len() < TIMESTAMP_LEN {
        return &buf[..0];
    }

    let (stamp, filler) = buf.split_at_mut(TIMESTAMP_LEN);
    stamp.copy_from_slice(&send_ts.to_be_bytes());

    let mut words = filler.chunks_exact_mut(4);
    for (word, value) in words.by_ref().zip(2u32..) {
        word.copy_from_slice(&value.to_be_bytes());
    }
    for (byte, value) in words.into_remainder().iter_mut().zip(0u8..) {
        *byte = value;
    }

    buf
}

/// Read the send timestamp from the front of `payload`.
pub fn decode(payload: &[u8]) -> Result<i64> {
    if payload.len() < TIMESTAMP_LEN {
        return Err(IpcPerfError::PayloadTooShort { len: payload.len(), min: TIMESTAMP_LEN });
    }
    let mut stamp = [0u8; TIMESTAMP_LEN];
    stamp.copy_from_slice(&payload[..TIMESTAMP_LEN]);
    Ok(i64::from_be_bytes(stamp))
}

/// Everything after the timestamp. Empty for payloads too short to carry one.
pub fn filler(payload: &[u8]) -> &[u8] {
    payload.get(TIMESTAMP_LEN..).unwrap_or(&[])
}

/// Copy the filler of `payload` into `scratch`, returning the bytes copied.
///
/// Filler longer than `scratch` is truncated; `scratch` is never resized.
pub fn drain_filler(payload: &[u8], scratch: &mut [u8]) -> usize {
    let filler = filler(payload);
    let n = filler.len().min(scratch.len());
    scratch[..n].copy_from_slice(&filler[..n]);
    n
}
