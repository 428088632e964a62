//! Reader bridge between a byte source and the external decoder.
//!
//! The decoder pulls container bytes through four operations: position,
//! read, seek, and a size check. [`StreamBridge`] implements them once for
//! every `Read + Seek` source.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use thiserror::Error;

/// Answer to a size check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrowStatus {
    /// The stream is at least as long as requested.
    SizeReached,
    /// The requested size lies beyond the end of the stream.
    SizeBeyondEof,
}

/// How closely the bridge reports read and seek outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BridgeMode {
    /// A read succeeds if any bytes arrived, and a seek succeeds only if it
    /// lands past offset 0. Seeking to the very start therefore reports
    /// failure. This is what existing loaders built on the same adapter do.
    #[default]
    Compatible,
    /// A read succeeds only if the whole buffer was filled, and a seek
    /// succeeds whenever the source accepts it.
    Strict,
}

/// Failure reported by a bridge operation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("read of {requested} bytes made no progress")]
    NoProgress { requested: usize },
    #[error("short read: {read} of {requested} bytes")]
    ShortRead { read: usize, requested: usize },
    #[error("seek to offset {0} failed")]
    Seek(i64),
    #[error("stream position unavailable")]
    Position,
    /// The remaining stream is longer than the caller allows.
    #[error("input of {len} bytes exceeds limit {limit}")]
    InputTooLarge { len: u64, limit: u64 },
    /// The buffer for the remaining stream could not be allocated.
    #[error("failed to allocate {requested} bytes for input")]
    Alloc { requested: u64 },
}

/// Reader interface expected by the external decoder.
pub trait HeifReader {
    /// Current offset, or -1 if the source cannot report one.
    fn position(&mut self) -> i64;

    /// Fill `buf` from the current offset.
    fn read(&mut self, buf: &mut [u8]) -> Result<(), BridgeError>;

    /// Move to an absolute offset.
    fn seek(&mut self, position: i64) -> Result<(), BridgeError>;

    /// Check whether the stream holds at least `target_size` bytes.
    ///
    /// Leaves the current offset unchanged.
    fn wait_for_file_size(&mut self, target_size: i64) -> GrowStatus;

    /// Read everything from the current offset to the end of the stream.
    ///
    /// Built on the four operations above: the stream length is found with
    /// size checks, then the remainder is read in one call. No seek is
    /// issued, so this works in [`BridgeMode::Compatible`] from offset 0.
    fn read_to_end(&mut self) -> Result<Vec<u8>, BridgeError> {
        self.read_to_end_max(None)
    }

    /// [`read_to_end`](Self::read_to_end), refusing more than `max_len`
    /// bytes. The length is checked and the buffer reserved fallibly before
    /// anything is read.
    fn read_to_end_max(&mut self, max_len: Option<u64>) -> Result<Vec<u8>, BridgeError> {
        let start = self.position();
        if start < 0 {
            return Err(BridgeError::Position);
        }

        let len = stream_len(self, start).abs_diff(start);
        if let Some(limit) = max_len.filter(|&limit| len > limit) {
            return Err(BridgeError::InputTooLarge { len, limit });
        }
        let remaining = usize::try_from(len).map_err(|_| BridgeError::Alloc { requested: len })?;

        let mut data = Vec::new();
        data.try_reserve_exact(remaining)
            .map_err(|_| BridgeError::Alloc { requested: len })?;
        data.resize(remaining, 0);
        if remaining > 0 {
            self.read(&mut data)?;
        }
        Ok(data)
    }
}

/// Find the stream length with size checks. `known` must be reachable.
fn stream_len<R: HeifReader + ?Sized>(reader: &mut R, known: i64) -> i64 {
    let mut lo = known;
    let mut hi = known.saturating_mul(2).max(4096);
    while reached(reader, hi) {
        lo = hi;
        if hi == i64::MAX {
            return hi;
        }
        hi = hi.saturating_mul(2);
    }
    // reached(lo) && !reached(hi)
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if reached(reader, mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

fn reached<R: HeifReader + ?Sized>(reader: &mut R, target: i64) -> bool {
    reader.wait_for_file_size(target) == GrowStatus::SizeReached
}

/// [`HeifReader`] over a borrowed `Read + Seek` source.
pub struct StreamBridge<'a, S: Read + Seek + ?Sized> {
    src: &'a mut S,
    mode: BridgeMode,
}

impl<'a, S: Read + Seek + ?Sized> StreamBridge<'a, S> {
    /// Bind a bridge to a source.
    pub fn new(src: &'a mut S, mode: BridgeMode) -> Self {
        Self { src, mode }
    }

    /// The reporting mode in use.
    pub fn mode(&self) -> BridgeMode {
        self.mode
    }

    /// Read until `buf` is full or the source is exhausted.
    fn fill(&mut self, buf: &mut [u8]) -> usize {
        let mut filled = 0;
        while filled < buf.len() {
            match self.src.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::trace!("bridge read error after {filled} bytes: {e}");
                    break;
                }
            }
        }
        filled
    }
}

impl<S: Read + Seek + ?Sized> HeifReader for StreamBridge<'_, S> {
    fn position(&mut self) -> i64 {
        match self.src.stream_position() {
            Ok(pos) => i64::try_from(pos).unwrap_or(-1),
            Err(_) => -1,
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), BridgeError> {
        let requested = buf.len();
        let read = self.fill(buf);
        log::trace!("bridge read {read}/{requested}");
        match self.mode {
            BridgeMode::Compatible if read > 0 => Ok(()),
            BridgeMode::Compatible => Err(BridgeError::NoProgress { requested }),
            BridgeMode::Strict if read == requested => Ok(()),
            BridgeMode::Strict if read == 0 => Err(BridgeError::NoProgress { requested }),
            BridgeMode::Strict => Err(BridgeError::ShortRead { read, requested }),
        }
    }

    fn seek(&mut self, position: i64) -> Result<(), BridgeError> {
        let Ok(offset) = u64::try_from(position) else {
            return Err(BridgeError::Seek(position));
        };
        let result = self.src.seek(SeekFrom::Start(offset));
        log::trace!("bridge seek {position} -> {result:?}");
        match (self.mode, result) {
            (BridgeMode::Compatible, Ok(pos)) if pos > 0 => Ok(()),
            (BridgeMode::Strict, Ok(_)) => Ok(()),
            _ => Err(BridgeError::Seek(position)),
        }
    }

    fn wait_for_file_size(&mut self, target_size: i64) -> GrowStatus {
        let len = match end_offset(self.src) {
            Ok(len) => i64::try_from(len).unwrap_or(i64::MAX),
            Err(e) => {
                log::warn!("bridge size check failed: {e}");
                -1
            }
        };
        if target_size > len {
            GrowStatus::SizeBeyondEof
        } else {
            GrowStatus::SizeReached
        }
    }
}

/// Offset of the end of the stream; the current offset is restored.
fn end_offset<S: Seek + ?Sized>(src: &mut S) -> std::io::Result<u64> {
    let start = src.stream_position()?;
    let end = src.seek(SeekFrom::End(0))?;
    src.seek(SeekFrom::Start(start))?;
    Ok(end)
}
