//! Magic-byte sniffing over a seekable stream.

use std::io::{Read, Seek, SeekFrom};

use crate::format::{FileType, MAGIC_LEN};

/// Whether the stream starts with a HEIF container `classify` accepts.
///
/// Reads [`MAGIC_LEN`] bytes and restores the stream position whatever the
/// outcome. A stream that is too short, or that fails to read, is simply not
/// a match.
pub fn is_heic<S, F>(src: &mut S, classify: F) -> bool
where
    S: Read + Seek + ?Sized,
    F: FnOnce(&[u8]) -> FileType,
{
    let start = match src.stream_position() {
        Ok(pos) => pos,
        Err(e) => {
            log::trace!("sniff: stream position unavailable: {e}");
            return false;
        }
    };

    let mut magic = [0u8; MAGIC_LEN];
    let matched = match src.read_exact(&mut magic) {
        Ok(()) => classify(&magic).is_match(),
        Err(_) => false,
    };

    if let Err(e) = src.seek(SeekFrom::Start(start)) {
        log::warn!("sniff: failed to restore stream position {start}: {e}");
    }
    matched
}
