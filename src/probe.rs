//! Partial-data header probing.
//!
//! Extracts brand and dimensions from a leading slice of a HEIF file without
//! decoding. This is pure byte parsing over the ISOBMFF box structure, so it
//! works without any backend compiled in.

use std::io::{Read, Seek, SeekFrom};

use crate::LoadError;
use crate::format::{FileType, HeifBrand, check_file_type};

/// Bytes read by [`probe_stream`]. Enough for `ftyp` and `meta` in files
/// written by phones and common encoders.
pub const RECOMMENDED_PROBE_BYTES: usize = 4096;

/// What the header says about a HEIF file.
///
/// Width and height stay `None` when the prefix ends before the `ispe`
/// property, or the file has none.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct ProbeResult {
    pub file_type: FileType,
    /// Major brand, if it is one this crate knows.
    pub brand: Option<HeifBrand>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Offset just past `meta`, or the prefix length if `meta` was not seen.
    pub bytes_examined: usize,
}

/// Read brand and primary image size from a prefix of a HEIF file.
///
/// Fails only if the data is not an ISOBMFF container at all.
pub fn probe(data: &[u8]) -> Result<ProbeResult, LoadError> {
    let file_type = check_file_type(data);
    if file_type == FileType::No {
        return Err(LoadError::UnrecognizedFormat);
    }

    let meta = find_box(data, b"meta");
    let size = meta
        .as_ref()
        .and_then(|meta| meta.content.get(4..)) // skip FullBox version/flags
        .and_then(image_spatial_extents);

    Ok(ProbeResult {
        file_type,
        brand: HeifBrand::detect(data),
        width: size.map(|(w, _)| w),
        height: size.map(|(_, h)| h),
        bytes_examined: meta.map_or(data.len(), |m| m.end.min(data.len())),
    })
}

/// Probe the start of a stream. The stream position is restored.
pub fn probe_stream<S: Read + Seek + ?Sized>(src: &mut S) -> Result<ProbeResult, LoadError> {
    let start = src.stream_position()?;
    let mut buf = Vec::with_capacity(RECOMMENDED_PROBE_BYTES);
    let read = Read::take(&mut *src, RECOMMENDED_PROBE_BYTES as u64).read_to_end(&mut buf);
    src.seek(SeekFrom::Start(start))?;
    read?;
    probe(&buf)
}

/// First `ispe` under `iprp/ipco` in the body of `meta`.
fn image_spatial_extents(meta: &[u8]) -> Option<(u32, u32)> {
    let iprp = find_box(meta, b"iprp")?;
    let ipco = find_box(iprp.content, b"ipco")?;
    let ispe = find_box(ipco.content, b"ispe")?;
    // version/flags, width, height
    let field = |at: usize| -> Option<u32> {
        let bytes = ispe.content.get(at..at + 4)?;
        Some(u32::from_be_bytes(bytes.try_into().ok()?))
    };
    Some((field(4)?, field(8)?))
}

/// One ISOBMFF box. `content` may be cut short by the end of the data;
/// `end` is where the box claims to end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BoxRef<'a> {
    pub(crate) kind: [u8; 4],
    pub(crate) content: &'a [u8],
    pub(crate) end: usize,
}

/// Sibling boxes in `data`, stopping at the first malformed header.
pub(crate) struct Boxes<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Boxes<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn header(&self) -> Option<([u8; 4], usize, usize)> {
        let rest = self.data.get(self.pos..)?;
        let size = u32::from_be_bytes(rest.get(..4)?.try_into().ok()?);
        let kind: [u8; 4] = rest.get(4..8)?.try_into().ok()?;
        let (header_len, box_len) = match size {
            0 => (8, rest.len()),
            1 => {
                let large = u64::from_be_bytes(rest.get(8..16)?.try_into().ok()?);
                (16, usize::try_from(large).ok()?)
            }
            n => (8, n as usize),
        };
        (box_len >= header_len).then_some((kind, header_len, box_len))
    }
}

impl<'a> Iterator for Boxes<'a> {
    type Item = BoxRef<'a>;

    fn next(&mut self) -> Option<BoxRef<'a>> {
        let (kind, header_len, box_len) = self.header()?;
        let start = self.pos + header_len;
        let end = self.pos.checked_add(box_len)?;
        let content = self.data.get(start..end.min(self.data.len()))?;
        self.pos = end;
        Some(BoxRef { kind, content, end })
    }
}

pub(crate) fn find_box<'a>(data: &'a [u8], kind: &[u8; 4]) -> Option<BoxRef<'a>> {
    Boxes::new(data).find(|b| &b.kind == kind)
}
