//! Backend interface to the external HEIF decoder.
//!
//! The loader never parses containers or decodes HEVC itself. It hands a
//! [`HeifReader`] to a [`HeifBackend`] and copies whatever interleaved RGB
//! plane comes back. Each backend module is a thin adapter between this
//! interface and a decoder crate.

use crate::bridge::HeifReader;
use crate::error::BackendError;
use crate::format::{FileType, check_file_type};
use crate::Limits;

#[cfg(feature = "libheif")]
pub mod libheif;

#[cfg(feature = "dynamic")]
pub(crate) mod dynamic;

/// Read-only view of a decoded interleaved plane.
#[derive(Clone, Copy, Debug)]
pub struct Plane<'a> {
    /// Row-major pixel bytes, `stride` bytes per row.
    pub data: &'a [u8],
    /// Bytes per row in `data`.
    pub stride: usize,
}

/// A decoded image owned by the backend.
///
/// Dropping the box releases the backend's resources.
pub trait DecodedImage {
    /// Width of the interleaved channel, or None if the backend reports an
    /// invalid value.
    fn width(&self) -> Option<u32>;

    /// Height of the interleaved channel, or None if invalid.
    fn height(&self) -> Option<u32>;

    /// The interleaved RGB plane, or None if it cannot be read.
    fn interleaved_plane(&self) -> Option<Plane<'_>>;
}

/// External decoder capability.
///
/// `setup` and `teardown` are driven by the
/// [`LibraryGuard`](crate::LibraryGuard) on its 0→1 and 1→0 transitions;
/// `decode` is only called in between.
pub trait HeifBackend {
    /// Short name for log output.
    fn name(&self) -> &str;

    /// One-time global setup.
    fn setup(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Undo [`setup`](Self::setup).
    fn teardown(&mut self) {}

    /// Classify the first [`MAGIC_LEN`](crate::MAGIC_LEN) bytes of a stream.
    fn check_file_type(&self, magic: &[u8]) -> FileType {
        check_file_type(magic)
    }

    /// Parse a container from `reader` and decode its primary image to
    /// 8-bit interleaved RGB.
    ///
    /// Runs the context → primary handle → decode sequence, reporting the
    /// failing step in [`BackendError::stage`].
    fn decode(
        &self,
        reader: &mut dyn HeifReader,
        limits: &Limits,
    ) -> Result<Box<dyn DecodedImage>, BackendError>;
}

impl<B: HeifBackend + ?Sized> HeifBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn setup(&mut self) -> Result<(), String> {
        (**self).setup()
    }

    fn teardown(&mut self) {
        (**self).teardown()
    }

    fn check_file_type(&self, magic: &[u8]) -> FileType {
        (**self).check_file_type(magic)
    }

    fn decode(
        &self,
        reader: &mut dyn HeifReader,
        limits: &Limits,
    ) -> Result<Box<dyn DecodedImage>, BackendError> {
        (**self).decode(reader, limits)
    }
}
