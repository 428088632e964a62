//! HEIF decode adapter using libheif-rs.

use libheif_rs::{ColorSpace, FileTypeResult, HeifContext, Image, LibHeif, RgbChroma};

use crate::Limits;
use crate::bridge::HeifReader;
use crate::codecs::{DecodedImage, HeifBackend, Plane};
use crate::error::{BackendError, DecodeStage};
use crate::format::FileType;

/// Backend over the system libheif, linked at build time.
///
/// `setup` creates the library instance and `teardown` drops it.
#[derive(Default)]
pub struct LibheifBackend {
    lib: Option<LibHeif>,
}

impl LibheifBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HeifBackend for LibheifBackend {
    fn name(&self) -> &str {
        "libheif"
    }

    fn setup(&mut self) -> Result<(), String> {
        self.lib = Some(LibHeif::new());
        Ok(())
    }

    fn teardown(&mut self) {
        self.lib = None;
    }

    fn check_file_type(&self, magic: &[u8]) -> FileType {
        match libheif_rs::check_file_type(magic) {
            FileTypeResult::No => FileType::No,
            FileTypeResult::Supported => FileType::Supported,
            FileTypeResult::Unsupported => FileType::Unsupported,
            FileTypeResult::MayBe => FileType::Maybe,
        }
    }

    fn decode(
        &self,
        reader: &mut dyn HeifReader,
        limits: &Limits,
    ) -> Result<Box<dyn DecodedImage>, BackendError> {
        let lib = self
            .lib
            .as_ref()
            .ok_or_else(|| BackendError::new(DecodeStage::Setup, "libheif not initialized"))?;

        // libheif-rs only takes 'static readers, so the borrowed stream is
        // pulled through the bridge and parsed from memory.
        let data = reader
            .read_to_end_max(limits.max_input_bytes)
            .map_err(|e| BackendError::from_bridge(DecodeStage::ReadContainer, e))?;

        let ctx = HeifContext::read_from_bytes(&data)
            .map_err(|e| BackendError::from_library(DecodeStage::ReadContainer, e))?;

        let handle = ctx
            .primary_image_handle()
            .map_err(|e| BackendError::from_library(DecodeStage::PrimaryHandle, e))?;

        limits
            .check_dimensions(handle.width(), handle.height())
            .map_err(|msg| BackendError::new(DecodeStage::LimitCheck, msg))?;

        let image = lib
            .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
            .map_err(|e| BackendError::from_library(DecodeStage::Decode, e))?;

        Ok(Box::new(LibheifImage(image)))
    }
}

struct LibheifImage(Image);

impl DecodedImage for LibheifImage {
    fn width(&self) -> Option<u32> {
        self.0.planes().interleaved.map(|p| p.width)
    }

    fn height(&self) -> Option<u32> {
        self.0.planes().interleaved.map(|p| p.height)
    }

    fn interleaved_plane(&self) -> Option<Plane<'_>> {
        self.0.planes().interleaved.map(|p| Plane {
            data: p.data,
            stride: p.stride,
        })
    }
}
