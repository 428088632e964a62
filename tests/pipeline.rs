//! End-to-end loading through the public API with a box-walking backend.

use std::cell::Cell;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::rc::Rc;

use proptest::prelude::*;
use zenheic::{
    BackendError, BridgeMode, DecodeStage, DecodedImage, GrowStatus, HeicLoader, HeifBackend,
    HeifReader, Limits, LoadError, LoaderConfig, Plane, copy_to_surface,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn boxed(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = ((8 + payload.len()) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out
}

/// `ftyp` followed by a `dims` box (width, height) and a `pixl` box holding
/// one RGB triple that fills the image.
fn container(brand: &[u8; 4], width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let mut ftyp = brand.to_vec();
    ftyp.extend_from_slice(&[0, 0, 0, 0]);
    ftyp.extend_from_slice(b"mif1");
    let mut dims = width.to_be_bytes().to_vec();
    dims.extend_from_slice(&height.to_be_bytes());

    let mut data = boxed(b"ftyp", &ftyp);
    data.extend_from_slice(&boxed(b"dims", &dims));
    data.extend_from_slice(&boxed(b"pixl", &rgb));
    data
}

/// Walks top-level boxes with position/size-check/read/seek like a
/// streaming container parser.
#[derive(Default)]
struct WalkingBackend {
    /// Re-read the `ftyp` box from offset 0 before walking.
    rewind_first: bool,
    stride_padding: usize,
    releases: Rc<Cell<usize>>,
}

impl WalkingBackend {
    fn read_box(
        reader: &mut dyn HeifReader,
    ) -> Result<Option<([u8; 4], Vec<u8>)>, BackendError> {
        let pos = reader.position();
        if reader.wait_for_file_size(pos + 8) == GrowStatus::SizeBeyondEof {
            return Ok(None);
        }
        let mut header = [0u8; 8];
        reader
            .read(&mut header)
            .map_err(|e| BackendError::from_library(DecodeStage::ReadContainer, e))?;
        let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as i64;
        let kind = [header[4], header[5], header[6], header[7]];
        if size < 8 || reader.wait_for_file_size(pos + size) == GrowStatus::SizeBeyondEof {
            return Err(BackendError::new(
                DecodeStage::ReadContainer,
                "Invalid input: box size exceeds file",
            ));
        }
        let mut payload = vec![0u8; (size - 8) as usize];
        if !payload.is_empty() {
            reader
                .read(&mut payload)
                .map_err(|e| BackendError::from_library(DecodeStage::ReadContainer, e))?;
        }
        Ok(Some((kind, payload)))
    }
}

impl HeifBackend for WalkingBackend {
    fn name(&self) -> &str {
        "walking"
    }

    fn decode(
        &self,
        reader: &mut dyn HeifReader,
        limits: &Limits,
    ) -> Result<Box<dyn DecodedImage>, BackendError> {
        let start = reader.position();
        if self.rewind_first {
            reader
                .seek(start)
                .map_err(|e| BackendError::from_library(DecodeStage::ReadContainer, e))?;
        }

        let mut dims = None;
        let mut rgb = None;
        let mut first = true;
        while let Some((kind, payload)) = Self::read_box(reader)? {
            if first && &kind != b"ftyp" {
                return Err(BackendError::new(
                    DecodeStage::ReadContainer,
                    "Invalid input: No 'ftyp' box",
                ));
            }
            first = false;
            match &kind {
                b"dims" if payload.len() == 8 => {
                    let w = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
                    let h = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
                    dims = Some((w, h));
                }
                b"pixl" if payload.len() == 3 => rgb = Some([payload[0], payload[1], payload[2]]),
                _ => {}
            }
        }
        if first {
            return Err(BackendError::new(DecodeStage::ReadContainer, "Invalid input: empty file"));
        }

        let (width, height) = dims.ok_or_else(|| {
            BackendError::new(DecodeStage::PrimaryHandle, "Invalid input: No 'pitm' box")
        })?;
        limits
            .check_dimensions(width, height)
            .map_err(|msg| BackendError::new(DecodeStage::LimitCheck, msg))?;
        let rgb = rgb.ok_or_else(|| {
            BackendError::new(DecodeStage::Decode, "Invalid input: missing image data")
        })?;

        let stride = width as usize * 3 + self.stride_padding;
        let mut data = vec![0u8; stride * height as usize];
        for row in data.chunks_mut(stride) {
            for px in row[..width as usize * 3].chunks_mut(3) {
                px.copy_from_slice(&rgb);
            }
        }
        Ok(Box::new(SolidImage {
            width,
            height,
            stride,
            data,
            releases: Rc::clone(&self.releases),
        }))
    }
}

struct SolidImage {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
    releases: Rc<Cell<usize>>,
}

impl DecodedImage for SolidImage {
    fn width(&self) -> Option<u32> {
        Some(self.width)
    }

    fn height(&self) -> Option<u32> {
        Some(self.height)
    }

    fn interleaved_plane(&self) -> Option<Plane<'_>> {
        Some(Plane {
            data: &self.data,
            stride: self.stride,
        })
    }
}

impl Drop for SolidImage {
    fn drop(&mut self) {
        self.releases.set(self.releases.get() + 1);
    }
}

#[test]
fn sniff_then_load() {
    init_logging();
    let mut loader = HeicLoader::new(WalkingBackend::default());
    let mut src = Cursor::new(container(b"heic", 5, 3, [10, 20, 30]));

    assert!(loader.is_format(&mut src));
    assert_eq!(src.position(), 0);

    let surface = loader.load_from_stream(&mut src).unwrap();
    assert_eq!((surface.width(), surface.height()), (5, 3));
    assert_eq!(surface.format().bits_per_pixel, 24);
    for y in 0..3 {
        assert_eq!(surface.row_pixels(y), [10, 20, 30].repeat(5).as_slice());
    }
    // Success leaves the stream where decoding stopped.
    assert_eq!(src.position(), src.get_ref().len() as u64);
}

#[test]
fn truncated_container_fails_and_rewinds() {
    init_logging();
    let mut data = container(b"heic", 5, 3, [1, 2, 3]);
    data.truncate(data.len() - 2);
    let mut src = Cursor::new(data);
    src.seek(SeekFrom::Start(0)).unwrap();

    let releases = Rc::new(Cell::new(0));
    let backend = WalkingBackend {
        releases: Rc::clone(&releases),
        ..Default::default()
    };
    let mut loader = HeicLoader::new(backend);
    let err = loader.load_from_stream(&mut src).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Codec {
            stage: DecodeStage::ReadContainer,
            ..
        }
    ));
    assert_eq!(
        loader.last_error(),
        Some("Invalid input: box size exceeds file")
    );
    assert_eq!(src.position(), 0);
    assert_eq!(releases.get(), 0);
}

#[test]
fn non_heif_stream_is_not_claimed() {
    let loader = HeicLoader::new(WalkingBackend::default());
    let mut png = Cursor::new(b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR\x00\x00".to_vec());
    png.set_position(0);
    assert!(!loader.is_format(&mut png));
    assert_eq!(png.position(), 0);
}

#[test]
fn load_at_nonzero_offset_rewinds_to_it() {
    let mut data = b"prefix".to_vec();
    data.extend_from_slice(b"\x00\x00\x00\x0cftypisom");
    let mut src = Cursor::new(data);
    src.set_position(6);

    let mut loader = HeicLoader::new(WalkingBackend::default());
    assert!(!loader.is_format(&mut src));
    assert!(loader.load_from_stream(&mut src).is_err());
    assert_eq!(src.position(), 6);
}

#[test]
fn compatible_bridge_fails_seek_to_start() {
    init_logging();
    let backend = WalkingBackend {
        rewind_first: true,
        ..Default::default()
    };
    let mut loader = HeicLoader::new(backend);
    let err = loader
        .load_from_stream(&mut Cursor::new(container(b"heic", 2, 2, [0, 0, 0])))
        .unwrap_err();
    assert_eq!(err.to_string(), "seek to offset 0 failed");
}

#[test]
fn strict_bridge_allows_seek_to_start() {
    let backend = WalkingBackend {
        rewind_first: true,
        ..Default::default()
    };
    let config = LoaderConfig::default().with_bridge_mode(BridgeMode::Strict);
    let mut loader = HeicLoader::with_config(backend, config);
    let surface = loader
        .load_from_stream(&mut Cursor::new(container(b"heic", 2, 2, [9, 9, 9])))
        .unwrap();
    assert_eq!(surface.row_pixels(1), &[9, 9, 9, 9, 9, 9]);
}

#[test]
fn compatible_bridge_seek_elsewhere_is_fine() {
    let backend = WalkingBackend {
        rewind_first: true,
        ..Default::default()
    };
    let mut data = vec![0u8; 4];
    data.extend_from_slice(&container(b"heic", 1, 1, [4, 5, 6]));
    let mut src = Cursor::new(data);
    src.set_position(4);
    let mut loader = HeicLoader::new(backend);
    let surface = loader.load_from_stream(&mut src).unwrap();
    assert_eq!(surface.row_pixels(0), &[4, 5, 6]);
}

#[test]
fn decoded_image_released_exactly_once() {
    let releases = Rc::new(Cell::new(0));
    let backend = WalkingBackend {
        releases: Rc::clone(&releases),
        stride_padding: 13,
        ..Default::default()
    };
    let config =
        LoaderConfig::default().with_limits(Limits::none().with_max_surface_bytes(1_000));
    let mut loader = HeicLoader::with_config(backend, config);

    loader
        .load_from_stream(&mut Cursor::new(container(b"heic", 4, 4, [1, 1, 1])))
        .unwrap();
    assert_eq!(releases.get(), 1);

    // 100x100 RGB exceeds the memory limit after decode
    let err = loader
        .load_from_stream(&mut Cursor::new(container(b"heic", 100, 100, [1, 1, 1])))
        .unwrap_err();
    assert!(matches!(err, LoadError::LimitExceeded(_)));
    assert_eq!(releases.get(), 2);
}

/// Plane backed by arbitrary bytes.
struct RawImage {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl DecodedImage for RawImage {
    fn width(&self) -> Option<u32> {
        Some(self.width)
    }

    fn height(&self) -> Option<u32> {
        Some(self.height)
    }

    fn interleaved_plane(&self) -> Option<Plane<'_>> {
        Some(Plane {
            data: &self.data,
            stride: self.stride,
        })
    }
}

proptest! {
    #[test]
    fn rows_copied_byte_for_byte(
        width in 1u32..22,
        height in 1u32..24,
        padding in 0usize..8,
        seed in any::<u8>(),
    ) {
        let stride = width as usize * 3 + padding;
        let data: Vec<u8> = (0..stride * height as usize)
            .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
            .collect();
        let image = RawImage { width, height, stride, data: data.clone() };

        // Pitch is at least 72, past every generated stride.
        let config = LoaderConfig::default().with_pitch_alignment(72);
        let surface = copy_to_surface(&image, &config).unwrap();
        prop_assert!(surface.pitch() >= stride);

        for y in 0..height {
            let src_row = &data[y as usize * stride..][..stride];
            prop_assert_eq!(&surface.row(y)[..stride], src_row);
        }
    }

    #[test]
    fn sniff_leaves_position_unchanged(
        data in proptest::collection::vec(any::<u8>(), 0..48),
        start in 0u64..48,
    ) {
        let loader = HeicLoader::new(WalkingBackend::default());
        let mut src = Cursor::new(data);
        src.set_position(start);
        let _ = loader.is_format(&mut src);
        prop_assert_eq!(src.position(), start);
    }
}

#[test]
fn read_trait_objects_work_as_sources() {
    let mut loader = HeicLoader::new(WalkingBackend::default());
    let mut cursor = Cursor::new(container(b"mif1", 2, 1, [7, 8, 9]));
    let src: &mut dyn ReadSeek = &mut cursor;
    assert!(loader.is_format(src));
    let surface = loader.load_from_stream(src).unwrap();
    assert_eq!(surface.row_pixels(0), &[7, 8, 9, 7, 8, 9]);
}

trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}
