//! Stream decoding to an RGB surface.

use std::io::{Read, Seek, SeekFrom};

use crate::bridge::{BridgeMode, StreamBridge};
use crate::codecs::{DecodedImage, HeifBackend};
use crate::{LibraryGuard, Limits, LoadError, LoaderConfig, Surface};

/// Image decode request builder.
///
/// # Example
///
/// ```no_run
/// # #[cfg(feature = "libheif")] {
/// use zenheic::{DecodeRequest, LibraryGuard, LibheifBackend};
///
/// let mut guard = LibraryGuard::new(LibheifBackend::new());
/// let mut file = std::fs::File::open("photo.heic")?;
/// let surface = DecodeRequest::new(&mut file).decode(&mut guard)?;
/// println!("{}x{}", surface.width(), surface.height());
/// # }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct DecodeRequest<'a, S: ?Sized> {
    src: &'a mut S,
    config: LoaderConfig,
}

impl<'a, S: Read + Seek + ?Sized> DecodeRequest<'a, S> {
    /// Create a new decode request reading from the current stream position.
    pub fn new(src: &'a mut S) -> Self {
        Self {
            src,
            config: LoaderConfig::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Set resource limits.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Set read/seek reporting of the reader bridge.
    pub fn with_bridge_mode(mut self, mode: BridgeMode) -> Self {
        self.config.bridge_mode = mode;
        self
    }

    /// Pad output rows to a multiple of `alignment` bytes.
    pub fn with_pitch_alignment(mut self, alignment: usize) -> Self {
        self.config.pitch_alignment = alignment;
        self
    }

    /// Initialize the library if needed, then decode.
    pub fn decode<B: HeifBackend>(self, guard: &mut LibraryGuard<B>) -> Result<Surface, LoadError> {
        guard.ensure_initialized()?;
        decode_to_surface(self.src, guard.backend(), &self.config)
    }
}

/// Decode the primary image of the container at the current stream position.
///
/// The backend must already be set up. On failure the stream is rewound to
/// where it was on entry; on success it is left wherever decoding stopped.
pub fn decode_to_surface<S, B>(
    src: &mut S,
    backend: &B,
    config: &LoaderConfig,
) -> Result<Surface, LoadError>
where
    S: Read + Seek + ?Sized,
    B: HeifBackend + ?Sized,
{
    let start = src.stream_position()?;

    let result = decode_inner(src, backend, config);
    if let Err(e) = &result {
        log::debug!("{}: decode failed at offset {start}: {e}", backend.name());
        if let Err(seek_err) = src.seek(SeekFrom::Start(start)) {
            log::warn!("failed to rewind stream to {start}: {seek_err}");
        }
    }
    result
}

fn decode_inner<S, B>(src: &mut S, backend: &B, config: &LoaderConfig) -> Result<Surface, LoadError>
where
    S: Read + Seek + ?Sized,
    B: HeifBackend + ?Sized,
{
    let image = {
        let mut bridge = StreamBridge::new(&mut *src, config.bridge_mode);
        backend.decode(&mut bridge, &config.limits)?
    };
    log::trace!("{}: primary image decoded", backend.name());

    // `image` is released when it goes out of scope, on every path below.
    copy_to_surface(image.as_ref(), config)
}

/// Allocate a surface for a decoded image and copy its plane in.
pub fn copy_to_surface(
    image: &dyn DecodedImage,
    config: &LoaderConfig,
) -> Result<Surface, LoadError> {
    let (width, height) = match (image.width(), image.height()) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        (width, height) => return Err(LoadError::InvalidDimension { width, height }),
    };
    config.limits.check_surface(width, height, config.pitch_alignment)?;

    let mut surface = Surface::new(width, height, config.pitch_alignment)?;
    log::trace!("surface allocated: {width}x{height}, pitch {}", surface.pitch());

    let plane = image
        .interleaved_plane()
        .ok_or(LoadError::PlaneAccess("no interleaved plane"))?;
    surface.copy_from_plane(plane.data, plane.stride)?;

    Ok(surface)
}
