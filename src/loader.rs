//! Framework-facing loader.
//!
//! [`HeicLoader`] exposes the entry points an image-loading framework
//! expects from a format plugin: `init`, `quit`, `is_format`, and
//! `load_from_stream`, plus a last-error side channel for frameworks that
//! report failures out of band.

use std::io::{Read, Seek};

use crate::codecs::HeifBackend;
use crate::config::LibraryConfig;
use crate::probe::ProbeResult;
use crate::{LibraryGuard, LoadError, LoaderConfig, Surface};

/// HEIC loader bound to one backend.
///
/// # Example
///
/// ```no_run
/// # #[cfg(feature = "libheif")] {
/// use zenheic::{HeicLoader, LibheifBackend};
///
/// let mut loader = HeicLoader::new(LibheifBackend::new());
/// let mut file = std::fs::File::open("photo.heic")?;
/// if loader.is_format(&mut file) {
///     match loader.load_from_stream(&mut file) {
///         Ok(surface) => println!("{}x{}", surface.width(), surface.height()),
///         Err(_) => eprintln!("{}", loader.last_error().unwrap_or_default()),
///     }
/// }
/// # }
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct HeicLoader<B: HeifBackend> {
    guard: LibraryGuard<B>,
    config: LoaderConfig,
    last_error: Option<String>,
}

impl<B: HeifBackend> HeicLoader<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, LoaderConfig::default())
    }

    pub fn with_config(backend: B, config: LoaderConfig) -> Self {
        Self::from_guard(LibraryGuard::new(backend), config)
    }

    /// Use a prepared guard, e.g. one built with a [`LibraryConfig`].
    pub fn from_guard(guard: LibraryGuard<B>, config: LoaderConfig) -> Self {
        Self {
            guard,
            config,
            last_error: None,
        }
    }

    /// Build a loader whose guard uses `library`.
    pub fn with_library_config(backend: B, library: LibraryConfig, config: LoaderConfig) -> Self {
        Self::from_guard(LibraryGuard::with_config(backend, library), config)
    }

    /// Add a user of the external library.
    pub fn init(&mut self) -> Result<(), LoadError> {
        self.guard.init().inspect_err(|e| self.last_error = Some(e.to_string()))
    }

    /// Remove a user of the external library.
    pub fn quit(&mut self) {
        self.guard.quit();
    }

    /// Whether the stream holds a container the backend recognizes.
    ///
    /// The stream position is unchanged afterwards.
    pub fn is_format<S: Read + Seek + ?Sized>(&self, src: &mut S) -> bool {
        let backend = self.guard.backend();
        let matched = crate::sniff::is_heic(src, |magic| backend.check_file_type(magic));
        log::trace!("{}: sniff -> {matched}", backend.name());
        matched
    }

    /// Decode the primary image at the current stream position.
    ///
    /// Initializes the library on first use. On failure the stream is rewound
    /// and the message is also kept for [`last_error`](Self::last_error).
    pub fn load_from_stream<S: Read + Seek + ?Sized>(
        &mut self,
        src: &mut S,
    ) -> Result<Surface, LoadError> {
        let result = self.guard.ensure_initialized().and_then(|()| {
            crate::decode::decode_to_surface(src, self.guard.backend(), &self.config)
        });
        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }
        result
    }

    /// Brand and dimensions from the header, without decoding.
    pub fn probe<S: Read + Seek + ?Sized>(&self, src: &mut S) -> Result<ProbeResult, LoadError> {
        crate::probe::probe_stream(src)
    }

    /// Message of the most recent failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut LoaderConfig {
        &mut self.config
    }

    pub fn guard(&self) -> &LibraryGuard<B> {
        &self.guard
    }
}
