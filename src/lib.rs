//! # zenheic
//!
//! HEIC/HEIF loading over any `Read + Seek` stream.
//!
//! The crate sniffs the container's magic bytes, bridges the stream to an
//! external decoder through a four-operation reader interface, and copies
//! the decoded interleaved RGB plane into a [`Surface`] with its own row
//! pitch. Container parsing and HEVC decoding are done by a
//! [`HeifBackend`]; enable the `libheif` feature for the libheif-backed one.
//!
//! ```toml
//! [dependencies]
//! zenheic = { version = "0.1", features = ["libheif"] }
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! # #[cfg(feature = "libheif")] {
//! use zenheic::{HeicLoader, LibheifBackend};
//!
//! let mut loader = HeicLoader::new(LibheifBackend::new());
//! loader.init()?;
//!
//! let mut file = std::fs::File::open("photo.heic")?;
//! if loader.is_format(&mut file) {
//!     let surface = loader.load_from_stream(&mut file)?;
//!     let rgb = surface.to_imgvec();
//!     println!("{}x{}", rgb.width(), rgb.height());
//! }
//!
//! loader.quit();
//! # }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]

pub mod bridge;
pub mod codecs;
mod config;
mod decode;
mod error;
mod format;
mod limits;
mod loader;
pub mod pixel;
mod probe;
mod registry;
mod sniff;
mod surface;

#[cfg(test)]
mod testing;

pub use bridge::{BridgeError, BridgeMode, GrowStatus, HeifReader, StreamBridge};
pub use codecs::{DecodedImage, HeifBackend, Plane};
pub use config::{LibraryConfig, LoaderConfig};
pub use decode::{DecodeRequest, copy_to_surface, decode_to_surface};
pub use error::{BackendError, DecodeStage, LoadError};
pub use format::{FileType, HeifBrand, MAGIC_LEN, check_file_type};
pub use limits::Limits;
pub use loader::HeicLoader;
pub use probe::{ProbeResult, RECOMMENDED_PROBE_BYTES, probe, probe_stream};
pub use registry::LibraryGuard;
pub use sniff::is_heic;
pub use surface::{BYTES_PER_PIXEL, DEFAULT_PITCH_ALIGNMENT, PixelFormat, Surface, pitch_for};

#[cfg(feature = "libheif")]
pub use codecs::libheif::LibheifBackend;
