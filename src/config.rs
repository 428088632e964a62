//! Loader and library configuration.
//!
//! [`LoaderConfig`] bundles everything that shapes a single decode: limits,
//! how the reader bridge reports outcomes, and the output row alignment.
//! [`LibraryConfig`] shapes the init guard.

use crate::Limits;
use crate::bridge::BridgeMode;
use crate::surface::DEFAULT_PITCH_ALIGNMENT;

/// Per-decode configuration.
///
/// # Example
///
/// ```
/// use zenheic::{BridgeMode, Limits, LoaderConfig};
///
/// let config = LoaderConfig::default()
///     .with_limits(Limits::none().with_max_pixels(50_000_000))
///     .with_bridge_mode(BridgeMode::Strict)
///     .with_pitch_alignment(16);
/// assert_eq!(config.pitch_alignment, 16);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct LoaderConfig {
    /// Resource limits checked once the decoded dimensions are known.
    pub limits: Limits,
    /// Read/seek reporting of the reader bridge.
    pub bridge_mode: BridgeMode,
    /// Output rows are padded to a multiple of this many bytes.
    pub pitch_alignment: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            limits: Limits::none(),
            bridge_mode: BridgeMode::Compatible,
            pitch_alignment: DEFAULT_PITCH_ALIGNMENT,
        }
    }
}

impl LoaderConfig {
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_bridge_mode(mut self, mode: BridgeMode) -> Self {
        self.bridge_mode = mode;
        self
    }

    pub fn with_pitch_alignment(mut self, alignment: usize) -> Self {
        self.pitch_alignment = alignment;
        self
    }
}

/// Init guard configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct LibraryConfig {
    /// Shared library to load on first init and unload on last quit.
    ///
    /// `None` means the library is linked in and there is nothing to load.
    #[cfg(feature = "dynamic")]
    pub dynamic_module: Option<std::path::PathBuf>,
}

impl LibraryConfig {
    /// Load the external library from `path` at init time.
    #[cfg(feature = "dynamic")]
    pub fn with_dynamic_module(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.dynamic_module = Some(path.into());
        self
    }
}
