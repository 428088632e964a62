//! Resource limits for decode operations.

use crate::LoadError;
use crate::surface::pitch_for;

/// Caps on what a single decode may produce.
///
/// Backends check input size and dimensions against these before decoding;
/// the pipeline checks the padded surface size before allocating. Unset
/// fields are unlimited.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Limits {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// Cap on `width * height`.
    pub max_pixels: Option<u64>,
    /// Cap on the output surface allocation, row padding included.
    pub max_surface_bytes: Option<u64>,
    /// Cap on container bytes a backend buffers from the stream.
    pub max_input_bytes: Option<u64>,
}

impl Limits {
    /// No restrictions.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_max_width(mut self, max: u32) -> Self {
        self.max_width = Some(max);
        self
    }

    pub fn with_max_height(mut self, max: u32) -> Self {
        self.max_height = Some(max);
        self
    }

    pub fn with_max_pixels(mut self, max: u64) -> Self {
        self.max_pixels = Some(max);
        self
    }

    pub fn with_max_surface_bytes(mut self, max: u64) -> Self {
        self.max_surface_bytes = Some(max);
        self
    }

    pub fn with_max_input_bytes(mut self, max: u64) -> Self {
        self.max_input_bytes = Some(max);
        self
    }

    /// Check image dimensions. The error names the limit that was hit.
    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<(), String> {
        let pixels = u64::from(width) * u64::from(height);
        match (self.max_width, self.max_height, self.max_pixels) {
            (Some(max), _, _) if width > max => Err(format!("width {width} exceeds limit {max}")),
            (_, Some(max), _) if height > max => {
                Err(format!("height {height} exceeds limit {max}"))
            }
            (_, _, Some(max)) if pixels > max => {
                Err(format!("{width}x{height} pixels exceeds limit {max}"))
            }
            _ => Ok(()),
        }
    }

    /// Check a `width` by `height` surface whose rows are padded to
    /// `alignment` bytes.
    pub fn check_surface(&self, width: u32, height: u32, alignment: usize) -> Result<(), LoadError> {
        self.check_dimensions(width, height)
            .map_err(LoadError::LimitExceeded)?;

        let Some(max) = self.max_surface_bytes else {
            return Ok(());
        };
        let bytes = pitch_for(width, alignment)
            .and_then(|pitch| u64::try_from(pitch).ok())
            .map_or(u64::MAX, |pitch| pitch.saturating_mul(u64::from(height)));
        if bytes > max {
            return Err(LoadError::LimitExceeded(format!(
                "surface of {bytes} bytes exceeds limit {max}"
            )));
        }
        Ok(())
    }
}
