//! Output raster surface.
//!
//! A [`Surface`] is a 24-bit RGB buffer whose rows may be padded past
//! `width * 3` bytes. Channel masks follow the target's byte order so that
//! the bytes in memory are always R, G, B.

use crate::LoadError;
use crate::pixel::{ImgVec, Rgb};

/// Bytes per pixel of every surface this crate produces.
pub const BYTES_PER_PIXEL: usize = 3;

/// Default row alignment in bytes.
pub const DEFAULT_PITCH_ALIGNMENT: usize = 4;

/// Pixel format descriptor: depth and channel masks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelFormat {
    pub bits_per_pixel: u8,
    pub bytes_per_pixel: u8,
    pub r_mask: u32,
    pub g_mask: u32,
    pub b_mask: u32,
    pub a_mask: u32,
}

impl PixelFormat {
    /// 24-bit RGB with masks for the target's byte order.
    pub const fn rgb24() -> Self {
        #[cfg(target_endian = "little")]
        let (r_mask, b_mask) = (0x0000FF, 0xFF0000);
        #[cfg(target_endian = "big")]
        let (r_mask, b_mask) = (0xFF0000, 0x0000FF);

        Self {
            bits_per_pixel: 24,
            bytes_per_pixel: BYTES_PER_PIXEL as u8,
            r_mask,
            g_mask: 0x00FF00,
            b_mask,
            a_mask: 0,
        }
    }
}

/// Decoded 24-bit RGB image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    pitch: usize,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl Surface {
    /// Allocate a zeroed surface.
    ///
    /// `alignment` rounds the pitch up to a multiple of itself; 0 and 1 both
    /// mean tightly packed rows. Allocation is fallible and reports
    /// [`LoadError::OutOfMemory`] instead of aborting.
    pub fn new(width: u32, height: u32, alignment: usize) -> Result<Self, LoadError> {
        if width == 0 || height == 0 {
            return Err(LoadError::InvalidDimension {
                width: Some(width),
                height: Some(height),
            });
        }

        let pitch = pitch_for(width, alignment).ok_or(LoadError::OutOfMemory)?;
        let len = pitch
            .checked_mul(height as usize)
            .ok_or(LoadError::OutOfMemory)?;

        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| LoadError::OutOfMemory)?;
        pixels.resize(len, 0);

        Ok(Self {
            width,
            height,
            pitch,
            format: PixelFormat::rgb24(),
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row, including padding.
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// The whole buffer, `pitch * height` bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// One row including padding. Panics if `y >= height`.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.pitch;
        &self.pixels[start..start + self.pitch]
    }

    /// Meaningful bytes of one row (`width * 3`). Panics if `y >= height`.
    pub fn row_pixels(&self, y: u32) -> &[u8] {
        &self.row(y)[..self.row_bytes()]
    }

    /// `width * 3`.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Copy rows from a plane with its own stride.
    ///
    /// Each destination row receives `min(stride, pitch)` bytes. The plane
    /// must cover `height` rows and each of its rows must hold at least
    /// `width * 3` bytes.
    pub fn copy_from_plane(&mut self, data: &[u8], stride: usize) -> Result<(), LoadError> {
        if stride < self.row_bytes() {
            return Err(LoadError::PlaneAccess("stride shorter than a row"));
        }
        let copy = stride.min(self.pitch);
        let needed = (self.height as usize - 1)
            .checked_mul(stride)
            .and_then(|n| n.checked_add(copy))
            .ok_or(LoadError::PlaneAccess("plane size overflow"))?;
        if data.len() < needed {
            return Err(LoadError::PlaneAccess("plane shorter than image"));
        }

        for (dst, src) in self
            .pixels
            .chunks_exact_mut(self.pitch)
            .zip(data.chunks(stride))
        {
            dst[..copy].copy_from_slice(&src[..copy]);
        }
        Ok(())
    }

    /// Packed copy without row padding.
    pub fn to_imgvec(&self) -> ImgVec<Rgb<u8>> {
        let mut buf = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            let row: &[Rgb<u8>] = bytemuck::cast_slice(self.row_pixels(y));
            buf.extend_from_slice(row);
        }
        ImgVec::new(buf, self.width as usize, self.height as usize)
    }
}

/// Row pitch for a width, rounded up to `alignment`.
pub fn pitch_for(width: u32, alignment: usize) -> Option<usize> {
    let row = (width as usize).checked_mul(BYTES_PER_PIXEL)?;
    let align = alignment.max(1);
    row.checked_next_multiple_of(align)
}
