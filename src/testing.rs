//! Fake backend for unit tests.
//!
//! Reads the container through the bridge, takes dimensions from `ispe`, and
//! fills the plane with a position-derived pattern.

use std::cell::Cell;
use std::io::{Read, Seek, SeekFrom};
use std::rc::Rc;

use crate::Limits;
use crate::bridge::HeifReader;
use crate::codecs::{DecodedImage, HeifBackend, Plane};
use crate::error::{BackendError, DecodeStage};

/// Step at which the fake backend fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Failure {
    Setup,
    AllocContext,
    Decode,
    Dimension,
    Plane,
}

#[derive(Default)]
struct Counters {
    setups: Cell<usize>,
    teardowns: Cell<usize>,
    releases: Cell<usize>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeBackend {
    counters: Rc<Counters>,
    failure: Option<Failure>,
    stride_padding: usize,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub(crate) fn with_stride_padding(mut self, padding: usize) -> Self {
        self.stride_padding = padding;
        self
    }

    pub(crate) fn setups(&self) -> usize {
        self.counters.setups.get()
    }

    pub(crate) fn teardowns(&self) -> usize {
        self.counters.teardowns.get()
    }

    pub(crate) fn releases(&self) -> usize {
        self.counters.releases.get()
    }

    pub(crate) fn expected_row(width: u32, y: u32) -> Vec<u8> {
        (0..width)
            .flat_map(|x| [x as u8, y as u8, (x ^ y) as u8 | 0x80])
            .collect()
    }
}

impl HeifBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn setup(&mut self) -> Result<(), String> {
        if self.failure == Some(Failure::Setup) {
            return Err("module not found".into());
        }
        self.counters.setups.set(self.setups() + 1);
        Ok(())
    }

    fn teardown(&mut self) {
        self.counters.teardowns.set(self.teardowns() + 1);
    }

    fn decode(
        &self,
        reader: &mut dyn HeifReader,
        limits: &Limits,
    ) -> Result<Box<dyn DecodedImage>, BackendError> {
        if self.failure == Some(Failure::AllocContext) {
            return Err(BackendError::new(DecodeStage::AllocContext, "alloc"));
        }

        let data = reader
            .read_to_end_max(limits.max_input_bytes)
            .map_err(|e| BackendError::from_bridge(DecodeStage::ReadContainer, e))?;
        let probe = crate::probe::probe(&data).map_err(|_| {
            BackendError::new(DecodeStage::ReadContainer, "Invalid input: No 'ftyp' box")
        })?;
        let (Some(width), Some(height)) = (probe.width, probe.height) else {
            return Err(BackendError::new(
                DecodeStage::PrimaryHandle,
                "Invalid input: No 'pitm' box",
            ));
        };
        if self.failure == Some(Failure::Decode) {
            return Err(BackendError::new(DecodeStage::Decode, "Decoder plugin error"));
        }

        let stride = width as usize * 3 + self.stride_padding;
        let mut pixels = vec![0xEEu8; stride * height as usize];
        for y in 0..height {
            let row = Self::expected_row(width, y);
            let start = y as usize * stride;
            pixels[start..start + row.len()].copy_from_slice(&row);
        }

        Ok(Box::new(FakeImage {
            width,
            height,
            stride,
            pixels,
            failure: self.failure,
            counters: Rc::clone(&self.counters),
        }))
    }
}

struct FakeImage {
    width: u32,
    height: u32,
    stride: usize,
    pixels: Vec<u8>,
    failure: Option<Failure>,
    counters: Rc<Counters>,
}

impl DecodedImage for FakeImage {
    fn width(&self) -> Option<u32> {
        (self.failure != Some(Failure::Dimension)).then_some(self.width)
    }

    fn height(&self) -> Option<u32> {
        Some(self.height)
    }

    fn interleaved_plane(&self) -> Option<Plane<'_>> {
        (self.failure != Some(Failure::Plane)).then_some(Plane {
            data: &self.pixels,
            stride: self.stride,
        })
    }
}

impl Drop for FakeImage {
    fn drop(&mut self) {
        self.counters.releases.set(self.counters.releases.get() + 1);
    }
}

/// Source whose end lies far past anything allocatable. Reads yield zeros.
pub(crate) struct Sparse {
    pos: u64,
    len: u64,
}

impl Sparse {
    pub(crate) fn new(len: u64) -> Self {
        Self { pos: 0, len }
    }
}

impl Read for Sparse {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = (buf.len() as u64).min(self.len.saturating_sub(self.pos)) as usize;
        buf[..n].fill(0);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for Sparse {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.pos = match pos {
            SeekFrom::Start(p) => p,
            SeekFrom::End(d) => self.len.saturating_add_signed(d),
            SeekFrom::Current(d) => self.pos.saturating_add_signed(d),
        };
        Ok(self.pos)
    }
}
