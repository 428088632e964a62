#![no_main]

//! Drives the reader bridge and surface copy with arbitrary backend output.

use std::io::Cursor;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use zenheic::{
    BackendError, BridgeMode, DecodeStage, DecodedImage, HeifBackend, HeifReader, Limits,
    LoaderConfig, Plane,
};

#[derive(Arbitrary, Debug)]
struct Input {
    strict: bool,
    pitch_alignment: u8,
    width: u8,
    height: u8,
    stride: u16,
    ops: Vec<Op>,
    data: Vec<u8>,
}

#[derive(Arbitrary, Debug)]
enum Op {
    Read(u16),
    Seek(i64),
    SizeCheck(i64),
    Drain,
}

struct Scripted<'a>(&'a Input);

struct Raw {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl DecodedImage for Raw {
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

impl HeifBackend for Scripted<'_> {
    fn name(&self) -> &str {
        "scripted"
    }

    fn decode(
        &self,
        reader: &mut dyn HeifReader,
        _limits: &Limits,
    ) -> Result<Box<dyn DecodedImage>, BackendError> {
        let mut plane = Vec::new();
        for op in self.0.ops.iter().take(64) {
            match *op {
                Op::Read(n) => {
                    let mut buf = vec![0u8; n as usize];
                    if reader.read(&mut buf).is_ok() {
                        plane.extend_from_slice(&buf);
                    }
                }
                Op::Seek(pos) => {
                    let _ = reader.seek(pos);
                }
                Op::SizeCheck(size) => {
                    let _ = reader.wait_for_file_size(size);
                }
                Op::Drain => {
                    let rest = reader
                        .read_to_end()
                        .map_err(|e| BackendError::from_bridge(DecodeStage::ReadContainer, e))?;
                    plane.extend_from_slice(&rest);
                }
            }
        }
        Ok(Box::new(Raw {
            width: u32::from(self.0.width),
            height: u32::from(self.0.height),
            stride: usize::from(self.0.stride),
            data: plane,
        }))
    }
}

fuzz_target!(|input: Input| {
    let mode = if input.strict {
        BridgeMode::Strict
    } else {
        BridgeMode::Compatible
    };
    let config = LoaderConfig::default()
        .with_bridge_mode(mode)
        .with_pitch_alignment(usize::from(input.pitch_alignment));

    let mut src = Cursor::new(input.data.as_slice());
    let backend = Scripted(&input);
    if let Ok(surface) = zenheic::decode_to_surface(&mut src, &backend, &config) {
        assert!(surface.pitch() >= surface.row_bytes());
        assert_eq!(surface.pixels().len(), surface.pitch() * surface.height() as usize);
    } else {
        assert_eq!(src.position(), 0);
    }
});
