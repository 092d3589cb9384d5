//! Parsing and replaying command streams.

use crate::{
    command::{Command, CommandContext},
    consts::FORMAT_VERSION,
    image::CellImage,
    StreamHeader,
};
use snafu::{ensure, Snafu};

mod ops;

use ops::{read_command, Reader};

const HEADER_LEN: usize = 3;

#[derive(Debug, Snafu)]
#[snafu(module)]
pub enum DecodeError {
    #[snafu(display("Unexpected end of stream"))]
    UnexpectedEof,
    #[snafu(display("Unsupported stream version {version}"))]
    UnsupportedVersion { version: u8 },
    #[snafu(display("Unknown opcode {opcode:#04x} at offset {offset}"))]
    UnknownOpcode { opcode: u8, offset: usize },
    #[snafu(display("Two-color run at offset {offset} uses the same color twice"))]
    InvalidColorPair { offset: usize },
}

/// Reads the three header bytes.
pub fn read_header(data: &[u8]) -> Result<StreamHeader, DecodeError> {
    ensure!(data.len() >= HEADER_LEN, decode_error::UnexpectedEofSnafu);

    let [version, width, height] = [data[0], data[1], data[2]];
    ensure!(
        version == FORMAT_VERSION,
        decode_error::UnsupportedVersionSnafu { version }
    );

    Ok(StreamHeader {
        version,
        width,
        height,
    })
}

/// Iterates the frames of a stream, yielding each frame's commands including its end marker.
///
/// A frame cut off before its end marker is an error. Iteration stops after the first error.
pub struct FrameReader<'a> {
    header: StreamHeader,
    reader: Reader<'a>,
    failed: bool,
}

impl<'a> FrameReader<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, DecodeError> {
        let header = read_header(data)?;
        Ok(Self {
            header,
            reader: Reader::new(data, HEADER_LEN),
            failed: false,
        })
    }

    pub fn header(&self) -> StreamHeader {
        self.header
    }

    fn read_frame(&mut self) -> Result<Vec<Command>, DecodeError> {
        let mut frame = Vec::new();
        loop {
            let cmd = read_command(&mut self.reader)?;
            let end = cmd == Command::EndFrame;
            frame.push(cmd);
            if end {
                return Ok(frame);
            }
        }
    }
}

impl Iterator for FrameReader<'_> {
    type Item = Result<Vec<Command>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.is_empty() {
            return None;
        }

        let frame = self.read_frame();
        self.failed = frame.is_err();
        Some(frame)
    }
}

/// The decoder's registers, kept across frames.
#[derive(Debug, Clone, Default)]
pub struct DecodeContext {
    registers: CommandContext,
}

impl DecodeContext {
    pub const fn new() -> Self {
        Self {
            registers: CommandContext::new(),
        }
    }

    pub fn registers(&self) -> &CommandContext {
        &self.registers
    }

    /// Draws a frame's commands onto `canvas`.
    pub fn replay(&mut self, frame: &[Command], canvas: &mut CellImage) {
        for cmd in frame {
            cmd.apply(&mut self.registers, canvas);
        }
    }
}

/// Decodes a whole stream, returning the canvas after every frame.
///
/// Decoding starts from a canvas of default cells.
pub fn decode_to_canvases(data: &[u8]) -> Result<(StreamHeader, Vec<CellImage>), DecodeError> {
    let frames = FrameReader::new(data)?;
    let header = frames.header();

    let mut ctx = DecodeContext::new();
    let mut canvas = CellImage::new(header.width.into(), header.height.into());
    let mut canvases = Vec::new();

    for frame in frames {
        ctx.replay(&frame?, &mut canvas);
        canvases.push(canvas.clone());
    }

    Ok((header, canvases))
}
