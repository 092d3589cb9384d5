//! Budgeted command-stream encoder for cell-based text-mode displays.
//!
//! The target display is a grid of cells. Each cell shows a 2x4 block of sub-pixels using two
//! palette colors: a background and a foreground, with an 8-bit mask selecting the foreground for
//! individual sub-pixels. The display is driven by a stream of drawing commands that share a
//! pair of color registers, so most commands don't have to repeat their colors.
//!
//! Every frame after the first is built under a fixed cost budget. The encoder greedily picks the
//! drawing commands that reduce the visual error the most per unit of cost, and periodically
//! compacts the frame's command list by dropping or shrinking commands that later commands
//! overwrite.
//!
//! # Palette
//!
//! The palette is fixed: 16 grays followed by a 6x8x5 RGB cube (see
//! [`Palette::tier3`](palette::Palette::tier3)).
//!
//! # Cells
//!
//! Sub-pixel `p` (`0..8`) of a cell sits at column `p & 1` and row `p >> 1`. It is controlled by
//! mask bit `7 - p`, so the most significant bit is the top-left sub-pixel.
//!
//! # Stream format
//!
//! - u8 format version: [`FORMAT_VERSION`](consts::FORMAT_VERSION)
//! - u8 width in cells
//! - u8 height in cells
//! - commands, each frame terminated by [`OP_END_FRAME`](consts::OP_END_FRAME)
//!
//! Multi-byte values are little-endian. See [consts] for the different command types.

pub mod command;
pub mod decode;
pub mod delta;
pub mod encode;
pub mod image;
pub mod palette;
pub mod quantize;
pub mod rle;
pub mod utils;

pub use command::{Command, CommandContext, Register};
pub use decode::DecodeContext;
pub use encode::{EncodeOptions, Encoder};
pub use image::{Cell, CellImage};
pub use palette::{Metric, Palette};
pub use quantize::DitherMatrix;
pub use utils::Rgb;

/// The three header bytes at the start of every stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub version: u8,
    pub width: u8,
    pub height: u8,
}

pub mod consts {
    /// Version byte written at the start of every stream.
    pub const FORMAT_VERSION: u8 = 1;

    /// Ends the current frame.
    ///
    /// ```plain
    /// .- OP_END_FRAME ----------.
    /// |         Byte[0]         |
    /// |-------------------------|
    /// |          0x01           |
    /// `-------------------------`
    /// ```
    pub const OP_END_FRAME: u8 = 0x01;

    /// Loads a palette index into the background register.
    ///
    /// ```plain
    /// .- OP_SET_BG --------------------------------------.
    /// |         Byte[0]         |         Byte[1]         |
    /// |-------------------------+-------------------------|
    /// |          0x02           |          color          |
    /// `---------------------------------------------------`
    /// ```
    pub const OP_SET_BG: u8 = 0x02;

    /// Loads a palette index into the foreground register.
    ///
    /// Same layout as [`OP_SET_BG`].
    pub const OP_SET_FG: u8 = 0x03;

    /// Writes a horizontal run of masks using the current registers.
    ///
    /// ```plain
    /// .- OP_SET ----------------------------------------------------------------------.
    /// | Byte[0] | Byte[1] | Byte[2] | Byte[3] | Byte[4]  ...  Byte[3 + count]         |
    /// |---------+---------+---------+---------+---------------------------------------|
    /// |  0x04   |    x    |    y    |  count  |  mask  ...  mask                      |
    /// `-------------------------------------------------------------------------------`
    /// ```
    ///
    /// - cell `i` of the run is at `(x + i, y)`
    pub const OP_SET: u8 = 0x04;

    /// Vertical variant of [`OP_SET`]: cell `i` of the run is at `(x, y + i)`.
    pub const OP_SET_VERTICAL: u8 = 0x05;

    /// Fills a rectangle with the background register (mask `0x00`).
    ///
    /// ```plain
    /// .- OP_FILL_BG ----------------------------------------.
    /// | Byte[0] | Byte[1] | Byte[2] | Byte[3]  | Byte[4]    |
    /// |---------+---------+---------+----------+------------|
    /// |  0x06   |    x    |    y    |  width   |  height    |
    /// `-----------------------------------------------------`
    /// ```
    pub const OP_FILL_BG: u8 = 0x06;

    /// Fills a rectangle with the foreground register (mask `0xFF`).
    ///
    /// Same layout as [`OP_FILL_BG`].
    pub const OP_FILL_FG: u8 = 0x07;

    /// Copies a rectangle of cells to a signed offset.
    ///
    /// ```plain
    /// .- OP_COPY -------------------------------------------------------------------------.
    /// | Byte[0] | Byte[1] | Byte[2] | Byte[3..5] | Byte[5..7] | Byte[7]  | Byte[8]         |
    /// |---------+---------+---------+------------+------------+----------+-----------------|
    /// |  0x09   |    x    |    y    |   i16le tx |   i16le ty |  width   |  height         |
    /// `-----------------------------------------------------------------------------------`
    /// ```
    ///
    /// The source rectangle is read in full before any cell is written.
    pub const OP_COPY: u8 = 0x09;

    /// Fills a rectangle with a literal color.
    ///
    /// ```plain
    /// .- OP_FILL_COLOR ---------------------------------------------------.
    /// | Byte[0] | Byte[1] | Byte[2] | Byte[3]  | Byte[4]    | Byte[5]     |
    /// |---------+---------+---------+----------+------------+-------------|
    /// |  0x10   |    x    |    y    |  width   |  height    |   color     |
    /// `-------------------------------------------------------------------`
    /// ```
    ///
    /// If the foreground register already holds `color`, the fill uses it (mask `0xFF`).
    /// Otherwise the background register is loaded with `color` unless it already holds it, and
    /// the fill uses mask `0x00`.
    pub const OP_FILL_COLOR: u8 = 0x10;

    /// [`OP_FILL_COLOR`] with a height of 1.
    ///
    /// ```plain
    /// .- OP_FILL_COLOR_ROW ---------------------------------.
    /// | Byte[0] | Byte[1] | Byte[2] | Byte[3]  | Byte[4]    |
    /// |---------+---------+---------+----------+------------|
    /// |  0x18   |    x    |    y    |  width   |   color    |
    /// `-----------------------------------------------------`
    /// ```
    pub const OP_FILL_COLOR_ROW: u8 = 0x18;

    /// [`OP_FILL_COLOR`] with a width of 1. The size byte holds the height.
    pub const OP_FILL_COLOR_COLUMN: u8 = 0x19;

    /// Loads both registers, then writes a horizontal run of up to four masks.
    ///
    /// ```plain
    /// .- OP_SET_COLOR -----------------------------------------------------------------.
    /// | Byte[0] | Byte[1] | Byte[2] | Byte[3] | Byte[4] | Byte[5] | Byte[6] ...         |
    /// |---------+---------+---------+---------+---------+---------+---------------------|
    /// |  0x12   |    x    |    y    |  count  |   bg    |   fg    |  mask ...           |
    /// `--------------------------------------------------------------------------------`
    /// ```
    ///
    /// The registers end up holding `{bg, fg}` in either order; the written cells always use
    /// `bg` and `fg` as given.
    pub const OP_SET_COLOR: u8 = 0x12;

    /// Vertical variant of [`OP_SET_COLOR`].
    pub const OP_SET_COLOR_VERTICAL: u8 = 0x13;

    /// Run-length compressed variant of [`OP_SET_COLOR`], used for runs of more than four masks.
    ///
    /// ```plain
    /// .- OP_SET_COLOR_RLE ---------------------------------------------------.
    /// | Byte[0] | Byte[1] | Byte[2] | Byte[3] | Byte[4] | Byte[5] ...         |
    /// |---------+---------+---------+---------+---------+---------------------|
    /// |  0x22   |    x    |    y    |   bg    |   fg    |  RLE body ...       |
    /// `-----------------------------------------------------------------------`
    /// ```
    ///
    /// The body is a sequence of records terminated by `0x00`:
    ///
    /// - `0x01..=0xA0`: literal, followed by that many masks
    /// - `0xA1..=0xFF`: repeat, followed by one mask repeated `byte - 0xA0` times
    pub const OP_SET_COLOR_RLE: u8 = 0x22;

    /// Vertical variant of [`OP_SET_COLOR_RLE`].
    pub const OP_SET_COLOR_RLE_VERTICAL: u8 = 0x23;

    /// Largest mask count [`OP_SET_COLOR`] is used for.
    pub const SET_COLOR_MAX_INLINE: usize = 4;

    /// Ends an RLE body.
    pub const RLE_END: u8 = 0x00;
    /// Largest literal record tag.
    pub const RLE_MAX_LITERAL: u8 = 0xA0;
    /// Repeat counts are stored with this bias.
    pub const RLE_REPEAT_BIAS: u8 = 0xA0;
}
