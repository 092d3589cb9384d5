//! Drawing commands and the color registers they share.

use crate::{
    consts::*,
    delta::Delta,
    image::{Cell, CellImage},
    palette::Metric,
    rle,
};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

/// A rectangle of cells. May extend past the image; see [`Region::cells`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A run of `len` cells starting at `(x, y)`.
    pub fn line(x: u8, y: u8, len: usize, vertical: bool) -> Self {
        let len = len as i32;
        if vertical {
            Self::new(x.into(), y.into(), 1, len)
        } else {
            Self::new(x.into(), y.into(), len, 1)
        }
    }

    /// The cells of the region inside a `width` by `height` image, in row-major order.
    pub fn cells(self, width: usize, height: usize) -> impl Iterator<Item = (usize, usize)> {
        let clip = |v: i32, max: usize| (v.max(0) as usize).min(max);
        let (x0, x1) = (clip(self.x, width), clip(self.x + self.width, width));
        let (y0, y1) = (clip(self.y, height), clip(self.y + self.height, height));

        (y0..y1).flat_map(move |y| (x0..x1).map(move |x| (x, y)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Bg,
    Fg,
}

/// The decoder's color registers, as tracked by the encoder.
///
/// `generation` is bumped on every actual register change and only serves as a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandContext {
    bg: Option<u8>,
    fg: Option<u8>,
    generation: u32,
}

impl CommandContext {
    /// Both registers unset.
    pub const fn new() -> Self {
        Self {
            bg: None,
            fg: None,
            generation: 0,
        }
    }

    pub fn bg(&self) -> Option<u8> {
        self.bg
    }

    pub fn fg(&self) -> Option<u8> {
        self.fg
    }

    pub fn register(&self, register: Register) -> Option<u8> {
        match register {
            Register::Bg => self.bg,
            Register::Fg => self.fg,
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn set(&mut self, register: Register, color: u8) {
        let slot = match register {
            Register::Bg => &mut self.bg,
            Register::Fg => &mut self.fg,
        };

        if *slot != Some(color) {
            *slot = Some(color);
            self.generation = self.generation.wrapping_add(1);
        }
    }

    pub fn set_bg(&mut self, color: u8) {
        self.set(Register::Bg, color);
    }

    pub fn set_fg(&mut self, color: u8) {
        self.set(Register::Fg, color);
    }

    /// Copies the registers, optionally starting the generation counter over.
    pub fn fork(&self, preserve_generation: bool) -> Self {
        Self {
            generation: if preserve_generation {
                self.generation
            } else {
                0
            },
            ..*self
        }
    }

    /// Whether either register holds `color`.
    pub fn holds(&self, color: u8) -> bool {
        self.bg == Some(color) || self.fg == Some(color)
    }

    /// The register values cells get written with. Unset registers read as palette index 0.
    pub fn resolved(&self) -> (u8, u8) {
        (self.bg.unwrap_or(0), self.fg.unwrap_or(0))
    }
}

/// How a two-color command brings the registers to its color pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairUpdate {
    Keep,
    Bg(u8),
    Fg(u8),
    Both(u8, u8),
}

impl PairUpdate {
    /// Reuses whichever register already holds one of the colors, in either order.
    fn plan(ctx: &CommandContext, bg: u8, fg: u8) -> Self {
        let (cur_bg, cur_fg) = (ctx.bg, ctx.fg);

        if (cur_bg, cur_fg) == (Some(bg), Some(fg)) || (cur_bg, cur_fg) == (Some(fg), Some(bg)) {
            PairUpdate::Keep
        } else if cur_bg == Some(bg) {
            PairUpdate::Fg(fg)
        } else if cur_bg == Some(fg) {
            PairUpdate::Fg(bg)
        } else if cur_fg == Some(fg) {
            PairUpdate::Bg(bg)
        } else if cur_fg == Some(bg) {
            PairUpdate::Bg(fg)
        } else {
            PairUpdate::Both(bg, fg)
        }
    }

    fn cost(self) -> u32 {
        match self {
            PairUpdate::Keep => 0,
            PairUpdate::Bg(_) | PairUpdate::Fg(_) => 2,
            PairUpdate::Both(..) => 4,
        }
    }

    fn apply(self, ctx: &mut CommandContext) {
        match self {
            PairUpdate::Keep => {}
            PairUpdate::Bg(c) => ctx.set_bg(c),
            PairUpdate::Fg(c) => ctx.set_fg(c),
            PairUpdate::Both(bg, fg) => {
                ctx.set_bg(bg);
                ctx.set_fg(fg);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// Loads a color into one register.
    SetColor { register: Register, color: u8 },
    /// Writes a run of masks with the current registers.
    Set {
        x: u8,
        y: u8,
        masks: Vec<u8>,
        vertical: bool,
    },
    /// Loads a color pair, then writes a run of masks with it.
    ///
    /// Build this with [`Command::set_with_color`] so that equivalent runs compare equal.
    SetWithColor {
        x: u8,
        y: u8,
        bg: u8,
        fg: u8,
        masks: Vec<u8>,
        vertical: bool,
    },
    /// Fills a rectangle with one of the current registers.
    Fill {
        x: u8,
        y: u8,
        width: u8,
        height: u8,
        use_fg: bool,
    },
    /// Fills a rectangle with a literal color, loading it into a register if needed.
    FillWithColor {
        x: u8,
        y: u8,
        width: u8,
        height: u8,
        color: u8,
    },
    /// Copies a rectangle to `(x + dx, y + dy)`.
    Copy {
        x: u8,
        y: u8,
        dx: i16,
        dy: i16,
        width: u8,
        height: u8,
    },
    EndFrame,
}

/// The cells of a mask run together with their masks.
fn run_cells(x: u8, y: u8, vertical: bool, masks: &[u8]) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
    let (x, y) = (usize::from(x), usize::from(y));
    masks.iter().enumerate().map(move |(i, &m)| {
        if vertical {
            (x, y + i, m)
        } else {
            (x + i, y, m)
        }
    })
}

impl Command {
    /// Creates a [`Command::SetWithColor`], normalized so that `bg > fg`.
    ///
    /// # Panics
    ///
    /// Panics if `bg == fg`. Runs showing a single color are fills.
    pub fn set_with_color(x: u8, y: u8, masks: Vec<u8>, bg: u8, fg: u8, vertical: bool) -> Self {
        assert_ne!(bg, fg, "a two-color run needs two different colors");

        let (bg, fg, masks) = if fg > bg {
            (fg, bg, masks.into_iter().map(|m| !m).collect())
        } else {
            (bg, fg, masks)
        };

        Command::SetWithColor {
            x,
            y,
            bg,
            fg,
            masks,
            vertical,
        }
    }

    /// Stream cost of the command when issued with `ctx` as the current registers.
    pub fn cost(&self, ctx: &CommandContext) -> u32 {
        match self {
            Command::SetColor { register, color } => {
                if ctx.register(*register) == Some(*color) {
                    0
                } else {
                    2
                }
            }
            Command::Set { .. } => 1,
            Command::SetWithColor { bg, fg, .. } => 1 + PairUpdate::plan(ctx, *bg, *fg).cost(),
            Command::Fill { .. } => 2,
            Command::FillWithColor {
                width,
                height,
                color,
                ..
            } => {
                let rect = *width > 1 && *height > 1;
                match (ctx.holds(*color), rect) {
                    (true, true) => 2,
                    (true, false) => 1,
                    (false, true) => 4,
                    (false, false) => 3,
                }
            }
            Command::Copy { .. } => 4,
            Command::EndFrame => 0,
        }
    }

    /// Updates the registers the way the decoder does before drawing.
    pub fn update_registers(&self, ctx: &mut CommandContext) {
        match self {
            Command::SetColor { register, color } => ctx.set(*register, *color),
            Command::SetWithColor { bg, fg, .. } => PairUpdate::plan(ctx, *bg, *fg).apply(ctx),
            Command::FillWithColor { color, .. } => {
                if !ctx.holds(*color) {
                    ctx.set_bg(*color);
                }
            }
            Command::Set { .. } | Command::Fill { .. } | Command::Copy { .. } | Command::EndFrame => {}
        }
    }

    /// The cells the command writes, if any.
    pub fn region(&self) -> Option<Region> {
        match self {
            Command::Set {
                x,
                y,
                masks,
                vertical,
            }
            | Command::SetWithColor {
                x,
                y,
                masks,
                vertical,
                ..
            } => Some(Region::line(*x, *y, masks.len(), *vertical)),
            Command::Fill {
                x,
                y,
                width,
                height,
                ..
            }
            | Command::FillWithColor {
                x,
                y,
                width,
                height,
                ..
            } => Some(Region::new(
                (*x).into(),
                (*y).into(),
                (*width).into(),
                (*height).into(),
            )),
            Command::Copy {
                x,
                y,
                dx,
                dy,
                width,
                height,
            } => Some(Region::new(
                i32::from(*x) + i32::from(*dx),
                i32::from(*y) + i32::from(*dy),
                (*width).into(),
                (*height).into(),
            )),
            Command::SetColor { .. } | Command::EndFrame => None,
        }
    }

    /// Executes the command against `image`.
    pub fn apply(&self, ctx: &mut CommandContext, image: &mut CellImage) {
        self.update_registers(ctx);
        let (bg, fg) = ctx.resolved();

        match self {
            Command::Set {
                x,
                y,
                masks,
                vertical,
            } => {
                for (cx, cy, m) in run_cells(*x, *y, *vertical, masks) {
                    image.set(cx, cy, Cell::new(bg, fg, m));
                }
            }
            Command::SetWithColor {
                x,
                y,
                bg,
                fg,
                masks,
                vertical,
            } => {
                for (cx, cy, m) in run_cells(*x, *y, *vertical, masks) {
                    image.set(cx, cy, Cell::new(*bg, *fg, m));
                }
            }
            Command::Fill { use_fg, .. } => {
                let cell = Cell::new(bg, fg, if *use_fg { 0xFF } else { 0 });
                self.fill(image, cell);
            }
            Command::FillWithColor { color, .. } => {
                let mask = if ctx.fg() == Some(*color) { 0xFF } else { 0 };
                self.fill(image, Cell::new(bg, fg, mask));
            }
            Command::Copy {
                x,
                y,
                dx,
                dy,
                width,
                height,
            } => {
                let (x, y) = (i32::from(*x), i32::from(*y));
                let (w, h) = (i32::from(*width), i32::from(*height));

                let source = (y..y + h)
                    .flat_map(|sy| (x..x + w).map(move |sx| (sx, sy)))
                    .map(|(sx, sy)| (sx, sy, read_signed(image, sx, sy)))
                    .collect::<Vec<_>>();

                for (sx, sy, cell) in source {
                    let (tx, ty) = (sx + i32::from(*dx), sy + i32::from(*dy));
                    if tx >= 0 && ty >= 0 {
                        image.set(tx as usize, ty as usize, cell);
                    }
                }
            }
            Command::SetColor { .. } | Command::EndFrame => {}
        }
    }

    fn fill(&self, image: &mut CellImage, cell: Cell) {
        if let Some(region) = self.region() {
            for (x, y) in region.cells(image.width(), image.height()) {
                image.set(x, y, cell);
            }
        }
    }

    /// How much closer to `target` the canvas gets when this command is applied to it.
    ///
    /// Updates `ctx` like [`apply`](Self::apply) would, but leaves the canvas alone. Positive
    /// values are improvements.
    pub fn value(
        &self,
        ctx: &mut CommandContext,
        canvas: &CellImage,
        target: &CellImage,
        delta: &Delta,
        metric: &Metric,
    ) -> f64 {
        self.update_registers(ctx);
        let (reg_bg, reg_fg) = ctx.resolved();
        let (width, height) = (target.width(), target.height());

        // Gain of writing `cell` at `(x, y)`.
        let gain = |x: usize, y: usize, cell: Cell| {
            delta.get(x, y) as i64 - metric.cell_distance(cell, target.get(x, y)) as i64
        };

        match self {
            Command::SetColor { .. } | Command::EndFrame => 0.0,
            Command::Set {
                x,
                y,
                masks,
                vertical,
            } => run_cells(*x, *y, *vertical, masks)
                .filter(|&(cx, cy, _)| target.contains(cx, cy))
                .map(|(cx, cy, m)| gain(cx, cy, Cell::new(reg_bg, reg_fg, m)))
                .sum::<i64>() as f64,
            Command::SetWithColor {
                x,
                y,
                bg,
                fg,
                masks,
                vertical,
            } => {
                let cells = run_cells(*x, *y, *vertical, masks)
                    .filter(|&(cx, cy, _)| target.contains(cx, cy))
                    .map(|(cx, cy, m)| (cx, cy, Cell::new(*bg, *fg, m)));

                let mut changed = false;
                let mut v = 0;
                for (cx, cy, cell) in cells {
                    changed |= !cell.matches(canvas.get(cx, cy));
                    v += gain(cx, cy, cell);
                }

                if changed {
                    v as f64
                } else {
                    0.0
                }
            }
            Command::Fill { use_fg, .. } => {
                let cell = Cell::new(reg_bg, reg_fg, if *use_fg { 0xFF } else { 0 });
                let v = self
                    .region()
                    .into_iter()
                    .flat_map(|r| r.cells(width, height))
                    .map(|(cx, cy)| gain(cx, cy, cell))
                    .sum::<i64>();
                v as f64 * 0.7
            }
            Command::FillWithColor { color, .. } => {
                let flat = Cell::flat(*color);
                self.region()
                    .into_iter()
                    .flat_map(|r| r.cells(width, height))
                    .map(|(cx, cy)| {
                        let t = target.get(cx, cy);
                        let mut d = metric.cell_distance(flat, t) as i64;
                        // mixed cells lose their pattern
                        if !t.is_flat() {
                            d *= 2;
                        }
                        delta.get(cx, cy) as i64 - d
                    })
                    .sum::<i64>() as f64
            }
            Command::Copy { dx, dy, .. } => {
                let (dx, dy) = (i32::from(*dx), i32::from(*dy));
                self.region()
                    .into_iter()
                    .flat_map(|r| r.cells(width, height))
                    .map(|(tx, ty)| {
                        let source = read_signed(canvas, tx as i32 - dx, ty as i32 - dy);
                        gain(tx, ty, source)
                    })
                    .sum::<i64>() as f64
            }
        }
    }

    /// Opcode this command is serialized with.
    pub fn opcode(&self) -> u8 {
        match self {
            Command::SetColor {
                register: Register::Bg,
                ..
            } => OP_SET_BG,
            Command::SetColor {
                register: Register::Fg,
                ..
            } => OP_SET_FG,
            Command::Set { vertical, .. } => {
                if *vertical {
                    OP_SET_VERTICAL
                } else {
                    OP_SET
                }
            }
            Command::SetWithColor {
                masks, vertical, ..
            } => match (masks.len() <= SET_COLOR_MAX_INLINE, *vertical) {
                (true, false) => OP_SET_COLOR,
                (true, true) => OP_SET_COLOR_VERTICAL,
                (false, false) => OP_SET_COLOR_RLE,
                (false, true) => OP_SET_COLOR_RLE_VERTICAL,
            },
            Command::Fill { use_fg, .. } => {
                if *use_fg {
                    OP_FILL_FG
                } else {
                    OP_FILL_BG
                }
            }
            Command::FillWithColor { width, height, .. } => {
                if *width == 1 {
                    OP_FILL_COLOR_COLUMN
                } else if *height == 1 {
                    OP_FILL_COLOR_ROW
                } else {
                    OP_FILL_COLOR
                }
            }
            Command::Copy { .. } => OP_COPY,
            Command::EndFrame => OP_END_FRAME,
        }
    }

    /// Writes the command in stream format.
    pub fn write<W: Write>(&self, mut w: W) -> io::Result<()> {
        let op = self.opcode();
        w.write_u8(op)?;

        match self {
            Command::SetColor { color, .. } => w.write_u8(*color),
            Command::Set { x, y, masks, .. } => {
                w.write_all(&[*x, *y, masks.len() as u8])?;
                w.write_all(masks)
            }
            Command::SetWithColor {
                x, y, bg, fg, masks, ..
            } => {
                if masks.len() <= SET_COLOR_MAX_INLINE {
                    w.write_all(&[*x, *y, masks.len() as u8, *bg, *fg])?;
                    w.write_all(masks)
                } else {
                    let mut body = Vec::with_capacity(masks.len() + 2);
                    rle::encode(masks, &mut body);
                    w.write_all(&[*x, *y, *bg, *fg])?;
                    w.write_all(&body)
                }
            }
            Command::Fill {
                x,
                y,
                width,
                height,
                ..
            } => w.write_all(&[*x, *y, *width, *height]),
            Command::FillWithColor {
                x,
                y,
                width,
                height,
                color,
            } => match op {
                OP_FILL_COLOR_COLUMN => w.write_all(&[*x, *y, *height, *color]),
                OP_FILL_COLOR_ROW => w.write_all(&[*x, *y, *width, *color]),
                _ => w.write_all(&[*x, *y, *width, *height, *color]),
            },
            Command::Copy {
                x,
                y,
                dx,
                dy,
                width,
                height,
            } => {
                w.write_all(&[*x, *y])?;
                w.write_i16::<LittleEndian>(*dx)?;
                w.write_i16::<LittleEndian>(*dy)?;
                w.write_all(&[*width, *height])
            }
            Command::EndFrame => Ok(()),
        }
    }
}

fn read_signed(image: &CellImage, x: i32, y: i32) -> Cell {
    if x < 0 || y < 0 {
        return Cell::default();
    }
    image.get(x as usize, y as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(cmd: &Command) -> Vec<u8> {
        let mut v = Vec::new();
        cmd.write(&mut v).unwrap();
        v
    }

    #[test]
    fn generation_counts_changes() {
        let mut ctx = CommandContext::new();
        ctx.set_bg(3);
        ctx.set_bg(3);
        ctx.set_fg(4);
        assert_eq!(ctx.generation(), 2);
        assert_eq!(ctx.fork(true).generation(), 2);

        let fork = ctx.fork(false);
        assert_eq!(fork.generation(), 0);
        assert_eq!((fork.bg(), fork.fg()), (Some(3), Some(4)));
    }

    #[test]
    fn generation_wraps() {
        let mut ctx = CommandContext {
            generation: u32::MAX,
            ..CommandContext::new()
        };
        ctx.set_fg(9);
        assert_eq!(ctx.generation(), 0);
        assert_eq!(ctx.fg(), Some(9));
    }

    #[test]
    fn set_with_color_normalizes() {
        let cmd = Command::set_with_color(1, 2, vec![0x0F, 0xF0], 5, 9, false);
        assert_eq!(
            cmd,
            Command::SetWithColor {
                x: 1,
                y: 2,
                bg: 9,
                fg: 5,
                masks: vec![0xF0, 0x0F],
                vertical: false,
            }
        );
        assert_eq!(cmd, Command::set_with_color(1, 2, vec![0xF0, 0x0F], 9, 5, false));
    }

    #[test]
    #[should_panic]
    fn set_with_color_needs_two_colors() {
        Command::set_with_color(0, 0, vec![0xAA], 7, 7, false);
    }

    #[test]
    fn register_costs() {
        let cmd = Command::set_with_color(0, 0, vec![0x0F], 20, 10, false);

        let mut ctx = CommandContext::new();
        assert_eq!(cmd.cost(&ctx), 5);

        ctx.set_bg(20);
        assert_eq!(cmd.cost(&ctx), 3);
        ctx.set_fg(10);
        assert_eq!(cmd.cost(&ctx), 1);

        // swapped registers are fine too
        let mut swapped = CommandContext::new();
        swapped.set_bg(10);
        swapped.set_fg(20);
        assert_eq!(cmd.cost(&swapped), 1);

        let set_fg = Command::SetColor {
            register: Register::Fg,
            color: 10,
        };
        assert_eq!(set_fg.cost(&ctx), 0);
        assert_eq!(set_fg.cost(&swapped), 2);
    }

    #[test]
    fn fill_with_color_costs() {
        let rect = Command::FillWithColor {
            x: 0,
            y: 0,
            width: 3,
            height: 3,
            color: 40,
        };
        let row = Command::FillWithColor {
            x: 0,
            y: 0,
            width: 3,
            height: 1,
            color: 40,
        };

        let mut ctx = CommandContext::new();
        assert_eq!((rect.cost(&ctx), row.cost(&ctx)), (4, 3));
        ctx.set_fg(40);
        assert_eq!((rect.cost(&ctx), row.cost(&ctx)), (2, 1));
    }

    #[test]
    fn fill_with_color_prefers_fg() {
        let mut image = CellImage::new(3, 3);
        let cmd = Command::FillWithColor {
            x: 1,
            y: 1,
            width: 5,
            height: 5,
            color: 40,
        };

        let mut ctx = CommandContext::new();
        ctx.set_bg(7);
        ctx.set_fg(40);
        cmd.apply(&mut ctx, &mut image);
        assert_eq!(ctx.generation(), 2);
        assert_eq!(image.get(1, 1), Cell::new(7, 40, 0xFF));
        assert_eq!(image.get(2, 2), Cell::new(7, 40, 0xFF));
        assert_eq!(image.get(0, 0), Cell::default());

        let mut ctx = CommandContext::new();
        cmd.apply(&mut ctx, &mut image);
        assert_eq!(ctx.bg(), Some(40));
        assert_eq!(image.get(1, 1), Cell::new(40, 0, 0));
    }

    #[test]
    fn copy_overlapping() {
        let mut image = CellImage::new(4, 1);
        for x in 0..4 {
            image.set(x, 0, Cell::flat(x as u8 + 16));
        }

        let cmd = Command::Copy {
            x: 0,
            y: 0,
            dx: 1,
            dy: 0,
            width: 3,
            height: 1,
        };
        cmd.apply(&mut CommandContext::new(), &mut image);

        let colors = image.cells().map(|c| c.bg).collect::<Vec<_>>();
        assert_eq!(colors, [16, 16, 17, 18]);
        assert_eq!(cmd.region(), Some(Region::new(1, 0, 3, 1)));
    }

    #[test]
    fn region_is_clipped() {
        let cells = Region::new(-1, 2, 3, 5).cells(4, 4).collect::<Vec<_>>();
        assert_eq!(cells, [(0, 2), (1, 2), (0, 3), (1, 3)]);
        assert_eq!(Region::line(3, 0, 4, true).cells(4, 2).count(), 2);
    }

    #[test]
    fn unchanged_run_is_worthless() {
        let metric = Metric::default();
        let mut target = CellImage::new(2, 1);
        target.set(0, 0, Cell::new(40, 20, 0x0F));
        target.set(1, 0, Cell::new(40, 20, 0x3C));
        let canvas = target.clone();
        let delta = Delta::new(&canvas, &target, &metric);

        let cmd = Command::set_with_color(0, 0, vec![0x0F, 0x3C], 40, 20, false);
        let v = cmd.value(&mut CommandContext::new(), &canvas, &target, &delta, &metric);
        assert_eq!(v, 0.0);

        let blank = CellImage::new(2, 1);
        let delta = Delta::new(&blank, &target, &metric);
        let v = cmd.value(&mut CommandContext::new(), &blank, &target, &delta, &metric);
        assert_eq!(v, delta.total() as f64);
    }

    #[test]
    fn serialized_forms() {
        assert_eq!(bytes(&Command::EndFrame), [0x01]);
        assert_eq!(
            bytes(&Command::SetColor {
                register: Register::Fg,
                color: 0x33
            }),
            [0x03, 0x33]
        );
        assert_eq!(
            bytes(&Command::FillWithColor {
                x: 1,
                y: 2,
                width: 1,
                height: 7,
                color: 9
            }),
            [0x19, 1, 2, 7, 9]
        );
        assert_eq!(
            bytes(&Command::FillWithColor {
                x: 1,
                y: 2,
                width: 7,
                height: 1,
                color: 9
            }),
            [0x18, 1, 2, 7, 9]
        );
        assert_eq!(
            bytes(&Command::Copy {
                x: 1,
                y: 2,
                dx: -2,
                dy: 300,
                width: 3,
                height: 4
            }),
            [0x09, 1, 2, 0xFE, 0xFF, 0x2C, 0x01, 3, 4]
        );
        assert_eq!(
            bytes(&Command::set_with_color(3, 4, vec![0xF0], 9, 5, true)),
            [0x13, 3, 4, 1, 9, 5, 0xF0]
        );
        assert_eq!(
            bytes(&Command::set_with_color(3, 4, vec![0xF0; 6], 9, 5, false)),
            [0x22, 3, 4, 9, 5, 0xA6, 0xF0, 0x00]
        );
    }
}
