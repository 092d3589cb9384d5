use crate::{
    palette::Palette,
    utils::{sub_pixel_bit, sub_pixel_offset, Rgb},
};

/// One display cell: two palette colors and the mask choosing between them per sub-pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cell {
    pub bg: u8,
    pub fg: u8,
    pub mask: u8,
}

impl Cell {
    pub const fn new(bg: u8, fg: u8, mask: u8) -> Self {
        Self { bg, fg, mask }
    }

    /// A cell showing only `color`.
    pub const fn flat(color: u8) -> Self {
        Self::new(color, 0, 0)
    }

    /// The same picture with the two colors swapped.
    pub const fn inverted(self) -> Self {
        Self::new(self.fg, self.bg, !self.mask)
    }

    /// Whether `other` describes exactly the same picture, either identically or with the colors
    /// swapped and the mask inverted.
    pub const fn matches(self, other: Cell) -> bool {
        (self.bg == other.bg && self.fg == other.fg && self.mask == other.mask)
            || (self.bg == other.fg && self.fg == other.bg && self.mask == !other.mask)
    }

    /// Palette index shown by sub-pixel `p`.
    pub const fn color_at(self, p: u8) -> u8 {
        if self.mask & sub_pixel_bit(p) != 0 {
            self.fg
        } else {
            self.bg
        }
    }

    /// Whether only one of the two colors is visible.
    pub const fn is_flat(self) -> bool {
        self.mask == 0 || self.mask == 0xFF
    }
}

/// A grid of cells stored as three parallel planes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellImage {
    width: usize,
    height: usize,
    bg: Vec<u8>,
    fg: Vec<u8>,
    mask: Vec<u8>,
}

impl CellImage {
    /// Creates an image filled with `Cell::default()`.
    pub fn new(width: usize, height: usize) -> Self {
        let len = width * height;
        Self {
            width,
            height,
            bg: vec![0; len],
            fg: vec![0; len],
            mask: vec![0; len],
        }
    }

    /// Creates an image from cells in row-major order.
    ///
    /// Returns `None` if `cells` doesn't hold exactly `width * height` cells.
    pub fn from_cells(width: usize, height: usize, cells: &[Cell]) -> Option<Self> {
        if cells.len() != width * height {
            return None;
        }

        Some(Self {
            width,
            height,
            bg: cells.iter().map(|c| c.bg).collect(),
            fg: cells.iter().map(|c| c.fg).collect(),
            mask: cells.iter().map(|c| c.mask).collect(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Returns the cell at `(x, y)`, or `Cell::default()` outside of the image.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Cell {
        if !self.contains(x, y) {
            return Cell::default();
        }

        let i = y * self.width + x;
        Cell::new(self.bg[i], self.fg[i], self.mask[i])
    }

    /// Writes the cell at `(x, y)`. Writes outside of the image are ignored.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if !self.contains(x, y) {
            return;
        }

        let i = y * self.width + x;
        self.bg[i] = cell.bg;
        self.fg[i] = cell.fg;
        self.mask[i] = cell.mask;
    }

    /// Iterates all cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.bg
            .iter()
            .zip(&self.fg)
            .zip(&self.mask)
            .map(|((&bg, &fg), &mask)| Cell::new(bg, fg, mask))
    }

    /// A copy with every cell's mask inverted, keeping its colors in place.
    ///
    /// Every cell of the result shows the opposite picture, except cells using the same color
    /// twice.
    pub fn inverted_masks(&self) -> Self {
        let mut image = self.clone();
        for m in &mut image.mask {
            *m = !*m;
        }
        image
    }

    /// Renders the image into an RGB raster of `width * 2` by `height * 4` pixels.
    pub fn to_rgb(&self, palette: &Palette) -> Vec<Rgb> {
        let pixel_width = self.width * 2;
        let mut pixels = vec![[0; 3]; pixel_width * self.height * 4];

        for y in 0..self.height {
            for x in 0..self.width {
                let cell = self.get(x, y);
                for p in 0..8 {
                    let (dx, dy) = sub_pixel_offset(p);
                    let i = (y * 4 + dy) * pixel_width + x * 2 + dx;
                    pixels[i] = palette.color(cell.color_at(p));
                }
            }
        }

        pixels
    }
}
