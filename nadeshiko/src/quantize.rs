//! Conversion of RGB rasters into cell images.

use crate::{
    image::{Cell, CellImage},
    palette::{color_distance, Metric},
    utils::{sub_pixel_offset, Rgb},
};
use rayon::prelude::*;
use snafu::{ensure, Snafu};

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Dither matrix data must be square, but has {len} entries"))]
    NonSquareDither { len: usize },
}

#[derive(Debug, Snafu)]
pub enum QuantizeError {
    #[snafu(display(
        "Specified raster dimensions don't match the number of pixels: {width} * {height} == {} pixels, but {pixel_count} pixels were given",
        width * height
    ))]
    InvalidDimensions {
        width: usize,
        height: usize,
        pixel_count: usize,
    },
}

/// An ordered dither threshold tile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DitherMatrix {
    matrix: Vec<u32>,
    width: usize,
}

impl DitherMatrix {
    /// Creates a matrix from row-major threshold data. The data must be square.
    pub fn new(matrix: Vec<u32>) -> Result<Self, ConfigError> {
        let width = (matrix.len() as f64).sqrt() as usize;
        ensure!(
            width * width == matrix.len(),
            NonSquareDitherSnafu { len: matrix.len() }
        );

        Ok(Self { matrix, width })
    }

    /// No dithering: every sub-pixel picks the closer of the two cell colors.
    pub const fn none() -> Self {
        Self {
            matrix: Vec::new(),
            width: 0,
        }
    }

    /// The 2x2 Bayer matrix.
    pub fn bayer2() -> Self {
        Self {
            matrix: vec![0, 2, 3, 1],
            width: 2,
        }
    }

    /// The 4x4 Bayer matrix.
    pub fn bayer4() -> Self {
        Self {
            matrix: vec![0, 8, 2, 10, 12, 4, 14, 6, 3, 11, 1, 9, 15, 7, 13, 5],
            width: 4,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.width > 0
    }

    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn threshold(&self, x: usize, y: usize) -> i64 {
        i64::from(self.matrix[(y % self.width) * self.width + x % self.width])
    }
}

/// Quantizes an RGB raster of `width` by `height` pixels into cells.
///
/// The result has `(width + 1) / 2` by `(height + 3) / 4` cells. Sub-pixels of the last column
/// or row that fall outside of the raster repeat the closest edge pixel.
pub fn quantize(
    metric: &Metric,
    dither: &DitherMatrix,
    width: usize,
    height: usize,
    pixels: &[Rgb],
) -> Result<CellImage, QuantizeError> {
    ensure!(
        width > 0 && height > 0 && width * height == pixels.len(),
        InvalidDimensionsSnafu {
            width,
            height,
            pixel_count: pixels.len()
        }
    );

    let cells_w = (width + 1) / 2;
    let cells_h = (height + 3) / 4;

    let rows = (0..cells_h)
        .into_par_iter()
        .map(|y| {
            (0..cells_w)
                .map(|x| {
                    let mut sub_pixels = [[0; 3]; 8];
                    for (p, px) in sub_pixels.iter_mut().enumerate() {
                        let (dx, dy) = sub_pixel_offset(p as u8);
                        let sx = (x * 2 + dx).min(width - 1);
                        let sy = (y * 4 + dy).min(height - 1);
                        *px = pixels[sy * width + sx];
                    }

                    quantize_cell(metric, dither, x, y, &sub_pixels)
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let mut image = CellImage::new(cells_w, cells_h);
    for (y, row) in rows.into_iter().enumerate() {
        for (x, cell) in row.into_iter().enumerate() {
            image.set(x, y, cell);
        }
    }
    Ok(image)
}

fn quantize_cell(
    metric: &Metric,
    dither: &DitherMatrix,
    x: usize,
    y: usize,
    sub_pixels: &[Rgb; 8],
) -> Cell {
    let palette = metric.palette();

    let mut colors = sub_pixels
        .iter()
        .flat_map(|&p| metric.nearest(p).iter().copied())
        .collect::<Vec<_>>();
    colors.sort_unstable();
    colors.dedup();

    let mut best = (0, 0);
    let mut best_distance = u32::MAX;
    let mut first_distances = [0; 8];

    for i in 0..colors.len().saturating_sub(1) {
        let ci = palette.color(colors[i]);
        let mut self_distance = 0;
        for (d, &p) in first_distances.iter_mut().zip(sub_pixels) {
            *d = color_distance(p, ci);
            self_distance += *d;
        }

        if self_distance < best_distance {
            best = (i, i);
            best_distance = self_distance;
        }

        for j in (i + 1)..colors.len() {
            let cj = palette.color(colors[j]);
            let mut distance = 0;
            for (&d, &p) in first_distances.iter().zip(sub_pixels) {
                distance += d.min(color_distance(p, cj));
                if distance >= best_distance {
                    break;
                }
            }

            if distance < best_distance {
                best = (i, j);
                best_distance = distance;
            }
        }
    }

    let bg = colors[best.0];
    let fg = colors[best.1];
    if bg == fg {
        return Cell::flat(bg);
    }

    let (bg_rgb, fg_rgb) = (palette.color(bg), palette.color(fg));
    let mut mask = 0u8;

    if dither.is_enabled() {
        let w = dither.width();
        let len = (w * w) as f64;
        let levels = (w * w) as i64;

        let mut last_level = -1;
        let mut level_changes = 0;

        for (p, &px) in sub_pixels.iter().enumerate() {
            let (dx, dy) = sub_pixel_offset(7 - p as u8);
            let mix = (mix_ratio(px, bg_rgb, fg_rgb) - 0.5) * 2.0 + 0.5;
            let level = ((len - mix * len) + 0.5).floor() as i64;
            let level = level.clamp(0, levels);

            if level != last_level {
                level_changes += 1;
                last_level = level;
            }

            let threshold = dither.threshold(x * 2 + dx, y * 4 + dy);
            mask = (mask << 1) | u8::from(threshold < level);
        }

        // A single level for the whole cell means there is no real pattern to show.
        if level_changes == 1 {
            mask = if last_level < levels / 2 { 0 } else { 0xFF };
        }
    } else {
        for &px in sub_pixels {
            let closer_to_fg = color_distance(px, fg_rgb) < color_distance(px, bg_rgb);
            mask = (mask << 1) | u8::from(closer_to_fg);
        }
    }

    Cell::new(bg, fg, mask)
}

/// Position of `c` along the line from `c2` (0.0) to `c1` (1.0).
fn mix_ratio(c: Rgb, c1: Rgb, c2: Rgb) -> f64 {
    if c1 == c2 {
        return 0.5;
    }

    let mut num = 0i64;
    let mut den = 0i64;
    for ch in 0..3 {
        let (v, v1, v2) = (i64::from(c[ch]), i64::from(c1[ch]), i64::from(c2[ch]));
        num += v * v1 - v * v2 - v1 * v2 + v2 * v2;
        den += (v1 - v2) * (v1 - v2);
    }

    num as f64 / den as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_square_dither() {
        assert!(matches!(
            DitherMatrix::new(vec![0, 1, 2]),
            Err(ConfigError::NonSquareDither { len: 3 })
        ));
        assert_eq!(DitherMatrix::new(vec![0, 2, 3, 1]).unwrap().width(), 2);
        assert!(!DitherMatrix::new(Vec::new()).unwrap().is_enabled());
    }

    #[test]
    fn invalid_dimensions() {
        let metric = Metric::default();
        let err = quantize(&metric, &DitherMatrix::none(), 3, 3, &[[0; 3]; 8]).unwrap_err();
        assert!(matches!(
            err,
            QuantizeError::InvalidDimensions { pixel_count: 8, .. }
        ));
    }

    #[test]
    fn flat_cell() {
        let metric = Metric::default();
        let image = quantize(&metric, &DitherMatrix::bayer2(), 2, 4, &[[0, 0, 0]; 8]).unwrap();
        assert_eq!(image.width(), 1);
        assert_eq!(image.height(), 1);
        assert_eq!(image.get(0, 0), Cell::flat(16));
    }

    #[test]
    fn two_color_cell() {
        let metric = Metric::default();
        let mut pixels = vec![[0, 0, 0]; 4];
        pixels.extend([[255, 255, 255]; 4]);

        for dither in [DitherMatrix::none(), DitherMatrix::bayer2()] {
            let image = quantize(&metric, &dither, 2, 4, &pixels).unwrap();
            assert_eq!(image.get(0, 0), Cell::new(16, 255, 0b0000_1111));
        }
    }

    #[test]
    fn cells_land_in_place() {
        let metric = Metric::default();
        let pixels = (0..8)
            .flat_map(|y| (0..4).map(move |x| (x, y)))
            .map(|(x, y)| if x < 2 && y < 4 { [255; 3] } else { [0; 3] })
            .collect::<Vec<_>>();

        let image = quantize(&metric, &DitherMatrix::none(), 4, 8, &pixels).unwrap();
        assert_eq!((image.width(), image.height()), (2, 2));
        let white = image.get(0, 0);
        assert!((0..8).all(|p| white.color_at(p) == 255), "{white:?}");
        for (x, y) in [(1, 0), (0, 1), (1, 1)] {
            assert_eq!(image.get(x, y), Cell::flat(16));
        }
    }

    #[test]
    fn uniform_mix_collapses_to_one_color() {
        // between black (16) and dark blue (17), closer to the blue. Every sub-pixel lands on the
        // same level, three quarters towards blue, which would otherwise give a 3-in-4 pattern.
        let metric = Metric::default();
        let pixels = [[0, 0, 40]; 8];

        for dither in [DitherMatrix::bayer2(), DitherMatrix::bayer4()] {
            let image = quantize(&metric, &dither, 2, 4, &pixels).unwrap();
            assert_eq!(image.get(0, 0), Cell::new(16, 17, 0xFF));
        }
    }

    #[test]
    fn edge_pixels_repeat() {
        let metric = Metric::default();
        let image = quantize(&metric, &DitherMatrix::none(), 3, 1, &[[255, 255, 255]; 3]).unwrap();
        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 1);
        let cell = image.get(1, 0);
        assert!((0..8).all(|p| cell.color_at(p) == 255), "{cell:?}");
    }

    #[test]
    fn mix_ratio_endpoints() {
        assert_eq!(mix_ratio([10, 10, 10], [10, 10, 10], [10, 10, 10]), 0.5);
        assert_eq!(mix_ratio([255, 255, 255], [255, 255, 255], [0, 0, 0]), 1.0);
        assert_eq!(mix_ratio([0, 0, 0], [255, 255, 255], [0, 0, 0]), 0.0);
    }
}
