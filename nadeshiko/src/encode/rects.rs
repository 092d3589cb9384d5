//! Finds large single-color rectangles worth filling in one go.

use crate::{
    command::Command,
    image::{Cell, CellImage},
};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Smallest rectangle side worth a fill.
const MIN_SIDE: usize = 3;

/// Coverage ratios the support maps are cut at.
const SUPPORT_THRESHOLDS: [f64; 2] = [0.1, 0.3];

/// Block multiples whose rectangles the coarser pass already found.
const COARSER_MULTIPLES: [usize; 3] = [2, 3, 5];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(super) struct ColorRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub color: u8,
}

impl ColorRect {
    pub fn to_command(self) -> Command {
        Command::FillWithColor {
            x: self.x as u8,
            y: self.y as u8,
            width: self.width as u8,
            height: self.height as u8,
            color: self.color,
        }
    }
}

/// Union of both finders, deduplicated and in a stable order.
pub(super) fn find(target: &CellImage, previous: &CellImage) -> Vec<ColorRect> {
    let mut rects = support_rects(target, previous);
    rects.extend(block_rects(target, previous));
    rects.into_iter().collect()
}

/// Sweeps a grid of column heights and collects every maximal rectangle ending in each row.
///
/// `heights[y * width + x]` is the number of consecutive set cells ending at `(x, y)`.
fn histogram_rects(
    heights: &mut [usize],
    width: usize,
    grid_height: usize,
    mut emit: impl FnMut(usize, usize, usize, usize) -> bool,
) {
    for y in 0..grid_height {
        for x in 0..width {
            let i = y * width + x;
            let h = heights[i];
            if h == 0 || (y + 1 < grid_height && heights[i + width] != 0) {
                continue;
            }

            let mut end = x;
            while end < width && heights[y * width + end] >= h {
                end += 1;
            }

            if emit(x, y + 1 - h, end - x, h) {
                // the same rectangle would be found again from the next columns
                for other in &mut heights[i + 1..y * width + end] {
                    if *other == h {
                        *other = 0;
                    }
                }
            }
        }
    }
}

/// Rectangles over per-color coverage maps.
///
/// Each cell supports its colors by the number of sub-pixels showing them. Mixed cells that are
/// already on screen support less. The maps are smoothed over a 5x3 neighbourhood before being
/// cut at each threshold.
fn support_rects(target: &CellImage, previous: &CellImage) -> BTreeSet<ColorRect> {
    let (width, height) = (target.width(), target.height());
    let mut support = BTreeMap::<u8, Vec<u8>>::new();

    for y in 0..height {
        for x in 0..width {
            let cell = target.get(x, y);
            let mut fg_val = cell.mask.count_ones() as i32;
            let mut bg_val = 8 - fg_val;
            if !cell.is_flat() && cell.matches(previous.get(x, y)) {
                fg_val -= 2;
                bg_val -= 2;
            }

            for (color, v) in [(cell.bg, bg_val), (cell.fg, fg_val)] {
                if v <= 0 {
                    continue;
                }
                let map = support
                    .entry(color)
                    .or_insert_with(|| vec![0; width * height]);
                let slot = &mut map[y * width + x];
                *slot = (*slot).max(v as u8);
            }
        }
    }

    SUPPORT_THRESHOLDS
        .par_iter()
        .map(|&threshold| {
            let mut rects = Vec::new();
            let mut heights = vec![0; width * height];

            for (&color, map) in &support {
                for y in 0..height {
                    for x in 0..width {
                        let (y0, y1) = (y.saturating_sub(1), (y + 2).min(height));
                        let (x0, x1) = (x.saturating_sub(2), (x + 3).min(width));

                        let mut sum = 0u32;
                        let mut count = 0u32;
                        for sy in y0..y1 {
                            for sx in x0..x1 {
                                sum += u32::from(map[sy * width + sx]);
                                count += 1;
                            }
                        }

                        let ratio = f64::from(sum) / f64::from(count) / 8.0;
                        let i = y * width + x;
                        heights[i] = if ratio < threshold {
                            0
                        } else if y == 0 {
                            1
                        } else {
                            1 + heights[i - width]
                        };
                    }
                }

                histogram_rects(&mut heights, width, height, |x, y, w, h| {
                    let big = w >= MIN_SIDE && h >= MIN_SIDE;
                    if big {
                        rects.push(ColorRect {
                            x,
                            y,
                            width: w,
                            height: h,
                            color,
                        });
                    }
                    big
                });
            }

            rects
        })
        .flatten()
        .collect()
}

/// Rectangles over a coarse grid of blocks, each labelled with its dominant color.
///
/// Runs at block sizes of the full and half image height.
fn block_rects(target: &CellImage, previous: &CellImage) -> BTreeSet<ColorRect> {
    let height = target.height();

    [height, height / 2]
        .into_par_iter()
        .filter(|&size| size > 0 && size <= target.width())
        .flat_map_iter(|size| blocks_of_size(target, previous, size))
        .collect()
}

fn blocks_of_size(target: &CellImage, previous: &CellImage, size: usize) -> Vec<ColorRect> {
    let (width, height) = (target.width(), target.height());
    let (grid_w, grid_h) = ((width - size) / size + 1, (height - size) / size + 1);
    let mut area = vec![None; grid_w * grid_h];

    for by in 0..grid_h {
        for bx in 0..grid_w {
            let mut counts = BTreeMap::<u8, usize>::new();
            let mut has_pattern = false;
            let mut has_change = false;

            for y in by * size..(by + 1) * size {
                for x in bx * size..(bx + 1) * size {
                    let cell = target.get(x, y);
                    has_pattern |= !cell.is_flat();
                    has_change |= !cell.matches(previous.get(x, y));

                    let fg_bits = cell.mask.count_ones() as usize;
                    *counts.entry(cell.fg).or_default() += fg_bits;
                    *counts.entry(cell.bg).or_default() += 8 - fg_bits;
                }
            }

            // a detailed block that is already on screen is better left alone
            if !has_change && has_pattern {
                continue;
            }

            let mut dominant = None;
            let mut dominant_count = 0;
            for (&color, &count) in &counts {
                if count > dominant_count {
                    dominant = Some(color);
                    dominant_count = count;
                }
            }

            // at least half of the block's sub-pixels
            if dominant_count >= size * size * 4 {
                area[by * grid_w + bx] = dominant;
            }
        }
    }

    let colors = area.iter().flatten().copied().collect::<BTreeSet<_>>();
    let mut heights = vec![0; grid_w * grid_h];
    let mut rects = Vec::new();

    for color in colors {
        for (i, label) in area.iter().enumerate() {
            heights[i] = if *label != Some(color) {
                0
            } else if i < grid_w {
                1
            } else {
                1 + heights[i - grid_w]
            };
        }

        histogram_rects(&mut heights, grid_w, grid_h, |bx, by, bw, bh| {
            let rect = ColorRect {
                x: bx * size,
                y: by * size,
                width: bw * size,
                height: bh * size,
                color,
            };

            let aligned = |m: usize| {
                let s = size * m;
                rect.x % s == 0 && rect.y % s == 0 && rect.width % s == 0 && rect.height % s == 0
            };
            if COARSER_MULTIPLES.into_iter().any(aligned) {
                return false;
            }

            let big = rect.width >= MIN_SIDE && rect.height >= MIN_SIDE;
            if big {
                rects.push(rect);
            }
            big
        });
    }

    rects
}
