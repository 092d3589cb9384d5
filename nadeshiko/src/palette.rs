//! The fixed display palette and the distance metric built on top of it.

use crate::{
    image::Cell,
    utils::{bucket_color, bucket_index, unpack_rgb, Rgb},
};
use rayon::prelude::*;

/// Number of palette candidates stored per color bucket.
pub const NEAREST_COUNT: usize = 4;

const BUCKETS: usize = 1 << 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb; 256],
}

impl Palette {
    /// 16 grays (`(i + 1) * 255 / 17`) followed by a 6x8x5 RGB cube.
    pub fn tier3() -> Self {
        let mut colors = [[0; 3]; 256];

        for (i, color) in colors.iter_mut().take(16).enumerate() {
            let v = ((i + 1) * 255 / 17) as u32;
            *color = unpack_rgb(v * 0x10101);
        }

        for i in 0..240 {
            let b = (i % 5) * 255 / 4;
            let g = ((i / 5) % 8) * 255 / 7;
            let r = ((i / 40) % 6) * 255 / 5;
            colors[i + 16] = [r as u8, g as u8, b as u8];
        }

        Self { colors }
    }

    pub fn from_colors(colors: [Rgb; 256]) -> Self {
        Self { colors }
    }

    #[inline]
    pub fn color(&self, index: u8) -> Rgb {
        self.colors[usize::from(index)]
    }

    pub fn colors(&self) -> &[Rgb; 256] {
        &self.colors
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::tier3()
    }
}

/// Red-mean weighted squared distance between two colors.
#[inline]
pub const fn color_distance(a: Rgb, b: Rgb) -> u32 {
    if a[0] == b[0] && a[1] == b[1] && a[2] == b[2] {
        return 0;
    }

    let (r1, g1, b1) = (a[0] as i32, a[1] as i32, a[2] as i32);
    let (r2, g2, b2) = (b[0] as i32, b[1] as i32, b[2] as i32);
    let rs = (r1 - r2) * (r1 - r2);
    let gs = (g1 - g2) * (g1 - g2);
    let bs = (b1 - b2) * (b1 - b2);
    let r_avg = (r1 + r2) / 2;

    ((((512 + r_avg) * rs) >> 8) + 4 * gs + (((767 - r_avg) * bs) >> 8)) as u32
}

/// A palette together with its precomputed lookup tables.
///
/// Building the tables takes a noticeable amount of time, so a metric is built once and shared
/// by everything that needs it.
#[derive(Debug, Clone)]
pub struct Metric {
    palette: Palette,
    /// `distances[(a << 8) | b]`
    distances: Vec<u32>,
    nearest: Vec<[u8; NEAREST_COUNT]>,
}

impl Metric {
    pub fn new(palette: Palette) -> Self {
        let mut distances = vec![0; 256 * 256];
        for a in 0..256 {
            for b in (a + 1)..256 {
                let d = color_distance(palette.colors[a], palette.colors[b]);
                distances[(a << 8) | b] = d;
                distances[(b << 8) | a] = d;
            }
        }

        let nearest = (0..BUCKETS)
            .into_par_iter()
            .map(|i| closest_slow(&palette, bucket_color(i)))
            .collect();

        Self {
            palette,
            distances,
            nearest,
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Distance between two palette entries.
    #[inline]
    pub fn palette_distance(&self, a: u8, b: u8) -> u32 {
        self.distances[(usize::from(a) << 8) | usize::from(b)]
    }

    /// The palette entries closest to `color`, best first.
    #[inline]
    pub fn nearest(&self, color: Rgb) -> &[u8; NEAREST_COUNT] {
        &self.nearest[bucket_index(color)]
    }

    /// Perceived difference between two cells.
    ///
    /// Symmetric, and zero for cells that [match](Cell::matches).
    pub fn cell_distance(&self, a: Cell, mut b: Cell) -> u64 {
        if a.bg == b.fg && a.fg == b.bg {
            b = b.inverted();
        }

        let (q1, q2) = (a.mask, b.mask);
        let mut v = 0u64;

        if a != b {
            let d = |x, y| u64::from(self.palette_distance(x, y));
            let bits = |m: u8| u64::from(m.count_ones());

            v = bits(q1 & q2) * d(a.fg, b.fg)
                + bits(!q1 & q2) * d(a.bg, b.fg)
                + bits(q1 & !q2) * d(a.fg, b.bg)
                + bits(!q1 & !q2) * d(a.bg, b.bg);
        }

        // A pattern shifted by one sub-pixel row only counts a third.
        if a.bg == b.bg && a.fg == b.fg && ((q1 >> 2) == (q2 & 0x3F) || (q2 >> 2) == (q1 & 0x3F)) {
            return v / 3;
        }

        v
    }
}

impl Default for Metric {
    fn default() -> Self {
        Self::new(Palette::tier3())
    }
}

/// Picks the best candidates for `color` the slow way.
///
/// Even grays up to index 12 are skipped and the remaining grays are heavily penalized, so grays
/// are only picked for colors that are (nearly) gray.
fn closest_slow(palette: &Palette, color: Rgb) -> [u8; NEAREST_COUNT] {
    let mut distances = (0..=255u8)
        .filter(|&i| !(i <= 12 && i % 2 == 0))
        .map(|i| {
            let mut d = color_distance(palette.color(i), color);
            if i < 16 {
                d *= 20;
            }
            (i, d)
        })
        .collect::<Vec<_>>();

    distances.sort_by_key(|&(_, d)| d);

    let mut out = [0; NEAREST_COUNT];
    for (o, &(i, _)) in out.iter_mut().zip(&distances) {
        *o = i;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier3_layout() {
        let palette = Palette::tier3();
        assert_eq!(palette.color(0), [15, 15, 15]);
        assert_eq!(palette.color(15), [240, 240, 240]);
        assert_eq!(palette.color(16), [0, 0, 0]);
        assert_eq!(palette.color(17), [0, 0, 63]);
        assert_eq!(palette.color(21), [0, 36, 0]);
        assert_eq!(palette.color(255), [255, 255, 255]);
    }

    #[test]
    fn redmean() {
        assert_eq!(color_distance([10, 20, 30], [10, 20, 30]), 0);
        // rs = 100, r_avg = 5: (517 * 100) >> 8
        assert_eq!(color_distance([0, 0, 0], [10, 0, 0]), 201);
        assert_eq!(color_distance([0, 0, 0], [0, 10, 0]), 400);
        assert_eq!(
            color_distance([1, 2, 3], [200, 100, 50]),
            color_distance([200, 100, 50], [1, 2, 3])
        );
    }

    #[test]
    fn nearest_avoids_grays() {
        let metric = Metric::default();

        // pure colors of the cube are their own best match
        assert_eq!(metric.nearest([0, 0, 0])[0], 16);
        assert_eq!(metric.nearest([255, 255, 255])[0], 255);
        assert!(metric
            .nearest([255, 0, 0])
            .iter()
            .all(|&i| !(i <= 12 && i % 2 == 0)));
    }

    #[test]
    fn cell_distance_basics() {
        let metric = Metric::default();
        let a = Cell::new(16, 255, 0b1111_0000);

        assert_eq!(metric.cell_distance(a, a), 0);
        assert_eq!(metric.cell_distance(a, a.inverted()), 0);

        let b = Cell::new(16, 255, 0b0000_1111);
        let expected = 8 * u64::from(metric.palette_distance(16, 255));
        assert_eq!(metric.cell_distance(a, b), expected);
        assert_eq!(metric.cell_distance(b, a), expected);
    }

    #[test]
    fn shifted_pattern_counts_a_third() {
        let metric = Metric::default();
        let a = Cell::new(16, 255, 0b1100_0000);
        let b = Cell::new(16, 255, 0b0011_0000);

        let d = u64::from(metric.palette_distance(16, 255));
        assert_eq!(metric.cell_distance(a, b), 4 * d / 3);
        assert_eq!(metric.cell_distance(b, a), 4 * d / 3);
    }
}
