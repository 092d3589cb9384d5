use crate::{command::Region, image::CellImage, palette::Metric};
use rayon::prelude::*;

/// Cached per-cell distance between a working canvas and a target image.
#[derive(Debug, Clone)]
pub struct Delta {
    width: usize,
    data: Vec<u64>,
}

impl Delta {
    pub fn new(canvas: &CellImage, target: &CellImage, metric: &Metric) -> Self {
        let mut delta = Self {
            width: target.width(),
            data: vec![0; target.width() * target.height()],
        };
        delta.recalc_all(canvas, target, metric);
        delta
    }

    /// Recomputes every cell.
    pub fn recalc_all(&mut self, canvas: &CellImage, target: &CellImage, metric: &Metric) {
        if self.width == 0 {
            return;
        }

        self.data
            .par_chunks_mut(self.width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, d) in row.iter_mut().enumerate() {
                    *d = metric.cell_distance(canvas.get(x, y), target.get(x, y));
                }
            });
    }

    /// Recomputes the cells inside `region`.
    pub fn refresh(
        &mut self,
        region: Region,
        canvas: &CellImage,
        target: &CellImage,
        metric: &Metric,
    ) {
        for (x, y) in region.cells(target.width(), target.height()) {
            self.data[y * self.width + x] =
                metric.cell_distance(canvas.get(x, y), target.get(x, y));
        }
    }

    /// Cached distance at `(x, y)`, zero outside of the image.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u64 {
        if x >= self.width {
            return 0;
        }
        self.data.get(y * self.width + x).copied().unwrap_or(0)
    }

    /// Sum over all cells.
    pub fn total(&self) -> u64 {
        self.data.iter().sum()
    }
}
