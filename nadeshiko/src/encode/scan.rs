//! Run scanner: splits every row (or column) into runs of cells sharing a color pair.

use super::{combine, Candidate};
use crate::{
    command::{Command, CommandContext},
    delta::Delta,
    image::{Cell, CellImage},
    palette::Metric,
};
use rayon::prelude::*;

/// Runs whose value drops below this are trimmed from the end of a line.
const TRIM_EPSILON: f64 = 1e-10;

/// Smallest window the combiner is run with.
const MIN_WINDOW: usize = 3;

struct Run {
    x: usize,
    y: usize,
    bg: u8,
    fg: u8,
    masks: Vec<u8>,
    uses_bg: bool,
    uses_fg: bool,
    has_mismatch: bool,
}

impl Run {
    fn start(x: usize, y: usize, bg: u8, fg: u8) -> Self {
        Self {
            x,
            y,
            bg,
            fg,
            masks: Vec::new(),
            uses_bg: false,
            uses_fg: false,
            has_mismatch: false,
        }
    }

    fn push(&mut self, mask: u8, mismatch: bool) {
        self.masks.push(mask);
        self.has_mismatch |= mismatch;
        self.uses_bg |= mask != 0xFF;
        self.uses_fg |= mask != 0;
    }

    /// Whether a cell can join the run as is.
    fn fits(&self, cell: Cell) -> bool {
        (cell.mask == 0xFF || self.bg == cell.bg) && (cell.mask == 0 || self.fg == cell.fg)
    }

    fn into_command(self, vertical: bool) -> Command {
        let (x, y) = (self.x as u8, self.y as u8);
        let len = self.masks.len() as u8;

        let fill = |color| {
            let (width, height) = if vertical { (1, len) } else { (len, 1) };
            Command::FillWithColor {
                x,
                y,
                width,
                height,
                color,
            }
        };

        if !self.uses_fg || self.bg == self.fg {
            fill(self.bg)
        } else if !self.uses_bg {
            fill(self.fg)
        } else {
            Command::set_with_color(x, y, self.masks, self.bg, self.fg, vertical)
        }
    }
}

/// Scans every line of `target` for runs that differ from `previous`.
///
/// With `sublines`, windows of neighbouring runs are also handed to the combiner.
pub(super) fn scan(
    previous: &CellImage,
    target: &CellImage,
    delta: &Delta,
    metric: &Metric,
    vertical: bool,
    sublines: bool,
) -> Vec<Candidate> {
    let lines = if vertical {
        target.width()
    } else {
        target.height()
    };

    (0..lines)
        .into_par_iter()
        .map(|line| scan_line(previous, target, delta, metric, line, vertical, sublines))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

fn scan_line(
    previous: &CellImage,
    target: &CellImage,
    delta: &Delta,
    metric: &Metric,
    line: usize,
    vertical: bool,
    sublines: bool,
) -> Vec<Candidate> {
    let len = if vertical {
        target.height()
    } else {
        target.width()
    };

    // every closed run once the line first differs from `previous`
    let mut line_cmds = Vec::new();
    // the runs that actually contain changes
    let mut candidates = Vec::new();
    let mut run: Option<Run> = None;

    let close = |run: Run, line_cmds: &mut Vec<Command>, candidates: &mut Vec<Candidate>| {
        if line_cmds.is_empty() && !run.has_mismatch {
            return;
        }

        // single cells are already covered by the horizontal scan
        let keep = run.has_mismatch && (!vertical || run.masks.len() > 1);
        let cmd = run.into_command(vertical);
        if keep {
            candidates.push(Candidate::single(cmd.clone()));
        }
        line_cmds.push(cmd);
    };

    for pos in 0..len {
        let (x, y) = if vertical { (line, pos) } else { (pos, line) };
        let mut cell = target.get(x, y);

        let mut color_mismatch = true;
        if let Some(current) = &run {
            color_mismatch = !current.fits(cell);
            if color_mismatch && current.fits(cell.inverted()) {
                cell = cell.inverted();
                color_mismatch = false;
            }
        }

        let tile_mismatch = !cell.matches(previous.get(x, y));

        if let Some(current) = run.take() {
            if color_mismatch || (!current.has_mismatch && tile_mismatch) {
                close(current, &mut line_cmds, &mut candidates);
            } else {
                run = Some(current);
            }
        }

        run.get_or_insert_with(|| Run::start(x, y, cell.bg, cell.fg))
            .push(cell.mask, tile_mismatch);
    }

    if let Some(current) = run.take() {
        close(current, &mut line_cmds, &mut candidates);
    }

    while let Some(last) = line_cmds.last() {
        let value = last.value(&mut CommandContext::new(), previous, target, delta, metric);
        if value >= TRIM_EPSILON {
            break;
        }
        line_cmds.pop();
    }

    if sublines && !line_cmds.is_empty() {
        let mut sizes = vec![MIN_WINDOW, line_cmds.len()];
        sizes.dedup();

        let merged = sizes
            .into_par_iter()
            .filter(|&size| size <= line_cmds.len())
            .map(|size| {
                line_cmds
                    .windows(size)
                    .flat_map(|window| combine::combine(previous, metric, window, vertical))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        candidates.extend(merged.into_iter().flatten());
    }

    candidates
}
