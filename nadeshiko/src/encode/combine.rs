//! Merges windows of neighbouring line runs into fewer, cheaper commands.

use super::Candidate;
use crate::{
    command::Command,
    image::{Cell, CellImage},
    palette::{color_distance, Metric},
};
use itertools::Itertools;

/// Windows using more colors than this skip the two-color remapping search.
const MAX_REMAP_COLORS: usize = 6;

/// Per-cell error the two-color remapping is allowed to introduce.
const REMAP_THRESHOLD: u32 = color_distance([0x10; 3], [0x28; 3]);

/// One run of the window, with fills expanded to masks.
struct Entry {
    x: u8,
    y: u8,
    bg: u8,
    fg: u8,
    masks: Vec<u8>,
}

impl Entry {
    fn from_command(cmd: &Command, vertical: bool) -> Option<Self> {
        match cmd {
            Command::SetWithColor {
                x, y, bg, fg, masks, ..
            } => Some(Self {
                x: *x,
                y: *y,
                bg: *bg,
                fg: *fg,
                masks: masks.clone(),
            }),
            Command::FillWithColor {
                x,
                y,
                width,
                height,
                color,
            } => {
                let len = if vertical { *height } else { *width };
                Some(Self {
                    x: *x,
                    y: *y,
                    bg: *color,
                    fg: *color,
                    masks: vec![0; usize::from(len)],
                })
            }
            _ => None,
        }
    }

    fn cells(&self, vertical: bool) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        let (x, y) = (usize::from(self.x), usize::from(self.y));
        self.masks.iter().enumerate().map(move |(i, &m)| {
            let cell = Cell::new(self.bg, self.fg, m);
            if vertical {
                (x, y + i, cell)
            } else {
                (x + i, y, cell)
            }
        })
    }

    fn same_colors(&self, other: &Entry) -> bool {
        self.bg == other.bg && self.fg == other.fg
    }
}

/// Covers `entries[start..=end]` with the colors of `entries[start]`.
fn span(entries: &[Entry], start: usize, end: usize, vertical: bool) -> Command {
    let first = &entries[start];
    let masks = entries[start..=end]
        .iter()
        .flat_map(|e| e.masks.iter().copied())
        .collect::<Vec<_>>();

    if first.bg == first.fg {
        let len = masks.len() as u8;
        let (width, height) = if vertical { (1, len) } else { (len, 1) };
        Command::FillWithColor {
            x: first.x,
            y: first.y,
            width,
            height,
            color: first.bg,
        }
    } else {
        Command::set_with_color(first.x, first.y, masks, first.bg, first.fg, vertical)
    }
}

/// Proposes merged replacements for a window of consecutive runs.
///
/// Symmetric color patterns are covered by one long command with the inner runs drawn on top.
/// Windows with few colors additionally get the best approximation using only two colors.
pub(super) fn combine(
    previous: &CellImage,
    metric: &Metric,
    window: &[Command],
    vertical: bool,
) -> Vec<Candidate> {
    let Some(entries) = window
        .iter()
        .map(|cmd| Entry::from_command(cmd, vertical))
        .collect::<Option<Vec<_>>>()
    else {
        return Vec::new();
    };

    let has_diff = entries.iter().any(|e| {
        e.cells(vertical)
            .any(|(x, y, cell)| metric.cell_distance(cell, previous.get(x, y)) != 0)
    });
    if entries.is_empty() || !has_diff {
        return Vec::new();
    }

    let mut out = Vec::new();
    let e = &entries;
    let mirrored = |a: usize, b: usize| e[a].same_colors(&e[b]);

    match e.len() {
        3 if mirrored(0, 2) => {
            out.push(Candidate::single(span(e, 0, 2, vertical)));
            out.push(Candidate::new(vec![span(e, 0, 2, vertical), window[1].clone()]));
        }
        4 if mirrored(0, 3) => {
            out.push(Candidate::single(span(e, 0, 3, vertical)));
            out.push(Candidate::new(vec![
                span(e, 0, 3, vertical),
                window[1].clone(),
                window[2].clone(),
            ]));
        }
        5 if mirrored(0, 4) && mirrored(1, 3) => {
            out.push(Candidate::single(span(e, 0, 4, vertical)));
            out.push(Candidate::single(span(e, 1, 3, vertical)));
            out.push(Candidate::new(vec![
                span(e, 0, 4, vertical),
                span(e, 1, 3, vertical),
                window[2].clone(),
            ]));
        }
        7 if mirrored(0, 6) && mirrored(1, 5) && mirrored(2, 4) => {
            out.push(Candidate::new(vec![
                span(e, 0, 6, vertical),
                span(e, 1, 5, vertical),
                span(e, 2, 4, vertical),
                window[3].clone(),
            ]));
        }
        8 if mirrored(0, 7) && mirrored(1, 3) && mirrored(4, 6) => {
            out.push(Candidate::new(vec![
                span(e, 0, 7, vertical),
                span(e, 1, 3, vertical),
                span(e, 4, 6, vertical),
                window[2].clone(),
                window[5].clone(),
            ]));
        }
        _ => {}
    }

    if let Some(remapped) = remap(metric, e, vertical) {
        out.push(Candidate::single(remapped));
    }

    out
}

/// Redraws the whole window using the best pair of its own colors.
fn remap(metric: &Metric, entries: &[Entry], vertical: bool) -> Option<Command> {
    let colors = entries
        .iter()
        .flat_map(|e| [e.bg, e.fg])
        .sorted_unstable()
        .dedup()
        .collect::<Vec<_>>();

    if colors.len() > MAX_REMAP_COLORS {
        return None;
    }

    let len = entries.iter().map(|e| e.masks.len()).sum::<usize>();
    let mut best_distance = u64::from(REMAP_THRESHOLD) * len as u64;
    let mut best = None;
    let mut masks = Vec::with_capacity(len);

    for (ci, cj) in colors.iter().copied().tuple_combinations() {
        masks.clear();
        let mut distance = 0;

        'entries: for e in entries {
            // which of the two colors replaces each of the entry's colors
            let j_for_bg = metric.palette_distance(cj, e.bg) < metric.palette_distance(ci, e.bg);
            let j_for_fg = metric.palette_distance(cj, e.fg) < metric.palette_distance(ci, e.fg);

            for &m in &e.masks {
                let remapped = match (j_for_bg, j_for_fg) {
                    (false, false) => 0,
                    (true, true) => 0xFF,
                    (true, false) => !m,
                    (false, true) => m,
                };
                masks.push(remapped);

                distance +=
                    metric.cell_distance(Cell::new(ci, cj, remapped), Cell::new(e.bg, e.fg, m));
                if distance >= best_distance {
                    break 'entries;
                }
            }
        }

        if distance < best_distance {
            best_distance = distance;
            best = Some((ci, cj, masks.clone()));
        }
    }

    let (ci, cj, masks) = best?;
    let first = &entries[0];
    Some(Command::set_with_color(first.x, first.y, masks, ci, cj, vertical))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(x: u8, len: u8, color: u8) -> Command {
        Command::FillWithColor {
            x,
            y: 0,
            width: len,
            height: 1,
            color,
        }
    }

    #[test]
    fn symmetric_window() {
        let metric = Metric::default();
        let previous = CellImage::new(6, 1);
        let window = [fill(0, 2, 100), fill(2, 1, 50), fill(3, 3, 100)];

        let out = combine(&previous, &metric, &window, false);
        assert_eq!(out[0].commands, [fill(0, 6, 100)]);
        assert_eq!(out[1].commands, [fill(0, 6, 100), fill(2, 1, 50)]);
    }

    #[test]
    fn unchanged_window_is_skipped() {
        let metric = Metric::default();
        let window = [fill(0, 2, 100), fill(2, 1, 50), fill(3, 3, 100)];

        let mut previous = CellImage::new(6, 1);
        for (x, color) in [100, 100, 50, 100, 100, 100].into_iter().enumerate() {
            previous.set(x, 0, Cell::flat(color));
        }

        assert!(combine(&previous, &metric, &window, false).is_empty());
    }

    #[test]
    fn two_color_window_is_remapped() {
        let metric = Metric::default();
        let previous = CellImage::new(3, 1);
        let window = [
            fill(0, 1, 100),
            Command::set_with_color(1, 0, vec![0x0F], 100, 50, false),
            fill(2, 1, 50),
        ];

        let out = combine(&previous, &metric, &window, false);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].commands,
            [Command::SetWithColor {
                x: 0,
                y: 0,
                bg: 100,
                fg: 50,
                masks: vec![0x00, 0x0F, 0xFF],
                vertical: false,
            }]
        );
    }

    #[test]
    fn distant_colors_are_not_remapped() {
        let metric = Metric::default();
        let previous = CellImage::new(3, 1);
        let window = [fill(0, 1, 16), fill(1, 1, 100), fill(2, 1, 255)];

        assert!(combine(&previous, &metric, &window, false).is_empty());
    }

    #[test]
    fn non_runs_are_ignored() {
        let metric = Metric::default();
        let previous = CellImage::new(3, 1);
        assert!(combine(&previous, &metric, &[Command::EndFrame], false).is_empty());
    }
}
