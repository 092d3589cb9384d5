//! Compaction of a frame's command list.

use crate::command::{Command, CommandContext};

/// Cells written by later commands of the frame.
struct Coverage {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl Coverage {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    /// Cells outside of the image count as covered, nothing can be seen there.
    fn covered(&self, x: usize, y: usize) -> bool {
        x >= self.width || y >= self.height || self.cells[y * self.width + x]
    }

    fn covers(&self, cmd: &Command) -> bool {
        cmd.region()
            .into_iter()
            .flat_map(|r| r.cells(self.width, self.height))
            .all(|(x, y)| self.covered(x, y))
    }

    fn add(&mut self, cmd: &Command) {
        if let Some(region) = cmd.region() {
            for (x, y) in region.cells(self.width, self.height) {
                self.cells[y * self.width + x] = true;
            }
        }
    }
}

/// Drops commands that later commands overwrite completely, and shrinks rectangle fills whose
/// border rows or columns are overwritten if that makes them cheaper.
///
/// Returns `None` if nothing could be removed.
pub(super) fn squeeze(commands: &[Command], width: usize, height: usize) -> Option<Vec<Command>> {
    let mut coverage = Coverage::new(width, height);
    let mut changed = false;
    let mut kept = Vec::with_capacity(commands.len());

    for cmd in commands.iter().rev() {
        if cmd.region().is_none() {
            kept.push(cmd.clone());
            continue;
        }

        if coverage.covers(cmd) {
            changed = true;
            continue;
        }

        let cmd = match shrink(cmd, &coverage) {
            Some(smaller) => {
                changed = true;
                smaller
            }
            None => cmd.clone(),
        };

        coverage.add(&cmd);
        kept.push(cmd);
    }

    kept.reverse();
    changed.then_some(kept)
}

/// A smaller fill with fully covered border rows and columns removed, if it is cheaper.
fn shrink(cmd: &Command, coverage: &Coverage) -> Option<Command> {
    let &Command::FillWithColor {
        x,
        y,
        width,
        height,
        color,
    } = cmd
    else {
        return None;
    };

    if width < 2 || height < 2 {
        return None;
    }

    let (mut x1, mut y1) = (usize::from(x), usize::from(y));
    let (mut x2, mut y2) = (x1 + usize::from(width) - 1, y1 + usize::from(height) - 1);

    let row = |y: usize, x1: usize, x2: usize| (x1..=x2).all(|x| coverage.covered(x, y));
    let column = |x: usize, y1: usize, y2: usize| (y1..=y2).all(|y| coverage.covered(x, y));

    while y1 < y2 && row(y1, x1, x2) {
        y1 += 1;
    }
    while y1 < y2 && row(y2, x1, x2) {
        y2 -= 1;
    }
    while x1 < x2 && column(x1, y1, y2) {
        x1 += 1;
    }
    while x1 < x2 && column(x2, y1, y2) {
        x2 -= 1;
    }

    let smaller = Command::FillWithColor {
        x: x1 as u8,
        y: y1 as u8,
        width: (x2 - x1 + 1) as u8,
        height: (y2 - y1 + 1) as u8,
        color,
    };

    let cold = CommandContext::new();
    (smaller.cost(&cold) < cmd.cost(&cold)).then_some(smaller)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(x: u8, y: u8, width: u8, height: u8, color: u8) -> Command {
        Command::FillWithColor {
            x,
            y,
            width,
            height,
            color,
        }
    }

    #[test]
    fn nothing_to_squeeze() {
        let commands = [fill(0, 0, 2, 2, 5), fill(2, 0, 2, 2, 6)];
        assert_eq!(squeeze(&commands, 4, 4), None);
    }

    #[test]
    fn overwritten_commands_are_dropped() {
        let commands = [
            Command::set_with_color(1, 1, vec![0x0F, 0xF0], 9, 5, false),
            fill(0, 0, 4, 4, 6),
            Command::SetColor {
                register: crate::Register::Fg,
                color: 3,
            },
        ];

        assert_eq!(
            squeeze(&commands, 4, 4),
            Some(vec![commands[1].clone(), commands[2].clone()])
        );
    }

    #[test]
    fn fills_shrink_to_a_line() {
        // the bottom row of the 4x2 fill gets overwritten
        let commands = [fill(0, 0, 4, 2, 5), fill(0, 1, 4, 1, 6)];
        assert_eq!(
            squeeze(&commands, 4, 4),
            Some(vec![fill(0, 0, 4, 1, 5), fill(0, 1, 4, 1, 6)])
        );
    }

    #[test]
    fn partial_shrink_is_not_worth_it() {
        // still a rectangle after losing its top row
        let commands = [fill(0, 0, 3, 3, 5), fill(0, 0, 3, 1, 6)];
        assert_eq!(squeeze(&commands, 4, 4), None);
    }
}
