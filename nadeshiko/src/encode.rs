//! The budgeted frame encoder.
//!
//! Every frame is encoded as a diff against the canvas the previous frames left behind:
//!
//! 1. candidates are gathered: runs along rows and columns (plus merged windows of them) and
//!    single-color rectangles
//! 2. the candidate with the best value per squared cost is applied, until the budget is spent
//! 3. whenever the best candidate doesn't fit, the frame's command list is squeezed: commands
//!    that later commands overwrite are dropped or shrunk, and the list is replayed
//!
//! The first frame has no budget and simply draws every run that differs.

use crate::{
    command::{Command, CommandContext},
    delta::Delta,
    image::{Cell, CellImage},
    palette::Metric,
    quantize::{self, DitherMatrix, QuantizeError},
    utils::Rgb,
};
use rayon::prelude::*;
use snafu::{ensure, ResultExt, Snafu};
use tracing::{debug, trace};

mod combine;
mod rects;
mod scan;
mod squeeze;
mod write;

/// Cost budget of every frame after the first.
pub const DEFAULT_BUDGET: u32 = 254;

/// Largest width or height in cells a stream can describe.
pub const MAX_CELLS: usize = u8::MAX as usize;

/// Candidates worth less than this end the frame.
const MIN_VALUE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Cost limit of every frame but the first.
    pub budget: u32,
    /// Dither matrix used when quantizing RGB frames.
    pub dither: DitherMatrix,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            dither: DitherMatrix::bayer2(),
        }
    }
}

/// What went into one encoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub frame: usize,
    /// Commands emitted, not counting the end-of-frame marker.
    pub commands: usize,
    pub cost: u32,
    pub line_candidates: usize,
    pub rect_candidates: usize,
    /// Remaining distance between the canvas and the frame.
    pub residual: u64,
}

#[derive(Debug, Snafu)]
pub enum EncodeError {
    #[snafu(display("Frame can't be quantized: {source}"))]
    InvalidDimensions { source: QuantizeError },
    #[snafu(display(
        "Frame is {width}x{height} cells, but streams hold between 1x1 and 255x255 cells"
    ))]
    TooLarge { width: usize, height: usize },
    #[snafu(display(
        "Frame is {width}x{height} cells, but the stream is {expected_width}x{expected_height}"
    ))]
    DimensionMismatch {
        width: usize,
        height: usize,
        expected_width: u8,
        expected_height: u8,
    },
    WriteIo {
        source: std::io::Error,
    },
}

/// A group of commands that is applied as a whole.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate {
    pub commands: Vec<Command>,
}

impl Candidate {
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    pub fn single(cmd: Command) -> Self {
        Self::new(vec![cmd])
    }

    /// Total cost, taking the register changes of earlier commands into account.
    pub fn cost(&self, ctx: &CommandContext) -> u32 {
        let mut ctx = *ctx;
        self.commands
            .iter()
            .map(|cmd| {
                let cost = cmd.cost(&ctx);
                cmd.update_registers(&mut ctx);
                cost
            })
            .sum()
    }

    pub fn value(
        &self,
        ctx: &CommandContext,
        canvas: &CellImage,
        target: &CellImage,
        delta: &Delta,
        metric: &Metric,
    ) -> f64 {
        let mut scratch = ctx.fork(true);
        self.commands
            .iter()
            .map(|cmd| cmd.value(&mut scratch, canvas, target, delta, metric))
            .sum()
    }
}

/// Identifies the state a cached value was computed in.
///
/// Applying candidates without touching the registers keeps the key, so cached values may be
/// slightly stale. `epoch` changes whenever a squeeze rewrites the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScoreKey {
    frame: usize,
    epoch: u32,
    generation: u32,
}

#[derive(Debug, Clone, Copy)]
struct Pick {
    index: usize,
    cost: u32,
    value: f64,
    ratio: f64,
}

/// The candidates of one frame with their cached values and consumed flags.
struct Pool {
    candidates: Vec<Candidate>,
    scores: Vec<Option<(ScoreKey, f64)>>,
    consumed: Vec<bool>,
}

impl Pool {
    fn new(candidates: Vec<Candidate>) -> Self {
        let len = candidates.len();
        Self {
            candidates,
            scores: vec![None; len],
            consumed: vec![false; len],
        }
    }

    /// The unconsumed candidate with the best value per squared cost, lowest index on ties.
    ///
    /// With a `limit`, only candidates costing at most that much are considered.
    #[allow(clippy::too_many_arguments)]
    fn select(
        &mut self,
        key: ScoreKey,
        limit: Option<u32>,
        ctx: &CommandContext,
        canvas: &CellImage,
        target: &CellImage,
        delta: &Delta,
        metric: &Metric,
    ) -> Option<Pick> {
        self.scores
            .par_iter_mut()
            .zip(self.candidates.par_iter())
            .zip(self.consumed.par_iter())
            .enumerate()
            .filter_map(|(index, ((score, candidate), &consumed))| {
                if consumed {
                    return None;
                }

                let cost = candidate.cost(ctx);
                if limit.map_or(false, |limit| cost > limit) {
                    return None;
                }

                let value = match *score {
                    Some((cached, value)) if cached == key => value,
                    _ => {
                        let value = candidate.value(ctx, canvas, target, delta, metric);
                        *score = Some((key, value));
                        value
                    }
                };

                let div = f64::from(cost.max(1));
                Some(Pick {
                    index,
                    cost,
                    value,
                    ratio: value / (div * div),
                })
            })
            .reduce_with(|a, b| {
                if b.ratio > a.ratio || (b.ratio == a.ratio && b.index < a.index) {
                    b
                } else {
                    a
                }
            })
    }
}

/// Result of encoding one frame.
struct EncodedFrame {
    commands: Vec<Command>,
    canvas: CellImage,
    context: CommandContext,
    stats: FrameStats,
}

/// Runs `commands` from the frame's starting state.
fn replay(
    start: &CellImage,
    mut ctx: CommandContext,
    commands: &[Command],
) -> (CellImage, CommandContext, u32) {
    let mut canvas = start.clone();
    let mut cost = 0;
    for cmd in commands {
        cost += cmd.cost(&ctx);
        cmd.apply(&mut ctx, &mut canvas);
    }
    (canvas, ctx, cost)
}

/// A frame's command list after squeezing, replayed.
struct Squeezed {
    commands: Vec<Command>,
    canvas: CellImage,
    context: CommandContext,
    cost: u32,
}

/// Squeezes `commands` and replays the result from the frame's starting state.
///
/// Dropping a command can leave later ones with colder registers, so the result is only taken
/// if it costs at most `cost`.
fn squeeze_frame(
    previous: &CellImage,
    start: CommandContext,
    commands: &[Command],
    cost: u32,
) -> Option<Squeezed> {
    let squeezed = squeeze::squeeze(commands, previous.width(), previous.height())?;
    let (canvas, context, new_cost) = replay(previous, start, &squeezed);

    (new_cost <= cost).then_some(Squeezed {
        commands: squeezed,
        canvas,
        context,
        cost: new_cost,
    })
}

/// What the first frame is diffed against: the target with every mask inverted.
///
/// Inverting a cell that shows a single color still matches it, so such cells start out as a
/// neighboring flat color instead.
fn first_prior(target: &CellImage) -> CellImage {
    let mut prior = target.inverted_masks();
    for y in 0..target.height() {
        for x in 0..target.width() {
            let cell = target.get(x, y);
            if cell.bg == cell.fg {
                prior.set(x, y, Cell::flat(cell.bg ^ 1));
            }
        }
    }
    prior
}

/// Draws every run differing from the inverted frame, best value first, without a budget.
fn encode_first(metric: &Metric, target: &CellImage) -> EncodedFrame {
    let prior = first_prior(target);
    let delta = Delta::new(&prior, target, metric);
    let start = CommandContext::new();

    let candidates = scan::scan(&prior, target, &delta, metric, false, false);
    let line_candidates = candidates.len();

    let mut scored = candidates
        .into_par_iter()
        .map(|c| (c.value(&start, &prior, target, &delta, metric), c))
        .collect::<Vec<_>>();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let commands = scored
        .into_iter()
        .flat_map(|(_, c)| c.commands)
        .collect::<Vec<_>>();

    // the decoder starts out with a blank canvas
    let blank = CellImage::new(target.width(), target.height());
    let (canvas, context, cost) = replay(&blank, start, &commands);

    let residual = Delta::new(&canvas, target, metric).total();
    EncodedFrame {
        stats: FrameStats {
            frame: 0,
            commands: commands.len(),
            cost,
            line_candidates,
            rect_candidates: 0,
            residual,
        },
        commands,
        canvas,
        context,
    }
}

fn encode_next(
    metric: &Metric,
    budget: u32,
    frame: usize,
    previous: &CellImage,
    start: CommandContext,
    target: &CellImage,
) -> EncodedFrame {
    let mut delta = Delta::new(previous, target, metric);

    let mut candidates = scan::scan(previous, target, &delta, metric, false, true);
    candidates.extend(scan::scan(previous, target, &delta, metric, true, true));
    let line_candidates = candidates.len();

    candidates.extend(
        rects::find(target, previous)
            .into_iter()
            .map(|r| Candidate::single(r.to_command())),
    );
    let rect_candidates = candidates.len() - line_candidates;
    trace!(frame, line_candidates, rect_candidates, "gathered candidates");

    let mut pool = Pool::new(candidates);
    let mut canvas = previous.clone();
    let mut ctx = start;
    let mut commands = Vec::new();
    let mut cost = 0;
    let mut epoch = 0;
    let mut last_breath = false;

    while cost <= budget {
        let key = ScoreKey {
            frame,
            epoch,
            generation: ctx.generation(),
        };
        let limit = last_breath.then(|| budget - cost);
        let pick = pool.select(key, limit, &ctx, &canvas, target, &delta, metric);

        if !pick.map_or(false, |p| cost + p.cost < budget) {
            if let Some(squeezed) = squeeze_frame(previous, start, &commands, cost) {
                trace!(
                    frame,
                    before = commands.len(),
                    after = squeezed.commands.len(),
                    cost_before = cost,
                    cost_after = squeezed.cost,
                    "squeezed"
                );

                commands = squeezed.commands;
                canvas = squeezed.canvas;
                ctx = squeezed.context;
                cost = squeezed.cost;
                delta.recalc_all(&canvas, target, metric);
                epoch += 1;
                continue;
            }
        }

        let Some(pick) = pick else {
            break;
        };
        pool.consumed[pick.index] = true;

        if pick.value <= MIN_VALUE {
            break;
        }

        if cost + pick.cost <= budget {
            cost += pick.cost;
            for cmd in &pool.candidates[pick.index].commands {
                cmd.apply(&mut ctx, &mut canvas);
                if let Some(region) = cmd.region() {
                    delta.refresh(region, &canvas, target, metric);
                }
                commands.push(cmd.clone());
            }
        } else if cost >= budget {
            break;
        } else {
            // only candidates that fit the rest of the budget from here on
            last_breath = true;
        }
    }

    EncodedFrame {
        stats: FrameStats {
            frame,
            commands: commands.len(),
            cost,
            line_candidates,
            rect_candidates,
            residual: delta.total(),
        },
        commands,
        canvas,
        context: ctx,
    }
}

/// Encodes a sequence of frames into one command stream.
#[derive(Debug, Clone)]
pub struct Encoder {
    options: EncodeOptions,
    metric: Metric,
    size: Option<(u8, u8)>,
    canvas: Option<CellImage>,
    context: CommandContext,
    commands: Vec<Command>,
    /// Index into `commands` just past each frame's end marker.
    frame_ends: Vec<usize>,
}

impl Encoder {
    /// Creates an encoder for the default palette. Builds the metric's lookup tables.
    pub fn new(options: EncodeOptions) -> Self {
        Self::with_metric(options, Metric::default())
    }

    pub fn with_metric(options: EncodeOptions, metric: Metric) -> Self {
        Self {
            options,
            metric,
            size: None,
            canvas: None,
            context: CommandContext::new(),
            commands: Vec::new(),
            frame_ends: Vec::new(),
        }
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Changes the budget of the frames encoded from now on.
    pub fn set_budget(&mut self, budget: u32) {
        self.options.budget = budget;
    }

    pub fn metric(&self) -> &Metric {
        &self.metric
    }

    /// Stream dimensions in cells, fixed by the first frame.
    pub fn size(&self) -> Option<(u8, u8)> {
        self.size
    }

    pub fn frame_count(&self) -> usize {
        self.frame_ends.len()
    }

    /// Every command emitted so far, including end-of-frame markers.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Commands of a single frame, including its end-of-frame marker.
    pub fn frame_commands(&self, frame: usize) -> Option<&[Command]> {
        let end = *self.frame_ends.get(frame)?;
        let start = match frame {
            0 => 0,
            _ => self.frame_ends[frame - 1],
        };
        Some(&self.commands[start..end])
    }

    /// What the display shows after the last encoded frame.
    pub fn canvas(&self) -> Option<&CellImage> {
        self.canvas.as_ref()
    }

    /// Quantizes an RGB raster with the configured dither matrix.
    pub fn quantize(
        &self,
        width: usize,
        height: usize,
        pixels: &[Rgb],
    ) -> Result<CellImage, EncodeError> {
        quantize::quantize(&self.metric, &self.options.dither, width, height, pixels)
            .context(InvalidDimensionsSnafu)
    }

    /// Quantizes and encodes an RGB frame of `width` by `height` pixels.
    pub fn encode_frame(
        &mut self,
        width: usize,
        height: usize,
        pixels: &[Rgb],
    ) -> Result<FrameStats, EncodeError> {
        let target = self.quantize(width, height, pixels)?;
        self.encode_cells(target)
    }

    /// Encodes an already quantized frame.
    pub fn encode_cells(&mut self, target: CellImage) -> Result<FrameStats, EncodeError> {
        let (width, height) = (target.width(), target.height());
        ensure!(
            (1..=MAX_CELLS).contains(&width) && (1..=MAX_CELLS).contains(&height),
            TooLargeSnafu { width, height }
        );

        if let Some((expected_width, expected_height)) = self.size {
            ensure!(
                width == usize::from(expected_width) && height == usize::from(expected_height),
                DimensionMismatchSnafu {
                    width,
                    height,
                    expected_width,
                    expected_height
                }
            );
        }

        let frame = self.frame_count();
        let encoded = match &self.canvas {
            None => encode_first(&self.metric, &target),
            Some(previous) => encode_next(
                &self.metric,
                self.options.budget,
                frame,
                previous,
                self.context,
                &target,
            ),
        };

        let stats = encoded.stats;
        debug!(
            frame,
            commands = stats.commands,
            cost = stats.cost,
            line_candidates = stats.line_candidates,
            rect_candidates = stats.rect_candidates,
            residual = stats.residual,
            "encoded frame"
        );

        self.size = Some((width as u8, height as u8));
        self.commands.extend(encoded.commands);
        self.commands.push(Command::EndFrame);
        self.frame_ends.push(self.commands.len());
        self.canvas = Some(encoded.canvas);
        self.context = encoded.context.fork(false);

        Ok(stats)
    }
}
