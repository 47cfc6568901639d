//! Engine state machine
//!
//! [`RasterParser`] consumes [`EngineMessage`]s strictly in order and writes
//! [`EngineReply`]s to a sink. It owns everything that is sequential across
//! lines: the tile store, the command emitter state and the direction toggle.

use crate::emitter::{CommandEmitter, EmitterConfig};
use crate::message::{CellData, ChunkKind, EngineInit, EngineMessage, EngineReply, GcodeData};
use crate::scan::{ScanLine, ScanOrder};
use crate::tiles::TileStore;
use crate::trim::trim_line;
use rasterkit_core::{BoxedIterator, Error, PixelCoord, ProtocolError, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Idle,
    Initialized,
    Streaming,
    Done,
}

impl fmt::Display for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParserState::Idle => "idle",
            ParserState::Initialized => "initialized",
            ParserState::Streaming => "streaming",
            ParserState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Per-run engine data, created by `init`.
#[derive(Debug)]
struct RunContext {
    init: EngineInit,
    order: ScanOrder,
    store: TileStore,
    emitter: CommandEmitter,
    reverse: bool,
}

impl RunContext {
    fn new(init: EngineInit) -> Result<Self> {
        init.settings.validate()?;
        let store = TileStore::new(init.image_size, init.grid_size, init.settings.buffer_size)?;
        let emitter = CommandEmitter::new(EmitterConfig::new(&init.settings, &init.derived));

        Ok(Self {
            order: ScanOrder::from_diagonal(init.settings.diagonal),
            init,
            store,
            emitter,
            reverse: true,
        })
    }

    /// Commands for one scan line, or `None` when the line is skipped.
    fn process_line(&mut self, line: &ScanLine) -> Result<Option<String>> {
        let pixels = if self.init.settings.trim_line {
            match trim_line(&line.pixels, &self.store)? {
                Some(pixels) => pixels,
                None => return Ok(None),
            }
        } else {
            line.pixels.as_slice()
        };

        self.reverse = !self.reverse;

        let ordered: BoxedIterator<'_, PixelCoord> =
            if self.order == ScanOrder::Rows && self.reverse {
                Box::new(pixels.iter().rev().copied())
            } else {
                Box::new(pixels.iter().copied())
            };
        self.emitter.emit(ordered, &self.store)
    }
}

/// Sequential rasterization engine.
#[derive(Debug)]
pub struct RasterParser {
    state: ParserState,
    run: Option<RunContext>,
}

impl Default for RasterParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Idle,
            run: None,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Handle one message.
    ///
    /// `parse` streams the whole run into `sink` before returning and checks
    /// `cancel` between lines. Any error ends the run without a `done` reply.
    pub fn handle<F>(&mut self, message: EngineMessage, sink: &mut F, cancel: &AtomicBool) -> Result<()>
    where
        F: FnMut(EngineReply) -> Result<()>,
    {
        let result = match (self.state, message) {
            (ParserState::Idle, EngineMessage::Init(init)) => self.init(*init),
            (ParserState::Initialized | ParserState::Streaming, EngineMessage::AddCell(cell)) => {
                self.add_cell(cell)
            }
            (ParserState::Initialized, EngineMessage::Parse) => self.parse(sink, cancel),
            (state, message) => Err(ProtocolError::UnexpectedMessage {
                state: state.to_string(),
                message: message.name().to_string(),
            }
            .into()),
        };

        if result.is_err() {
            self.state = ParserState::Done;
            self.run = None;
        }
        result
    }

    fn init(&mut self, init: EngineInit) -> Result<()> {
        info!(
            version = %init.version,
            image_size = %init.image_size,
            grid_x = init.grid_size.x,
            grid_y = init.grid_size.y,
            "Engine initialized"
        );
        self.run = Some(RunContext::new(init)?);
        self.state = ParserState::Initialized;
        Ok(())
    }

    fn add_cell(&mut self, cell: CellData) -> Result<()> {
        let run = self.context()?;
        debug!(x = cell.x, y = cell.y, bytes = cell.buffer.len(), "Tile received");
        run.store.insert(cell.coord(), cell.buffer)
    }

    fn parse<F>(&mut self, sink: &mut F, cancel: &AtomicBool) -> Result<()>
    where
        F: FnMut(EngineReply) -> Result<()>,
    {
        self.state = ParserState::Streaming;
        let run = self.context()?;

        if let Some(missing) = run.store.first_missing() {
            return Err(ProtocolError::MissingTile {
                x: missing.x,
                y: missing.y,
            }
            .into());
        }

        info!(order = %run.order, "Rasterization started");
        sink(EngineReply::Gcode(GcodeData {
            text: header(&run.init),
            percent: 0,
            kind: Some(ChunkKind::Header),
        }))?;

        let mut emitted = 0usize;
        for line in run.order.lines(run.store.image_size()) {
            if cancel.load(Ordering::Relaxed) {
                warn!(emitted, "Rasterization cancelled");
                return Err(Error::Cancelled);
            }

            if let Some(text) = run.process_line(&line)? {
                trace!(percent = line.percent, pixels = line.pixels.len(), "Line emitted");
                emitted += 1;
                sink(EngineReply::Gcode(GcodeData {
                    text,
                    percent: line.percent,
                    kind: None,
                }))?;
            }
        }

        sink(EngineReply::Done)?;
        info!(emitted, "Rasterization finished");
        self.state = ParserState::Done;
        self.run = None;
        Ok(())
    }

    fn context(&mut self) -> Result<&mut RunContext> {
        let state = self.state;
        self.run.as_mut().ok_or_else(|| {
            ProtocolError::UnexpectedMessage {
                state: state.to_string(),
                message: "no run".to_string(),
            }
            .into()
        })
    }
}

/// Commented run metadata followed by the feed-rate setup commands.
pub fn header(init: &EngineInit) -> String {
    let settings = &init.settings;
    let derived = &init.derived;
    let mut lines = vec![
        format!("; Generated by rasterkit - {}", init.version),
        format!(
            "; Size       : {} x {} mm",
            number(init.image_size.width as f64 * settings.beam_size),
            number(init.image_size.height as f64 * settings.beam_size)
        ),
        format!(
            "; Resolution : {} PPM - {} PPI",
            number(derived.ppm),
            settings.ppi
        ),
        format!("; Beam size  : {} mm", number(settings.beam_size)),
        format!(
            "; Beam range : {} to {}",
            number(derived.beam_range.min),
            number(derived.beam_range.max)
        ),
        format!(
            "; Beam power : {} to {} %",
            number(settings.beam_power.min),
            number(settings.beam_power.max)
        ),
        format!("; Feed rate  : {} mm/min", number(settings.feed_rate)),
    ];

    let options = settings.enabled_options();
    if !options.is_empty() {
        lines.push(format!("; Options    : {}", options.join(", ")));
    }

    let feed = number(settings.feed_rate);
    lines.push(String::new());
    lines.push(format!("G0 F{feed}"));
    lines.push(format!("G1 F{feed}"));
    lines.push(String::new());
    lines.join("\n")
}

/// Shortest display of `value` after rounding away float noise.
fn number(value: f64) -> String {
    let rounded = (value * 1e10).round() / 1e10;
    format!("{}", rounded + 0.0)
}
