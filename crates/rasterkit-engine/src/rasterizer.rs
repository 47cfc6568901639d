//! Orchestrator
//!
//! [`Rasterizer`] tiles a pixel source on the calling thread, then hands the
//! tiles to a dedicated engine thread over a message channel. The engine
//! streams header, chunk and done replies back through a second channel,
//! which [`RasterRun`] exposes as a sequence of [`OutputEvent`]s.

use crate::message::{EngineInit, EngineMessage, EngineReply, OutputEvent};
use crate::parser::{ParserState, RasterParser};
use crate::source::PixelSource;
use crate::tiles::TileGrid;
use chrono::{DateTime, Utc};
use rasterkit_core::{Error, GridSize, ImageSize, ProtocolError, Result};
use rasterkit_settings::{DerivedSettings, RasterSettings};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, info_span};
use uuid::Uuid;

/// Version written into the header of every run.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identifier attached to the logs of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Shared cancellation flag, checked by the engine between lines.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn flag(&self) -> &AtomicBool {
        &self.0
    }
}

/// A tiled image ready to be streamed to the engine.
#[derive(Debug)]
pub struct PreparedImage {
    init: EngineInit,
    grid: TileGrid,
}

impl PreparedImage {
    pub fn image_size(&self) -> ImageSize {
        self.init.image_size
    }

    pub fn grid_size(&self) -> GridSize {
        self.init.grid_size
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Every message of a run, in protocol order.
    pub fn into_messages(self) -> impl Iterator<Item = EngineMessage> {
        std::iter::once(EngineMessage::Init(Box::new(self.init)))
            .chain(
                self.grid
                    .into_tiles()
                    .into_iter()
                    .map(|tile| EngineMessage::AddCell(tile.into())),
            )
            .chain(std::iter::once(EngineMessage::Parse))
    }
}

/// Entry point for converting pixel sources to G-code.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    settings: RasterSettings,
    derived: DerivedSettings,
}

impl Rasterizer {
    /// Validate `settings`; invalid settings never produce output.
    pub fn new(settings: RasterSettings) -> Result<Self> {
        let settings = settings.validated()?;
        let derived = DerivedSettings::from_settings(&settings);
        Ok(Self { settings, derived })
    }

    pub fn settings(&self) -> &RasterSettings {
        &self.settings
    }

    pub fn derived(&self) -> &DerivedSettings {
        &self.derived
    }

    /// Scale and tile `source`.
    pub fn prepare<S: PixelSource + ?Sized>(&self, source: &S) -> Result<PreparedImage> {
        let (width, height) = source.dimensions();
        let image_size = self.derived.image_size(width, height);
        let grid = TileGrid::build(
            source,
            image_size,
            self.settings.buffer_size,
            self.settings.smoothing,
        );

        Ok(PreparedImage {
            init: EngineInit {
                version: ENGINE_VERSION.to_string(),
                settings: self.settings.clone(),
                derived: self.derived,
                image_size,
                grid_size: grid.grid_size(),
            },
            grid,
        })
    }

    /// Tile `source` and start a run on a new engine thread.
    pub fn rasterize<S: PixelSource + ?Sized>(&self, source: &S) -> Result<RasterRun> {
        let prepared = self.prepare(source)?;
        self.start(prepared)
    }

    /// Start a run for an already prepared image.
    pub fn start(&self, prepared: PreparedImage) -> Result<RasterRun> {
        let run_id = RunId::new();
        let cancel = CancelToken::new();
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();

        info!(
            run_id = %run_id,
            image_size = %prepared.image_size(),
            tiles = prepared.grid_size().tile_count(),
            "Starting rasterization"
        );

        let worker = {
            let cancel = cancel.clone();
            thread::Builder::new()
                .name(format!("rasterkit-engine-{run_id}"))
                .spawn(move || run_engine(run_id, message_rx, reply_tx, cancel))?
        };

        for message in prepared.into_messages() {
            if send(&message_tx, message).is_err() {
                // The engine has already stopped; its error is reported by the run.
                break;
            }
        }

        Ok(RasterRun {
            run_id,
            started_at: Utc::now(),
            started: Instant::now(),
            cancel,
            replies: reply_rx,
            worker: Some(worker),
            finished: false,
        })
    }
}

fn send(tx: &UnboundedSender<EngineMessage>, message: EngineMessage) -> Result<()> {
    tx.send(message)
        .map_err(|_| ProtocolError::ChannelClosed.into())
}

/// Engine thread body.
fn run_engine(
    run_id: RunId,
    mut messages: UnboundedReceiver<EngineMessage>,
    replies: UnboundedSender<EngineReply>,
    cancel: CancelToken,
) -> Result<()> {
    let span = info_span!("raster_run", run_id = %run_id);
    let _entered = span.enter();

    let mut parser = RasterParser::new();
    let mut sink = |reply: EngineReply| -> Result<()> {
        replies
            .send(reply)
            .map_err(|_| ProtocolError::ChannelClosed.into())
    };

    while let Some(message) = messages.blocking_recv() {
        if let Err(e) = parser.handle(message, &mut sink, cancel.flag()) {
            error!("Engine stopped: {}", e);
            return Err(e);
        }
        if parser.state() == ParserState::Done {
            return Ok(());
        }
    }

    Err(ProtocolError::EngineStopped(format!(
        "message channel closed in {} state",
        parser.state()
    ))
    .into())
}

/// Handle on a running rasterization.
///
/// Events arrive in order: one header, the chunks, then done. If the engine
/// fails, the error is yielded once in place of done and the sequence ends.
/// Dropping the run cancels it.
#[derive(Debug)]
pub struct RasterRun {
    run_id: RunId,
    started_at: DateTime<Utc>,
    started: Instant,
    cancel: CancelToken,
    replies: UnboundedReceiver<EngineReply>,
    worker: Option<JoinHandle<Result<()>>>,
    finished: bool,
}

impl RasterRun {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Ask the engine to stop before its next line.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub async fn next_event(&mut self) -> Option<Result<OutputEvent>> {
        if self.finished {
            return None;
        }
        let reply = self.replies.recv().await;
        Some(self.accept(reply))
    }

    /// Blocking variant of [`next_event`](Self::next_event).
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_next_event(&mut self) -> Option<Result<OutputEvent>> {
        if self.finished {
            return None;
        }
        let reply = self.replies.blocking_recv();
        Some(self.accept(reply))
    }

    pub async fn collect(mut self) -> Result<RasterOutput> {
        let mut output = OutputCollector::default();
        while let Some(event) = self.next_event().await {
            output.push(event?);
        }
        output.finish(self.run_id, self.started_at, self.started.elapsed())
    }

    pub fn blocking_collect(mut self) -> Result<RasterOutput> {
        let mut output = OutputCollector::default();
        while let Some(event) = self.blocking_next_event() {
            output.push(event?);
        }
        output.finish(self.run_id, self.started_at, self.started.elapsed())
    }

    fn accept(&mut self, reply: Option<EngineReply>) -> Result<OutputEvent> {
        match reply.map(OutputEvent::from) {
            Some(OutputEvent::Done) => {
                self.finished = true;
                self.worker = None;
                info!(run_id = %self.run_id, elapsed = ?self.started.elapsed(), "Rasterization complete");
                Ok(OutputEvent::Done)
            }
            Some(event) => Ok(event),
            None => {
                self.finished = true;
                Err(self.worker_error())
            }
        }
    }

    /// Error of an engine that closed its channel without `done`.
    fn worker_error(&mut self) -> Error {
        // The reply sender is gone, so the thread is already returning.
        match self.worker.take().map(JoinHandle::join) {
            Some(Ok(Err(e))) => e,
            Some(Err(_)) => ProtocolError::EngineStopped("engine thread panicked".to_string()).into(),
            _ => ProtocolError::EngineStopped("no completion signal".to_string()).into(),
        }
    }
}

impl Drop for RasterRun {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel.cancel();
        }
    }
}

/// One emitted line of commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcodeChunk {
    pub text: String,
    pub percent: u8,
}

/// Collected result of a completed run.
#[derive(Debug, Clone)]
pub struct RasterOutput {
    pub run_id: RunId,
    pub header: String,
    /// Header followed by every chunk, newline separated
    pub gcode: String,
    pub chunks: Vec<GcodeChunk>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
struct OutputCollector {
    header: Option<String>,
    chunks: Vec<GcodeChunk>,
    done: bool,
}

impl OutputCollector {
    fn push(&mut self, event: OutputEvent) {
        match event {
            OutputEvent::Header(text) => self.header = Some(text),
            OutputEvent::Chunk { text, percent } => self.chunks.push(GcodeChunk { text, percent }),
            OutputEvent::Done => self.done = true,
        }
    }

    fn finish(
        self,
        run_id: RunId,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Result<RasterOutput> {
        let header = match (self.header, self.done) {
            (Some(header), true) => header,
            _ => {
                return Err(
                    ProtocolError::EngineStopped("run ended without completing".to_string()).into(),
                )
            }
        };

        let gcode = std::iter::once(header.as_str())
            .chain(self.chunks.iter().map(|chunk| chunk.text.as_str()))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(RasterOutput {
            run_id,
            header,
            gcode,
            chunks: self.chunks,
            started_at,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RgbaBuffer;

    #[test]
    fn test_rejects_invalid_settings() {
        let settings = RasterSettings {
            beam_size: 0.0,
            ..RasterSettings::default()
        };
        let err = Rasterizer::new(settings).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_prepare_scales_image() {
        let settings = RasterSettings {
            ppi: 127,
            ..RasterSettings::default()
        };
        let rasterizer = Rasterizer::new(settings).unwrap();
        let prepared = rasterizer
            .prepare(&RgbaBuffer::filled(3, 2, [0, 0, 0, 255]))
            .unwrap();

        assert_eq!(prepared.image_size(), ImageSize::new(6, 4));
        assert_eq!(prepared.grid_size(), GridSize { x: 1, y: 1 });
        assert_eq!(prepared.grid().tiles()[0].data().len(), 6 * 4 * 4);
    }

    #[test]
    fn test_messages_in_protocol_order() {
        let settings = RasterSettings {
            buffer_size: 2,
            ..RasterSettings::default()
        };
        let rasterizer = Rasterizer::new(settings).unwrap();
        let prepared = rasterizer
            .prepare(&RgbaBuffer::filled(3, 3, [0, 0, 0, 255]))
            .unwrap();
        let names: Vec<&str> = prepared.into_messages().map(|m| m.name()).collect();

        assert_eq!(
            names,
            vec!["init", "addCell", "addCell", "addCell", "addCell", "parse"]
        );
    }

    #[test]
    fn test_blocking_run() {
        let rasterizer = Rasterizer::new(RasterSettings::default()).unwrap();
        let run = rasterizer
            .rasterize(&RgbaBuffer::filled(2, 2, [0, 0, 0, 255]))
            .unwrap();
        let output = run.blocking_collect().unwrap();

        assert_eq!(output.chunks.len(), 2);
        assert!(output.gcode.starts_with(&output.header));
        assert!(output.gcode.ends_with(&output.chunks[1].text));
        assert_eq!(output.chunks[1].percent, 50);
    }

    #[test]
    fn test_events_end_after_done() {
        let rasterizer = Rasterizer::new(RasterSettings::default()).unwrap();
        let mut run = rasterizer
            .rasterize(&RgbaBuffer::filled(1, 1, [0, 0, 0, 255]))
            .unwrap();

        assert!(matches!(run.blocking_next_event(), Some(Ok(OutputEvent::Header(_)))));
        assert!(matches!(run.blocking_next_event(), Some(Ok(OutputEvent::Chunk { .. }))));
        assert!(matches!(run.blocking_next_event(), Some(Ok(OutputEvent::Done))));
        assert!(run.blocking_next_event().is_none());
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_run_id_display() {
        let id = RunId::new();
        assert_eq!(id.to_string(), id.as_uuid().to_string());
        assert_ne!(RunId::new(), id);
    }
}
