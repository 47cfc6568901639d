//! Messages exchanged between the producer and the engine worker.
//!
//! Both directions serialize as `{"type": ..., "data": ...}` documents so a
//! run can be replayed from JSON.

use crate::tiles::Tile;
use rasterkit_core::{GridSize, ImageSize, TileCoord};
use rasterkit_settings::{DerivedSettings, RasterSettings};
use serde::{Deserialize, Serialize};

/// Producer to engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum EngineMessage {
    /// Run settings; must come first
    Init(Box<EngineInit>),
    /// One tile of the scaled image
    AddCell(CellData),
    /// Start streaming commands
    Parse,
}

impl EngineMessage {
    /// Short name used in logs and protocol errors.
    pub fn name(&self) -> &'static str {
        match self {
            EngineMessage::Init(_) => "init",
            EngineMessage::AddCell(_) => "addCell",
            EngineMessage::Parse => "parse",
        }
    }
}

/// Payload of the `init` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInit {
    pub version: String,
    pub settings: RasterSettings,
    pub derived: DerivedSettings,
    pub image_size: ImageSize,
    pub grid_size: GridSize,
}

/// Payload of the `addCell` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellData {
    pub x: u32,
    pub y: u32,
    pub buffer: Vec<u8>,
}

impl CellData {
    pub fn coord(&self) -> TileCoord {
        TileCoord {
            x: self.x,
            y: self.y,
        }
    }
}

impl From<Tile> for CellData {
    fn from(tile: Tile) -> Self {
        let TileCoord { x, y } = tile.coord();
        Self {
            x,
            y,
            buffer: tile.into_data(),
        }
    }
}

/// Engine to producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum EngineReply {
    Gcode(GcodeData),
    Done,
}

/// Payload of a `gcode` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcodeData {
    pub text: String,
    pub percent: u8,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChunkKind>,
}

/// Marks the header chunk of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChunkKind {
    Header,
}

/// Caller-facing run event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    /// Commented metadata plus feed-rate setup
    Header(String),
    /// Commands for one processed line
    Chunk { text: String, percent: u8 },
    /// Terminal event
    Done,
}

impl From<EngineReply> for OutputEvent {
    fn from(reply: EngineReply) -> Self {
        match reply {
            EngineReply::Gcode(GcodeData {
                text,
                kind: Some(ChunkKind::Header),
                ..
            }) => OutputEvent::Header(text),
            EngineReply::Gcode(GcodeData { text, percent, .. }) => {
                OutputEvent::Chunk { text, percent }
            }
            EngineReply::Done => OutputEvent::Done,
        }
    }
}
