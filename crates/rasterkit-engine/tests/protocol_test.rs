use rasterkit_engine::{
    ChunkKind, EngineMessage, EngineReply, GcodeData, ParserState, RasterParser, Rasterizer,
    RgbaBuffer,
};
use rasterkit_settings::RasterSettings;
use serde_json::{json, Value};
use std::sync::atomic::AtomicBool;

/// Serialize every message to JSON and back before feeding the parser.
fn replay(image: &RgbaBuffer) -> Vec<Value> {
    let prepared = Rasterizer::new(RasterSettings::default())
        .unwrap()
        .prepare(image)
        .unwrap();

    let mut parser = RasterParser::new();
    let cancel = AtomicBool::new(false);
    let mut replies = Vec::new();
    let mut sink = |reply: EngineReply| -> rasterkit_core::Result<()> {
        replies.push(serde_json::to_value(&reply).unwrap());
        Ok(())
    };

    for message in prepared.into_messages() {
        let wire = serde_json::to_string(&message).unwrap();
        let decoded: EngineMessage = serde_json::from_str(&wire).unwrap();
        parser.handle(decoded, &mut sink, &cancel).unwrap();
    }
    assert_eq!(parser.state(), ParserState::Done);
    replies
}

#[test]
fn test_json_replay_produces_header_chunks_done() {
    let image = RgbaBuffer::filled(2, 2, [0, 0, 0, 255]);
    let replies = replay(&image);

    assert_eq!(replies.len(), 4);
    assert_eq!(replies[0]["type"], "gcode");
    assert_eq!(replies[0]["data"]["type"], "header");
    assert_eq!(replies[0]["data"]["percent"], 0);
    assert!(replies[1]["data"].get("type").is_none());
    assert_eq!(replies[2]["data"]["percent"], 50);
    assert_eq!(replies[3], json!({ "type": "done" }));
}

#[test]
fn test_wire_documents_decode() {
    let cell: EngineMessage = serde_json::from_value(json!({
        "type": "addCell",
        "data": { "x": 0, "y": 1, "buffer": [0, 0, 0, 255] }
    }))
    .unwrap();
    assert_eq!(cell.name(), "addCell");

    let reply: EngineReply = serde_json::from_value(json!({
        "type": "gcode",
        "data": { "text": "G0 F1500", "percent": 0, "type": "header" }
    }))
    .unwrap();
    assert_eq!(
        reply,
        EngineReply::Gcode(GcodeData {
            text: "G0 F1500".to_string(),
            percent: 0,
            kind: Some(ChunkKind::Header),
        })
    );
}

#[test]
fn test_init_with_partial_settings() {
    let message: EngineMessage = serde_json::from_value(json!({
        "type": "init",
        "data": {
            "version": "1",
            "settings": { "beamSize": 0.2, "diagonal": true },
            "derived": { "ppm": 0.1, "scaleRatio": 0.5, "beamOffset": 0.1,
                         "beamRange": { "min": 0.0, "max": 1.0 } },
            "imageSize": { "width": 4, "height": 4 },
            "gridSize": { "x": 1, "y": 1 }
        }
    }))
    .unwrap();

    let EngineMessage::Init(init) = message else {
        panic!("expected init");
    };
    assert_eq!(init.settings.beam_size, 0.2);
    assert!(init.settings.diagonal);
    assert_eq!(init.settings.feed_rate, 1500.0);
}

#[test]
fn test_inconsistent_grid_is_rejected() {
    let message: EngineMessage = serde_json::from_value(json!({
        "type": "init",
        "data": {
            "version": "1",
            "settings": {},
            "derived": { "ppm": 0.1, "scaleRatio": 1.0, "beamOffset": 0.05,
                         "beamRange": { "min": 0.0, "max": 1.0 } },
            "imageSize": { "width": 4096, "height": 10 },
            "gridSize": { "x": 1, "y": 1 }
        }
    }))
    .unwrap();

    let mut parser = RasterParser::new();
    let err = parser
        .handle(message, &mut |_| Ok(()), &AtomicBool::new(false))
        .unwrap_err();
    assert!(err.is_protocol_error());
}

#[test]
fn test_out_of_order_messages_are_rejected() {
    let mut parser = RasterParser::new();
    let cell = EngineMessage::AddCell(rasterkit_engine::CellData {
        x: 0,
        y: 0,
        buffer: vec![255; 4],
    });
    let err = parser
        .handle(cell, &mut |_| Ok(()), &AtomicBool::new(false))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unexpected 'addCell' message while idle"
    );
}
