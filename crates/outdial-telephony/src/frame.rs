// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoding of inbound event frames.
//!
//! ```json
//! {"sequence": 12, "event": {"event_type": 1, "entity": "/callcontrol/101/participants/7"}}
//! ```

use outdial_core::OutdialError;
use outdial_core::types::{EventKind, ProtocolEvent};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct WireFrame {
    #[serde(default)]
    sequence: Option<u64>,
    event: WireEvent,
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    event_type: u8,
    entity: String,
    #[serde(default)]
    #[allow(dead_code)]
    attached_data: Option<serde_json::Value>,
}

/// Decode one text frame into a protocol event.
pub fn parse_frame(text: &str) -> Result<ProtocolEvent, OutdialError> {
    let frame: WireFrame =
        serde_json::from_str(text).map_err(|e| OutdialError::MalformedFrame(e.to_string()))?;

    let kind = EventKind::try_from(frame.event.event_type).map_err(|other| {
        OutdialError::MalformedFrame(format!("unknown event_type {other}"))
    })?;

    if frame.event.entity.trim().is_empty() {
        return Err(OutdialError::MalformedFrame("empty entity".into()));
    }

    Ok(ProtocolEvent {
        sequence: frame.sequence,
        kind,
        entity: frame.event.entity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_participant_change() {
        let event = parse_frame(
            r#"{"sequence": 4, "event": {"event_type": 1, "entity": "/callcontrol/101/participants/7", "attached_data": null}}"#,
        )
        .unwrap();
        assert_eq!(event.kind, EventKind::ParticipantChanged);
        assert_eq!(event.sequence, Some(4));
        assert_eq!(event.extension_dn(), Some("101"));
    }

    #[test]
    fn sequence_is_optional() {
        let event =
            parse_frame(r#"{"event": {"event_type": 0, "entity": "/callcontrol/102/participants/1"}}"#)
                .unwrap();
        assert_eq!(event.kind, EventKind::ParticipantAppeared);
        assert!(event.sequence.is_none());
    }

    #[test]
    fn rejects_garbage_and_unknown_kinds() {
        assert!(matches!(
            parse_frame("not json"),
            Err(OutdialError::MalformedFrame(_))
        ));
        assert!(matches!(
            parse_frame(r#"{"event": {"event_type": 9, "entity": "/callcontrol/1"}}"#),
            Err(OutdialError::MalformedFrame(_))
        ));
        assert!(matches!(
            parse_frame(r#"{"event": {"event_type": 0, "entity": " "}}"#),
            Err(OutdialError::MalformedFrame(_))
        ));
    }
}
