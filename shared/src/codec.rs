//! JSON encoding of protocol envelopes.
//!
//! One encoded message never contains a raw newline, so frames can be
//! delimited by `\n` on the wire.

use crate::messages::Message;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Encoding failed: {0}")]
    Encode(String),
}

pub fn encode(message: &Message) -> Result<String, CodecError> {
    serde_json::to_string(message).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decodes one frame. Invalid UTF-8, invalid JSON, unknown types and
/// payloads of the wrong shape all come back as `Malformed`.
pub fn decode(bytes: &[u8]) -> Result<Message, CodecError> {
    let text = std::str::from_utf8(bytes).map_err(|e| CodecError::Malformed(e.to_string()))?;
    serde_json::from_str(text.trim()).map_err(|e| CodecError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ErrorPayload, TaskRef};
    use crate::types::{Task, TaskId};
    use serde_json::json;

    #[test]
    fn claim_uses_envelope_shape() {
        let msg = Message::Claim(TaskRef { task_id: TaskId::new("task-1-42") });
        let encoded = encode(&msg).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();

        assert_eq!(value, json!({"type": "claim", "payload": {"taskId": "task-1-42"}}));
    }

    #[test]
    fn decodes_task_list_from_wire_text() {
        let raw = br#"{"type":"task_list","payload":[{"id":"task-1-1","title":"Sort crates","description":"by size","status":"claimed","claimedBy":"ab12cd34","completedAt":null}]}"#;

        match decode(raw).unwrap() {
            Message::TaskList(tasks) => {
                assert_eq!(tasks.len(), 1);
                assert_eq!(tasks[0].title, "Sort crates");
                assert_eq!(tasks[0].claimed_by.as_ref().unwrap().as_str(), "ab12cd34");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn encoded_task_has_no_newlines() {
        let task = Task::open(TaskId::new("t"), "multi\nline".into(), "x\ny".into());
        let encoded = encode(&Message::NewTask(task.clone())).unwrap();

        assert!(!encoded.contains('\n'));
        assert_eq!(decode(encoded.as_bytes()).unwrap(), Message::NewTask(task));
    }

    #[test]
    fn error_payload_decodes() {
        let raw = br#"{"type":"error","payload":{"message":"Task not available"}}"#;
        assert_eq!(
            decode(raw).unwrap(),
            Message::Error(ErrorPayload { message: "Task not available".into() })
        );
    }

    #[test]
    fn garbage_is_malformed() {
        for raw in [
            &b"not json"[..],
            &b"{\"type\":\"explode\",\"payload\":{}}"[..],
            &b"{\"type\":\"claim\",\"payload\":{\"id\":1}}"[..],
            &b"{\"payload\":[]}"[..],
            &[0xff, 0xfe, 0x00][..],
            &b""[..],
        ] {
            assert!(matches!(decode(raw), Err(CodecError::Malformed(_))));
        }
    }
}
