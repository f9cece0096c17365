use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

/// Reference to the element hosting a terminal, as sent to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRef {
    pub element_id: String,
}

/// A cell in the terminal buffer. Rows count from the top of the scrollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferPoint {
    #[serde(rename = "x")]
    pub column: u32,
    #[serde(rename = "y")]
    pub row: u32,
}

impl BufferPoint {
    pub fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPosition {
    pub start: BufferPoint,
    pub end: BufferPoint,
}

impl SelectionPosition {
    /// Inclusive row range covered by the selection.
    pub fn rows(&self) -> std::ops::RangeInclusive<u32> {
        self.start.row..=self.end.row
    }
}

/// Browser keyboard event details accompanying a key press.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyboardEvent {
    pub key: String,
    pub code: String,
    pub location: u32,
    pub repeat: bool,
    pub ctrl_key: bool,
    pub shift_key: bool,
    pub alt_key: bool,
    pub meta_key: bool,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A key press: the data it produces plus the raw keyboard event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    pub key: String,
    pub dom_event: KeyboardEvent,
}

/// Inclusive row range redrawn by the renderer, `0..=rows-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderEvent {
    pub start: u16,
    pub end: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeEvent {
    pub cols: u16,
    pub rows: u16,
}

/// Data written to the terminal.
///
/// Text is sent as a JSON string. Bytes are sent as `{"binary": "<base64>"}`
/// so the engine can feed them to its parser without a UTF-8 round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WritePayload {
    Text(String),
    Bytes(Vec<u8>),
}

impl WritePayload {
    /// Raw bytes of the payload, lossless for both variants.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            WritePayload::Text(text) => text.as_bytes(),
            WritePayload::Bytes(bytes) => bytes,
        }
    }
}

impl From<&str> for WritePayload {
    fn from(text: &str) -> Self {
        WritePayload::Text(text.to_string())
    }
}

impl From<String> for WritePayload {
    fn from(text: String) -> Self {
        WritePayload::Text(text)
    }
}

impl From<Vec<u8>> for WritePayload {
    fn from(bytes: Vec<u8>) -> Self {
        WritePayload::Bytes(bytes)
    }
}

impl From<&[u8]> for WritePayload {
    fn from(bytes: &[u8]) -> Self {
        WritePayload::Bytes(bytes.to_vec())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WirePayload {
    Text(String),
    Binary { binary: String },
}

impl Serialize for WritePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WritePayload::Text(text) => serializer.serialize_str(text),
            WritePayload::Bytes(bytes) => WirePayload::Binary {
                binary: BASE64.encode(bytes),
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for WritePayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match WirePayload::deserialize(deserializer)? {
            WirePayload::Text(text) => Ok(WritePayload::Text(text)),
            WirePayload::Binary { binary } => BASE64
                .decode(binary.as_bytes())
                .map(WritePayload::Bytes)
                .map_err(|e| de::Error::custom(format!("invalid base64 payload: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selection_position_uses_engine_coordinates() {
        let json = json!({ "start": { "x": 0, "y": 2 }, "end": { "x": 79, "y": 5 } });
        let position: SelectionPosition = serde_json::from_value(json).unwrap();
        assert_eq!(position.start, BufferPoint::new(0, 2));
        assert_eq!(position.rows(), 2..=5);
    }

    #[test]
    fn test_key_event_from_engine() {
        let json = json!({
            "key": "\u{3}",
            "domEvent": { "key": "c", "code": "KeyC", "ctrlKey": true, "type": "keydown" }
        });
        let event: KeyEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.key, "\u{3}");
        assert!(event.dom_event.ctrl_key);
        assert!(!event.dom_event.shift_key);
        assert_eq!(event.dom_event.kind, "keydown");
    }

    #[test]
    fn test_text_payload_is_a_plain_string() {
        let value = serde_json::to_value(WritePayload::from("ls -la")).unwrap();
        assert_eq!(value, json!("ls -la"));
    }

    #[test]
    fn test_bytes_payload_is_base64_wrapped() {
        let payload = WritePayload::from(&[0x1b, b'[', b'0', b'm', 0xff][..]);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value, json!({ "binary": "G1swbf8=" }));

        let decoded: WritePayload = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_corrupt_base64_is_rejected() {
        let result: Result<WritePayload, _> =
            serde_json::from_value(json!({ "binary": "not base64!" }));
        assert!(result.is_err());
    }
}
