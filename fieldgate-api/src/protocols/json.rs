use super::{Error, Protocol, Result};

/// UTF-8 JSON, one flat object per message.
#[derive(Debug, Default, Clone)]
pub struct JsonProtocol;

impl JsonProtocol {
    pub fn encode<T: serde::Serialize>(&self, data: &T) -> Result<String> {
        serde_json::to_string(data).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn decode<T: for<'de> serde::Deserialize<'de>>(&self, text: &str) -> Result<T> {
        if text.trim().is_empty() {
            return Err(Error::Empty);
        }

        serde_json::from_str(text).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

impl Protocol for JsonProtocol {
    fn serialize<T: serde::Serialize>(&self, data: &T) -> Result<Vec<u8>> {
        self.encode(data).map(String::into_bytes)
    }

    fn deserialize<T: for<'de> serde::Deserialize<'de>>(&self, bytes: &[u8]) -> Result<T> {
        let text = core::str::from_utf8(bytes).map_err(|_| Error::Encoding)?;
        self.decode(text)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
