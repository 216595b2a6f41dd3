pub mod json;

pub use json::JsonProtocol;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to encode record: {0}")]
    Serialization(String),

    #[error("failed to decode payload: {0}")]
    Deserialization(String),

    #[error("payload is not valid UTF-8")]
    Encoding,

    #[error("payload is empty")]
    Empty,
}

pub type Result<T> = core::result::Result<T, Error>;

pub trait Protocol: Send + Sync {
    /// Serialize a record into wire bytes
    fn serialize<T: serde::Serialize>(&self, data: &T) -> Result<Vec<u8>>;

    /// Deserialize wire bytes into a record
    fn deserialize<T: for<'de> serde::Deserialize<'de>>(&self, bytes: &[u8]) -> Result<T>;

    /// Get protocol name
    fn name(&self) -> &'static str;
}
