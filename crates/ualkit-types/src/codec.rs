//! Codec trait and implementations for serializing persisted data.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The file-backed session store and the configuration loader don't care
//! HOW values are serialized; they just need something that implements
//! [`Codec`].

use serde::{de::DeserializeOwned, Serialize};

use crate::CodecError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because codecs are stored inside session stores,
/// which are shared with background polling tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`CodecError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`CodecError::Decode`] if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Pretty-printed on encode so a session file can be inspected (and edited)
/// by hand while debugging a wallet integration.
///
/// ## Example
///
/// ```rust
/// use ualkit_types::{Codec, JsonCodec, RpcEndpoint};
///
/// let codec = JsonCodec;
/// let endpoint = RpcEndpoint::new("https", "telos.caleos.io", 443);
///
/// let bytes = codec.encode(&endpoint).unwrap();
/// let decoded: RpcEndpoint = codec.decode(&bytes).unwrap();
/// assert_eq!(endpoint, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec_pretty(value).map_err(CodecError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(data).map_err(CodecError::Decode)
    }
}
