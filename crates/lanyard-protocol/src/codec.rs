//! Body encoding for companion requests and replies.
//!
//! The HTTP provider is generic over a [`Codec`] so tests and future
//! companions can swap the wire format without touching request logic.
//! The companion application speaks JSON, so [`JsonCodec`] is the only
//! implementation today.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Turns request bodies into bytes and reply bodies back into types.
///
/// A provider holding a codec is used from the liveness task and from
/// cache calls at the same time, hence `Send + Sync + 'static`.
pub trait Codec: Send + Sync + 'static {
    /// The MIME type to advertise for encoded bodies.
    fn content_type(&self) -> &'static str;

    /// Encode a request body.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Decode a reply body. Fails with `ProtocolError::Decode` when the
    /// companion answered with something other than the expected shape.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// JSON bodies via `serde_json`, field names in camelCase.
///
/// Enabled by the default `json` feature.
///
/// ## Example
///
/// ```rust
/// use lanyard_protocol::{Codec, JsonCodec, StatRecord};
///
/// let codec = JsonCodec;
/// let record = StatRecord::int("kills", 5);
///
/// let bytes = codec.encode(&record).unwrap();
/// let decoded: StatRecord = codec.decode(&bytes).unwrap();
/// assert_eq!(record, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
