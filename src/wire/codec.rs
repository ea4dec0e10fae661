//! rkyv encoding of [`Message`] frames.

use rkyv::rancor::Error as RkyvError;
use rkyv::util::AlignedVec;

use super::error::WireError;
use super::message::Message;
use crate::constants::MAX_FRAME_BYTES;

/// Serializes a message into frame payload bytes.
pub fn encode_message(msg: &Message) -> Result<AlignedVec, WireError> {
    let bytes =
        rkyv::to_bytes::<RkyvError>(msg).map_err(|e| WireError::Encode(e.to_string()))?;
    if bytes.len() > MAX_FRAME_BYTES {
        return Err(WireError::FrameTooLarge {
            len: bytes.len(),
            max: MAX_FRAME_BYTES,
        });
    }
    Ok(bytes)
}

/// Validates and deserializes frame payload bytes.
///
/// The input does not need to be aligned; it is copied into an aligned buffer first.
pub fn decode_message(bytes: &[u8]) -> Result<Message, WireError> {
    if bytes.len() > MAX_FRAME_BYTES {
        return Err(WireError::FrameTooLarge {
            len: bytes.len(),
            max: MAX_FRAME_BYTES,
        });
    }

    let mut aligned = AlignedVec::<16>::with_capacity(bytes.len());
    aligned.extend_from_slice(bytes);

    rkyv::from_bytes::<Message, RkyvError>(&aligned).map_err(|e| WireError::Decode(e.to_string()))
}
