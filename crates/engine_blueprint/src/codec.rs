//! MessagePack codec helpers.
//!
//! Thin wrappers around `rmp-serde`. Wire structures use the compact
//! positional encoding and are prefixed with a [`FileIdentifier`].

use serde::{Deserialize, Serialize};

use crate::error::BlueprintError;
use crate::format::FileIdentifier;

/// Encode a value to MessagePack bytes.
///
/// # Errors
///
/// Returns [`BlueprintError::Encode`] if serialisation fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, BlueprintError> {
    rmp_serde::to_vec(value).map_err(BlueprintError::Encode)
}

/// Decode a value from MessagePack bytes, borrowing from `bytes` where the
/// target type allows it.
///
/// # Errors
///
/// Returns [`BlueprintError::Decode`] if deserialisation fails.
pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, BlueprintError> {
    rmp_serde::from_slice(bytes).map_err(BlueprintError::Decode)
}

/// Encode `value` behind a 4-byte file identifier.
///
/// # Errors
///
/// Returns [`BlueprintError::Encode`] if serialisation fails.
pub fn encode_tagged<T: Serialize>(
    identifier: FileIdentifier,
    value: &T,
) -> Result<Vec<u8>, BlueprintError> {
    let mut buffer = Vec::with_capacity(256);
    buffer.extend_from_slice(identifier.as_bytes());
    rmp_serde::encode::write(&mut buffer, value)?;
    Ok(buffer)
}

/// Check the identifier at the front of `bytes` and decode the remainder.
///
/// # Errors
///
/// Returns [`BlueprintError::MissingIdentifier`] or
/// [`BlueprintError::WrongIdentifier`] if the tag does not match, and
/// [`BlueprintError::Decode`] if the payload is malformed.
pub fn decode_tagged<'a, T: Deserialize<'a>>(
    expected: FileIdentifier,
    bytes: &'a [u8],
) -> Result<T, BlueprintError> {
    let found =
        FileIdentifier::from_prefix(bytes).ok_or(BlueprintError::MissingIdentifier(bytes.len()))?;
    if found != expected {
        return Err(BlueprintError::WrongIdentifier { expected, found });
    }
    decode(&bytes[FileIdentifier::LEN..])
}
