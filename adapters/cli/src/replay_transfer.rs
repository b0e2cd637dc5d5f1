use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use maze_tanks_core::{from_bytes, to_bytes, CodecError, Replay};
use thiserror::Error;

const TRANSFER_DOMAIN: &str = "tanks";
const TRANSFER_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded replay payload.
pub(crate) const TRANSFER_HEADER: &str = "tanks:v1";
/// Delimiter used to separate the prefix, version and payload.
const FIELD_DELIMITER: char = ':';

/// Encodes a replay into a single-line string suitable for clipboard transfer.
#[must_use]
pub(crate) fn encode(replay: &Replay) -> String {
    let encoded = STANDARD_NO_PAD.encode(to_bytes(replay));
    format!("{TRANSFER_HEADER}{FIELD_DELIMITER}{encoded}")
}

/// Decodes a replay from its single-line string representation.
pub(crate) fn decode(value: &str) -> Result<Replay, ReplayTransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ReplayTransferError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(ReplayTransferError::MissingPrefix)?;
    let version = parts.next().ok_or(ReplayTransferError::MissingVersion)?;
    let payload = parts.next().ok_or(ReplayTransferError::MissingPayload)?;

    if domain != TRANSFER_DOMAIN {
        return Err(ReplayTransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != TRANSFER_VERSION {
        return Err(ReplayTransferError::UnsupportedVersion(version.to_owned()));
    }

    let bytes = STANDARD_NO_PAD.decode(payload.as_bytes())?;
    Ok(from_bytes(&bytes)?)
}

/// Errors that can occur while decoding replay transfer strings.
#[derive(Debug, Error)]
pub(crate) enum ReplayTransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("replay string was empty")]
    EmptyPayload,
    /// The prefix segment was missing.
    #[error("replay string is missing the prefix")]
    MissingPrefix,
    /// The version segment was missing.
    #[error("replay string is missing the version")]
    MissingVersion,
    /// The payload segment was missing.
    #[error("replay string is missing the payload")]
    MissingPayload,
    /// The prefix named another kind of payload.
    #[error("replay prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The version is not understood by this build.
    #[error("replay version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode replay payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    /// The decoded bytes are not a valid replay.
    #[error("could not parse replay payload: {0}")]
    InvalidPayload(#[from] CodecError),
}
