use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use geomerge_core::SessionSnapshot;
use thiserror::Error;

const SNAPSHOT_DOMAIN: &str = "geomerge";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub const SNAPSHOT_HEADER: &str = "geomerge:v1";
const FIELD_DELIMITER: char = ':';

/// Errors that can occur while encoding or decoding snapshot strings.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The provided string was empty or contained only whitespace.
    #[error("saved session was empty")]
    EmptyPayload,
    /// The encoded snapshot did not contain a version segment.
    #[error("saved session is missing the version")]
    MissingVersion,
    /// The encoded snapshot did not include the payload segment.
    #[error("saved session is missing the payload")]
    MissingPayload,
    /// The encoded snapshot used an unexpected prefix segment.
    #[error("saved session prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    #[error("saved session version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode saved session payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    #[error("could not parse saved session payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

/// Encodes the snapshot into a single-line string.
pub fn encode_snapshot(snapshot: &SessionSnapshot) -> Result<String, SnapshotError> {
    let json = serde_json::to_vec(snapshot).map_err(SnapshotError::InvalidPayload)?;
    let encoded = STANDARD_NO_PAD.encode(json);
    Ok(format!("{SNAPSHOT_HEADER}{FIELD_DELIMITER}{encoded}"))
}

/// Decodes a snapshot from its single-line string representation.
pub fn decode_snapshot(value: &str) -> Result<SessionSnapshot, SnapshotError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SnapshotError::EmptyPayload);
    }

    let mut parts = trimmed.splitn(3, FIELD_DELIMITER);
    let domain = parts.next().unwrap_or_default();
    let version = parts.next().ok_or(SnapshotError::MissingVersion)?;
    let payload = parts.next().ok_or(SnapshotError::MissingPayload)?;

    if domain != SNAPSHOT_DOMAIN {
        return Err(SnapshotError::InvalidPrefix(domain.to_owned()));
    }
    if version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(version.to_owned()));
    }

    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(SnapshotError::InvalidEncoding)?;
    serde_json::from_slice(&bytes).map_err(SnapshotError::InvalidPayload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomerge_core::{CellCoord, CellOverride, GeoPosition, MovementMode, OverrideEntry, Token};

    fn populated() -> SessionSnapshot {
        SessionSnapshot {
            holding: Token::new(8),
            position: GeoPosition::new(-33.8688, 151.2093),
            overrides: vec![
                OverrideEntry {
                    cell: CellCoord::new(-338_688, 1_512_093),
                    value: CellOverride::Empty,
                },
                OverrideEntry {
                    cell: CellCoord::new(-338_687, 1_512_093),
                    value: CellOverride::Token(Token::new(4).expect("power of two")),
                },
            ],
            movement_mode: MovementMode::Feed,
            saved_at: 1_720_000_000,
            goal_reached: false,
        }
    }

    #[test]
    fn round_trip_fresh_session() {
        let snapshot = SessionSnapshot::fresh(GeoPosition::new(1.5, 2.5), MovementMode::Step, 7);
        let encoded = encode_snapshot(&snapshot).expect("snapshot encodes");
        assert!(encoded.starts_with(&format!("{SNAPSHOT_HEADER}:")));

        let decoded = decode_snapshot(&encoded).expect("snapshot decodes");
        assert_eq!(snapshot, decoded);
    }

    #[test]
    fn round_trip_populated_session() {
        let snapshot = populated();
        let encoded = encode_snapshot(&snapshot).expect("snapshot encodes");
        assert!(!encoded.contains('\n'));

        let decoded = decode_snapshot(&format!("  {encoded}\n")).expect("snapshot decodes");
        assert_eq!(snapshot, decoded);
    }

    #[test]
    fn rejects_foreign_prefix_and_version() {
        assert!(matches!(
            decode_snapshot("othergame:v1:abc"),
            Err(SnapshotError::InvalidPrefix(prefix)) if prefix == "othergame"
        ));
        assert!(matches!(
            decode_snapshot("geomerge:v9:abc"),
            Err(SnapshotError::UnsupportedVersion(version)) if version == "v9"
        ));
    }

    #[test]
    fn rejects_truncated_strings() {
        assert!(matches!(decode_snapshot("   "), Err(SnapshotError::EmptyPayload)));
        assert!(matches!(
            decode_snapshot("geomerge"),
            Err(SnapshotError::MissingVersion)
        ));
        assert!(matches!(
            decode_snapshot("geomerge:v1"),
            Err(SnapshotError::MissingPayload)
        ));
    }

    #[test]
    fn rejects_corrupt_payloads() {
        assert!(matches!(
            decode_snapshot("geomerge:v1:***"),
            Err(SnapshotError::InvalidEncoding(_))
        ));
        let not_json = STANDARD_NO_PAD.encode(b"not json");
        assert!(matches!(
            decode_snapshot(&format!("geomerge:v1:{not_json}")),
            Err(SnapshotError::InvalidPayload(_))
        ));
    }
}
