// Canonical textual codecs for values crossing the host boundary

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;
use uuid::Uuid;

/// Marker error for identifier parsing through `FromStr`. The boundary
/// contract for malformed identifiers is "treat as absent", so boundary
/// code goes through [`decode_uuid`] instead of raising this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not a canonical UUID")]
pub struct InvalidUuid;

/// Parse an identifier against the canonical hyphenated grammar,
/// case-insensitively. `None` means "field not provided"; malformed
/// identifiers never raise.
pub fn decode_uuid(text: &str) -> Option<Uuid> {
    // Uuid::parse_str also accepts unhyphenated, braced and urn forms;
    // the boundary grammar is the 36-character hyphenated one only.
    if text.len() != 36 {
        return None;
    }
    Uuid::parse_str(text).ok()
}

/// Render an identifier in canonical form: lowercase, hyphenated.
pub fn encode_uuid(uuid: &Uuid) -> String {
    uuid.hyphenated().to_string()
}

/// Encode bytes with the standard base64 alphabet, padded, no line wrap.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard-alphabet base64. `None` on malformed input. An empty
/// string is the valid encoding of the empty byte sequence.
pub fn decode_base64(text: &str) -> Option<Vec<u8>> {
    STANDARD.decode(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_uuid_requires_hyphenated_grammar() {
        assert!(decode_uuid("123e4567-e89b-12d3-a456-426614174000").is_some());
        assert!(decode_uuid("123e4567e89b12d3a456426614174000").is_none());
        assert!(decode_uuid("urn:uuid:123e4567-e89b-12d3-a456-426614174000").is_none());
        assert!(decode_uuid("{123e4567-e89b-12d3-a456-42661417400}").is_none());
        assert!(decode_uuid("").is_none());
    }

    #[test]
    fn test_encode_uuid_is_lowercase() {
        let uuid = decode_uuid("123E4567-E89B-12D3-A456-426614174000").unwrap();
        assert_eq!(encode_uuid(&uuid), "123e4567-e89b-12d3-a456-426614174000");
    }

    #[test]
    fn test_decode_base64_empty_string_is_empty_bytes() {
        assert_eq!(decode_base64(""), Some(Vec::new()));
    }

    #[test]
    fn test_decode_base64_rejects_malformed_input() {
        assert!(decode_base64("not base64!!").is_none());
        assert!(decode_base64("AA=").is_none());
    }

    proptest! {
        #[test]
        fn prop_base64_round_trips(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let text = encode_base64(&bytes);
            prop_assert_eq!(decode_base64(&text), Some(bytes));
        }

        #[test]
        fn prop_uuid_decode_accepts_any_case(raw in any::<u128>()) {
            let uuid = Uuid::from_u128(raw);
            let canonical = encode_uuid(&uuid);
            let upper = canonical.to_uppercase();
            prop_assert_eq!(decode_uuid(&upper), Some(uuid));
            // Re-encoding always lands back on the canonical form
            prop_assert_eq!(encode_uuid(&decode_uuid(&upper).unwrap()), canonical);
        }
    }
}
