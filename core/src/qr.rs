//! QR payload codec.
//!
//! An issued code carries only `{eventId, userId}`. The wire form is the
//! compact JSON document `{"eventId":"…","userId":"…"}` encoded as unpadded
//! base64url, so it survives URLs and QR alphanumeric modes untouched.
//!
//! The payload is plaintext: it identifies a registration, it does not prove
//! one. Check-in always re-validates against storage. Rendering the string
//! into an image is left to the client.
//!
//! Decoding also accepts the raw JSON form, which older scanners send.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{EventPassError, Result};
use crate::types::{EventId, UserId};

/// The data carried by a check-in code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QrPayload {
    /// Event the holder registered for
    pub event_id: EventId,
    /// Registered user
    pub user_id: UserId,
}

impl QrPayload {
    /// Create a payload
    #[must_use]
    pub const fn new(event_id: EventId, user_id: UserId) -> Self {
        Self { event_id, user_id }
    }
}

/// Encodes and decodes [`QrPayload`]s. Pure and synchronous.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrCodec;

impl QrCodec {
    /// Encode a payload into its opaque string form.
    #[must_use]
    pub fn encode(payload: &QrPayload) -> String {
        let json = serde_json::json!({
            "eventId": payload.event_id,
            "userId": payload.user_id,
        })
        .to_string();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode a scanned string back into a payload.
    ///
    /// # Errors
    ///
    /// Returns [`EventPassError::InvalidPayload`] if the input is empty, is
    /// not base64url, or does not contain exactly a valid `eventId` and
    /// `userId`.
    pub fn decode(encoded: &str) -> Result<QrPayload> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(EventPassError::invalid_payload("empty code"));
        }

        let json = if encoded.starts_with('{') {
            encoded.as_bytes().to_vec()
        } else {
            URL_SAFE_NO_PAD
                .decode(encoded.trim_end_matches('='))
                .map_err(|e| EventPassError::invalid_payload(format!("not base64url: {e}")))?
        };

        serde_json::from_slice(&json)
            .map_err(|e| EventPassError::invalid_payload(format!("malformed payload: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn payload() -> QrPayload {
        QrPayload::new(EventId::new(), UserId::new())
    }

    #[test]
    fn encoded_form_is_url_safe() {
        let encoded = QrCodec::encode(&payload());
        assert!(
            encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn encoded_form_wraps_camel_case_json() {
        let p = payload();
        let raw = URL_SAFE_NO_PAD.decode(QrCodec::encode(&p)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["eventId"], p.event_id.to_string());
        assert_eq!(value["userId"], p.user_id.to_string());
    }

    #[test]
    fn decodes_legacy_raw_json() {
        let p = payload();
        let raw = format!(r#"{{"eventId":"{}","userId":"{}"}}"#, p.event_id, p.user_id);
        assert_eq!(QrCodec::decode(&raw).unwrap(), p);
    }

    #[test]
    fn rejects_malformed_input() {
        let missing_user = URL_SAFE_NO_PAD.encode(format!(r#"{{"eventId":"{}"}}"#, EventId::new()));
        let not_uuid = URL_SAFE_NO_PAD.encode(r#"{"eventId":"x","userId":"y"}"#);
        for input in [
            "",
            "   ",
            "%%%",
            "bm90IGpzb24",
            missing_user.as_str(),
            not_uuid.as_str(),
            "{",
        ] {
            let err = QrCodec::decode(input).unwrap_err();
            assert!(
                matches!(err, EventPassError::InvalidPayload { .. }),
                "{input:?} gave {err:?}"
            );
        }
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(a in any::<u128>(), b in any::<u128>()) {
            let p = QrPayload::new(
                EventId::from_uuid(Uuid::from_u128(a)),
                UserId::from_uuid(Uuid::from_u128(b)),
            );
            prop_assert_eq!(QrCodec::decode(&QrCodec::encode(&p)).unwrap(), p);
        }

        #[test]
        fn decode_never_panics(input in ".*") {
            let _ = QrCodec::decode(&input);
        }
    }
}
