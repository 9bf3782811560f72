//! Login verification.
//!
//! The frontend SDK signs `{"user": <user>, "jwt": <jwt>}` with the
//! platform's Ed25519 key; the backend re-serializes the payload with field
//! order preserved and checks the signature against the pinned public key.

use crate::error::{AppError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde_json::Value;

/// The asserted identity once the signature checks out.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoginIdentity {
    pub username: String,
    pub uid: Option<String>,
}

pub struct LoginVerifier {
    key: VerifyingKey,
}

impl LoginVerifier {
    /// Accepts a hex-encoded SPKI document; the raw 32-byte Ed25519 key is
    /// its trailing 32 bytes.
    pub fn from_spki_hex(spki_hex: &str) -> Result<Self> {
        let der = hex::decode(spki_hex)
            .map_err(|e| AppError::Internal(format!("Invalid login public key hex: {e}")))?;

        if der.len() < 32 {
            return Err(AppError::Internal(
                "Login public key is shorter than an Ed25519 key".to_string(),
            ));
        }

        let mut raw = [0u8; 32];
        raw.copy_from_slice(&der[der.len() - 32..]);

        let key = VerifyingKey::from_bytes(&raw)
            .map_err(|e| AppError::Internal(format!("Invalid login public key: {e}")))?;

        Ok(Self { key })
    }

    pub fn verify(&self, user: &Value, jwt: &str, signature_b64: &str) -> Result<LoginIdentity> {
        let message = serde_json::to_string(&serde_json::json!({
            "user": user,
            "jwt": jwt,
        }))
        .map_err(|e| AppError::Internal(format!("Failed to serialize login payload: {e}")))?;

        let signature_bytes = BASE64
            .decode(signature_b64)
            .map_err(|_| AppError::Unauthorized("Malformed signature encoding".to_string()))?;

        let signature = Signature::from_slice(&signature_bytes)
            .map_err(|_| AppError::Unauthorized("Malformed signature".to_string()))?;

        self.key
            .verify(message.as_bytes(), &signature)
            .map_err(|_| AppError::Unauthorized("Invalid signature".to_string()))?;

        let username = user
            .get("username")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Validation("user.username is required".to_string()))?
            .to_string();

        let uid = user.get("uid").and_then(Value::as_str).map(str::to_string);

        tracing::info!(username = %username, "Login verified");
        Ok(LoginIdentity { username, uid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    // DER prefix for an Ed25519 SubjectPublicKeyInfo document.
    const SPKI_PREFIX: &str = "302a300506032b6570032100";

    fn verifier_for(signing: &SigningKey) -> LoginVerifier {
        let spki = format!("{}{}", SPKI_PREFIX, hex::encode(signing.verifying_key().as_bytes()));
        LoginVerifier::from_spki_hex(&spki).unwrap()
    }

    #[test]
    fn accepts_a_correctly_signed_payload() {
        let signing = SigningKey::generate(&mut OsRng);
        let verifier = verifier_for(&signing);

        let user = serde_json::json!({"username": "pi_listener", "uid": "uid-42"});
        let jwt = "header.payload.sig";
        let message =
            serde_json::to_string(&serde_json::json!({"user": user, "jwt": jwt})).unwrap();
        let signature = BASE64.encode(signing.sign(message.as_bytes()).to_bytes());

        let identity = verifier.verify(&user, jwt, &signature).unwrap();
        assert_eq!(identity.username, "pi_listener");
        assert_eq!(identity.uid.as_deref(), Some("uid-42"));
    }

    #[test]
    fn rejects_a_tampered_payload() {
        let signing = SigningKey::generate(&mut OsRng);
        let verifier = verifier_for(&signing);

        let user = serde_json::json!({"username": "pi_listener", "uid": "uid-42"});
        let message =
            serde_json::to_string(&serde_json::json!({"user": user, "jwt": "original"})).unwrap();
        let signature = BASE64.encode(signing.sign(message.as_bytes()).to_bytes());

        let err = verifier.verify(&user, "forged", &signature).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn rejects_garbage_signatures() {
        let signing = SigningKey::generate(&mut OsRng);
        let verifier = verifier_for(&signing);
        let user = serde_json::json!({"username": "pi_listener"});

        assert!(matches!(
            verifier.verify(&user, "jwt", "not base64!!"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn loads_the_pinned_platform_key_format() {
        let spki = format!("{}{}", SPKI_PREFIX, hex::encode([7u8; 32]));
        // Not all 32-byte strings are valid curve points, but the parser must
        // at least slice the DER prefix off without panicking.
        let _ = LoginVerifier::from_spki_hex(&spki);
    }
}
