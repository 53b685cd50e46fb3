use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use qfleet_core::{Bias, Outcome};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Messages exchanged with a remote oracle. JSON lines framing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OracleMessage {
    /// Ask for a single draw; `signature` authenticates `request`.
    Collapse { request: CollapseRequest, signature: String },

    /// Successful draw for request `id`.
    Outcome { id: Uuid, outcome: Outcome },

    /// The server could not answer request `id` (or any request, if `None`).
    Error { id: Option<Uuid>, message: String },
}

/// A single-shot two-outcome draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollapseRequest {
    pub id: Uuid,
    /// Probability of outcome 0.
    pub bias: f64,
    /// Rotation angle preparing the same process, for backends that need it.
    pub theta: f64,
}

impl CollapseRequest {
    pub fn new(bias: Bias) -> Self {
        Self { id: Uuid::new_v4(), bias: bias.probability(), theta: bias.rotation_angle() }
    }

    /// HMAC-SHA256 of the JSON encoding, base64.
    pub fn sign(&self, key: &[u8]) -> anyhow::Result<String> {
        let mut mac = HmacSha256::new_from_slice(key).map_err(|e| anyhow::anyhow!("invalid signing key: {e}"))?;
        mac.update(&serde_json::to_vec(self)?);
        Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }

    pub fn verify(&self, key: &[u8], signature: &str) -> bool {
        let Ok(expected) = general_purpose::STANDARD.decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
            return false;
        };
        let Ok(body) = serde_json::to_vec(self) else {
            return false;
        };
        mac.update(&body);
        mac.verify_slice(&expected).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_roundtrip_through_json() {
        let request = CollapseRequest::new(Bias::new(0.75).unwrap());
        let signature = request.sign(b"secret").unwrap();
        let msg = OracleMessage::Collapse { request: request.clone(), signature };

        let line = serde_json::to_string(&msg).unwrap();
        let back: OracleMessage = serde_json::from_str(&line).unwrap();
        let OracleMessage::Collapse { request: received, signature } = back else {
            panic!("wrong message type");
        };
        assert_eq!(received, request);
        assert!(received.verify(b"secret", &signature));
        assert!(!received.verify(b"other", &signature));
        assert!(!received.verify(b"secret", "not base64!"));
    }

    #[test]
    fn test_tampered_request_fails_verification() {
        let mut request = CollapseRequest::new(Bias::BALANCED);
        let signature = request.sign(b"k").unwrap();
        request.bias = 0.99;
        assert!(!request.verify(b"k", &signature));
    }
}
