//! Client certificates and the JWT assertions signed with them.

use std::fmt;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use pem::Pem;
use serde::Serialize;
use sha1::{Digest, Sha1};
use uuid::Uuid;

use crate::error::{GraphError, GraphResult};

/// Assertions are valid for this long after signing.
const ASSERTION_LIFETIME_MINUTES: i64 = 10;

#[derive(Serialize)]
struct AssertionClaims<'a> {
    aud: &'a str,
    iss: &'a str,
    sub: &'a str,
    jti: String,
    nbf: i64,
    iat: i64,
    exp: i64,
}

/// RSA private key plus the thumbprint of its certificate, read from a
/// single PEM file.
pub struct ClientCertificate {
    key: EncodingKey,
    thumbprint: String,
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("thumbprint", &self.thumbprint)
            .finish_non_exhaustive()
    }
}

impl ClientCertificate {
    pub fn load(path: &Path) -> GraphResult<Self> {
        let invalid = |message: String| GraphError::Certificate {
            path: path.to_path_buf(),
            message,
        };

        let contents = std::fs::read_to_string(path)
            .map_err(|e| invalid(format!("cannot read file: {e}")))?;
        Self::from_pem(&contents).map_err(invalid)
    }

    pub fn from_pem(input: &str) -> Result<Self, String> {
        let blocks = pem::parse_many(input).map_err(|e| format!("invalid PEM: {e}"))?;

        if blocks.iter().any(is_encrypted) {
            return Err("encrypted private keys are not supported".to_string());
        }
        let key_block = blocks
            .iter()
            .find(|b| matches!(b.tag(), "PRIVATE KEY" | "RSA PRIVATE KEY"))
            .ok_or("no unencrypted private key block found")?;
        let key = EncodingKey::from_rsa_pem(pem::encode(key_block).as_bytes())
            .map_err(|e| format!("unusable RSA private key: {e}"))?;

        let cert_block = blocks
            .iter()
            .find(|b| b.tag() == "CERTIFICATE")
            .ok_or("no certificate block found")?;
        let thumbprint = URL_SAFE_NO_PAD.encode(Sha1::digest(cert_block.contents()));

        Ok(Self { key, thumbprint })
    }

    /// Base64url SHA-1 thumbprint of the certificate, as sent in `x5t`.
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    /// Sign a client assertion for `client_id` addressed to `audience`
    /// (the token endpoint).
    pub fn assertion(&self, client_id: &str, audience: &str) -> GraphResult<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.x5t = Some(self.thumbprint.clone());

        let now = Utc::now();
        let claims = AssertionClaims {
            aud: audience,
            iss: client_id,
            sub: client_id,
            jti: Uuid::new_v4().to_string(),
            nbf: now.timestamp(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(ASSERTION_LIFETIME_MINUTES)).timestamp(),
        };

        jsonwebtoken::encode(&header, &claims, &self.key)
            .map_err(|e| GraphError::token("certificate", format!("cannot sign client assertion: {e}")))
    }
}

fn is_encrypted(block: &Pem) -> bool {
    block.tag() == "ENCRYPTED PRIVATE KEY"
        || block
            .headers()
            .get("Proc-Type")
            .is_some_and(|value| value.contains("ENCRYPTED"))
}
