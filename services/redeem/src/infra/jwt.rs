use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use crate::error::IssuerError;

/// Audience the issuer expects in every signed request.
pub const ISSUER_AUDIENCE: &str = "appstoreconnect-v1";

/// Lifetime of a signed issuer token in seconds.
pub const ISSUER_TOKEN_TTL_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct IssuerClaims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
}

/// Builds the short-lived ES256 bearer token the issuer authenticates with.
pub struct IssuerTokenSigner {
    key_id: String,
    issuer_id: String,
    key: EncodingKey,
}

impl std::fmt::Debug for IssuerTokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerTokenSigner")
            .field("key_id", &self.key_id)
            .field("issuer_id", &self.issuer_id)
            .finish_non_exhaustive()
    }
}

impl IssuerTokenSigner {
    /// `private_key_pem` is a PKCS#8 PEM; escaped `\n` sequences (as they
    /// arrive from single-line env vars) are unescaped first.
    pub fn from_pem(
        key_id: impl Into<String>,
        issuer_id: impl Into<String>,
        private_key_pem: &str,
    ) -> Result<Self, IssuerError> {
        let pem = private_key_pem.replace("\\n", "\n");
        let key = EncodingKey::from_ec_pem(pem.as_bytes()).map_err(IssuerError::Signing)?;
        Ok(Self {
            key_id: key_id.into(),
            issuer_id: issuer_id.into(),
            key,
        })
    }

    pub fn sign(&self, now: DateTime<Utc>) -> Result<String, IssuerError> {
        let iat = now.timestamp();
        let claims = IssuerClaims {
            iss: self.issuer_id.clone(),
            iat,
            exp: iat + ISSUER_TOKEN_TTL_SECS,
            aud: ISSUER_AUDIENCE.to_owned(),
        };
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());
        encode(&header, &claims, &self.key).map_err(IssuerError::Signing)
    }
}
