//! Session credential issuing and verification.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Issues and verifies opaque bearer credentials naming an owner.
///
/// A credential reads `<owner_id>.<expires_unix>.<mac>` where `mac` is the hex
/// HMAC-SHA256 of `<owner_id>.<expires_unix>` keyed by `signing_secret`. Nothing
/// is stored server side; rotating the secret revokes every credential.
#[derive(Clone)]
pub struct AuthService {
    signing_secret: String,
    ttl: Duration,
}

impl AuthService {
    /// Creates a new authentication service.
    ///
    /// # Arguments
    ///
    /// - `signing_secret` - HMAC key; must match the value used when credentials were issued
    /// - `ttl_seconds` - lifetime of issued credentials
    pub fn new(signing_secret: String, ttl_seconds: i64) -> Self {
        Self {
            signing_secret,
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(self.signing_secret.as_bytes())
            .expect("HMAC accepts any key length")
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Issues a credential for `owner_id` valid until now plus the configured TTL.
    pub fn issue(&self, owner_id: i64) -> String {
        self.issue_at(owner_id, Utc::now())
    }

    fn issue_at(&self, owner_id: i64, now: DateTime<Utc>) -> String {
        let payload = format!("{}.{}", owner_id, (now + self.ttl).timestamp());
        let signature = self.sign(&payload);
        format!("{}.{}", payload, signature)
    }

    /// Verifies a credential and returns the owner it names.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] if the credential is malformed, carries
    /// a bad signature or has expired.
    pub fn authenticate(&self, credential: &str) -> Result<i64, AppError> {
        self.authenticate_at(credential, Utc::now())
    }

    fn authenticate_at(&self, credential: &str, now: DateTime<Utc>) -> Result<i64, AppError> {
        let invalid = |reason: &str| {
            AppError::unauthorized("Unauthorized", json!({ "reason": reason }))
        };

        let mut parts = credential.rsplitn(2, '.');
        let (Some(signature), Some(payload)) = (parts.next(), parts.next()) else {
            return Err(invalid("Malformed credential"));
        };

        let signature = hex::decode(signature).map_err(|_| invalid("Malformed credential"))?;
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| invalid("Invalid signature"))?;

        let (owner_id, expires_at) = payload
            .split_once('.')
            .and_then(|(owner, expires)| {
                Some((owner.parse::<i64>().ok()?, expires.parse::<i64>().ok()?))
            })
            .ok_or_else(|| invalid("Malformed credential"))?;

        if now.timestamp() >= expires_at {
            return Err(invalid("Credential expired"));
        }

        Ok(owner_id)
    }
}
