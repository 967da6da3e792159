use crate::game::{Participant, ParticipantId};
use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// What a bearer credential resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub authorized: bool,
    pub identity: ParticipantId,
    pub display_name: String,
}

impl ResolvedIdentity {
    pub fn anonymous() -> Self {
        Self {
            authorized: false,
            identity: ParticipantId::anonymous(),
            display_name: "Anonymous".to_string(),
        }
    }

    pub fn into_participant(self) -> Participant {
        Participant::new(self.identity, self.display_name, self.authorized)
    }
}

/// Resolves bearer credentials to participants
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, credential: &str) -> Result<ResolvedIdentity>;

    /// Resolve, falling back to a fresh anonymous identity on failure or
    /// when no credential was presented
    fn resolve_or_anonymous(&self, credential: Option<&str>) -> ResolvedIdentity {
        match credential.map(|c| self.resolve(c)) {
            Some(Ok(resolved)) => resolved,
            Some(Err(err)) => {
                debug!(error = %err, "credential rejected, continuing anonymously");
                ResolvedIdentity::anonymous()
            }
            None => ResolvedIdentity::anonymous(),
        }
    }
}

/// Signed token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub name: String,
    /// Issue time, seconds since the Unix epoch
    pub iat: i64,
}

/// Issues and verifies Ed25519-signed bearer tokens of the form
/// `base64(claims json).base64(signature)`
pub struct TokenAuthority {
    signing_key: SigningKey,
}

impl TokenAuthority {
    pub fn from_secret(secret: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&secret),
        }
    }

    /// Build from a 64-character hex secret
    pub fn from_hex(secret: &str) -> Result<Self> {
        let bytes = hex::decode(secret.trim()).context("Secret is not valid hex")?;
        let secret: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            anyhow::anyhow!(
                "Invalid secret length: expected 32 bytes, got {}",
                bytes.len()
            )
        })?;
        Ok(Self::from_secret(secret))
    }

    /// Generate an authority with a random key
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut secret = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut secret);
        Self::from_secret(secret)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn issue(&self, identity: &str, display_name: &str) -> Result<String> {
        let claims = TokenClaims {
            sub: identity.to_string(),
            name: display_name.to_string(),
            iat: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or_default(),
        };
        let payload = serde_json::to_vec(&claims).context("Failed to serialize token claims")?;
        let signature = self.signing_key.sign(&payload);
        Ok(format!(
            "{}.{}",
            general_purpose::URL_SAFE_NO_PAD.encode(&payload),
            general_purpose::URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        let (payload, signature) = token
            .trim()
            .split_once('.')
            .context("Token must have a payload and a signature")?;
        let payload = general_purpose::URL_SAFE_NO_PAD
            .decode(payload)
            .context("Failed to decode token payload")?;
        let signature = general_purpose::URL_SAFE_NO_PAD
            .decode(signature)
            .context("Failed to decode token signature")?;
        let signature: [u8; 64] = signature.as_slice().try_into().map_err(|_| {
            anyhow::anyhow!(
                "Invalid signature length: expected 64 bytes, got {}",
                signature.len()
            )
        })?;

        self.verifying_key()
            .verify(&payload, &Signature::from_bytes(&signature))
            .map_err(|e| anyhow::anyhow!("Invalid token signature: {}", e))?;
        serde_json::from_slice(&payload).context("Failed to parse token claims")
    }
}

impl IdentityResolver for TokenAuthority {
    fn resolve(&self, credential: &str) -> Result<ResolvedIdentity> {
        let token = credential.strip_prefix("Bearer ").unwrap_or(credential);
        let claims = self.verify(token)?;
        Ok(ResolvedIdentity {
            authorized: true,
            identity: ParticipantId::new(claims.sub),
            display_name: claims.name,
        })
    }
}
