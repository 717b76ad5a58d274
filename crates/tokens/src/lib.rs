//! Session token adapter.
//!
//! Implements [`shard::TokenSigner`] with JSON Web Tokens. Deployments sign
//! with an RSA key pair (RS256); a shared secret (HS256) is accepted for
//! development setups without key files.
//!
//! Verification checks the signature and the `exp` claim. Tokens signed with
//! any other algorithm are rejected.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use shard::{Claims, TokenError, TokenSigner};
use thiserror::Error;
use tracing::debug;

/// A signing or verification key could not be loaded.
#[derive(Debug, Error)]
#[error("Invalid session token key: {0}")]
pub struct KeyError(#[from] jsonwebtoken::errors::Error);

/// [`TokenSigner`] producing signed JWTs.
pub struct JwtSigner {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtSigner {
    /// RS256 signer from a PEM private key and the matching PEM public key.
    pub fn from_rsa_pem(sign_key: &[u8], verify_key: &[u8]) -> Result<Self, KeyError> {
        Ok(Self {
            algorithm: Algorithm::RS256,
            encoding: EncodingKey::from_rsa_pem(sign_key)?,
            decoding: DecodingKey::from_rsa_pem(verify_key)?,
        })
    }

    /// HS256 signer from a shared secret.
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl TokenSigner for JwtSigner {
    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding).map_err(|err| {
            TokenError::Signing {
                message: err.to_string(),
            }
        })
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(self.algorithm);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| {
                debug!(error = %err, "Token verification failed");
                TokenError::Invalid {
                    message: err.to_string(),
                }
            })
    }
}

impl std::fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSigner")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}
