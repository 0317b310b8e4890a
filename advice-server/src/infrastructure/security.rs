use std::fmt::Write as _;

use argon2::{Argon2, password_hash::Output};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SALT_BYTES: usize = 16;
const DIGEST_BYTES: usize = 32;
const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Clone)]
pub struct JwtKeys {
    secret: String,
}

impl JwtKeys {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn expires_in(&self) -> i64 {
        TOKEN_TTL_HOURS * 3600
    }

    pub fn generate_token(&self, user_id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

/// Salted Argon2id digests kept as a separate `(digest, salt)` pair, both hex.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash(&self, password: &str) -> Result<(String, String), argon2::Error> {
        let mut raw = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut raw);
        let salt = to_hex(&raw);
        let digest = self.digest(password, &salt)?;
        Ok((to_hex(&digest), salt))
    }

    pub fn verify(&self, password: &str, digest: &str, salt: &str) -> bool {
        let Some(stored) = from_hex(digest) else {
            return false;
        };
        let Ok(computed) = self.digest(password, salt) else {
            return false;
        };
        // Output equality is constant-time
        match (Output::new(&stored), Output::new(&computed)) {
            (Ok(stored), Ok(computed)) => stored == computed,
            _ => false,
        }
    }

    fn digest(&self, password: &str, salt: &str) -> Result<[u8; DIGEST_BYTES], argon2::Error> {
        let mut out = [0u8; DIGEST_BYTES];
        self.argon2
            .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut out)?;
        Ok(out)
    }
}

/// Single shared admin secret, compared case-insensitively and otherwise
/// exactly. A blank secret counts as none.
#[derive(Clone, Default)]
pub struct AdminKeyValidator {
    secret: Option<String>,
}

impl AdminKeyValidator {
    pub fn new(secret: Option<String>) -> Self {
        let secret = secret
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_lowercase());
        Self { secret }
    }

    pub fn is_valid(&self, key: &str) -> bool {
        match &self.secret {
            Some(secret) => key.to_lowercase() == *secret,
            None => false,
        }
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || !s.is_ascii() {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}
