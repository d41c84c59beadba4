use crate::error::ConfigError;
use rand::RngCore;
use std::fmt;
use zeroize::Zeroizing;

/// Secret key material for the spamming account.
///
/// The secret is wiped from memory on drop and never shows up in `Debug`
/// output or logs.
#[derive(Clone)]
pub struct Credential {
    secret: Zeroizing<String>,
}

impl Credential {
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = Zeroizing::new(secret.into());
        if secret.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "secret_key".to_string(),
            });
        }
        Ok(Self { secret })
    }

    /// Read the secret from an environment variable.
    pub fn from_env(key: &str) -> Result<Self, ConfigError> {
        let value = std::env::var(key).map_err(|_| ConfigError::MissingField {
            field: key.to_string(),
        })?;
        Self::new(value)
    }

    /// Random throwaway key, for local networks.
    pub fn ephemeral() -> Self {
        let mut bytes = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(&mut bytes[..]);
        Self {
            secret: Zeroizing::new(format!("0x{}", hex::encode(&bytes[..]))),
        }
    }

    pub fn expose_secret(&self) -> &str {
        self.secret.as_str()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
