//! API credential resolution.

use crate::defaults;
use crate::error::{Result, ScribeError};

/// Source of the API token attached to outbound connections.
///
/// Checked before the session starts so a missing credential fails fast,
/// without opening a device or a socket.
pub trait CredentialProvider: Send + Sync {
    fn current_token(&self) -> Result<String>;
}

/// Reads the token from the `SCRIBEWIRE_API_KEY` environment variable.
pub struct EnvCredentialProvider;

impl CredentialProvider for EnvCredentialProvider {
    fn current_token(&self) -> Result<String> {
        match std::env::var(defaults::API_KEY_ENV) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(ScribeError::Unconfigured {
                message: format!("set {}", defaults::API_KEY_ENV),
            }),
        }
    }
}

/// Fixed token, for tests and embedding callers that manage credentials
/// themselves.
pub struct StaticToken(pub String);

impl CredentialProvider for StaticToken {
    fn current_token(&self) -> Result<String> {
        if self.0.is_empty() {
            return Err(ScribeError::Unconfigured {
                message: "empty token".to_string(),
            });
        }
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token_returns_value() {
        let provider = StaticToken("secret-token".to_string());
        assert_eq!(provider.current_token().unwrap(), "secret-token");
    }

    #[test]
    fn test_empty_static_token_is_unconfigured() {
        let provider = StaticToken(String::new());
        assert!(matches!(
            provider.current_token().unwrap_err(),
            ScribeError::Unconfigured { .. }
        ));
    }

    #[test]
    fn test_env_provider_missing_var_is_unconfigured() {
        // The test environment never sets this variable.
        if std::env::var(defaults::API_KEY_ENV).is_err() {
            assert!(matches!(
                EnvCredentialProvider.current_token().unwrap_err(),
                ScribeError::Unconfigured { .. }
            ));
        }
    }
}
