//! Session token storage using system keyring

use keyring::Entry;

use super::error::ApiError;

/// Service name for keyring storage
const SERVICE_NAME: &str = "periapi";
/// Entry name for the session token
const TOKEN_ENTRY: &str = "session-token";

/// Manages the Periscope session token in the system keyring
pub struct TokenStore;

impl TokenStore {
    /// Get the session token from system keyring
    pub fn get_token() -> Result<String, ApiError> {
        let entry =
            Entry::new(SERVICE_NAME, TOKEN_ENTRY).map_err(|e| ApiError::Keyring(e.to_string()))?;

        entry.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => ApiError::TokenNotFound,
            _ => ApiError::Keyring(e.to_string()),
        })
    }

    /// Store the session token in system keyring
    pub fn set_token(token: &str) -> Result<(), ApiError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ApiError::Config("session token is empty".to_string()));
        }

        let entry =
            Entry::new(SERVICE_NAME, TOKEN_ENTRY).map_err(|e| ApiError::Keyring(e.to_string()))?;

        entry.set_password(token).map_err(|e| ApiError::Keyring(e.to_string()))
    }

    /// Delete the stored session token
    pub fn delete_token() -> Result<(), ApiError> {
        let entry =
            Entry::new(SERVICE_NAME, TOKEN_ENTRY).map_err(|e| ApiError::Keyring(e.to_string()))?;

        entry.delete_credential().map_err(|e| ApiError::Keyring(e.to_string()))
    }

    /// Mask a token for display (show first and last 4 chars)
    pub fn mask_token(token: &str) -> String {
        let chars: Vec<char> = token.chars().collect();
        if chars.len() <= 12 {
            return "*".repeat(chars.len());
        }
        let prefix: String = chars[..4].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    }
}
