//! Authentication header construction per provider auth scheme.

use crate::credentials::CredentialStore;
use crate::errors::QuoteError;
use crate::registry::{AuthScheme, ProviderConfig};

/// Build the auth headers for one provider call.
///
/// Schemes that need a credential fail with
/// [`QuoteError::MissingCredential`] when the store has no live key for
/// the provider. That failure is a configuration error and is never
/// retried.
pub(crate) fn auth_headers(
    config: &ProviderConfig,
    credentials: &CredentialStore,
) -> Result<Vec<(&'static str, String)>, QuoteError> {
    if !config.auth.requires_credential() {
        return Ok(Vec::new());
    }

    let key = credentials
        .get_key(&config.name)
        .ok_or_else(|| QuoteError::MissingCredential {
            provider: config.name.clone(),
        })?;

    let header = match config.auth {
        AuthScheme::ApiKey => ("X-API-Key", key),
        AuthScheme::Bearer => ("Authorization", format!("Bearer {}", key)),
        AuthScheme::OAuth => ("Authorization", format!("OAuth {}", key)),
        AuthScheme::None => return Ok(Vec::new()),
    };

    Ok(vec![header])
}
