//! Input validation shared by the registry implementations and the
//! command interface.

use crate::shared::errors::DomainError;

/// Validate a user-submitted URL and return it trimmed.
///
/// The URL must start with `http://` or `https://` (case-sensitive) and
/// carry a non-empty remainder without embedded whitespace.
pub fn validate_url(raw: &str) -> Result<String, DomainError> {
    let url = raw.trim();

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| {
            DomainError::Validation(format!(
                "URL must start with http:// or https://: {}",
                url
            ))
        })?;

    if rest.is_empty() || rest.starts_with('/') {
        return Err(DomainError::Validation(format!("URL has no host: {}", url)));
    }

    if rest.chars().any(char::is_whitespace) {
        return Err(DomainError::Validation(format!(
            "URL must not contain whitespace: {}",
            url
        )));
    }

    Ok(url.to_string())
}
