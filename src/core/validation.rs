//! Input validation for engine operations.
//!
//! Checks content limits and encryption options before any parsing or
//! provider call happens.

use std::collections::HashSet;

use crate::core::constants::MAX_CONTENT_SIZE;
use crate::error::{Result, ValidationError};

/// Validate that a document is within the size ceiling.
///
/// # Errors
///
/// Returns `ValidationError::Oversize` if the content exceeds 50 MiB.
pub fn validate_content_size(content: &[u8]) -> Result<()> {
    if content.len() > MAX_CONTENT_SIZE {
        return Err(ValidationError::Oversize {
            size: content.len(),
            limit: MAX_CONTENT_SIZE,
        }
        .into());
    }

    Ok(())
}

/// Validate a recipient list.
///
/// Recipients must be non-empty, unique (case-insensitively), and look like
/// email addresses. Commas and line breaks are rejected because the list is
/// written comma-separated into file metadata.
///
/// # Errors
///
/// Returns `ValidationError` describing the first offending recipient.
pub fn validate_recipients(recipients: &[String]) -> Result<()> {
    if recipients.is_empty() {
        return Err(ValidationError::EmptyRecipients.into());
    }

    let mut seen = HashSet::new();
    for recipient in recipients {
        validate_recipient(recipient)?;
        if !seen.insert(recipient.to_ascii_lowercase()) {
            return Err(ValidationError::DuplicateRecipient(recipient.clone()).into());
        }
    }

    Ok(())
}

fn validate_recipient(recipient: &str) -> Result<()> {
    let invalid = |reason: &str| -> Result<()> {
        Err(ValidationError::InvalidRecipient {
            recipient: recipient.to_string(),
            reason: reason.to_string(),
        }
        .into())
    };

    if recipient.trim().is_empty() {
        return invalid("empty");
    }
    if recipient.chars().any(|c| c == ',' || c.is_whitespace()) {
        return invalid("must not contain commas or whitespace");
    }

    match recipient.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => invalid("expected an email address"),
    }
}

/// Validate a vault label.
///
/// The label is written verbatim into metadata lines, so it must be a single
/// non-empty line.
///
/// # Errors
///
/// Returns `ValidationError::InvalidVault` if the label is empty or multi-line.
pub fn validate_vault(vault: &str) -> Result<()> {
    if vault.trim().is_empty() {
        return Err(ValidationError::InvalidVault {
            vault: vault.to_string(),
            reason: "cannot be empty".to_string(),
        }
        .into());
    }

    if vault.contains('\n') || vault.contains('\r') {
        return Err(ValidationError::InvalidVault {
            vault: vault.to_string(),
            reason: "must be a single line".to_string(),
        }
        .into());
    }

    Ok(())
}
