//! Entity name validation.
//!
//! Every entity name becomes a directory name under its manager's root, so
//! the accepted alphabet is deliberately narrow:
//! - Must be non-empty and at most [`MAX_NAME_LEN`] bytes
//! - Must start and end with an ASCII letter or digit
//! - Interior characters may also be `-`, `+`, `_`, or `.`
//! - Must not contain `..`
//!
//! Names starting with `.` are therefore never valid, which keeps hidden and
//! staging directories out of the entity namespace.

use crate::error::TypeError;

/// Maximum length of an entity name in bytes.
pub const MAX_NAME_LEN: usize = 255;

const INTERIOR_PUNCTUATION: &[char] = &['-', '+', '_', '.'];

/// Validate an entity name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use depot_types::names::validate_entity_name;
///
/// assert!(validate_entity_name("alpha").is_ok());
/// assert!(validate_entity_name("my-project.v2").is_ok());
/// assert!(validate_entity_name("").is_err());
/// assert!(validate_entity_name(".hidden").is_err());
/// ```
pub fn validate_entity_name(name: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name is too long"));
    }

    let first = name.chars().next().unwrap_or_default();
    let last = name.chars().next_back().unwrap_or_default();
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err(invalid("must start and end with a letter or digit"));
    }

    if let Some(ch) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !INTERIOR_PUNCTUATION.contains(c))
    {
        return Err(invalid(&format!("contains forbidden character: {ch:?}")));
    }

    if name.contains("..") {
        return Err(invalid("must not contain '..'"));
    }

    Ok(())
}
