use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identity attributed to a creation event.
///
/// Storage layers never interpret an `Author`; they pass it through to the
/// entity, which persists it alongside its other creation metadata.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Author {
    name: String,
    email: String,
}

impl Author {
    /// Create an author, rejecting an empty e-mail address.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let email = email.into();
        if email.trim().is_empty() {
            return Err(TypeError::InvalidAuthor("email must not be empty".into()));
        }
        if !email.contains('@') {
            return Err(TypeError::InvalidAuthor(format!("malformed email: {email}")));
        }
        Ok(Self { name, email })
    }

    /// Create an author whose display name is the local part of `email`.
    pub fn from_email(email: impl Into<String>) -> Result<Self, TypeError> {
        let email = email.into();
        let name = email.split('@').next().unwrap_or_default().to_string();
        Self::new(name, email)
    }

    /// The author used for changes made by the system itself.
    pub fn system() -> Self {
        Self {
            name: "System".into(),
            email: "system@localhost.localdomain".into(),
        }
    }

    /// The author used when the real author cannot be determined.
    pub fn unknown() -> Self {
        Self {
            name: "Unknown".into(),
            email: "nobody@no.where".into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}
