/// Why a storage manager is shutting its entities down.
///
/// Close hooks receive a `&dyn Fn() -> ShutdownCause` rather than a value,
/// so a cause is only built when an entity actually has to report one (for
/// example, to fail work that was still pending).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct ShutdownCause {
    reason: String,
}

impl ShutdownCause {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The cause used for an orderly process shutdown.
    pub fn shutting_down() -> Self {
        Self::new("storage is shutting down")
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_reason() {
        assert_eq!(ShutdownCause::new("bye").to_string(), "bye");
        assert_eq!(ShutdownCause::shutting_down().reason(), "storage is shutting down");
    }
}
