use std::fmt;

/// Canonical outcome every native service status is normalized into.
///
/// `Unknown` is the zero value only. The reply builder treats it as `Error` so an
/// unclassified result can never pass as a success.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    #[default]
    Unknown,
    Success,
    Running,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Unknown => "unknown",
            Outcome::Success => "success",
            Outcome::Running => "running",
            Outcome::Error => "error",
        }
    }

    /// Whether the engine has to call back later.
    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Running)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unknown() {
        assert_eq!(Outcome::default(), Outcome::Unknown);
        assert_eq!(Outcome::default().to_string(), "unknown");
    }

    #[test]
    fn test_only_running_is_pending() {
        assert!(Outcome::Running.is_pending());
        for outcome in [Outcome::Unknown, Outcome::Success, Outcome::Error] {
            assert!(!outcome.is_pending());
        }
    }
}
