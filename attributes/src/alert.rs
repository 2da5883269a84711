use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A user-visible notice about a recoverable failure or a completed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
    pub description: String,
}

impl Alert {
    pub fn new(level: AlertLevel, message: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            description: description.into(),
        }
    }

    pub fn error(message: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(AlertLevel::Error, message, description)
    }

    pub fn warning(message: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(AlertLevel::Warning, message, description)
    }

    pub fn success(message: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(AlertLevel::Success, message, description)
    }

    /// Error alert for a rejected request, preferring the server's own
    /// description over `generic` when it sent one.
    pub fn from_api_error(message: impl Into<String>, generic: &str, err: &idp::Error) -> Self {
        let description = err.description().unwrap_or(generic);
        Self::error(message, description)
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::server_description(
        Some("Duplicate claim mapping for 'mail'."),
        "Duplicate claim mapping for 'mail'."
    )]
    #[case::no_description(None, "Failed to update the claim configuration.")]
    #[case::blank_description(Some(""), "Failed to update the claim configuration.")]
    fn test_from_api_error(#[case] description: Option<&str>, #[case] want: &str) {
        // given
        let err = idp::Error::Api {
            status: 400u16.try_into().unwrap(),
            code: "APP-60001".to_string(),
            message: "Invalid input.".to_string(),
            description: description.map(str::to_string),
        };

        // when
        let got = Alert::from_api_error(
            "Update error",
            "Failed to update the claim configuration.",
            &err,
        );

        // then
        assert_eq!(got.level, AlertLevel::Error);
        assert_eq!(got.description, want);
    }
}
