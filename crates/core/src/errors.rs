use thiserror::Error;

use crate::domain::EntityType;

/// Failure taxonomy for one command submission.
///
/// `NotFound` and `AmbiguousMatch` are recovered locally and rendered as
/// assistant messages. `Delegate` and `Persistence` are caught at the
/// executor/delegate boundary and rendered as actionable assistant text.
/// Nothing here terminates the session.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("no {} named '{name}' was found", kind.display())]
    NotFound { kind: EntityType, name: String, suggestions: Vec<String> },
    #[error("multiple {} entries match '{name}'", kind.display())]
    AmbiguousMatch { kind: EntityType, name: String, match_count: usize },
    #[error(transparent)]
    Delegate(#[from] DelegateError),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl CommandError {
    /// The assistant reply rendered for this failure. Always safe to show
    /// and always leaves the session usable for an immediate retry.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(reason) => {
                format!("I couldn't apply that: {reason}.")
            }
            Self::NotFound { kind, name, suggestions } => {
                if suggestions.is_empty() {
                    format!("I couldn't find a {} named '{name}'.", kind.display())
                } else {
                    format!(
                        "I couldn't find a {} named '{name}'. Did you mean: {}?",
                        kind.display(),
                        suggestions.join(", ")
                    )
                }
            }
            Self::AmbiguousMatch { kind, name, match_count } => format!(
                "{match_count} {}s match '{name}'; I used the most recently updated one.",
                kind.display()
            ),
            Self::Delegate(error) => error.user_message(),
            Self::Persistence(_) => {
                "I couldn't save that change. Nothing was lost; please try again.".to_owned()
            }
        }
    }
}

/// Remote conversational delegate failure, bucketed by cause.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind:?} delegate failure: {message}")]
pub struct DelegateError {
    pub kind: DelegateErrorKind,
    pub message: String,
}

impl DelegateError {
    pub fn new(kind: DelegateErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// Categorize a raw failure by its message content.
    pub fn categorize(message: impl Into<String>) -> Self {
        let message = message.into();
        Self { kind: DelegateErrorKind::from_message(&message), message }
    }

    pub fn user_message(&self) -> String {
        match self.kind {
            DelegateErrorKind::Auth => {
                "Your session with the assistant service has expired. Please sign in again."
                    .to_owned()
            }
            DelegateErrorKind::Network => {
                "I couldn't reach the assistant service. Check your connection and retry."
                    .to_owned()
            }
            DelegateErrorKind::ServiceUnavailable => {
                "The assistant service is temporarily unavailable. Please retry shortly."
                    .to_owned()
            }
            DelegateErrorKind::UpstreamBusy => {
                "The assistant service is busy right now. Give it a moment and retry.".to_owned()
            }
            DelegateErrorKind::Generic => {
                "Something went wrong while answering. Your message was kept; please retry."
                    .to_owned()
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelegateErrorKind {
    Auth,
    Network,
    ServiceUnavailable,
    UpstreamBusy,
    Generic,
}

impl DelegateErrorKind {
    /// Transient buckets: a fresh attempt can plausibly succeed without
    /// the user changing anything.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::ServiceUnavailable | Self::UpstreamBusy)
    }

    pub fn from_message(message: &str) -> Self {
        let lowered = message.to_ascii_lowercase();
        if lowered.contains("auth")
            || lowered.contains("session expired")
            || lowered.contains("401")
            || lowered.contains("403")
        {
            Self::Auth
        } else if lowered.contains("network")
            || lowered.contains("timed out")
            || lowered.contains("timeout")
            || lowered.contains("connection")
        {
            Self::Network
        } else if lowered.contains("unavailable") || lowered.contains("503") {
            Self::ServiceUnavailable
        } else if lowered.contains("busy")
            || lowered.contains("overloaded")
            || lowered.contains("rate limit")
            || lowered.contains("429")
        {
            Self::UpstreamBusy
        } else {
            Self::Generic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandError, DelegateError, DelegateErrorKind};
    use crate::domain::EntityType;

    #[test]
    fn not_found_message_lists_suggestions() {
        let error = CommandError::NotFound {
            kind: EntityType::Project,
            name: "Launch".to_owned(),
            suggestions: vec!["Launch Alpha".to_owned(), "Launch Beta".to_owned()],
        };
        let message = error.user_message();
        assert!(message.contains("Launch Alpha"));
        assert!(message.contains("Launch Beta"));
    }

    #[test]
    fn ambiguous_match_is_rendered_as_warning_text() {
        let error = CommandError::AmbiguousMatch {
            kind: EntityType::Goal,
            name: "MVP".to_owned(),
            match_count: 2,
        };
        assert!(error.user_message().contains("most recently updated"));
    }

    #[test]
    fn delegate_errors_categorize_by_message_content() {
        let cases = [
            ("session expired, please re-authenticate", DelegateErrorKind::Auth),
            ("network connection reset by peer", DelegateErrorKind::Network),
            ("request timed out after 30s", DelegateErrorKind::Network),
            ("service unavailable (503)", DelegateErrorKind::ServiceUnavailable),
            ("model overloaded, rate limit hit", DelegateErrorKind::UpstreamBusy),
            ("unexpected end of stream", DelegateErrorKind::Generic),
        ];
        for (message, expected) in cases {
            assert_eq!(DelegateError::categorize(message).kind, expected, "{message}");
        }
    }

    #[test]
    fn only_transient_delegate_failures_are_retryable() {
        assert!(DelegateErrorKind::Network.is_retryable());
        assert!(DelegateErrorKind::ServiceUnavailable.is_retryable());
        assert!(DelegateErrorKind::UpstreamBusy.is_retryable());
        assert!(!DelegateErrorKind::Auth.is_retryable());
        assert!(!DelegateErrorKind::Generic.is_retryable());
    }

    #[test]
    fn persistence_message_invites_retry() {
        let error = CommandError::Persistence("disk full".to_owned());
        assert!(error.user_message().contains("try again"));
    }
}
