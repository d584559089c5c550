use crate::domain::types::FailureKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const PERMISSION_MARKERS: &[&str] = &[
    "permission denied",
    "access denied",
    "access is denied",
    "unauthorized",
    "forbidden",
];
const TRANSIENT_MARKERS: &[&str] = &["timeout", "timed out", "connection", "network", "unreachable"];
const UNAVAILABLE_MARKERS: &[&str] = &[
    "not found",
    "cannot find",
    "not available",
    "unavailable",
    "no tab is connected",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Permission,
    Transient,
    Unavailable,
    Unclassified,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Permission => "permission",
            ErrorCategory::Transient => "transient",
            ErrorCategory::Unavailable => "unavailable",
            ErrorCategory::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buckets a tool failure. Permission markers win over everything else; the
/// message is checked before the transport-level kind, which only decides
/// when no marker matches.
///
/// Keyword matching depends on upstream wording, so unmatched messages are
/// logged for tuning the marker lists.
pub fn classify_failure(kind: Option<FailureKind>, message: &str) -> ErrorCategory {
    let lowered = message.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|marker| lowered.contains(marker));

    let category = if has(PERMISSION_MARKERS) {
        ErrorCategory::Permission
    } else if has(TRANSIENT_MARKERS) {
        ErrorCategory::Transient
    } else if has(UNAVAILABLE_MARKERS) {
        ErrorCategory::Unavailable
    } else {
        match kind {
            Some(FailureKind::Timeout) | Some(FailureKind::Transport) => ErrorCategory::Transient,
            Some(FailureKind::NotFound) | Some(FailureKind::Unavailable) => {
                ErrorCategory::Unavailable
            }
            _ => ErrorCategory::Unclassified,
        }
    };

    if category == ErrorCategory::Unclassified {
        debug!(message = %message, "No recovery marker matched tool failure");
    }
    category
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_markers_abort_regardless_of_kind() {
        assert_eq!(
            classify_failure(Some(FailureKind::Timeout), "Access Denied while opening registry"),
            ErrorCategory::Permission
        );
        assert_eq!(
            classify_failure(None, "401 Unauthorized"),
            ErrorCategory::Permission
        );
    }

    #[test]
    fn transient_and_unavailable_markers() {
        assert_eq!(
            classify_failure(Some(FailureKind::Execution), "Connection reset by peer"),
            ErrorCategory::Transient
        );
        assert_eq!(
            classify_failure(Some(FailureKind::Execution), "Window 'Chrome' not found"),
            ErrorCategory::Unavailable
        );
        assert_eq!(
            classify_failure(Some(FailureKind::Execution), "No tab is connected"),
            ErrorCategory::Unavailable
        );
    }

    #[test]
    fn kind_decides_when_message_is_silent() {
        assert_eq!(
            classify_failure(Some(FailureKind::Transport), "broken pipe"),
            ErrorCategory::Transient
        );
        assert_eq!(
            classify_failure(Some(FailureKind::NotFound), "tool 'ghost' missing"),
            ErrorCategory::Unavailable
        );
        assert_eq!(
            classify_failure(Some(FailureKind::Execution), "element index out of range"),
            ErrorCategory::Unclassified
        );
    }
}
