use serde::Serialize;

use super::error::StudioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A discrete, dismissible user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, title, message)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, title, message)
    }

    fn new(level: NotificationLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }
}

impl From<&StudioError> for Notification {
    fn from(err: &StudioError) -> Self {
        let title = match err {
            StudioError::Acquisition { kind, .. } | StudioError::PermissionDenied(kind) => {
                format!("Could not acquire {}", kind)
            }
            StudioError::UnexpectedSourceTermination(kind) => format!("{} stopped", capitalize(kind.as_str())),
            StudioError::UnsupportedFormat => "Recording unavailable".to_string(),
            StudioError::EncodingFault(_) => "Recording interrupted".to_string(),
            StudioError::PersistenceFailure(_) => "Save failed".to_string(),
            _ => "Recording error".to_string(),
        };
        Self::error(title, err.to_string())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
