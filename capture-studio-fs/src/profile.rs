use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use capture_studio_core::models::error::StudioError;
use capture_studio_core::traits::chunk_buffer::{get_json, set_json, SettingsStore};

pub const CLOUD_PROFILE_KEY: &str = "cloud_profile";

/// Signed-in cloud account, cached so the UI can show it before re-auth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfile {
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub cached_at: DateTime<Utc>,
}

impl CloudProfile {
    pub fn new(email: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            email: email.into(),
            display_name,
            avatar_url: None,
            cached_at: Utc::now(),
        }
    }
}

pub struct ProfileCache {
    settings: Arc<dyn SettingsStore>,
}

impl ProfileCache {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    pub fn load(&self) -> Result<Option<CloudProfile>, StudioError> {
        get_json(self.settings.as_ref(), CLOUD_PROFILE_KEY)
    }

    pub fn store(&self, profile: &CloudProfile) -> Result<(), StudioError> {
        debug!("ProfileCache: caching profile for {}", profile.email);
        set_json(self.settings.as_ref(), CLOUD_PROFILE_KEY, profile)
    }

    /// Forget the cached profile (sign-out).
    pub fn clear(&self) -> Result<(), StudioError> {
        self.settings.remove_setting(CLOUD_PROFILE_KEY)
    }
}
