//! Fixed set of watched applications and their display names.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedApp {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl WatchedApp {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            category: None,
        }
    }

    fn builtin(id: &str, display_name: &str, category: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            category: Some(category.to_string()),
        }
    }
}

pub const INSTAGRAM: &str = "com.instagram.android";

#[derive(Debug, Clone)]
pub struct WatchedAppRegistry {
    apps: Vec<WatchedApp>,
}

impl Default for WatchedAppRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl WatchedAppRegistry {
    pub fn builtin() -> Self {
        Self {
            apps: vec![
                WatchedApp::builtin(INSTAGRAM, "Instagram", "Photo Sharing"),
                WatchedApp::builtin("com.facebook.katana", "Facebook", "Social Network"),
                WatchedApp::builtin("com.twitter.android", "Twitter/X", "Microblogging"),
                WatchedApp::builtin("com.snapchat.android", "Snapchat", "Ephemeral Content"),
                WatchedApp::builtin("com.linkedin.android", "LinkedIn", "Professional Network"),
                WatchedApp::builtin("com.pinterest", "Pinterest", "Visual Discovery"),
                WatchedApp::builtin("com.reddit.frontpage", "Reddit", "Community Discussion"),
                WatchedApp::builtin("com.whatsapp", "WhatsApp", "Messaging"),
                WatchedApp::builtin("com.zhiliaoapp.musically", "TikTok", "Short Video"),
                WatchedApp::builtin("com.google.android.youtube", "YouTube", "Video Content"),
            ],
        }
    }

    pub fn new(apps: Vec<WatchedApp>) -> Self {
        let mut registry = Self { apps: Vec::new() };
        registry.merge(apps);
        registry
    }

    /// Built-in apps plus `extra`; an extra entry with a known id replaces the built-in one.
    pub fn with_extra(extra: Vec<WatchedApp>) -> Self {
        let mut registry = Self::builtin();
        registry.merge(extra);
        registry
    }

    fn merge(&mut self, apps: Vec<WatchedApp>) {
        for app in apps {
            if app.id.is_empty() {
                continue;
            }
            match self.apps.iter_mut().find(|existing| existing.id == app.id) {
                Some(existing) => *existing = app,
                None => self.apps.push(app),
            }
        }
    }

    pub fn contains(&self, app_id: &str) -> bool {
        self.get(app_id).is_some()
    }

    pub fn get(&self, app_id: &str) -> Option<&WatchedApp> {
        self.apps.iter().find(|app| app.id == app_id)
    }

    /// Display name for `app_id`, falling back to the raw identifier.
    pub fn display_name(&self, app_id: &str) -> String {
        self.get(app_id)
            .map(|app| app.display_name.clone())
            .unwrap_or_else(|| app_id.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchedApp> {
        self.apps.iter()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_knows_instagram() {
        let registry = WatchedAppRegistry::builtin();
        assert_eq!(registry.len(), 10);
        assert!(registry.contains(INSTAGRAM));
        assert_eq!(registry.display_name(INSTAGRAM), "Instagram");
    }

    #[test]
    fn unknown_ids_fall_back_to_identifier() {
        let registry = WatchedAppRegistry::builtin();
        assert!(!registry.contains("com.android.chrome"));
        assert_eq!(registry.display_name("com.android.chrome"), "com.android.chrome");
    }

    #[test]
    fn extra_apps_are_merged_and_override_builtins() {
        let registry = WatchedAppRegistry::with_extra(vec![
            WatchedApp::new("com.android.calculator2", "Calculator"),
            WatchedApp::new(INSTAGRAM, "Insta"),
            WatchedApp::new("", "ignored"),
        ]);

        assert_eq!(registry.len(), 11);
        assert_eq!(registry.display_name("com.android.calculator2"), "Calculator");
        assert_eq!(registry.display_name(INSTAGRAM), "Insta");
    }
}
