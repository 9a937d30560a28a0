use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated player record produced by an external login component.
///
/// The engine reads it to fill launch placeholders and never mutates or
/// persists it.
#[derive(Clone, Serialize, Deserialize)]
pub struct Identity {
    pub access_token: String,
    pub client_token: String,
    pub uuid: String,
    pub name: String,
    /// `legacy`, `mojang` or `msa`.
    pub user_type: String,
    #[serde(default)]
    pub xuid: Option<String>,
    /// JSON object text for `${user_properties}`.
    #[serde(default)]
    pub user_properties: Option<String>,
}

impl Identity {
    /// Offline identity with freshly generated ids. No network involved.
    pub fn offline(name: &str) -> Self {
        let uuid = Uuid::new_v4().to_string();
        Self {
            access_token: uuid.clone(),
            client_token: Uuid::new_v4().to_string(),
            uuid,
            name: name.trim().to_string(),
            user_type: "legacy".into(),
            xuid: None,
            user_properties: None,
        }
    }

    pub(crate) fn user_properties_or_empty(&self) -> &str {
        self.user_properties.as_deref().unwrap_or("{}")
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("user_type", &self.user_type)
            .field("access_token", &"<redacted>")
            .field("client_token", &"<redacted>")
            .finish()
    }
}
