use serde::Deserialize;
use serde_json::Value;

/// Runtime configuration, injected by the host page as `window.ENV`.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Origin of the API; empty means same origin.
    pub api_url: String,
    pub graphql_path: String,
    pub session_path: String,
    /// When set, logging out is a plain link to this URL.
    pub logout_link: Option<String>,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            graphql_path: "/graphql".to_string(),
            session_path: "/~session".to_string(),
            logout_link: None,
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Parses a JSON object. Unknown keys are ignored, missing keys take
    /// their default. `API_URL` is accepted as well and wins over `api_url`.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let mut value: Value = serde_json::from_str(raw)?;
        if let Some(obj) = value.as_object_mut() {
            if let Some(url) = obj.remove("API_URL") {
                obj.insert("api_url".to_string(), url);
            }
        }
        serde_json::from_value(value)
    }

    /// Reads `window.ENV`, falling back to defaults when it is missing or
    /// malformed.
    pub fn from_window() -> Self {
        let raw = web_sys::window()
            .and_then(|w| w.get("ENV"))
            .filter(|env| env.is_object())
            .and_then(|env| js_sys::JSON::stringify(&env).ok())
            .and_then(|s| s.as_string());

        match raw {
            Some(raw) => Self::from_json(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring malformed window.ENV");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.graphql_path, "/graphql");
        assert_eq!(config.session_path, "/~session");
        assert_eq!(config.log_filter, "info");
        assert!(config.logout_link.is_none());
    }

    #[test]
    fn test_readme_key_wins() {
        let config =
            AppConfig::from_json(r#"{"api_url":"http://old","API_URL":"http://new","extra":1}"#).unwrap();
        assert_eq!(config.api_url, "http://new");
    }

    #[test]
    fn test_logout_link() {
        let config = AppConfig::from_json(r#"{"logout_link":"https://sso.example/logout"}"#).unwrap();
        assert_eq!(config.logout_link.as_deref(), Some("https://sso.example/logout"));
    }

    #[test]
    fn test_malformed() {
        assert!(AppConfig::from_json(r#"{"log_filter": 5}"#).is_err());
    }
}
