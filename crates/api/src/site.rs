//! Site-wide display settings shared by notifications and preview pages.
//!
//! Read once at start-up from the JSON file named by `SITE_CONFIG_PATH` and
//! shared read-only through `AppState`.

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum SiteConfigError {
    #[error("Failed to read site config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid site config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub site_name: String,
    /// Public URL of the web app, used in links and preview redirects.
    pub base_url: String,
    /// Image attached to notifications whose event carries none.
    pub default_image: Option<String>,
    /// `og:image` of preview pages.
    pub preview_image: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: "LearnHub".to_string(),
            base_url: "http://localhost:5173".to_string(),
            default_image: None,
            preview_image: None,
        }
    }
}

impl SiteConfig {
    /// Load from `SITE_CONFIG_PATH`, or defaults when the variable is unset.
    pub fn from_env() -> Result<Self, SiteConfigError> {
        match std::env::var("SITE_CONFIG_PATH") {
            Ok(path) => Self::load(Path::new(&path)),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Parse a JSON file. Missing keys take their default.
    pub fn load(path: &Path) -> Result<Self, SiteConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| SiteConfigError::Read {
            path: display.clone(),
            source,
        })?;
        Self::parse(&raw).map_err(|source| SiteConfigError::Parse {
            path: display,
            source,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let site = SiteConfig::parse(r#"{"site_name": "Academy"}"#).unwrap();
        assert_eq!(site.site_name, "Academy");
        assert_eq!(site.base_url, SiteConfig::default().base_url);
        assert!(site.default_image.is_none());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = SiteConfig::load(Path::new("/nonexistent/site.json")).unwrap_err();
        assert!(matches!(err, SiteConfigError::Read { .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(SiteConfig::parse("{not json").is_err());
    }
}
