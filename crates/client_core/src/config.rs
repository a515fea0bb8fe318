use std::{fs, path::Path};

use anyhow::{bail, Context};
use dataset::DEFAULT_DATASET;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::classifier::DEFAULT_CLASSIFIER_URL;

pub const DEFAULT_CONFIG_FILE: &str = "sentiment.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub dataset: String,
    pub classifier_url: String,
    pub api_token: Option<String>,
    pub bind_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dataset: DEFAULT_DATASET.into(),
            classifier_url: DEFAULT_CLASSIFIER_URL.into(),
            api_token: None,
            bind_addr: "127.0.0.1:8080".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    dataset: Option<String>,
    classifier_url: Option<String>,
    api_token: Option<String>,
    bind_addr: Option<String>,
}

/// Defaults, then the TOML file if it exists, then environment overrides.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => settings.apply_file(file_cfg),
            Err(error) => warn!(path = %path.display(), %error, "config: ignoring unparseable file"),
        }
    }

    settings.apply_env(|key| std::env::var(key).ok());
    settings
}

impl Settings {
    fn apply_file(&mut self, file_cfg: FileSettings) {
        if let Some(v) = file_cfg.dataset {
            self.dataset = v;
        }
        if let Some(v) = file_cfg.classifier_url {
            self.classifier_url = v;
        }
        if let Some(v) = file_cfg.api_token {
            self.api_token = Some(v);
        }
        if let Some(v) = file_cfg.bind_addr {
            self.bind_addr = v;
        }
    }

    /// Later keys in each list take precedence.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in ["SENTIMENT_DATASET", "APP__DATASET"] {
            if let Some(v) = lookup(key) {
                self.dataset = v;
            }
        }
        for key in ["SENTIMENT_ENDPOINT", "APP__CLASSIFIER_URL"] {
            if let Some(v) = lookup(key) {
                self.classifier_url = v;
            }
        }
        for key in ["HF_TOKEN", "SENTIMENT_API_TOKEN", "APP__API_TOKEN"] {
            if let Some(v) = lookup(key) {
                self.api_token = Some(v);
            }
        }
        for key in ["SENTIMENT_BIND", "APP__BIND_ADDR"] {
            if let Some(v) = lookup(key) {
                self.bind_addr = v;
            }
        }
    }

    /// Blank tokens mean "unauthenticated".
    pub fn token(&self) -> Option<&str> {
        self.api_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.classifier_url)
            .with_context(|| format!("invalid classifier url '{}'", self.classifier_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("classifier url must be http or https, got '{}'", url.scheme());
        }
        if self.dataset.trim().is_empty() {
            bail!("dataset location is empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "dataset = \"data/imdb.tsv\"\nclassifier_url = \"http://localhost:9000/classify\""
        )
        .expect("write");

        let settings = load_settings(file.path());

        assert_eq!(settings.dataset, "data/imdb.tsv");
        assert_eq!(settings.classifier_url, "http://localhost:9000/classify");
        assert_eq!(settings.bind_addr, Settings::default().bind_addr);
    }

    #[test]
    fn env_overrides_win_and_prefixed_aliases_come_last() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SENTIMENT_DATASET", "a.tsv"),
            ("APP__DATASET", "b.tsv"),
            ("HF_TOKEN", "hf_abc"),
        ]);
        let mut settings = Settings::default();
        settings.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.dataset, "b.tsv");
        assert_eq!(settings.token(), Some("hf_abc"));
    }

    #[test]
    fn blank_token_is_treated_as_absent() {
        let settings = Settings {
            api_token: Some("  ".into()),
            ..Settings::default()
        };
        assert_eq!(settings.token(), None);
    }

    #[test]
    fn validate_rejects_non_http_endpoints() {
        let mut settings = Settings::default();
        settings.validate().expect("defaults are valid");

        settings.classifier_url = "ftp://example.com/model".into();
        assert!(settings.validate().is_err());

        settings.classifier_url = "not a url".into();
        assert!(settings.validate().is_err());
    }
}
