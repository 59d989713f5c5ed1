//! Configuration file handling (missive.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use missive_delivery::{AuthMechanism, Credentials, SmtpConfig};
use missive_template::Registry;

/// Configuration file structure (missive.toml).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub templates: TemplatesSettings,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub smtp: Option<SmtpSettings>,
}

#[derive(Debug, Deserialize)]
pub struct TemplatesSettings {
    #[serde(default = "default_templates_dir")]
    pub dir: String,
}

impl Default for TemplatesSettings {
    fn default() -> Self {
        Self {
            dir: default_templates_dir(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportSettings {
    #[serde(default = "default_export_out")]
    pub out: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            out: default_export_out(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// "plain" or "login"
    #[serde(default = "default_auth")]
    pub auth: String,
    pub from: Option<String>,
}

fn default_templates_dir() -> String {
    "templates".to_string()
}
fn default_export_out() -> String {
    "previews".to_string()
}
fn default_smtp_port() -> u16 {
    1025
}
fn default_auth() -> String {
    "plain".to_string()
}

/// Load configuration from the given path if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if path.exists() {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config: ConfigFile = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        tracing::info!("Loaded config from {}", path.display());
        return Ok(config);
    }
    Ok(ConfigFile::default())
}

/// Build a registry from the built-ins plus the configured template
/// directory, when it exists.
pub fn build_registry(config: &ConfigFile) -> Result<Registry> {
    let mut registry = Registry::with_builtins();
    let dir = PathBuf::from(&config.templates.dir);
    if dir.exists() {
        let count = registry.load_dir(&dir)?;
        tracing::info!("Loaded {} templates from {}", count, dir.display());
    }
    Ok(registry)
}

impl SmtpSettings {
    /// Convert file settings into a delivery SmtpConfig.
    pub fn to_smtp_config(&self) -> Result<SmtpConfig> {
        let mut smtp = SmtpConfig::new(self.host.as_str(), self.port);

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            let mechanism = match self.auth.as_str() {
                "plain" => AuthMechanism::Plain,
                "login" => AuthMechanism::Login,
                other => anyhow::bail!("Unsupported auth mechanism '{other}' (plain or login)"),
            };
            smtp = smtp.with_credentials(Credentials {
                username: username.clone(),
                password: password.clone(),
                mechanism,
            });
        }

        Ok(smtp)
    }
}
