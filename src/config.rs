//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$ORDERPDF_CONFIG` (environment variable)
//! 2. `~/.config/orderpdf/config.toml` (Linux/macOS)
//!    `%APPDATA%\orderpdf\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! The mailbox password is never read from the file; pass it on the command
//! line or through `ORDERPDF_PASSWORD`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Default mailbox connection.
    pub mailbox: MailboxConfig,
    /// Page geometry and typography of the base document.
    pub layout: LayoutConfig,
    /// Where finished documents are stored.
    pub output: OutputConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Default mailbox connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// IMAP host name.
    pub host: String,
    /// IMAP port.
    pub port: u16,
    /// Implicit TLS (`true`) or STARTTLS (`false`).
    pub tls: bool,
    /// Login name.
    pub user: String,
    /// Folder searched for order messages.
    pub mailbox: String,
}

/// Page geometry and typography, in PDF points.
///
/// `margin` doubles as the bottom threshold for page breaks: nothing is
/// placed below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    /// Maximum width of flowed text.
    pub text_width: f32,
    /// Size of the `Order ID` heading.
    pub title_font_size: f32,
    /// Size of section headings (`Email Body`, `Attachment: …`, `Sheet: …`).
    pub heading_font_size: f32,
    /// Size of metadata and body text.
    pub body_font_size: f32,
    /// Size of attachment text and spreadsheet rows.
    pub attachment_font_size: f32,
    /// Line height as a multiple of the font size.
    pub line_spacing: f32,
    /// Box images are scaled to fit in.
    pub image_box_width: f32,
    pub image_box_height: f32,
}

/// Output location for the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory for stored documents.
    pub directory: PathBuf,
    /// First segment of generated object keys.
    pub key_prefix: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 993,
            tls: true,
            user: String::new(),
            mailbox: crate::model::request::DEFAULT_MAILBOX.to_string(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: 612.0, // US Letter
            page_height: 792.0,
            margin: 50.0,
            text_width: 500.0,
            title_font_size: 18.0,
            heading_font_size: 14.0,
            body_font_size: 12.0,
            attachment_font_size: 10.0,
            line_spacing: 1.2,
            image_box_width: 450.0,
            image_box_height: 400.0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            key_prefix: "pdf".to_string(),
        }
    }
}

impl LayoutConfig {
    /// Width available between the left and right margins.
    pub fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    /// Height available between the top and bottom margins.
    pub fn content_height(&self) -> f32 {
        self.page_height - 2.0 * self.margin
    }

    /// Width text is wrapped to.
    pub fn wrap_width(&self) -> f32 {
        self.text_width.min(self.content_width())
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("ORDERPDF_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("orderpdf").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("orderpdf")
}
