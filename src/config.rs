use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use url::Url;

use crate::overlay::default_slot;

pub const DEFAULT_URL: &str = "https://jsonplaceholder.typicode.com/users";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Custom title for header (defaults to the collection host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub resource: ResourceConfig,
  /// Rows per page in the user table
  #[serde(default = "default_page_size")]
  pub page_size: usize,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      title: None,
      resource: ResourceConfig::default(),
      page_size: default_page_size(),
      storage: StorageConfig::default(),
      logging: LoggingConfig::default(),
    }
  }
}

/// The remote collection and the shape of its records.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
  pub url: String,
  /// Name of the id attribute on the wire (`id`, or `_id` for Mongo-style APIs)
  #[serde(default = "default_id_field", deserialize_with = "deserialize_trimmed")]
  pub id_field: String,
  /// Attribute matched by the search box and used for sorting
  #[serde(default = "default_search_field", deserialize_with = "deserialize_trimmed")]
  pub search_field: String,
  /// Editable attributes, in column order
  #[serde(default = "default_fields")]
  pub fields: Vec<FieldConfig>,
  /// Request timeout; the transport default applies when unset
  pub timeout_secs: Option<u64>,
}

impl Default for ResourceConfig {
  fn default() -> Self {
    Self {
      url: DEFAULT_URL.to_string(),
      id_field: default_id_field(),
      search_field: default_search_field(),
      fields: default_fields(),
      timeout_secs: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldConfig {
  pub name: String,
  pub label: Option<String>,
  #[serde(default = "default_true")]
  pub required: bool,
  #[serde(default)]
  pub kind: FieldKind,
}

/// How form text for a field is sent to the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
  #[default]
  Text,
  /// Sent as a JSON number when the text parses as one
  Number,
}

impl FieldConfig {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      label: None,
      required: true,
      kind: FieldKind::Text,
    }
  }

  /// Column/form label, falling back to the capitalized attribute name.
  pub fn label(&self) -> String {
    match &self.label {
      Some(label) => label.clone(),
      None => {
        let mut chars = self.name.chars();
        match chars.next() {
          Some(first) => first.to_uppercase().chain(chars).collect(),
          None => String::new(),
        }
      }
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// SQLite file holding overlay slots (default: $XDG_DATA_HOME/usertab/overlay.db)
  pub path: Option<PathBuf>,
  /// Slot key (default: derived from the collection URL)
  pub slot: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Filter directive used when USERTAB_LOG is not set
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Directory for log files (default: $XDG_DATA_HOME/usertab/logs)
  pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      directory: None,
    }
  }
}

fn default_page_size() -> usize {
  5
}

fn default_id_field() -> String {
  "id".to_string()
}

fn default_search_field() -> String {
  "name".to_string()
}

fn default_fields() -> Vec<FieldConfig> {
  vec![
    FieldConfig::new("name"),
    FieldConfig::new("email"),
    FieldConfig::new("phone"),
  ]
}

fn default_true() -> bool {
  true
}

fn default_log_level() -> String {
  "info".to_string()
}

fn deserialize_trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  let s = String::deserialize(deserializer)?;
  Ok(s.trim().to_string())
}

/// Application data directory, e.g. ~/.local/share/usertab
fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("usertab"))
}

impl StorageConfig {
  pub fn database_path(&self) -> Result<PathBuf> {
    match &self.path {
      Some(path) => Ok(path.clone()),
      None => Ok(data_dir()?.join("overlay.db")),
    }
  }

  /// Slot key for the given collection URL.
  pub fn slot_for(&self, url: &str) -> Result<String> {
    if let Some(slot) = &self.slot {
      return Ok(slot.clone());
    }
    let url = Url::parse(url).map_err(|e| eyre!("Invalid resource url {}: {}", url, e))?;
    Ok(default_slot(&url))
  }
}

impl LoggingConfig {
  pub fn log_directory(&self) -> Result<PathBuf> {
    match &self.directory {
      Some(dir) => Ok(dir.clone()),
      None => Ok(data_dir()?.join("logs")),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./usertab.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/usertab/config.yaml
  ///
  /// Without a file, built-in defaults target the public JSONPlaceholder
  /// users collection. USERTAB_URL overrides the resource url either way.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var("USERTAB_URL") {
      if !url.trim().is_empty() {
        config.resource.url = url.trim().to_string();
      }
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("usertab.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("usertab").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Reject configurations the UI cannot work with.
  pub fn validate(&self) -> Result<()> {
    Url::parse(&self.resource.url)
      .map_err(|e| eyre!("Invalid resource url {}: {}", self.resource.url, e))?;

    if self.page_size == 0 {
      return Err(eyre!("page_size must be at least 1"));
    }
    if self.resource.fields.is_empty() {
      return Err(eyre!("resource.fields must list at least one attribute"));
    }
    if self.resource.id_field.is_empty() {
      return Err(eyre!("resource.id_field must not be empty"));
    }

    Ok(())
  }
}
