use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::table::Field;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub sheet: SheetConfig,
  #[serde(default)]
  pub columns: ColumnsConfig,
  #[serde(default)]
  pub records: RecordsConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

/// Which end of the sheet new rows are inserted at
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsertAt {
  #[default]
  Top,
  Bottom,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetConfig {
  /// Numeric sheet id
  pub id: u64,
  #[serde(default = "default_api_url")]
  pub api_url: String,
  #[serde(default)]
  pub insert_at: InsertAt,
  #[serde(default = "default_request_timeout")]
  pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
  "https://api.smartsheet.com/2.0".to_string()
}

fn default_request_timeout() -> u64 {
  30
}

/// Remote column title for each logical field.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
  pub id: String,
  pub created_at: String,
  pub room: String,
  pub work_order: String,
  pub part_number: String,
  pub lot_number: String,
  pub quantity: String,
  pub reason: String,
  pub status: String,
  pub owner: String,
  pub issue: String,
  pub frozen_minutes: String,
  /// Free-text note column; not tracked when unset
  pub note: Option<String>,
}

impl Default for ColumnsConfig {
  fn default() -> Self {
    Self {
      id: "ID".to_string(),
      created_at: "fecha_hora".to_string(),
      room: "cuarto".to_string(),
      work_order: "work_order".to_string(),
      part_number: "numero_parte".to_string(),
      lot_number: "numero_lote".to_string(),
      quantity: "cantidad".to_string(),
      reason: "motivo".to_string(),
      status: "status".to_string(),
      owner: "almacenista".to_string(),
      issue: "issue".to_string(),
      frozen_minutes: "minuto_final".to_string(),
      note: None,
    }
  }
}

impl ColumnsConfig {
  /// Configured (field, column title) pairs, in column order.
  pub fn titles(&self) -> Vec<(Field, &str)> {
    let mut titles = vec![
      (Field::Id, self.id.as_str()),
      (Field::CreatedAt, self.created_at.as_str()),
      (Field::Room, self.room.as_str()),
      (Field::WorkOrder, self.work_order.as_str()),
      (Field::PartNumber, self.part_number.as_str()),
      (Field::LotNumber, self.lot_number.as_str()),
      (Field::Quantity, self.quantity.as_str()),
      (Field::Reason, self.reason.as_str()),
      (Field::Status, self.status.as_str()),
      (Field::Owner, self.owner.as_str()),
      (Field::Issue, self.issue.as_str()),
      (Field::FrozenMinutes, self.frozen_minutes.as_str()),
    ];
    if let Some(note) = &self.note {
      titles.push((Field::Note, note.as_str()));
    }
    titles
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
  /// Identifier prefix, e.g. "REQ" for REQ-00042
  pub id_prefix: String,
  /// Business timezone as a fixed offset from UTC
  pub utc_offset_hours: i32,
  /// Rooms accepted by the creation form
  pub rooms: Vec<String>,
  /// Reasons accepted by the creation form
  pub reasons: Vec<String>,
}

impl Default for RecordsConfig {
  fn default() -> Self {
    let rooms = [
      "INTRODUCER", "PU1", "PU2", "PU3", "PU4", "PVC1", "PVC2", "PVC3A", "PVC3B", "PVC6", "PVC7",
      "PVC8", "PVC9", "PVCS", "PAK1", "MGLY", "MASM1", "MMCL", "MM MOLD", "MMFP", "MIXIN",
      "RESORTES",
    ];
    let reasons = ["Proceso", "Extra", "Scrap", "Navajas", "Tooling"];
    Self {
      id_prefix: "REQ".to_string(),
      utc_offset_hours: -7,
      rooms: rooms.iter().map(|s| s.to_string()).collect(),
      reasons: reasons.iter().map(|s| s.to_string()).collect(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Seconds a fetched snapshot stays fresh
  pub ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self { ttl_secs: 15 }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./reqsync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/reqsync/config.yaml
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/reqsync/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("reqsync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("reqsync").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Invalid config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config =
      serde_yaml::from_str(contents).map_err(|e| eyre!("Failed to parse config: {}", e))?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    let prefix = &self.records.id_prefix;
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
      return Err(eyre!("records.id_prefix must be non-empty and alphanumeric, got {:?}", prefix));
    }
    if self.records.utc_offset_hours.abs() > 14 {
      return Err(eyre!(
        "records.utc_offset_hours must be within -14..=14, got {}",
        self.records.utc_offset_hours
      ));
    }
    if self.records.rooms.is_empty() || self.records.reasons.is_empty() {
      return Err(eyre!("records.rooms and records.reasons must not be empty"));
    }
    if self.cache.ttl_secs == 0 {
      return Err(eyre!("cache.ttl_secs must be greater than zero"));
    }
    if self.sheet.request_timeout_secs == 0 {
      return Err(eyre!("sheet.request_timeout_secs must be greater than zero"));
    }
    Ok(())
  }

  /// Get the Smartsheet API token from environment variables.
  ///
  /// Checks REQSYNC_SMARTSHEET_TOKEN first, then SMARTSHEET_ACCESS_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("REQSYNC_SMARTSHEET_TOKEN")
      .or_else(|_| std::env::var("SMARTSHEET_ACCESS_TOKEN"))
      .map_err(|_| {
        eyre!(
          "Smartsheet token not found. Set REQSYNC_SMARTSHEET_TOKEN or SMARTSHEET_ACCESS_TOKEN environment variable."
        )
      })
  }
}
