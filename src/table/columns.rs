//! Mapping between logical fields and remote column ids.

use std::collections::{BTreeMap, HashMap};

use crate::config::ColumnsConfig;
use crate::error::{Result, SyncError};

use super::api_types::ApiColumn;
use super::types::Field;

/// Column ids resolved against the remote schema
#[derive(Debug, Clone)]
pub struct ColumnMap {
  by_field: BTreeMap<Field, u64>,
  by_column: HashMap<u64, Field>,
}

impl ColumnMap {
  /// Resolve configured titles against the remote columns.
  ///
  /// Fails with `SchemaMismatch` naming every configured title that the
  /// remote schema lacks.
  pub fn resolve(config: &ColumnsConfig, remote: &[ApiColumn]) -> Result<Self> {
    let ids_by_title: HashMap<&str, u64> = remote
      .iter()
      .map(|c| (c.title.as_str(), c.id))
      .collect();

    let mut by_field = BTreeMap::new();
    let mut missing = Vec::new();
    for (field, title) in config.titles() {
      match ids_by_title.get(title) {
        Some(id) => {
          by_field.insert(field, *id);
        }
        None => missing.push(title.to_string()),
      }
    }

    if !missing.is_empty() {
      return Err(SyncError::SchemaMismatch { missing });
    }

    let by_column = by_field.iter().map(|(f, id)| (*id, *f)).collect();
    Ok(Self {
      by_field,
      by_column,
    })
  }

  pub fn column_id(&self, field: Field) -> Option<u64> {
    self.by_field.get(&field).copied()
  }

  pub fn field(&self, column_id: u64) -> Option<Field> {
    self.by_column.get(&column_id).copied()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn legacy_columns() -> Vec<ApiColumn> {
    ColumnsConfig::default()
      .titles()
      .iter()
      .enumerate()
      .map(|(i, (_, title))| ApiColumn {
        id: 100 + i as u64,
        title: title.to_string(),
      })
      .collect()
  }

  #[test]
  fn test_resolves_legacy_sheet() {
    let map = ColumnMap::resolve(&ColumnsConfig::default(), &legacy_columns()).unwrap();
    assert_eq!(map.column_id(Field::Id), Some(100));
    assert_eq!(map.field(111), Some(Field::FrozenMinutes));
    assert_eq!(map.column_id(Field::Note), None);
  }

  #[test]
  fn test_reports_every_missing_column() {
    let mut remote = legacy_columns();
    remote.retain(|c| c.title != "status" && c.title != "issue");

    match ColumnMap::resolve(&ColumnsConfig::default(), &remote) {
      Err(SyncError::SchemaMismatch { missing }) => {
        assert_eq!(missing, vec!["status".to_string(), "issue".to_string()]);
      }
      other => panic!("expected SchemaMismatch, got {:?}", other),
    }
  }

  #[test]
  fn test_configured_note_becomes_required() {
    let config = ColumnsConfig {
      note: Some("Notas".to_string()),
      ..ColumnsConfig::default()
    };
    let err = ColumnMap::resolve(&config, &legacy_columns()).unwrap_err();
    assert!(matches!(err, SyncError::SchemaMismatch { missing } if missing == vec!["Notas"]));
  }
}
