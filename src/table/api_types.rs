//! Serde types matching Smartsheet API 2.0 requests and responses.
//!
//! Kept apart from the row types so the wire format can change without
//! touching the reconciler or the lifecycle code.

use serde::{Deserialize, Serialize};

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiColumn {
  pub id: u64,
  #[serde(default)]
  pub title: String,
}

/// `GET /sheets/{id}/columns`
#[derive(Debug, Deserialize)]
pub struct ApiColumnsResponse {
  #[serde(default)]
  pub data: Vec<ApiColumn>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCell {
  #[serde(rename = "columnId")]
  pub column_id: u64,
  #[serde(default)]
  pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct ApiRow {
  pub id: u64,
  #[serde(default)]
  pub cells: Vec<ApiCell>,
}

/// `GET /sheets/{id}`
#[derive(Debug, Deserialize)]
pub struct ApiSheet {
  #[serde(default)]
  pub rows: Vec<ApiRow>,
}

#[derive(Debug, Deserialize)]
pub struct ApiRowResult {
  pub id: u64,
}

/// Envelope returned by row writes (`POST`/`PUT /sheets/{id}/rows`)
#[derive(Debug, Deserialize)]
pub struct ApiRowsResult {
  #[serde(rename = "resultCode", default)]
  pub result_code: i64,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub result: Vec<ApiRowResult>,
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiCellWrite {
  #[serde(rename = "columnId")]
  pub column_id: u64,
  pub value: serde_json::Value,
}

/// New row for `POST /sheets/{id}/rows`
#[derive(Debug, Serialize)]
pub struct ApiNewRow {
  #[serde(rename = "toTop", skip_serializing_if = "Option::is_none")]
  pub to_top: Option<bool>,
  #[serde(rename = "toBottom", skip_serializing_if = "Option::is_none")]
  pub to_bottom: Option<bool>,
  pub cells: Vec<ApiCellWrite>,
}

/// Partial row for `PUT /sheets/{id}/rows`
#[derive(Debug, Serialize)]
pub struct ApiRowUpdate {
  pub id: u64,
  pub cells: Vec<ApiCellWrite>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sheet_with_missing_cell_values() {
    let sheet: ApiSheet = serde_json::from_value(serde_json::json!({
      "id": 1,
      "name": "Requisiciones",
      "rows": [
        { "id": 10, "rowNumber": 1, "cells": [
          { "columnId": 100, "value": "REQ-00001", "displayValue": "REQ-00001" },
          { "columnId": 101 }
        ]}
      ]
    }))
    .unwrap();

    assert_eq!(sheet.rows.len(), 1);
    assert_eq!(sheet.rows[0].cells[1].value, serde_json::Value::Null);
  }

  #[test]
  fn test_new_row_serializes_only_position_flag_set() {
    let row = ApiNewRow {
      to_top: Some(true),
      to_bottom: None,
      cells: vec![ApiCellWrite {
        column_id: 7,
        value: serde_json::json!("x"),
      }],
    };
    assert_eq!(
      serde_json::to_value(&row).unwrap(),
      serde_json::json!({ "toTop": true, "cells": [{ "columnId": 7, "value": "x" }] })
    );
  }
}
