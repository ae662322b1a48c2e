use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::{Config, InsertAt};
use crate::error::{Operation, Result, SyncError};

use super::api_types::{
  ApiCellWrite, ApiColumnsResponse, ApiNewRow, ApiRowUpdate, ApiRowsResult, ApiSheet,
};
use super::columns::ColumnMap;
use super::types::{CellValue, FieldValues, Row, RowRef};
use super::RemoteTable;

/// Smartsheet API client bound to one sheet
#[derive(Clone)]
pub struct SmartsheetClient {
  http: Client,
  base: Url,
  sheet_id: u64,
  columns: ColumnMap,
  insert_at: InsertAt,
}

impl SmartsheetClient {
  /// Build the HTTP client and resolve the column mapping against the
  /// sheet's schema. Fails with `SchemaMismatch` when a configured column
  /// is absent.
  pub async fn connect(config: &Config, token: &str) -> Result<Self> {
    let mut headers = HeaderMap::new();
    let auth = HeaderValue::from_str(&format!("Bearer {}", token))
      .map_err(|_| SyncError::InvalidInput("API token contains invalid characters".to_string()))?;
    headers.insert(header::AUTHORIZATION, auth);

    let http = Client::builder()
      .default_headers(headers)
      .timeout(Duration::from_secs(config.sheet.request_timeout_secs))
      .build()
      .map_err(|e| SyncError::remote(Operation::Schema, None, e.to_string()))?;

    let base = Url::parse(&config.sheet.api_url)
      .map_err(|e| SyncError::InvalidInput(format!("invalid api_url: {}", e)))?;

    let sheet_id = config.sheet.id;
    let url = endpoint(&base, &["sheets", &sheet_id.to_string(), "columns"])?;
    let response: ApiColumnsResponse = send(
      http.get(url).query(&[("includeAll", "true")]),
      Operation::Schema,
      None,
    )
    .await?;

    let columns = ColumnMap::resolve(&config.columns, &response.data)?;
    debug!(sheet_id, columns = response.data.len(), "resolved sheet schema");

    Ok(Self {
      http,
      base,
      sheet_id,
      columns,
      insert_at: config.sheet.insert_at,
    })
  }

  fn rows_url(&self) -> Result<Url> {
    endpoint(&self.base, &["sheets", &self.sheet_id.to_string(), "rows"])
  }

  /// Map field values to cell writes, dropping fields without a column.
  fn cell_writes(&self, fields: &FieldValues) -> Vec<ApiCellWrite> {
    fields
      .iter()
      .filter_map(|(field, value)| match self.columns.column_id(*field) {
        Some(column_id) => Some(ApiCellWrite {
          column_id,
          value: value.to_json(),
        }),
        None => {
          debug!(%field, "field has no column, not written");
          None
        }
      })
      .collect()
  }
}

#[async_trait::async_trait]
impl RemoteTable for SmartsheetClient {
  async fn fetch_all(&self) -> Result<Vec<Row>> {
    let url = endpoint(&self.base, &["sheets", &self.sheet_id.to_string()])?;
    let sheet: ApiSheet = send(self.http.get(url), Operation::FetchAll, None).await?;

    let rows: Vec<Row> = sheet
      .rows
      .into_iter()
      .map(|api_row| {
        let mut row = Row::new(RowRef(api_row.id));
        for cell in api_row.cells {
          if let Some(field) = self.columns.field(cell.column_id) {
            row.set(field, CellValue::from_json(&cell.value));
          }
        }
        row
      })
      .collect();

    debug!(sheet_id = self.sheet_id, rows = rows.len(), "fetched sheet");
    Ok(rows)
  }

  async fn append(&self, fields: &FieldValues) -> Result<RowRef> {
    let (to_top, to_bottom) = match self.insert_at {
      InsertAt::Top => (Some(true), None),
      InsertAt::Bottom => (None, Some(true)),
    };
    let body = vec![ApiNewRow {
      to_top,
      to_bottom,
      cells: self.cell_writes(fields),
    }];

    let url = self.rows_url()?;
    let result: ApiRowsResult = send(self.http.post(url).json(&body), Operation::Append, None).await?;
    check_result(&result, Operation::Append, None)?;

    let row_ref = result
      .result
      .first()
      .map(|r| RowRef(r.id))
      .ok_or_else(|| SyncError::remote(Operation::Append, None, "response did not include the new row"))?;

    debug!(%row_ref, "appended row");
    Ok(row_ref)
  }

  async fn update(&self, row_ref: RowRef, fields: &FieldValues) -> Result<()> {
    let cells = self.cell_writes(fields);
    if cells.is_empty() {
      return Ok(());
    }

    let body = vec![ApiRowUpdate {
      id: row_ref.0,
      cells,
    }];

    let url = self.rows_url()?;
    let result: ApiRowsResult = send(
      self.http.put(url).json(&body),
      Operation::Update,
      Some(row_ref),
    )
    .await?;
    check_result(&result, Operation::Update, Some(row_ref))?;

    debug!(%row_ref, fields = fields.len(), "updated row");
    Ok(())
  }
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
  let mut url = base.clone();
  url
    .path_segments_mut()
    .map_err(|_| SyncError::InvalidInput(format!("api_url cannot be a base: {}", base)))?
    .pop_if_empty()
    .extend(segments);
  Ok(url)
}

/// Send a request and decode the JSON body. Every failure, including
/// timeouts and non-success statuses, becomes `RemoteUnavailable`.
async fn send<T: DeserializeOwned>(
  request: RequestBuilder,
  operation: Operation,
  row_ref: Option<RowRef>,
) -> Result<T> {
  let response = request.send().await.map_err(|e| {
    let reason = if e.is_timeout() {
      "request timed out".to_string()
    } else {
      e.to_string()
    };
    SyncError::remote(operation, row_ref, reason)
  })?;

  let status = response.status();
  if !status.is_success() {
    let body = response.text().await.unwrap_or_default();
    return Err(SyncError::remote(
      operation,
      row_ref,
      format!("HTTP {}: {}", status.as_u16(), body),
    ));
  }

  response
    .json::<T>()
    .await
    .map_err(|e| SyncError::remote(operation, row_ref, format!("invalid response: {}", e)))
}

fn check_result(result: &ApiRowsResult, operation: Operation, row_ref: Option<RowRef>) -> Result<()> {
  if result.result_code != 0 {
    return Err(SyncError::remote(
      operation,
      row_ref,
      format!("result code {}: {}", result.result_code, result.message),
    ));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::table::Field;
  use serde_json::json;
  use wiremock::matchers::{body_json, header, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  const SHEET: u64 = 2854951320506244;

  fn config(server: &MockServer) -> Config {
    Config::from_yaml(&format!(
      "sheet:\n  id: {}\n  api_url: {}\n  request_timeout_secs: 1\n",
      SHEET,
      server.uri()
    ))
    .unwrap()
  }

  fn legacy_columns() -> serde_json::Value {
    let titles = [
      "ID",
      "fecha_hora",
      "cuarto",
      "work_order",
      "numero_parte",
      "numero_lote",
      "cantidad",
      "motivo",
      "status",
      "almacenista",
      "issue",
      "minuto_final",
    ];
    let data: Vec<_> = titles
      .iter()
      .enumerate()
      .map(|(i, t)| json!({ "id": 100 + i, "index": i, "title": t, "type": "TEXT_NUMBER" }))
      .collect();
    json!({ "pageNumber": 1, "totalPages": 1, "totalCount": data.len(), "data": data })
  }

  async fn mount_schema(server: &MockServer, columns: serde_json::Value) {
    Mock::given(method("GET"))
      .and(path(format!("/sheets/{}/columns", SHEET)))
      .and(query_param("includeAll", "true"))
      .and(header("authorization", "Bearer secret"))
      .respond_with(ResponseTemplate::new(200).set_body_json(columns))
      .mount(server)
      .await;
  }

  async fn connected(server: &MockServer) -> SmartsheetClient {
    mount_schema(server, legacy_columns()).await;
    SmartsheetClient::connect(&config(server), "secret")
      .await
      .unwrap()
  }

  #[tokio::test]
  async fn test_connect_fails_on_missing_column() {
    let server = MockServer::start().await;
    mount_schema(
      &server,
      json!({ "data": [{ "id": 100, "title": "ID" }, { "id": 101, "title": "status" }] }),
    )
    .await;

    let err = SmartsheetClient::connect(&config(&server), "secret")
      .await
      .err()
      .unwrap();
    match err {
      SyncError::SchemaMismatch { missing } => {
        assert_eq!(missing.len(), 10);
        assert!(missing.contains(&"minuto_final".to_string()));
      }
      other => panic!("expected SchemaMismatch, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_fetch_all_maps_cells_to_fields() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("GET"))
      .and(path(format!("/sheets/{}", SHEET)))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "id": SHEET,
        "rows": [
          { "id": 9001, "cells": [
            { "columnId": 100, "value": "REQ-00007" },
            { "columnId": 108, "value": "Entregado" },
            { "columnId": 110, "value": true },
            { "columnId": 111, "value": 125.0 },
            { "columnId": 999, "value": "unmapped" }
          ]},
          { "id": 9002, "cells": [{ "columnId": 100 }] }
        ]
      })))
      .mount(&server)
      .await;

    let rows = client.fetch_all().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].row_ref, RowRef(9001));
    assert_eq!(rows[0].get(Field::Id), &CellValue::text("REQ-00007"));
    assert_eq!(rows[0].get(Field::Issue), &CellValue::Bool(true));
    assert_eq!(rows[0].get(Field::FrozenMinutes).as_integer(), Some(125));
    assert_eq!(rows[0].cells.len(), 4);
    assert!(rows[1].is_blank());
  }

  #[tokio::test]
  async fn test_append_inserts_at_top_and_returns_row_ref() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("POST"))
      .and(path(format!("/sheets/{}/rows", SHEET)))
      .and(body_json(json!([{
        "toTop": true,
        "cells": [
          { "columnId": 100, "value": "REQ-00001" },
          { "columnId": 106, "value": 3 },
          { "columnId": 110, "value": false },
          { "columnId": 111, "value": "" }
        ]
      }])))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "message": "SUCCESS",
        "resultCode": 0,
        "result": [{ "id": 4242, "rowNumber": 1 }]
      })))
      .expect(1)
      .mount(&server)
      .await;

    let mut fields = FieldValues::new();
    fields.insert(Field::Id, CellValue::text("REQ-00001"));
    fields.insert(Field::Quantity, CellValue::from(3u32));
    fields.insert(Field::Issue, CellValue::Bool(false));
    fields.insert(Field::FrozenMinutes, CellValue::Empty);
    fields.insert(Field::Note, CellValue::text("not tracked"));

    let row_ref = client.append(&fields).await.unwrap();
    assert_eq!(row_ref, RowRef(4242));
  }

  #[tokio::test]
  async fn test_update_sends_only_named_cells() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("PUT"))
      .and(path(format!("/sheets/{}/rows", SHEET)))
      .and(body_json(json!([{
        "id": 9001,
        "cells": [{ "columnId": 108, "value": "Entregado" }, { "columnId": 111, "value": 125 }]
      }])))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(json!({ "message": "SUCCESS", "resultCode": 0, "result": [{ "id": 9001 }] })),
      )
      .expect(1)
      .mount(&server)
      .await;

    let mut fields = FieldValues::new();
    fields.insert(Field::Status, CellValue::text("Entregado"));
    fields.insert(Field::FrozenMinutes, CellValue::from(125i64));
    client.update(RowRef(9001), &fields).await.unwrap();
  }

  #[tokio::test]
  async fn test_auth_failure_surfaces_as_remote_unavailable() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("PUT"))
      .and(path(format!("/sheets/{}/rows", SHEET)))
      .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
      .mount(&server)
      .await;

    let mut fields = FieldValues::new();
    fields.insert(Field::Owner, CellValue::text("Luis"));
    let err = client.update(RowRef(5), &fields).await.unwrap_err();
    match err {
      SyncError::RemoteUnavailable {
        operation,
        row_ref,
        reason,
      } => {
        assert_eq!(operation, Operation::Update);
        assert_eq!(row_ref, Some(RowRef(5)));
        assert!(reason.contains("401"));
      }
      other => panic!("expected RemoteUnavailable, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_timeout_maps_to_remote_unavailable() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("GET"))
      .and(path(format!("/sheets/{}", SHEET)))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(json!({ "rows": [] }))
          .set_delay(Duration::from_secs(3)),
      )
      .mount(&server)
      .await;

    let err = client.fetch_all().await.unwrap_err();
    assert!(matches!(
      err,
      SyncError::RemoteUnavailable { operation: Operation::FetchAll, .. }
    ));
  }
}
