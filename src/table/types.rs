use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque locator of a row in the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowRef(pub u64);

impl fmt::Display for RowRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Logical column of a record row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
  Id,
  CreatedAt,
  Room,
  WorkOrder,
  PartNumber,
  LotNumber,
  Quantity,
  Reason,
  Status,
  Owner,
  Issue,
  FrozenMinutes,
  Note,
}

impl Field {
  /// Fields the lifecycle core is allowed to change after creation
  pub const EDITABLE: [Field; 5] = [
    Field::Status,
    Field::Owner,
    Field::Issue,
    Field::FrozenMinutes,
    Field::Note,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Field::Id => "id",
      Field::CreatedAt => "created_at",
      Field::Room => "room",
      Field::WorkOrder => "work_order",
      Field::PartNumber => "part_number",
      Field::LotNumber => "lot_number",
      Field::Quantity => "quantity",
      Field::Reason => "reason",
      Field::Status => "status",
      Field::Owner => "owner",
      Field::Issue => "issue",
      Field::FrozenMinutes => "frozen_minutes",
      Field::Note => "note",
    }
  }
}

impl fmt::Display for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Scalar cell value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
  #[default]
  Empty,
  Bool(bool),
  Number(f64),
  Text(String),
}

impl CellValue {
  /// Text cell; blank strings collapse to `Empty`.
  pub fn text(s: impl Into<String>) -> Self {
    let s = s.into();
    if s.trim().is_empty() {
      CellValue::Empty
    } else {
      CellValue::Text(s)
    }
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, CellValue::Empty)
  }

  /// Same value up to representation: `Number(125.0)` and `Text("125")`
  /// are equivalent, `Empty` only matches `Empty`.
  pub fn equivalent(&self, other: &CellValue) -> bool {
    if self == other {
      return true;
    }
    !self.is_empty() && !other.is_empty() && self.as_text() == other.as_text()
  }

  /// Render as display text. Whole numbers print without a fraction.
  pub fn as_text(&self) -> String {
    match self {
      CellValue::Empty => String::new(),
      CellValue::Bool(b) => b.to_string(),
      CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
      CellValue::Number(n) => n.to_string(),
      CellValue::Text(s) => s.clone(),
    }
  }

  /// Interpret as an integer. Accepts numbers and numeric text, truncating fractions.
  pub fn as_integer(&self) -> Option<i64> {
    match self {
      CellValue::Number(n) if n.is_finite() => Some(n.trunc() as i64),
      CellValue::Text(s) => {
        let s = s.trim();
        s.parse::<i64>()
          .ok()
          .or_else(|| s.parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| n.trunc() as i64))
      }
      _ => None,
    }
  }

  /// Interpret as a boolean flag. Text `true`/`false` is accepted.
  pub fn as_bool(&self) -> Option<bool> {
    match self {
      CellValue::Bool(b) => Some(*b),
      CellValue::Text(s) => match s.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
      },
      _ => None,
    }
  }

  /// Convert a JSON value from the remote API.
  pub fn from_json(value: &serde_json::Value) -> Self {
    match value {
      serde_json::Value::Null => CellValue::Empty,
      serde_json::Value::Bool(b) => CellValue::Bool(*b),
      serde_json::Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or_default(),
      serde_json::Value::String(s) => CellValue::text(s.as_str()),
      other => CellValue::text(other.to_string()),
    }
  }

  /// Convert to a JSON value for the remote API. Empty clears the cell.
  pub fn to_json(&self) -> serde_json::Value {
    match self {
      CellValue::Empty => serde_json::Value::String(String::new()),
      CellValue::Bool(b) => serde_json::Value::Bool(*b),
      CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
        serde_json::Value::from(*n as i64)
      }
      CellValue::Number(n) => serde_json::Value::from(*n),
      CellValue::Text(s) => serde_json::Value::String(s.clone()),
    }
  }
}

impl From<&str> for CellValue {
  fn from(s: &str) -> Self {
    CellValue::text(s)
  }
}

impl From<String> for CellValue {
  fn from(s: String) -> Self {
    CellValue::text(s)
  }
}

impl From<bool> for CellValue {
  fn from(b: bool) -> Self {
    CellValue::Bool(b)
  }
}

impl From<i64> for CellValue {
  fn from(n: i64) -> Self {
    CellValue::Number(n as f64)
  }
}

impl From<u32> for CellValue {
  fn from(n: u32) -> Self {
    CellValue::Number(n as f64)
  }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
  fn from(value: Option<T>) -> Self {
    value.map(Into::into).unwrap_or_default()
  }
}

/// Field values of a row, keyed by logical field
pub type FieldValues = BTreeMap<Field, CellValue>;

/// A remote row: its reference plus the mapped cell values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
  pub row_ref: RowRef,
  pub cells: FieldValues,
}

impl Row {
  pub fn new(row_ref: RowRef) -> Self {
    Self {
      row_ref,
      cells: FieldValues::new(),
    }
  }

  /// Value of a field; absent cells read as `Empty`.
  pub fn get(&self, field: Field) -> &CellValue {
    static EMPTY: CellValue = CellValue::Empty;
    self.cells.get(&field).unwrap_or(&EMPTY)
  }

  pub fn set(&mut self, field: Field, value: impl Into<CellValue>) {
    self.cells.insert(field, value.into());
  }

  pub fn with(mut self, field: Field, value: impl Into<CellValue>) -> Self {
    self.set(field, value);
    self
  }

  /// True when every cell is empty.
  pub fn is_blank(&self) -> bool {
    self.cells.values().all(CellValue::is_empty)
  }
}

/// Minimal write for one row: only the fields that changed.
#[derive(Debug, Clone, PartialEq)]
pub struct RowUpdate {
  pub row_ref: RowRef,
  pub changes: FieldValues,
}
