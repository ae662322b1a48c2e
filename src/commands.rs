//! Command-line subcommands and their execution.

use clap::{Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};

use crate::lifecycle::Status;
use crate::table::RemoteTable;
use crate::tracker::{
  export_rows, ExportRow, IssueFilter, NewRecord, PendingEdits, RecordEdit, RecordFilter,
  TrackedRecord, Tracker,
};

#[derive(Debug, Subcommand)]
pub enum Command {
  /// List records with elapsed time and freshness
  List {
    /// Only records in these rooms
    #[arg(long = "room")]
    rooms: Vec<String>,
    /// Only records in these statuses
    #[arg(long = "status")]
    statuses: Vec<Status>,
    /// Filter by issue flag
    #[arg(long, value_enum, default_value_t = IssueArg::All)]
    issue: IssueArg,
    /// Bypass the snapshot cache
    #[arg(long)]
    refresh: bool,
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
  },
  /// Register a new record
  Create {
    #[arg(long)]
    room: String,
    #[arg(long)]
    work_order: String,
    #[arg(long)]
    part_number: String,
    #[arg(long)]
    lot_number: String,
    #[arg(long, default_value_t = 1)]
    quantity: u32,
    #[arg(long, default_value = "Proceso")]
    reason: String,
    #[arg(long)]
    note: Option<String>,
  },
  /// Change status or annotations of a record
  Edit {
    /// Record identifier, e.g. REQ-00042
    id: String,
    #[arg(long)]
    status: Option<Status>,
    #[arg(long)]
    owner: Option<String>,
    #[arg(long)]
    issue: Option<bool>,
    #[arg(long)]
    note: Option<String>,
  },
  /// Move a record to a new status
  Status {
    /// Record identifier, e.g. REQ-00042
    id: String,
    /// Label or name, e.g. "Entregado" or delivered
    status: Status,
  },
  /// Write frozen minutes for terminal records that lack them
  Freeze,
  /// Show the identifier the next record would get
  NextId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IssueArg {
  All,
  Yes,
  No,
}

impl From<IssueArg> for IssueFilter {
  fn from(arg: IssueArg) -> Self {
    match arg {
      IssueArg::All => IssueFilter::All,
      IssueArg::Yes => IssueFilter::Yes,
      IssueArg::No => IssueFilter::No,
    }
  }
}

pub async fn run<T: RemoteTable>(command: Command, tracker: &Tracker<T>) -> Result<()> {
  match command {
    Command::List {
      rooms,
      statuses,
      issue,
      refresh,
      json,
    } => {
      let filter = RecordFilter {
        rooms: rooms.into_iter().collect(),
        statuses: statuses.into_iter().collect(),
        issue: issue.into(),
      };
      let rows = export_rows(&tracker.filtered(&filter, refresh).await?);
      if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
      } else {
        print!("{}", render_table(&rows));
      }
    }
    Command::Create {
      room,
      work_order,
      part_number,
      lot_number,
      quantity,
      reason,
      note,
    } => {
      let record = tracker
        .create(&NewRecord {
          room,
          work_order,
          part_number,
          lot_number,
          quantity,
          reason,
          note,
        })
        .await?;
      println!("{}", record.id);
    }
    Command::Edit {
      id,
      status,
      owner,
      issue,
      note,
    } => {
      let edit = RecordEdit {
        status,
        owner,
        issue,
        note,
      };
      if edit.is_empty() {
        return Err(eyre!("Nothing to change. Pass --status, --owner, --issue or --note."));
      }

      let tracked = find(tracker, &id).await?;
      let mut edits = PendingEdits::new();
      edits.insert(tracked.record.row_ref, edit);

      match tracker.apply_edits(&edits).await {
        Ok(updates) if updates.is_empty() => println!("{}: no changes", id),
        Ok(updates) => {
          let fields: Vec<String> = updates
            .iter()
            .flat_map(|u| u.changes.keys().map(|f| f.to_string()))
            .collect();
          println!("{}: updated {}", id, fields.join(", "));
        }
        Err(e) if e.is_retryable() => {
          return Err(eyre!("{}\nNothing was lost; run the same command again to retry.", e));
        }
        Err(e) => return Err(e.into()),
      }
    }
    Command::Status { id, status } => {
      let tracked = find(tracker, &id).await?;
      let updates = tracker.change_status(tracked.record.row_ref, status).await?;
      if updates.is_empty() {
        println!("{}: already {}", id, status);
      } else {
        println!("{}: {} -> {}", id, tracked.record.status, status);
      }
    }
    Command::Freeze => {
      let updates = tracker.freeze_terminal().await?;
      let clock = tracker.clock();
      println!("froze {} record(s) at {}", updates.len(), clock.format(clock.now()));
    }
    Command::NextId => {
      println!("{}", tracker.peek_next_id().await?);
    }
  }
  Ok(())
}

async fn find<T: RemoteTable>(tracker: &Tracker<T>, id: &str) -> Result<TrackedRecord> {
  tracker
    .find(id)
    .await?
    .ok_or_else(|| eyre!("No record with id {}", id))
}

/// Aligned plain-text table, header first.
fn render_table(rows: &[ExportRow]) -> String {
  let cells: Vec<Vec<String>> = rows.iter().map(ExportRow::cells).collect();
  let mut widths: Vec<usize> = ExportRow::COLUMNS.iter().map(|c| c.chars().count()).collect();
  for row in &cells {
    for (width, cell) in widths.iter_mut().zip(row) {
      *width = (*width).max(cell.chars().count());
    }
  }

  let mut out = String::new();
  let header: Vec<String> = ExportRow::COLUMNS.iter().map(|c| c.to_string()).collect();
  for line in std::iter::once(&header).chain(cells.iter()) {
    let padded: Vec<String> = line
      .iter()
      .zip(&widths)
      .map(|(cell, width)| {
        let pad = width.saturating_sub(cell.chars().count());
        format!("{}{}", cell, " ".repeat(pad))
      })
      .collect();
    out.push_str(padded.join("  ").trim_end());
    out.push('\n');
  }
  out
}
