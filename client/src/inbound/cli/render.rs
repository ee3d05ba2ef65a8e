//! Plain-text output for CLI commands.

use std::io::{self, Write};

use crate::domain::ports::StoreCounts;
use crate::domain::{DrainReport, SyncStatus, Todo, TodoList, format_timestamp};

pub(super) fn lists<W: Write>(out: &mut W, lists: &[TodoList]) -> io::Result<()> {
    if lists.is_empty() {
        return writeln!(out, "no lists");
    }
    for list in lists {
        writeln!(out, "{}  {}", list.id, list.name)?;
    }
    Ok(())
}

pub(super) fn todos<W: Write>(out: &mut W, owner: &TodoList, todos: &[Todo]) -> io::Result<()> {
    writeln!(out, "{}", owner.name)?;
    if todos.is_empty() {
        return writeln!(out, "  no todos");
    }
    for item in todos {
        write!(out, "  ")?;
        todo(out, item)?;
    }
    Ok(())
}

pub(super) fn todo<W: Write>(out: &mut W, todo: &Todo) -> io::Result<()> {
    let mark = if todo.completed { 'x' } else { ' ' };
    writeln!(out, "[{mark}] {}  {}", todo.id, todo.description)
}

pub(super) fn status<W: Write>(
    out: &mut W,
    counts: &StoreCounts,
    remote_configured: bool,
) -> io::Result<()> {
    writeln!(out, "lists: {}", counts.lists)?;
    writeln!(out, "todos: {}", counts.todos)?;
    writeln!(out, "pending mutations: {}", counts.pending)?;
    let remote = if remote_configured {
        "configured"
    } else {
        "not configured"
    };
    writeln!(out, "remote: {remote}")
}

pub(super) fn drain<W: Write>(out: &mut W, report: &DrainReport) -> io::Result<()> {
    if report.batches == 0 && report.failure.is_none() {
        return writeln!(out, "nothing to upload");
    }
    writeln!(
        out,
        "uploaded {} mutations in {} batches ({} skipped)",
        report.applied, report.batches, report.skipped
    )
}

pub(super) fn sync_status<W: Write>(out: &mut W, status: &SyncStatus) -> io::Result<()> {
    writeln!(out, "committed batches: {}", status.committed_batches)?;
    if let Some(pending) = status.pending {
        writeln!(out, "pending mutations: {pending}")?;
    }
    if let Some(at) = status.last_success_at {
        writeln!(out, "last success: {}", format_timestamp(at))?;
    }
    if let Some(error) = &status.last_error {
        writeln!(
            out,
            "last error ({} consecutive failures): {error}",
            status.consecutive_failures
        )?;
    }
    if let Some(op_id) = status.blocked_op_id {
        writeln!(out, "blocked on op {op_id}: the remote refuses it until the data changes")?;
    }
    Ok(())
}
