//! Line protocol: command parsing and response rendering.
//!
//! Client → server: one `;`-separated command per line.
//! Server → client: `STATUS;<timestamp>;<message>`, where `<message>` may
//! contain embedded newlines and the consumer splits on the first two `;`.

use chrono::{DateTime, Local, Utc};

use crate::domain::{HistoryRecord, HistoryStatus, Service, Task};
use crate::error::{ExecError, Rejection};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    RequestTask(TaskRequest),
    QueueStatus,
    /// Raw id as the client sent it; may name no task at all.
    CancelTask(i64),
    TaskHistory,
}

/// `REQUEST_TASK;<serviceNumber>;<requester>;<priority>[;<extra>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub service_number: i32,
    pub requester: String,
    pub priority: i32,
    pub extra: Option<String>,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, Rejection> {
        // 引数なしの command は行全体の完全一致のみ
        match line {
            "QUEUE_STATUS" => return Ok(Command::QueueStatus),
            "TASK_HISTORY" => return Ok(Command::TaskHistory),
            _ => {}
        }
        let fields = split_fields(line);
        match fields.first().copied() {
            Some("REQUEST_TASK") => parse_request(&fields).map(Command::RequestTask),
            Some("CANCEL_TASK") => parse_cancel(&fields).map(Command::CancelTask),
            _ => Err(Rejection::InvalidCommand(line.to_string())),
        }
    }
}

/// Split on `;`, dropping trailing empty fields (`A;B;;` has two fields).
fn split_fields(line: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = line.split(';').collect();
    while fields.len() > 1 && fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields
}

fn parse_request(fields: &[&str]) -> Result<TaskRequest, Rejection> {
    if fields.len() < 4 {
        return Err(Rejection::MalformedRequest);
    }
    let service_number: i32 = fields[1].parse().map_err(|_| Rejection::InvalidNumber)?;
    let priority: i32 = fields[3].parse().map_err(|_| Rejection::InvalidNumber)?;

    if service_number == Service::MySqlLogin.number() && fields.len() != 5 {
        return Err(Rejection::MissingUserName);
    }

    Ok(TaskRequest {
        service_number,
        requester: fields[2].to_string(),
        priority,
        extra: fields.get(4).map(|s| s.to_string()),
    })
}

fn parse_cancel(fields: &[&str]) -> Result<i64, Rejection> {
    if fields.len() != 2 {
        return Err(Rejection::MalformedCancel);
    }
    fields[1].parse().map_err(|_| Rejection::InvalidTaskId)
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()
}

/// `STATUS;<timestamp>;<message>`
pub fn status_line(ts: &DateTime<Utc>, message: &str) -> String {
    format!("STATUS;{};{}", format_timestamp(ts), message)
}

pub fn rejected(reason: &Rejection) -> String {
    format!("REJECTED: {reason}")
}

/// Split a status line into `(timestamp, message)`.
///
/// Only the first two `;` are separators; the message keeps everything else.
pub fn split_status_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix("STATUS;")?;
    rest.split_once(';')
}

pub fn queued_message(task: &Task) -> String {
    format!("Task queued with ID {}", task.id)
}

pub fn cancelled_message(task: &Task) -> String {
    format!("TaskID {} cancelled successfully", task.id)
}

pub fn render_queue_status(tasks: &[Task]) -> String {
    let mut out = String::from("Pending Tasks:");
    if tasks.is_empty() {
        out.push_str("\nQueue is empty.");
        return out;
    }
    for (idx, t) in tasks.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. TaskID={}, Script={}, Priority={}, Client={}, QueuedAt={}",
            idx + 1,
            t.id,
            t.resource,
            t.priority,
            t.requester,
            format_timestamp(&t.enqueued_at)
        ));
    }
    out
}

pub fn render_history(records: &[HistoryRecord]) -> String {
    let mut out = String::from("Task History:");
    if records.is_empty() {
        out.push_str("\nNo task history available.");
        return out;
    }
    for (idx, r) in records.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. TaskID={}, Script={}, Client={}, Status={}, Time={}",
            idx + 1,
            r.task_id,
            r.resource,
            r.requester,
            r.status,
            format_timestamp(&r.recorded_at)
        ));
    }
    out
}

/// Broadcast text for a task entering `Executing`.
pub fn started_event(task: &Task) -> String {
    format!(
        "EXECUTING: TaskID {} ({}) started execution",
        task.id, task.resource
    )
}

/// Broadcast text for a task whose script ran to an exit code.
pub fn finished_event(task: &Task, status: HistoryStatus) -> String {
    let label = match status {
        HistoryStatus::Completed => "COMPLETED",
        _ => "ERROR",
    };
    format!(
        "{label}: TaskID {} ({}) finished with status: {label}",
        task.id, task.resource
    )
}

/// Broadcast text for a task whose script could not be run.
pub fn launch_failed_event(task: &Task, err: &ExecError) -> String {
    format!(
        "ERROR: TaskID {} ({}) encountered an error: {err}",
        task.id, task.resource
    )
}
