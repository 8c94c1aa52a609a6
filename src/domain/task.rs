use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ColorTag, DomainError, DomainResult};

/// Display and input format for task start/end times.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Written by older versions of the app when a time was left unset.
const LEGACY_UNSET: &str = "未设置";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        TaskId(id)
    }
}

impl FromStr for TaskId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(TaskId)
            .map_err(|_| DomainError::InvalidId(s.to_string()))
    }
}

/// A start or end time as stored: either a `YYYY-MM-DD HH:MM` string or
/// the unset sentinel. The repository never parses it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskTime(String);

impl TaskTime {
    pub fn unset() -> Self {
        TaskTime(String::new())
    }

    /// Wraps a stored value as-is.
    #[cfg(test)]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        TaskTime(raw.into())
    }

    /// Validates user input. Blank input means unset.
    pub fn parse_input(input: &str) -> DomainResult<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Self::unset());
        }

        NaiveDateTime::parse_from_str(input, TIME_FORMAT)
            .map(|dt| TaskTime(dt.format(TIME_FORMAT).to_string()))
            .map_err(|_| DomainError::InvalidTime(input.to_string()))
    }

    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        TaskTime(dt.format(TIME_FORMAT).to_string())
    }

    pub fn now() -> Self {
        Self::from_datetime(chrono::Local::now().naive_local())
    }

    pub fn is_unset(&self) -> bool {
        self.0.is_empty() || self.0 == LEGACY_UNSET
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text for editing and display; empty when unset.
    pub fn display(&self) -> &str {
        if self.is_unset() {
            ""
        } else {
            &self.0
        }
    }
}

impl fmt::Display for TaskTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unset() {
            write!(f, "not set")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub is_done: bool,
    #[serde(alias = "colorArgb")]
    pub color_tag: ColorTag,
    #[serde(default)]
    pub start_time: TaskTime,
    #[serde(default)]
    pub end_time: TaskTime,
}

impl Task {
    pub fn new(id: TaskId, draft: TaskDraft) -> Self {
        Self {
            id,
            text: draft.text,
            is_done: false,
            color_tag: draft.color_tag,
            start_time: draft.start_time,
            end_time: draft.end_time,
        }
    }

    /// Replaces the editable fields, keeping identity and completion.
    pub fn apply(&mut self, draft: TaskDraft) {
        self.text = draft.text;
        self.color_tag = draft.color_tag;
        self.start_time = draft.start_time;
        self.end_time = draft.end_time;
    }

    pub fn has_schedule(&self) -> bool {
        !self.start_time.is_unset() || !self.end_time.is_unset()
    }

    pub fn status_marker(&self) -> &'static str {
        if self.is_done {
            "[x]"
        } else {
            "[ ]"
        }
    }
}

/// The user-editable fields of a task, as collected by a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub text: String,
    pub color_tag: ColorTag,
    pub start_time: TaskTime,
    pub end_time: TaskTime,
}

impl TaskDraft {
    pub fn new(text: impl Into<String>, color_tag: ColorTag) -> Self {
        Self {
            text: text.into(),
            color_tag,
            start_time: TaskTime::unset(),
            end_time: TaskTime::unset(),
        }
    }

    pub fn with_times(mut self, start_time: TaskTime, end_time: TaskTime) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.text.trim().is_empty() {
            return Err(DomainError::EmptyText);
        }
        Ok(())
    }
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        Self {
            text: task.text.clone(),
            color_tag: task.color_tag,
            start_time: task.start_time.clone(),
            end_time: task.end_time.clone(),
        }
    }
}
