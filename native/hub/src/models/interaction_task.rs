use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of an interaction task, encoded as an integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum InteractionKind {
    All,
    Notification,
    Captcha,
    Query,
    Other(i64),
}

impl From<i64> for InteractionKind {
    fn from(value: i64) -> Self {
        match value {
            0 => Self::All,
            1 => Self::Notification,
            2 => Self::Captcha,
            4 => Self::Query,
            other => Self::Other(other),
        }
    }
}

impl From<InteractionKind> for i64 {
    fn from(kind: InteractionKind) -> Self {
        match kind {
            InteractionKind::All => 0,
            InteractionKind::Notification => 1,
            InteractionKind::Captcha => 2,
            InteractionKind::Query => 4,
            InteractionKind::Other(value) => value,
        }
    }
}

/// A pending interaction: either a passive notification or a query that
/// waits for user input (captcha, question).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionTask {
    pub iid: u64,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub plugin: String,
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub default_value: Option<Value>,
}

impl InteractionTask {
    pub fn is_notification(&self) -> bool {
        self.kind == InteractionKind::Notification
    }
}

/// Counts handed to the rendering layer instead of the task list itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionSummary {
    pub queries: usize,
    pub notifications: usize,
}

impl InteractionSummary {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a InteractionTask>) -> Self {
        tasks.into_iter().fold(Self::default(), |mut summary, task| {
            if task.is_notification() {
                summary.notifications += 1;
            } else {
                summary.queries += 1;
            }
            summary
        })
    }

    pub fn total(&self) -> usize {
        self.queries + self.notifications
    }
}
