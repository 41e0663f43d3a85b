use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use super::{DownloadProgress, DownloadStatus};

/// Status message of a progress record. Older servers send a numeric code,
/// newer ones a text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusMessage {
    Code(i64),
    Text(String),
}

impl Default for StatusMessage {
    fn default() -> Self {
        StatusMessage::Code(-1)
    }
}

impl Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::Code(code) => write!(f, "{code}"),
            StatusMessage::Text(text) => write!(f, "{text}"),
        }
    }
}

/// Snapshot of an in-progress operation on the server.
///
/// Counters default to `-1` when the server leaves them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressInfo {
    /// Generated by the server, never submitted back
    pub pid: i64,
    pub plugin: Option<String>,
    pub name: Option<String>,
    pub statusmsg: StatusMessage,
    /// Seconds remaining
    pub eta: i64,
    pub done: i64,
    pub total: i64,
    pub download: Option<DownloadProgress>,
}

impl Default for ProgressInfo {
    fn default() -> Self {
        Self {
            pid: -1,
            plugin: None,
            name: None,
            statusmsg: StatusMessage::default(),
            eta: -1,
            done: -1,
            total: -1,
            download: None,
        }
    }
}

impl ProgressInfo {
    /// Completion in percent, rounded half up.
    ///
    /// Returns 0 while `total` is not positive. Not clamped: `done > total`
    /// yields more than 100.
    pub fn percent(&self) -> i64 {
        if self.total <= 0 {
            return 0;
        }
        // round(done * 100 / total) == floor((200 * done + total) / (2 * total))
        let done = i128::from(self.done);
        let total = i128::from(self.total);
        let rounded = (200 * done + total).div_euclid(2 * total);
        i64::try_from(rounded).unwrap_or(if rounded > 0 { i64::MAX } else { i64::MIN })
    }

    /// Whether this record tracks a download, whatever its status.
    pub fn is_download_record(&self) -> bool {
        self.download.is_some()
    }

    /// Whether the tracked download is actively transferring.
    pub fn is_downloading(&self) -> bool {
        self.download.as_ref().is_some_and(|d| d.status == DownloadStatus::Downloading)
    }

    /// View-ready form: every base attribute plus the derived fields.
    pub fn to_view(&self) -> ProgressView {
        ProgressView {
            info: self.clone(),
            percent: self.percent(),
            downloading: self.is_downloading(),
        }
    }
}

/// Serialized shape handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressView {
    #[serde(flatten)]
    pub info: ProgressInfo,
    pub percent: i64,
    pub downloading: bool,
}
