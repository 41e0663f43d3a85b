use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Status of a single download, encoded as an integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
#[repr(u8)]
pub enum DownloadStatus {
    #[default]
    NA = 0,
    Offline = 1,
    Online = 2,
    Queued = 3,
    Paused = 4,
    Finished = 5,
    Skipped = 6,
    Failed = 7,
    Starting = 8,
    Waiting = 9,
    Downloading = 10,
    TempOffline = 11,
    Aborted = 12,
    NotPossible = 13,
    Missing = 14,
    FileMismatch = 15,
    Occupied = 16,
    Decrypting = 17,
    Processing = 18,
    Custom = 19,
    Unknown = 20,
}

impl From<i64> for DownloadStatus {
    fn from(value: i64) -> Self {
        match value {
            0 => Self::NA,
            1 => Self::Offline,
            2 => Self::Online,
            3 => Self::Queued,
            4 => Self::Paused,
            5 => Self::Finished,
            6 => Self::Skipped,
            7 => Self::Failed,
            8 => Self::Starting,
            9 => Self::Waiting,
            10 => Self::Downloading,
            11 => Self::TempOffline,
            12 => Self::Aborted,
            13 => Self::NotPossible,
            14 => Self::Missing,
            15 => Self::FileMismatch,
            16 => Self::Occupied,
            17 => Self::Decrypting,
            18 => Self::Processing,
            19 => Self::Custom,
            _ => Self::Unknown,
        }
    }
}

impl From<DownloadStatus> for u8 {
    fn from(status: DownloadStatus) -> Self {
        status as u8
    }
}

impl Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::NA => write!(f, "N/A"),
            DownloadStatus::TempOffline => write!(f, "Temporarily offline"),
            DownloadStatus::NotPossible => write!(f, "Not possible"),
            DownloadStatus::FileMismatch => write!(f, "File mismatch"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Transfer state of the download behind a progress record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadProgress {
    pub fid: i64,
    pub pid: i64,
    /// Bytes per second
    pub speed: u64,
    pub status: DownloadStatus,
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn decodes_known_and_unknown_codes() {
        let status: DownloadStatus = serde_json::from_str("10").unwrap();
        assert_eq!(status, DownloadStatus::Downloading);

        let status: DownloadStatus = serde_json::from_str("5").unwrap();
        assert_eq!(status, DownloadStatus::Finished);

        let status: DownloadStatus = serde_json::from_str("99").unwrap();
        assert_eq!(status, DownloadStatus::Unknown);
    }

    #[test]
    fn out_of_range_codes_decode_as_unknown() {
        for code in ["20", "300", "-1", "70000"] {
            let status: DownloadStatus = serde_json::from_str(code).unwrap();
            assert_eq!(status, DownloadStatus::Unknown, "code {code}");
        }
        assert_eq!(serde_json::to_string(&DownloadStatus::Unknown).unwrap(), "20");
    }

    #[test]
    fn encodes_as_integer() {
        assert_eq!(serde_json::to_string(&DownloadStatus::Downloading).unwrap(), "10");
        assert_eq!(serde_json::to_string(&DownloadStatus::NA).unwrap(), "0");
    }

    #[test]
    fn download_progress_fills_missing_fields() {
        let progress: DownloadProgress = serde_json::from_str(r#"{"status": 3}"#).unwrap();
        assert_eq!(progress.status, DownloadStatus::Queued);
        assert_eq!(progress.speed, 0);
        assert_eq!(progress.fid, 0);
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(DownloadStatus::TempOffline.to_string(), "Temporarily offline");
        assert_eq!(DownloadStatus::Downloading.to_string(), "Downloading");
    }
}
