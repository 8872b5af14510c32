//! Plain data shared by the pipeline and the presentation layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One extracted employee-name / weekly-hours pair.
///
/// Field names on the wire follow the schema given to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct EmployeeRecord {
    #[serde(rename = "employeeName")]
    pub(crate) employee_name: String,
    /// Free text, usually unit-suffixed ("40 horas/sem").
    #[serde(rename = "weeklyHours")]
    pub(crate) weekly_hours: String,
}

impl EmployeeRecord {
    pub(crate) fn new(employee_name: impl Into<String>, weekly_hours: impl Into<String>) -> Self {
        Self {
            employee_name: employee_name.into(),
            weekly_hours: weekly_hours.into(),
        }
    }
}

/// A file chosen by the user, with the name shown in listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectedFile {
    pub(crate) name: String,
    pub(crate) path: PathBuf,
}

impl SelectedFile {
    /// Build a selection entry; the display name is the path's file name.
    pub(crate) fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self { name, path }
    }
}

/// Observable state of the pipeline. Exactly one value is live at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RunStatus {
    #[default]
    Idle,
    Reading,
    Analyzing,
    Done,
    Error,
}

impl RunStatus {
    /// True while a run is in flight and the selection must not change.
    pub(crate) fn is_active(self) -> bool {
        matches!(self, Self::Reading | Self::Analyzing)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Reading => "reading",
            Self::Analyzing => "analyzing",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
