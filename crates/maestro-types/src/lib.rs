use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Lifecycle label of a managed application. The set is closed; a record
/// that has never been started carries `Stopped`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLabel {
    #[serde(rename = "started")]
    Started,
    #[serde(rename = "running")]
    Running,
    #[serde(rename = "asked to stop")]
    AskedToStop,
    #[default]
    #[serde(rename = "stopped")]
    Stopped,
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusLabel::Started => "started",
            StatusLabel::Running => "running",
            StatusLabel::AskedToStop => "asked to stop",
            StatusLabel::Stopped => "stopped",
        };
        write!(f, "{label}")
    }
}

/// Current status of an application: its label plus how many times the
/// supervisor has restarted it. Readers tolerate racing updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationStatus {
    #[serde(rename = "Status")]
    pub status: StatusLabel,
    #[serde(rename = "Restarts")]
    pub restarts: u32,
}

impl ApplicationStatus {
    pub fn set_status(&mut self, label: StatusLabel) {
        self.status = label;
    }

    pub fn add_restart(&mut self) {
        self.restarts += 1;
    }
}

/// The persisted shape of one managed application. Every path is derived
/// from the system folder and the name; the transient process handle is
/// never part of this record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Cmd")]
    pub cmd: PathBuf,
    #[serde(rename = "Args", default)]
    pub args: Vec<String>,
    #[serde(rename = "Path")]
    pub path: PathBuf,
    #[serde(rename = "Pidfile")]
    pub pidfile: PathBuf,
    #[serde(rename = "Outfile")]
    pub outfile: PathBuf,
    #[serde(rename = "Errfile")]
    pub errfile: PathBuf,
    #[serde(rename = "KeepAlive", default)]
    pub keep_alive: bool,
    #[serde(rename = "Pid", default = "no_pid")]
    pub pid: i32,
    #[serde(rename = "Status", default)]
    pub status: ApplicationStatus,
}

fn no_pid() -> i32 {
    -1
}

/// One row of a status reply: what the operator sees for an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationData {
    pub name: String,
    pub pid: i32,
    pub status: ApplicationStatus,
    pub keep_alive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_render_as_their_wire_names() {
        assert_eq!(StatusLabel::Started.to_string(), "started");
        assert_eq!(StatusLabel::Running.to_string(), "running");
        assert_eq!(StatusLabel::AskedToStop.to_string(), "asked to stop");
        assert_eq!(StatusLabel::Stopped.to_string(), "stopped");
    }

    #[test]
    fn add_restart_is_monotonic() {
        let mut status = ApplicationStatus::default();
        assert_eq!(status.restarts, 0);
        status.add_restart();
        status.add_restart();
        assert_eq!(status.restarts, 2);
        status.set_status(StatusLabel::Running);
        assert_eq!(status.restarts, 2);
    }
}
