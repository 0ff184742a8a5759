use std::{collections::HashMap, path::PathBuf};

use maestro_types::ApplicationRecord;
use serde::Serialize;

/// Everything the daemon persists between runs: its own file paths plus the
/// full application registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DaemonSnapshot {
    #[serde(rename = "SysFolder")]
    pub sys_folder: PathBuf,
    #[serde(rename = "PidFile")]
    pub pid_file: PathBuf,
    #[serde(rename = "OutFile")]
    pub out_file: PathBuf,
    #[serde(rename = "ErrFile")]
    pub err_file: PathBuf,
    #[serde(rename = "Applications")]
    pub applications: HashMap<String, ApplicationRecord>,
}
