use std::{collections::HashMap, path::PathBuf};

use maestro_types::ApplicationRecord;
use serde::Deserialize;

/// Decodable shape of the config file, kept apart from the adopted model so
/// the decode can be validated before the daemon trusts it.
#[derive(Deserialize)]
pub(crate) struct RawSnapshot {
    #[serde(rename = "SysFolder", default)]
    pub sys_folder: PathBuf,
    #[serde(rename = "PidFile", default)]
    pub pid_file: PathBuf,
    #[serde(rename = "OutFile", default)]
    pub out_file: PathBuf,
    #[serde(rename = "ErrFile", default)]
    pub err_file: PathBuf,
    #[serde(rename = "Applications", default)]
    pub applications: HashMap<String, ApplicationRecord>,
}
