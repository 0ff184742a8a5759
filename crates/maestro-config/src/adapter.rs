use crate::{model::DaemonSnapshot, raw::RawSnapshot, ConfigError};

impl RawSnapshot {
    pub(crate) fn into_snapshot(self) -> Result<DaemonSnapshot, ConfigError> {
        for (key, record) in &self.applications {
            if key.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "application table key is empty".into(),
                ));
            }
            if record.name != *key {
                return Err(ConfigError::Validation(format!(
                    "application `{key}`: record name `{}` does not match its key",
                    record.name
                )));
            }
            if record.cmd.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "application `{key}`: cmd is empty"
                )));
            }
        }

        Ok(DaemonSnapshot {
            sys_folder: self.sys_folder,
            pid_file: self.pid_file,
            out_file: self.out_file,
            err_file: self.err_file,
            applications: self.applications,
        })
    }
}
