use std::{os::unix::process::CommandExt, process::Stdio};

use maestro_types::{ApplicationRecord, ApplicationStatus, StatusLabel};
use tokio::process::{Child, Command};

use crate::{
    application::container::{ApplicationContainer, ExitFuture},
    error::{Error, Result},
    utils,
};

/// OS-process wrapper: the persisted record plus the transient child handle.
///
/// The handle moves into the watcher's waiter task once a watcher is
/// registered; from then on signals are addressed to the pid. A pid of -1
/// means there is nothing to signal.
#[derive(Debug)]
pub struct Application {
    record: ApplicationRecord,
    child: Option<Child>,
}

impl Application {
    #[must_use]
    pub fn from_record(record: ApplicationRecord) -> Self {
        Self {
            record,
            child: None,
        }
    }

    /// Drop the child handle and remove the pid file.
    fn release(&mut self) {
        self.child = None;
        if let Err(err) = utils::delete_file(&self.record.pidfile) {
            tracing::warn!(
                "failed to remove pid file of application {}: {err}",
                self.record.name
            );
        }
    }

    fn signal(&self, signal: libc::c_int) -> Result<()> {
        if self.record.pid <= 0 {
            return Err(Error::NoProcess(self.record.name.clone()));
        }
        #[allow(unsafe_code)]
        let rc = unsafe { libc::kill(self.record.pid, signal) };
        if rc == -1 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ApplicationContainer for Application {
    async fn start(&mut self) -> Result<()> {
        let out_file = utils::open_append(&self.record.outfile)?;
        let err_file = utils::open_append(&self.record.errfile)?;

        let mut cmd = std::process::Command::new(&self.record.cmd);
        cmd.arg0(&self.record.name)
            .args(&self.record.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::from(out_file))
            .stderr(Stdio::from(err_file));

        let child = Command::from(cmd).spawn().map_err(|source| Error::Spawn {
            name: self.record.name.clone(),
            source,
        })?;

        let pid = child
            .id()
            .and_then(|pid| i32::try_from(pid).ok())
            .ok_or_else(|| Error::Spawn {
                name: self.record.name.clone(),
                source: std::io::Error::other("pid not available"),
            })?;

        utils::write_file(&self.record.pidfile, pid.to_string().as_bytes())?;

        self.record.pid = pid;
        self.child = Some(child);
        self.record.status.set_status(StatusLabel::Started);
        Ok(())
    }

    fn gracefully_stop(&mut self) -> Result<()> {
        self.signal(libc::SIGTERM)?;
        self.record.status.set_status(StatusLabel::AskedToStop);
        Ok(())
    }

    fn force_stop(&mut self) -> Result<()> {
        self.signal(libc::SIGKILL)?;
        self.record.status.set_status(StatusLabel::Stopped);
        self.release();
        Ok(())
    }

    async fn restart(&mut self) -> Result<()> {
        if self.is_alive() {
            self.gracefully_stop()?;
        }
        self.start().await
    }

    fn delete(&mut self) -> Result<()> {
        self.release();
        utils::delete_file(&self.record.outfile)?;
        utils::delete_file(&self.record.errfile)?;
        match std::fs::remove_dir_all(&self.record.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn is_alive(&self) -> bool {
        if self.record.pid <= 0 {
            return false;
        }
        // Signal 0 probes reachability without delivering anything.
        #[allow(unsafe_code)]
        let rc = unsafe { libc::kill(self.record.pid, 0) };
        rc == 0
    }

    fn identifier(&self) -> &str {
        &self.record.name
    }

    fn should_keep_alive(&self) -> bool {
        self.record.keep_alive
    }

    fn add_restart(&mut self) {
        self.record.status.add_restart();
    }

    fn notify_stopped(&mut self) {
        self.record.pid = -1;
    }

    fn set_status(&mut self, label: StatusLabel) {
        self.record.status.set_status(label);
    }

    fn pid(&self) -> i32 {
        self.record.pid
    }

    fn status(&self) -> ApplicationStatus {
        self.record.status.clone()
    }

    fn watch(&mut self) -> Option<ExitFuture> {
        let mut child = self.child.take()?;
        Some(Box::pin(async move { child.wait().await }))
    }

    fn record(&self) -> ApplicationRecord {
        self.record.clone()
    }
}
