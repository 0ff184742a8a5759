use std::path::{Path, PathBuf};

use maestro_types::{ApplicationRecord, ApplicationStatus};
use tokio::process::Command;

use crate::{
    application::{Application, ApplicationContainer},
    error::{Error, Result},
};

/// An artifact-producing step: compile source into an executable, then
/// assemble and start the container that runs it.
#[async_trait::async_trait]
pub trait Preparable: Send + Sync {
    type Output: ApplicationContainer;

    /// Build the executable artifact. Returns the combined build output.
    async fn prepare_bin(&mut self) -> Result<Vec<u8>>;

    /// Assemble the application from the derived paths and start it. Meant
    /// to be called from inside the supervisor so watcher registration and
    /// bookkeeping happen in the right order.
    async fn start(&self) -> Result<Self::Output>;

    fn identifier(&self) -> &str;
}

/// Preparable for Go sources: compiles the package at `source_path` into
/// `<sys_folder>/<name>/<name>`.
#[derive(Debug, Clone)]
pub struct GoPreparable {
    pub name: String,
    pub source_path: String,
    pub sys_folder: PathBuf,
    pub language: String,
    pub keep_alive: bool,
    pub args: Vec<String>,
}

impl GoPreparable {
    #[must_use]
    pub fn new(
        source_path: &str,
        name: &str,
        language: &str,
        sys_folder: &Path,
        keep_alive: bool,
        args: Vec<String>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            source_path: source_path
                .strip_suffix('/')
                .unwrap_or(source_path)
                .to_owned(),
            sys_folder: sys_folder.to_path_buf(),
            language: language.to_owned(),
            keep_alive,
            args,
        }
    }

    /// Directory owning every artifact of this application.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.sys_folder.join(&self.name)
    }

    /// Where the compiled binary lands.
    #[must_use]
    pub fn bin_path(&self) -> PathBuf {
        self.path().join(&self.name)
    }

    #[must_use]
    pub fn pid_path(&self) -> PathBuf {
        suffixed(&self.bin_path(), "pid")
    }

    #[must_use]
    pub fn out_path(&self) -> PathBuf {
        suffixed(&self.bin_path(), "out")
    }

    #[must_use]
    pub fn err_path(&self) -> PathBuf {
        suffixed(&self.bin_path(), "err")
    }

    fn record(&self) -> ApplicationRecord {
        ApplicationRecord {
            name: self.name.clone(),
            cmd: self.bin_path(),
            args: self.args.clone(),
            path: self.path(),
            pidfile: self.pid_path(),
            outfile: self.out_path(),
            errfile: self.err_path(),
            keep_alive: self.keep_alive,
            pid: -1,
            status: ApplicationStatus::default(),
        }
    }
}

fn suffixed(path: &Path, ext: &str) -> PathBuf {
    PathBuf::from(format!("{}.{ext}", path.display()))
}

#[async_trait::async_trait]
impl Preparable for GoPreparable {
    type Output = Application;

    async fn prepare_bin(&mut self) -> Result<Vec<u8>> {
        if self.language != "go" {
            return Err(Error::UnsupportedLanguage(self.language.clone()));
        }

        std::fs::create_dir_all(self.path())?;

        let output = Command::new("go")
            .arg("build")
            .arg("-o")
            .arg(self.bin_path())
            .arg(format!("{}/.", self.source_path))
            .output()
            .await?;

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        if !output.status.success() {
            return Err(Error::BuildFailure {
                message: format!("go build exited with {}", output.status),
                output: combined,
            });
        }
        Ok(combined)
    }

    async fn start(&self) -> Result<Application> {
        let mut application = Application::from_record(self.record());
        application.start().await?;
        Ok(application)
    }

    fn identifier(&self) -> &str {
        &self.name
    }
}
