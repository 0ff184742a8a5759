use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use maestro_config::DaemonSnapshot;
use maestro_types::{ApplicationData, StatusLabel};
use tokio::sync::{mpsc, Mutex};

use crate::{
    application::{Application, ApplicationContainer},
    error::{Error, Result},
    preparable::{GoPreparable, Preparable},
    watcher::Watcher,
};

const CONFIG_FILE_NAME: &str = "config.toml";

/// The daemon core: owns the registry, arbitrates every lifecycle operation
/// under one lock, and drives the restart loop fed by the watcher.
pub struct Supervisor<A: ApplicationContainer> {
    pub(crate) sys_folder: PathBuf,
    pub(crate) pid_file: PathBuf,
    pub(crate) out_file: PathBuf,
    pub(crate) err_file: PathBuf,
    pub(crate) watcher: Watcher,
    pub(crate) registry: Mutex<HashMap<String, A>>,
}

impl<A: ApplicationContainer> Supervisor<A> {
    /// Bare supervisor over an empty registry. Background loops are not
    /// launched; see [`spawn_background_tasks`](Self::spawn_background_tasks).
    #[must_use]
    pub fn new(sys_folder: PathBuf) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (watcher, restart_rx) = Watcher::new();
        (
            Arc::new(Self {
                sys_folder,
                pid_file: PathBuf::new(),
                out_file: PathBuf::new(),
                err_file: PathBuf::new(),
                watcher,
                registry: Mutex::new(HashMap::new()),
            }),
            restart_rx,
        )
    }

    /// Launch the three long-lived loops: the restart-bus consumer, the
    /// periodic save, and the periodic status refresh.
    pub fn spawn_background_tasks(self: &Arc<Self>, restart_rx: mpsc::Receiver<String>) {
        tokio::spawn(Arc::clone(self).watch_applications(restart_rx));
        tokio::spawn(Arc::clone(self).save_applications_loop());
        tokio::spawn(Arc::clone(self).update_status_loop());
    }

    /// Compile `source_path` into a preparable ready to be executed.
    ///
    /// Deliberately does not take the registry lock: builds are slow and the
    /// registry must stay responsive. A duplicate name is caught later, at
    /// registration time.
    ///
    /// # Errors
    ///
    /// Returns the build error; a failed compilation carries the captured
    /// build output.
    pub async fn prepare(
        &self,
        source_path: &str,
        name: &str,
        language: &str,
        keep_alive: bool,
        args: Vec<String>,
    ) -> Result<(GoPreparable, Vec<u8>)> {
        let mut preparable = GoPreparable::new(
            source_path,
            name,
            language,
            &self.sys_folder,
            keep_alive,
            args,
        );
        let output = preparable.prepare_bin().await?;
        Ok((preparable, output))
    }

    /// Run a prepared application and put it under watch.
    ///
    /// # Errors
    ///
    /// Fails with `DuplicateApplication` when the name is already
    /// registered, or with whatever the start itself raises.
    pub async fn run_preparable<P>(&self, preparable: P) -> Result<()>
    where
        P: Preparable<Output = A>,
    {
        let mut registry = self.registry.lock().await;
        if registry.contains_key(preparable.identifier()) {
            tracing::warn!("application {} already exists", preparable.identifier());
            return Err(Error::DuplicateApplication(
                preparable.identifier().to_owned(),
            ));
        }

        let mut application = preparable.start().await?;
        let name = application.identifier().to_owned();
        let exit = application.watch();
        registry.insert(name.clone(), application);

        if let Err(err) = self.save_locked(&registry) {
            tracing::warn!("failed to persist registry: {err}");
        }

        match exit {
            Some(exit) => self.watcher.add_application_watcher(&name, exit).await,
            None => tracing::warn!("application {name} started without a child handle"),
        }
        if let Some(application) = registry.get_mut(&name) {
            application.set_status(StatusLabel::Running);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Fails with `UnknownApplication` when the name is absent.
    pub async fn start_applications(&self, name: &str) -> Result<()> {
        let mut registry = self.registry.lock().await;
        match registry.get_mut(name) {
            Some(application) => self.start_app(application).await,
            None => Err(Error::UnknownApplication(name.to_owned())),
        }
    }

    /// # Errors
    ///
    /// Fails with `UnknownApplication` when the name is absent.
    pub async fn stop_applications(&self, name: &str) -> Result<()> {
        let mut registry = self.registry.lock().await;
        match registry.get_mut(name) {
            Some(application) => self.stop_app(application).await,
            None => Err(Error::UnknownApplication(name.to_owned())),
        }
    }

    /// Stop then start. The registry lock is re-acquired between the two
    /// phases so the watcher's stop handshake can complete without a
    /// deadlock.
    ///
    /// # Errors
    ///
    /// Fails with `UnknownApplication` when the name is absent.
    pub async fn restart_applications(&self, name: &str) -> Result<()> {
        self.stop_applications(name).await?;
        self.start_applications(name).await
    }

    /// Stop an application and remove it and all of its files forever.
    ///
    /// # Errors
    ///
    /// Fails with `UnknownApplication` when the name is absent.
    pub async fn delete_applications(&self, name: &str) -> Result<()> {
        let mut registry = self.registry.lock().await;
        tracing::info!("trying to delete application {name}");
        match registry.get_mut(name) {
            Some(application) => self.stop_app(application).await?,
            None => return Err(Error::UnknownApplication(name.to_owned())),
        }
        if let Some(mut application) = registry.remove(name) {
            application.delete()?;
        }
        tracing::info!("successfully deleted application {name}");
        Ok(())
    }

    /// Consistent snapshot of the registry for status reporting.
    pub async fn list_applications(&self) -> Vec<ApplicationData> {
        let registry = self.registry.lock().await;
        registry
            .values()
            .map(|application| ApplicationData {
                name: application.identifier().to_owned(),
                pid: application.pid(),
                status: application.status(),
                keep_alive: application.should_keep_alive(),
            })
            .collect()
    }

    /// Persist the registry to `<sys_folder>/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns a `Persist` error when the snapshot cannot be written.
    pub async fn save_applications(&self) -> Result<()> {
        let registry = self.registry.lock().await;
        self.save_locked(&registry)
    }

    /// Start every application marked keep-alive. Only meant for daemon
    /// startup and the explicit resurrect operation.
    ///
    /// # Errors
    ///
    /// Returns the first start error; later entries are not attempted.
    pub async fn revive(&self) -> Result<()> {
        let mut registry = self.registry.lock().await;
        tracing::info!("reviving all applications");
        for (name, application) in registry.iter_mut() {
            if !application.should_keep_alive() {
                tracing::info!("application {name} does not have keep-alive set, not reviving");
                continue;
            }
            tracing::info!("reviving application {name}");
            self.start_app(application).await?;
        }
        Ok(())
    }

    /// Stop the supervisor: best-effort stop of every application, then one
    /// final persistence pass.
    ///
    /// # Errors
    ///
    /// Returns a `Persist` error when the final snapshot cannot be written.
    pub async fn stop(&self) -> Result<()> {
        tracing::info!("stopping the supervisor and all of its applications");
        let mut registry = self.registry.lock().await;
        for (name, application) in registry.iter_mut() {
            if let Err(err) = self.stop_app(application).await {
                tracing::warn!("failed to stop application {name}: {err}");
            }
        }
        tracing::info!("saving the list of applications");
        self.save_locked(&registry)
    }

    /// Lock must be held.
    pub(crate) async fn start_app(&self, application: &mut A) -> Result<()> {
        if application.is_alive() {
            return Ok(());
        }
        application.start().await?;
        match application.watch() {
            Some(exit) => {
                self.watcher
                    .add_application_watcher(application.identifier(), exit)
                    .await;
            }
            None => tracing::warn!(
                "application {} started without a child handle",
                application.identifier()
            ),
        }
        application.set_status(StatusLabel::Running);
        Ok(())
    }

    /// Lock must be held. Blocks until the watcher has observed the exit,
    /// which is what makes the `stopped` label trustworthy.
    pub(crate) async fn stop_app(&self, application: &mut A) -> Result<()> {
        if !application.is_alive() {
            return Ok(());
        }
        let wait_stop = self.watcher.stop_watcher(application.identifier()).await;
        application.gracefully_stop()?;
        if let Some(wait_stop) = wait_stop {
            // A dropped sender also counts: the dispatcher was already gone.
            let _ = wait_stop.await;
        }
        application.notify_stopped();
        application.set_status(StatusLabel::Stopped);
        tracing::info!(
            "application {} successfully stopped",
            application.identifier()
        );
        Ok(())
    }

    /// Lock must be held.
    pub(crate) async fn restart_app(&self, application: &mut A) -> Result<()> {
        self.stop_app(application).await?;
        self.start_app(application).await
    }

    /// Lock must be held.
    pub(crate) fn update_status_app(application: &mut A) {
        if application.is_alive() {
            application.set_status(StatusLabel::Running);
        } else {
            application.notify_stopped();
            application.set_status(StatusLabel::Stopped);
        }
    }

    /// Lock must be held.
    pub(crate) fn save_locked(&self, registry: &HashMap<String, A>) -> Result<()> {
        let snapshot = DaemonSnapshot {
            sys_folder: self.sys_folder.clone(),
            pid_file: self.pid_file.clone(),
            out_file: self.out_file.clone(),
            err_file: self.err_file.clone(),
            applications: registry
                .iter()
                .map(|(name, application)| (name.clone(), application.record()))
                .collect(),
        };
        maestro_config::save_snapshot(&snapshot, &self.config_path())?;
        Ok(())
    }

    fn config_path(&self) -> PathBuf {
        self.sys_folder.join(CONFIG_FILE_NAME)
    }
}

impl Supervisor<Application> {
    /// Bring the daemon core up from `config_file`: load the persisted
    /// snapshot, revive the keep-alive subset, and launch the background
    /// loops. A snapshot that cannot be decoded is the one fatal path.
    ///
    /// # Errors
    ///
    /// Returns a `Persist` error when the snapshot is corrupt, or an `Io`
    /// error when the system folder cannot be created.
    pub async fn init_master(config_file: &Path) -> Result<Arc<Self>> {
        let (watcher, restart_rx) = Watcher::new();

        let DaemonSnapshot {
            mut sys_folder,
            pid_file,
            out_file,
            err_file,
            applications,
        } = maestro_config::load_snapshot(config_file)?;

        if sys_folder.as_os_str().is_empty() {
            let dir = config_file.parent().unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)?;
            sys_folder = dir.to_path_buf();
        }

        let registry = applications
            .into_iter()
            .map(|(name, record)| (name, Application::from_record(record)))
            .collect();

        let supervisor = Arc::new(Self {
            sys_folder,
            pid_file,
            out_file,
            err_file,
            watcher,
            registry: Mutex::new(registry),
        });

        if let Err(err) = supervisor.revive().await {
            tracing::warn!("failed to revive applications: {err}");
        }
        tracing::info!("all applications revived");

        supervisor.spawn_background_tasks(restart_rx);
        Ok(supervisor)
    }
}
