use std::{
    os::unix::process::ExitStatusExt,
    process::ExitStatus,
    sync::{Arc, Mutex},
};

use maestro_types::{ApplicationRecord, ApplicationStatus, StatusLabel};
use tokio::sync::oneshot;

use crate::{
    application::container::{ApplicationContainer, ExitFuture},
    error::{Error, Result},
    preparable::Preparable,
};

#[derive(Debug, Default)]
struct MockState {
    alive: bool,
    starts: u32,
    exit_tx: Option<oneshot::Sender<i32>>,
    fail_next_start: bool,
}

/// Scripted container for supervisor and watcher tests. The process it
/// pretends to run always complies with a termination request.
pub struct MockApplication {
    record: ApplicationRecord,
    state: Arc<Mutex<MockState>>,
}

/// Test-side view of a [`MockApplication`]: lets a test kill the fake
/// process from outside the registry and observe how often it was started.
#[derive(Clone)]
pub struct MockHandle(Arc<Mutex<MockState>>);

impl MockHandle {
    pub fn kill(&self, code: i32) {
        let mut state = self.0.lock().unwrap();
        state.alive = false;
        if let Some(tx) = state.exit_tx.take() {
            let _ = tx.send(code);
        }
    }

    pub fn starts(&self) -> u32 {
        self.0.lock().unwrap().starts
    }

    pub fn alive(&self) -> bool {
        self.0.lock().unwrap().alive
    }

    pub fn fail_next_start(&self) {
        self.0.lock().unwrap().fail_next_start = true;
    }
}

impl MockApplication {
    pub fn new(name: &str, keep_alive: bool) -> Self {
        let path = std::path::PathBuf::from(format!("/tmp/maestro/{name}"));
        let cmd = path.join(name);
        let record = ApplicationRecord {
            name: name.to_owned(),
            cmd: cmd.clone(),
            args: Vec::new(),
            path,
            pidfile: std::path::PathBuf::from(format!("{}.pid", cmd.display())),
            outfile: std::path::PathBuf::from(format!("{}.out", cmd.display())),
            errfile: std::path::PathBuf::from(format!("{}.err", cmd.display())),
            keep_alive,
            pid: -1,
            status: ApplicationStatus::default(),
        };
        Self {
            record,
            state: Arc::default(),
        }
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle(Arc::clone(&self.state))
    }
}

#[async_trait::async_trait]
impl ApplicationContainer for MockApplication {
    async fn start(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_next_start {
            state.fail_next_start = false;
            return Err(Error::Spawn {
                name: self.record.name.clone(),
                source: std::io::Error::other("scripted spawn failure"),
            });
        }
        state.alive = true;
        state.starts += 1;
        self.record.pid = 4000 + state.starts as i32;
        self.record.status.set_status(StatusLabel::Started);
        Ok(())
    }

    fn gracefully_stop(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.alive {
            return Err(Error::NoProcess(self.record.name.clone()));
        }
        state.alive = false;
        if let Some(tx) = state.exit_tx.take() {
            let _ = tx.send(0);
        }
        self.record.status.set_status(StatusLabel::AskedToStop);
        Ok(())
    }

    fn force_stop(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.alive {
            return Err(Error::NoProcess(self.record.name.clone()));
        }
        state.alive = false;
        if let Some(tx) = state.exit_tx.take() {
            let _ = tx.send(137);
        }
        self.record.status.set_status(StatusLabel::Stopped);
        Ok(())
    }

    async fn restart(&mut self) -> Result<()> {
        if self.is_alive() {
            self.gracefully_stop()?;
        }
        self.start().await
    }

    fn delete(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.state.lock().unwrap().alive
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
        let (tx, rx) = oneshot::channel();
        self.state.lock().unwrap().exit_tx = Some(tx);
        Some(Box::pin(async move {
            let code = rx.await.unwrap_or(0);
            Ok(ExitStatus::from_raw(code << 8))
        }))
    }

    fn record(&self) -> ApplicationRecord {
        self.record.clone()
    }
}

/// Preparable that skips the build and hands out a prebuilt mock.
pub struct MockPreparable {
    name: String,
    application: Mutex<Option<MockApplication>>,
}

impl MockPreparable {
    pub fn new(application: MockApplication) -> Self {
        Self {
            name: application.identifier().to_owned(),
            application: Mutex::new(Some(application)),
        }
    }
}

#[async_trait::async_trait]
impl Preparable for MockPreparable {
    type Output = MockApplication;

    async fn prepare_bin(&mut self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn start(&self) -> Result<MockApplication> {
        let mut application = {
            self.application
                .lock()
                .unwrap()
                .take()
                .expect("mock preparable already started")
        };
        application.start().await?;
        Ok(application)
    }

    fn identifier(&self) -> &str {
        &self.name
    }
}
