use std::process::ExitStatus;

use futures::future::BoxFuture;
use maestro_types::{ApplicationRecord, ApplicationStatus, StatusLabel};

use crate::error::Result;

/// Future resolving once the underlying OS process changes state.
pub type ExitFuture = BoxFuture<'static, std::io::Result<ExitStatus>>;

/// Capability set of a managed application. The supervisor only ever talks
/// to this trait; tests inject a scripted implementation.
#[async_trait::async_trait]
pub trait ApplicationContainer: Send + Sync + 'static {
    /// Launch the process and write its pid file.
    async fn start(&mut self) -> Result<()>;

    /// Ask the process to terminate. Does not wait for it to comply.
    fn gracefully_stop(&mut self) -> Result<()>;

    /// Kill the process and release everything attached to it.
    fn force_stop(&mut self) -> Result<()>;

    /// Gracefully stop the process (when alive) and start it again.
    async fn restart(&mut self) -> Result<()>;

    /// Remove every file artifact this application owns.
    fn delete(&mut self) -> Result<()>;

    /// Advisory liveness probe; may race with exit. The definitive signal
    /// of death is the future handed out by [`watch`](Self::watch)
    /// completing.
    fn is_alive(&self) -> bool;

    fn identifier(&self) -> &str;

    fn should_keep_alive(&self) -> bool;

    fn add_restart(&mut self);

    /// Mark the process gone by resetting the pid.
    fn notify_stopped(&mut self);

    fn set_status(&mut self, label: StatusLabel);

    fn pid(&self) -> i32;

    fn status(&self) -> ApplicationStatus;

    /// Hand out the exit future by moving the child handle out, or `None`
    /// when no handle is held.
    fn watch(&mut self) -> Option<ExitFuture>;

    /// Persistable snapshot of this container.
    fn record(&self) -> ApplicationRecord;
}
