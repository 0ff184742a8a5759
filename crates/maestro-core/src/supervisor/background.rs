use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;

use crate::{application::ApplicationContainer, supervisor::Supervisor};

const SAVE_INTERVAL: Duration = Duration::from_secs(5 * 60);
const STATUS_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

impl<A: ApplicationContainer> Supervisor<A> {
    /// Restart loop: consumes the watcher's restart bus for the lifetime of
    /// the supervisor. Never panics; failures are logged and the loop moves
    /// on to the next dead application.
    pub async fn watch_applications(self: Arc<Self>, mut restart_rx: mpsc::Receiver<String>) {
        while let Some(name) = restart_rx.recv().await {
            let mut registry = self.registry.lock().await;
            let Some(application) = registry.get_mut(&name) else {
                // Deleted between the exit observation and now.
                continue;
            };

            if !application.should_keep_alive() {
                Self::update_status_app(application);
                tracing::info!(
                    "application {name} does not have keep-alive set, will not be restarted"
                );
                continue;
            }

            tracing::info!("restarting application {name}");
            if application.is_alive() {
                tracing::warn!("application {name} was supposed to be dead, but it is alive");
            }
            application.add_restart();
            if let Err(err) = self.restart_app(application).await {
                tracing::warn!("could not restart application {name}: {err}");
            }
        }
    }

    /// Persist the registry every five minutes.
    pub async fn save_applications_loop(self: Arc<Self>) {
        loop {
            tracing::info!("saving the list of applications");
            {
                let registry = self.registry.lock().await;
                if let Err(err) = self.save_locked(&registry) {
                    tracing::warn!("failed to persist registry: {err}");
                }
            }
            tokio::time::sleep(SAVE_INTERVAL).await;
        }
    }

    /// Refresh every application's status label every thirty seconds.
    pub async fn update_status_loop(self: Arc<Self>) {
        loop {
            {
                let mut registry = self.registry.lock().await;
                for application in registry.values_mut() {
                    Self::update_status_app(application);
                }
            }
            tokio::time::sleep(STATUS_REFRESH_INTERVAL).await;
        }
    }
}
