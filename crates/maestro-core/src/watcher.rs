use std::{collections::HashMap, process::ExitStatus, sync::Arc};

use tokio::sync::{mpsc, oneshot, Mutex};

use crate::application::ExitFuture;

const RESTART_BUS_CAPACITY: usize = 32;

struct ApplicationWatcher {
    stop_tx: mpsc::Sender<oneshot::Sender<bool>>,
}

/// Watches every running application and publishes the ones that die on the
/// restart bus, keyed by name. The supervisor re-resolves the name under its
/// own lock, so an entry deleted in the meantime turns the event into a
/// no-op.
pub struct Watcher {
    restart_tx: mpsc::Sender<String>,
    watched: Arc<Mutex<HashMap<String, ApplicationWatcher>>>,
}

impl Watcher {
    #[must_use]
    pub fn new() -> (Self, mpsc::Receiver<String>) {
        let (restart_tx, restart_rx) = mpsc::channel(RESTART_BUS_CAPACITY);
        (
            Self {
                restart_tx,
                watched: Arc::new(Mutex::new(HashMap::new())),
            },
            restart_rx,
        )
    }

    /// Register a waiter/dispatcher pair for `name`. A second registration
    /// for the same name is ignored.
    pub async fn add_application_watcher(&self, name: &str, exit: ExitFuture) {
        let mut watched = self.watched.lock().await;
        if watched.contains_key(name) {
            tracing::warn!("a watcher for application {name} already exists");
            return;
        }

        // Both channels hold one slot so no sender ever blocks.
        let (status_tx, mut status_rx) = mpsc::channel::<std::io::Result<ExitStatus>>(1);
        let (stop_tx, mut stop_rx) = mpsc::channel::<oneshot::Sender<bool>>(1);
        watched.insert(name.to_owned(), ApplicationWatcher { stop_tx });

        let waiter_name = name.to_owned();
        tokio::spawn(async move {
            tracing::info!("starting watcher on application {waiter_name}");
            let state = exit.await;
            let _ = status_tx.send(state).await;
        });

        let name = name.to_owned();
        let watched = Arc::clone(&self.watched);
        let restart_tx = self.restart_tx.clone();
        tokio::spawn(async move {
            // Biased toward the stop channel: an exit racing a stop request
            // is the stop completing, not a crash to restart.
            tokio::select! {
                biased;
                requester = stop_rx.recv() => {
                    if let Some(done) = requester {
                        // The stopper wants proof the child actually died:
                        // drain the waiter before signaling back.
                        let _ = status_rx.recv().await;
                        let _ = done.send(true);
                    }
                    watched.lock().await.remove(&name);
                }
                state = status_rx.recv() => {
                    tracing::info!("application {name} is dead, advising master");
                    match state {
                        Some(Ok(state)) => tracing::info!("exit state is {state}"),
                        Some(Err(err)) => tracing::warn!("wait on application {name} failed: {err}"),
                        None => {}
                    }
                    // Tear the table entry down before advising the master,
                    // so the restart can re-register without colliding with
                    // this watcher.
                    watched.lock().await.remove(&name);
                    if restart_tx.send(name.clone()).await.is_err() {
                        tracing::debug!("restart bus closed, dropping exit event for {name}");
                    }
                }
            }
        });
    }

    /// Cancel the watcher for `name`. The returned channel resolves (with a
    /// value, or with an error when the dispatcher is already gone) once the
    /// waiter has observed the exit; `None` means there is nothing to wait
    /// for.
    pub async fn stop_watcher(&self, name: &str) -> Option<oneshot::Receiver<bool>> {
        let watched = self.watched.lock().await;
        let watcher = watched.get(name)?;
        tracing::info!("stopping watcher on application {name}");
        let (done_tx, done_rx) = oneshot::channel();
        match watcher.stop_tx.try_send(done_tx) {
            Ok(()) => Some(done_rx),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{os::unix::process::ExitStatusExt, time::Duration};

    use super::*;

    fn fake_exit() -> (oneshot::Sender<i32>, ExitFuture) {
        let (tx, rx) = oneshot::channel();
        let exit: ExitFuture = Box::pin(async move {
            let code = rx.await.unwrap_or(0);
            Ok(ExitStatus::from_raw(code << 8))
        });
        (tx, exit)
    }

    async fn watched_len(watcher: &Watcher) -> usize {
        watcher.watched.lock().await.len()
    }

    #[tokio::test]
    async fn exit_is_published_on_the_restart_bus() {
        let (watcher, mut restart_rx) = Watcher::new();
        let (trigger, exit) = fake_exit();

        watcher.add_application_watcher("svc", exit).await;
        assert_eq!(watched_len(&watcher).await, 1);

        trigger.send(1).unwrap();
        let name = tokio::time::timeout(Duration::from_secs(5), restart_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(name, "svc");

        // The dispatcher tears its table entry down on the way out.
        for _ in 0..100 {
            if watched_len(&watcher).await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(watched_len(&watcher).await, 0);
    }

    #[tokio::test]
    async fn second_watcher_for_the_same_name_is_ignored() {
        let (watcher, _restart_rx) = Watcher::new();
        let (_trigger_a, exit_a) = fake_exit();
        let (_trigger_b, exit_b) = fake_exit();

        watcher.add_application_watcher("svc", exit_a).await;
        watcher.add_application_watcher("svc", exit_b).await;
        assert_eq!(watched_len(&watcher).await, 1);
    }

    #[tokio::test]
    async fn stop_watcher_waits_for_the_exit_and_suppresses_the_restart() {
        let (watcher, mut restart_rx) = Watcher::new();
        let (trigger, exit) = fake_exit();

        watcher.add_application_watcher("svc", exit).await;
        let done = watcher.stop_watcher("svc").await.expect("watcher entry");

        // The handshake resolves only once the child has actually exited.
        trigger.send(0).unwrap();
        let done = tokio::time::timeout(Duration::from_secs(5), done)
            .await
            .unwrap();
        assert!(done.unwrap());

        // Nothing reaches the restart bus on the stop path.
        let raced = tokio::time::timeout(Duration::from_millis(100), restart_rx.recv()).await;
        assert!(raced.is_err());
    }

    #[tokio::test]
    async fn stop_watcher_on_an_unknown_name_returns_nothing() {
        let (watcher, _restart_rx) = Watcher::new();
        assert!(watcher.stop_watcher("ghost").await.is_none());
    }
}
