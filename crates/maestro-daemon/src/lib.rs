use std::{path::PathBuf, sync::Arc};

use futures_util::FutureExt;
use maestro_core::{Application, Error, Supervisor};
use maestro_transport::{api::MaestroApi, error::TransportResult, server::rpc_server::RpcServer};
use tokio::net::TcpListener;

/// Default RPC endpoint the thin client dials.
pub const DEFAULT_RPC_ADDR: &str = "127.0.0.1:9653";

/// Wires the supervisor core to the RPC surface. Daemonization (pid file,
/// fork-to-background, log redirection) is the embedding binary's business.
#[derive(Debug, Clone)]
pub struct DaemonRunner {
    config_file: PathBuf,
}

#[derive(Clone)]
struct Context {
    supervisor: Arc<Supervisor<Application>>,
}

impl DaemonRunner {
    #[must_use]
    pub fn new(config_file: PathBuf) -> Self {
        Self { config_file }
    }

    /// Initialize the supervisor from the config file and serve RPC on
    /// `listener` until the process dies.
    ///
    /// # Errors
    ///
    /// Returns an error when the persisted snapshot is corrupt.
    pub async fn start(&self, listener: TcpListener) -> anyhow::Result<()> {
        let supervisor = Supervisor::init_master(&self.config_file).await?;
        serve(listener, supervisor).await;
        Ok(())
    }
}

/// Serve the RPC surface for an already-initialized supervisor.
pub async fn serve(listener: TcpListener, supervisor: Arc<Supervisor<Application>>) {
    let handler =
        Arc::new(|api: MaestroApi, context: Context| unary_handler(api, context).boxed());
    RpcServer::new(listener, Context { supervisor })
        .with_unary_handler(handler)
        .serve()
        .await;
}

async fn unary_handler(message: MaestroApi, context: Context) -> TransportResult<MaestroApi> {
    let supervisor = &context.supervisor;
    let reply = match message {
        MaestroApi::Save => supervisor.save_applications().await.map(|()| MaestroApi::Ack),
        MaestroApi::Resurrect => supervisor.revive().await.map(|()| MaestroApi::Ack),
        MaestroApi::StartGoApplication {
            source_path,
            name,
            keep_alive,
            args,
        } => start_go_application(supervisor, &source_path, &name, keep_alive, args).await,
        MaestroApi::RestartApplications { name } => supervisor
            .restart_applications(&name)
            .await
            .map(|()| MaestroApi::Ack),
        MaestroApi::StartApplications { name } => supervisor
            .start_applications(&name)
            .await
            .map(|()| MaestroApi::Ack),
        MaestroApi::StopApplications { name } => supervisor
            .stop_applications(&name)
            .await
            .map(|()| MaestroApi::Ack),
        MaestroApi::DeleteApplications { name } => supervisor
            .delete_applications(&name)
            .await
            .map(|()| MaestroApi::Ack),
        MaestroApi::MonitStatus => Ok(MaestroApi::Status {
            applications: supervisor.list_applications().await,
        }),
        other => {
            tracing::warn!("unexpected rpc request body: {other:?}");
            return Ok(MaestroApi::Error {
                message: "ERROR: unsupported request".to_owned(),
            });
        }
    };

    Ok(match reply {
        Ok(body) => body,
        Err(err) => MaestroApi::Error {
            message: render_error(&err),
        },
    })
}

async fn start_go_application(
    supervisor: &Supervisor<Application>,
    source_path: &str,
    name: &str,
    keep_alive: bool,
    args: Vec<String>,
) -> maestro_core::Result<MaestroApi> {
    let (preparable, _output) = supervisor
        .prepare(source_path, name, "go", keep_alive, args)
        .await?;
    supervisor.run_preparable(preparable).await?;
    Ok(MaestroApi::Ack)
}

/// Operator-visible rendering: `ERROR: …`, with the captured build bytes
/// appended for compilation failures.
fn render_error(err: &Error) -> String {
    match err {
        Error::BuildFailure { output, .. } => {
            format!("ERROR: {err} OUTPUT: {}", String::from_utf8_lossy(output))
        }
        _ => format!("ERROR: {err}"),
    }
}
