use std::{net::SocketAddr, time::Duration};

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use maestro_types::ApplicationData;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::{
    api::{MaestroApi, MessageType, RpcMessage},
    error::{TransportError, TransportResult},
};

/// Request-reply client for the daemon: one call per invocation, replies
/// correlated by message id. This is the surface the command-line front-end
/// dials.
#[derive(Debug)]
pub struct RpcClient {
    framed: Framed<TcpStream, LengthDelimitedCodec>,
    message_counter: u32,
}

impl RpcClient {
    /// Dial the daemon, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` when the connection fails or times out.
    pub async fn connect(addr: SocketAddr, timeout: Duration) -> TransportResult<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| TransportError::Send(format!("connection to {addr} timed out")))??;
        Ok(Self {
            framed: Framed::new(stream, LengthDelimitedCodec::new()),
            message_counter: 0,
        })
    }

    /// Send one request and wait for its reply. Frames carrying a different
    /// id are skipped.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` if the message could not be exchanged.
    pub async fn send(&mut self, body: MaestroApi) -> TransportResult<MaestroApi> {
        self.message_counter += 1;
        let message_id = self.message_counter;

        let message = RpcMessage {
            id: message_id,
            req_type: MessageType::Request,
            body,
        };
        let bytes = serde_json::to_vec(&message)?;
        self.framed.send(Bytes::from(bytes)).await?;

        while let Some(frame) = self.framed.next().await {
            let frame = frame?;
            let response = serde_json::from_slice::<RpcMessage>(&frame)?;
            if response.id != message_id || response.req_type != MessageType::Response {
                continue;
            }
            return Ok(response.body);
        }

        Err(TransportError::Send("no response".to_owned()))
    }

    async fn call(&mut self, body: MaestroApi) -> TransportResult<()> {
        match self.send(body).await? {
            MaestroApi::Error { message } => Err(TransportError::Remote(message)),
            _ => Ok(()),
        }
    }

    /// Ask the daemon to persist its registry.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` when the call fails locally or remotely.
    pub async fn save(&mut self) -> TransportResult<()> {
        self.call(MaestroApi::Save).await
    }

    /// Ask the daemon to revive every keep-alive application.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` when the call fails locally or remotely.
    pub async fn resurrect(&mut self) -> TransportResult<()> {
        self.call(MaestroApi::Resurrect).await
    }

    /// Build a Go application and put it under management.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` when the call fails locally or remotely;
    /// a remote build failure carries the captured build output.
    pub async fn start_go_application(
        &mut self,
        source_path: &str,
        name: &str,
        keep_alive: bool,
        args: Vec<String>,
    ) -> TransportResult<()> {
        self.call(MaestroApi::StartGoApplication {
            source_path: source_path.to_owned(),
            name: name.to_owned(),
            keep_alive,
            args,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns a `TransportError` when the call fails locally or remotely.
    pub async fn restart_applications(&mut self, name: &str) -> TransportResult<()> {
        self.call(MaestroApi::RestartApplications {
            name: name.to_owned(),
        })
        .await
    }

    /// # Errors
    ///
    /// Returns a `TransportError` when the call fails locally or remotely.
    pub async fn start_applications(&mut self, name: &str) -> TransportResult<()> {
        self.call(MaestroApi::StartApplications {
            name: name.to_owned(),
        })
        .await
    }

    /// # Errors
    ///
    /// Returns a `TransportError` when the call fails locally or remotely.
    pub async fn stop_applications(&mut self, name: &str) -> TransportResult<()> {
        self.call(MaestroApi::StopApplications {
            name: name.to_owned(),
        })
        .await
    }

    /// # Errors
    ///
    /// Returns a `TransportError` when the call fails locally or remotely.
    pub async fn delete_applications(&mut self, name: &str) -> TransportResult<()> {
        self.call(MaestroApi::DeleteApplications {
            name: name.to_owned(),
        })
        .await
    }

    /// Snapshot of every managed application.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` when the call fails locally or remotely.
    pub async fn monit_status(&mut self) -> TransportResult<Vec<ApplicationData>> {
        match self.send(MaestroApi::MonitStatus).await? {
            MaestroApi::Status { applications } => Ok(applications),
            MaestroApi::Error { message } => Err(TransportError::Remote(message)),
            other => Err(TransportError::Send(format!("unexpected reply: {other:?}"))),
        }
    }
}
