use std::sync::Arc;

use bytes::Bytes;
use futures_util::{future::BoxFuture, SinkExt, StreamExt};
use tokio::{net::TcpListener, sync::mpsc};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::{
    api::{MaestroApi, MessageType, RpcMessage},
    error::TransportResult,
};

type UnaryHandler<C> =
    Arc<dyn Fn(MaestroApi, C) -> BoxFuture<'static, TransportResult<MaestroApi>> + Send + Sync>;

/// Request-reply RPC server over length-delimited JSON frames.
///
/// The listener is injected by the caller. Every accepted connection gets a
/// reader task and a writer channel; each request runs its handler in its
/// own task, so handlers must be safe under concurrent calls.
pub struct RpcServer<C: Clone + Send + Sync> {
    listener: TcpListener,
    handler: UnaryHandler<C>,
    context: C,
}

impl<C: Clone + Send + Sync + 'static> RpcServer<C> {
    #[must_use]
    pub fn new(listener: TcpListener, context: C) -> Self {
        Self {
            listener,
            handler: Arc::new(|_api: MaestroApi, _context: C| {
                Box::pin(async { unimplemented!("no unary handler installed") })
            }),
            context,
        }
    }

    #[must_use]
    pub fn with_unary_handler(mut self, handler: UnaryHandler<C>) -> Self {
        self.handler = handler;
        self
    }

    /// Accept connections until the listener dies.
    pub async fn serve(self) {
        while let Ok((stream, peer)) = self.listener.accept().await {
            tracing::debug!("accepted rpc connection from {peer}");

            let framed = Framed::new(stream, LengthDelimitedCodec::new());
            let (mut sink, mut stream) = framed.split();
            let (tx, mut rx) = mpsc::channel::<RpcMessage>(10);

            let handler = Arc::clone(&self.handler);
            let context = self.context.clone();
            tokio::spawn(async move {
                while let Some(frame) = stream.next().await {
                    let frame = match frame {
                        Ok(frame) => frame,
                        Err(err) => {
                            tracing::warn!("rpc read failed: {err}");
                            break;
                        }
                    };
                    let message = match serde_json::from_slice::<RpcMessage>(&frame) {
                        Ok(message) => message,
                        Err(err) => {
                            tracing::warn!("dropping undecodable rpc frame: {err}");
                            continue;
                        }
                    };

                    let handler = Arc::clone(&handler);
                    let context = context.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let body = match (handler)(message.body, context).await {
                            Ok(body) => body,
                            Err(err) => MaestroApi::Error {
                                message: format!("ERROR: {err}"),
                            },
                        };
                        let response = RpcMessage {
                            id: message.id,
                            req_type: MessageType::Response,
                            body,
                        };
                        let _ = tx.send(response).await;
                    });
                }
            });

            tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    let bytes = match serde_json::to_vec(&message) {
                        Ok(bytes) => bytes,
                        Err(err) => {
                            tracing::error!("failed to encode rpc response: {err}");
                            continue;
                        }
                    };
                    if sink.send(Bytes::from(bytes)).await.is_err() {
                        break;
                    }
                }
            });
        }
    }
}
