use maestro_types::ApplicationData;
use serde::{Deserialize, Serialize};

/// Envelope of every frame on the wire. Replies echo the request id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcMessage {
    pub id: u32,
    pub req_type: MessageType,
    pub body: MaestroApi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    Request,
    Response,
}

/// Body of every request and reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MaestroApi {
    Save,
    Resurrect,
    StartGoApplication {
        source_path: String,
        name: String,
        keep_alive: bool,
        args: Vec<String>,
    },
    RestartApplications {
        name: String,
    },
    StartApplications {
        name: String,
    },
    StopApplications {
        name: String,
    },
    DeleteApplications {
        name: String,
    },
    MonitStatus,
    Ack,
    Status {
        applications: Vec<ApplicationData>,
    },
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use maestro_types::ApplicationStatus;

    use super::*;

    #[test]
    fn request_round_trips_through_json() {
        let message = RpcMessage {
            id: 7,
            req_type: MessageType::Request,
            body: MaestroApi::StartGoApplication {
                source_path: "/src/example".to_owned(),
                name: "svc".to_owned(),
                keep_alive: true,
                args: vec!["-v".to_owned()],
            },
        };

        let bytes = serde_json::to_vec(&message).unwrap();
        let decoded = serde_json::from_slice::<RpcMessage>(&bytes).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn status_reply_round_trips_through_json() {
        let message = RpcMessage {
            id: 8,
            req_type: MessageType::Response,
            body: MaestroApi::Status {
                applications: vec![ApplicationData {
                    name: "svc".to_owned(),
                    pid: 4242,
                    status: ApplicationStatus::default(),
                    keep_alive: false,
                }],
            },
        };

        let bytes = serde_json::to_vec(&message).unwrap();
        let decoded = serde_json::from_slice::<RpcMessage>(&bytes).unwrap();
        assert_eq!(decoded, message);
    }
}
