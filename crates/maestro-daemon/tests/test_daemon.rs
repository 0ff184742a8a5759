use std::time::Duration;

use maestro_core::Supervisor;
use maestro_transport::{client::rpc_client::RpcClient, error::TransportError};
use tokio::net::TcpListener;

async fn client_against_fresh_daemon(
    dir: &tempfile::TempDir,
) -> (RpcClient, std::path::PathBuf) {
    let config_file = dir.path().join("config.toml");
    let supervisor = Supervisor::init_master(&config_file).await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(maestro_daemon::serve(listener, supervisor));

    let client = RpcClient::connect(addr, Duration::from_secs(5))
        .await
        .unwrap();
    (client, config_file)
}

#[tokio::test]
async fn save_persists_through_the_rpc_surface() {
    let dir = tempfile::tempdir().unwrap();
    let (mut client, config_file) = client_against_fresh_daemon(&dir).await;

    assert!(client.monit_status().await.unwrap().is_empty());
    client.save().await.unwrap();
    assert!(config_file.exists());
}

#[tokio::test]
async fn resurrect_on_an_empty_registry_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let (mut client, _config_file) = client_against_fresh_daemon(&dir).await;

    client.resurrect().await.unwrap();
    assert!(client.monit_status().await.unwrap().is_empty());
}

#[tokio::test]
async fn lifecycle_calls_on_unknown_names_report_back() {
    let dir = tempfile::tempdir().unwrap();
    let (mut client, _config_file) = client_against_fresh_daemon(&dir).await;

    for result in [
        client.start_applications("ghost").await,
        client.stop_applications("ghost").await,
        client.restart_applications("ghost").await,
        client.delete_applications("ghost").await,
    ] {
        let err = result.unwrap_err();
        assert!(matches!(err, TransportError::Remote(ref message)
            if message == "ERROR: unknown application `ghost`"));
    }
}

#[tokio::test]
async fn failed_builds_come_back_as_error_replies() {
    let dir = tempfile::tempdir().unwrap();
    let (mut client, _config_file) = client_against_fresh_daemon(&dir).await;

    // Whether the build tool is missing or the source directory is empty,
    // the reply must be an operator-readable ERROR string, not a hangup.
    let err = client
        .start_go_application(dir.path().to_str().unwrap(), "svc", true, vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Remote(ref message)
        if message.starts_with("ERROR:")));
    assert!(client.monit_status().await.unwrap().is_empty());
}
