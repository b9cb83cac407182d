//! Shared helpers for integration tests

use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

/// Starts a server that reads each request and closes the socket without answering
///
/// Returns the endpoint URL to give to the client.
pub async fn spawn_dropping_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
        }
    });

    format!("http://{}/customsearch/v1", addr)
}
