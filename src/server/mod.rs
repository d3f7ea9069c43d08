//! RESP server
//!
//! Accepts TCP connections and runs every decoded command against the
//! shared [`Backend`], one task per connection.

mod connection;

use crate::db::Backend;
use tokio::net::TcpListener;
use tracing::{error, info};

pub use connection::Connection;

/// Bind `addr` and serve until the listener fails
pub async fn run(addr: &str, backend: Backend) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("forumdb RESP server listening on {} ({} backend)", addr, backend.kind());
    serve(listener, backend).await
}

/// Serve connections from an already bound listener
pub async fn serve(listener: TcpListener, backend: Backend) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        info!("New RESP connection from {}", peer);

        let backend = backend.clone();
        tokio::spawn(async move {
            let mut connection = Connection::new(socket);
            if let Err(e) = connection.handle(&backend).await {
                error!("Connection error from {}: {}", peer, e);
            }
            info!("Connection closed: {}", peer);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::clock;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn start() -> std::net::SocketAddr {
        let backend = Backend::open(&Config::ephemeral(), clock::system()).await.unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, backend));
        addr
    }

    async fn roundtrip(stream: &mut TcpStream, request: &[u8], expected: &[u8]) {
        stream.write_all(request).await.unwrap();
        let mut buf = vec![0u8; expected.len()];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&buf), String::from_utf8_lossy(expected));
    }

    #[tokio::test]
    async fn test_commands_over_tcp() {
        let addr = start().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        roundtrip(&mut stream, b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await;
        roundtrip(&mut stream, b"*2\r\n$4\r\nINCR\r\n$5\r\nviews\r\n", b":1\r\n").await;
        roundtrip(
            &mut stream,
            b"*3\r\n$4\r\nHGET\r\n$5\r\nviews\r\n$5\r\nvalue\r\n",
            b"$1\r\n1\r\n",
        )
        .await;
    }

    #[tokio::test]
    async fn test_pipelined_and_split_frames() {
        let addr = start().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(b"*1\r\n$4\r\nPI").await.unwrap();
        tokio::task::yield_now().await;
        roundtrip(&mut stream, b"NG\r\n*1\r\n$4\r\nPING\r\n", b"+PONG\r\n+PONG\r\n").await;
    }

    #[tokio::test]
    async fn test_unknown_command_reply() {
        let addr = start().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        roundtrip(&mut stream, b"*1\r\n$4\r\nNOPE\r\n", b"-ERR unknown command 'NOPE'\r\n").await;
    }
}
