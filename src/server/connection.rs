//! One client connection
//!
//! Bytes are buffered until whole frames decode; pipelined requests are
//! answered in order.

use crate::db::Backend;
use crate::protocol::{self, Frame};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

pub struct Connection {
    stream: TcpStream,
    read_buffer: BytesMut,
    write_buffer: BytesMut,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Connection {
            stream,
            read_buffer: BytesMut::with_capacity(4096),
            write_buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Serve requests until the peer disconnects
    pub async fn handle(&mut self, backend: &Backend) -> anyhow::Result<()> {
        loop {
            let n = self.stream.read_buf(&mut self.read_buffer).await?;
            if n == 0 {
                if self.read_buffer.is_empty() {
                    return Ok(());
                }
                anyhow::bail!("connection reset by peer");
            }
            debug!("Read {} bytes", n);

            loop {
                match protocol::decode(&mut self.read_buffer) {
                    Ok(Some(request)) => {
                        debug!("Request: {}", request);
                        let response = match backend.execute(request).await {
                            Ok(frame) => frame,
                            Err(e) => Frame::error(format!("ERR {}", e)),
                        };
                        protocol::encode_to(&mut self.write_buffer, &response);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        // The stream cannot be resynchronised after a bad frame
                        warn!("Protocol error: {}", e);
                        self.read_buffer.clear();
                        protocol::encode_to(&mut self.write_buffer, &Frame::error(format!("ERR protocol error: {}", e)));
                        break;
                    }
                }
            }

            if !self.write_buffer.is_empty() {
                self.stream.write_all(&self.write_buffer).await?;
                self.stream.flush().await?;
                self.write_buffer.clear();
            }
        }
    }
}
