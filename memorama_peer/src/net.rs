use log::{debug, info, warn};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpListener, TcpStream,
    },
};

use memorama_core::message::PeerMessage;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Point-to-point link carrying one JSON message per line. One side listens,
/// the other dials; the listener stops accepting once its single peer is in.
pub struct Connection {
    reader: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Connection {
    pub async fn listen(port: u16) -> Result<Self, NetError> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        let (stream, peer) = listener.accept().await?;
        info!("peer connected from {peer}");
        Ok(Self::from_stream(stream))
    }

    pub async fn dial(addr: &str) -> Result<Self, NetError> {
        let stream = TcpStream::connect(addr).await?;
        info!("connected to {addr}");
        Ok(Self::from_stream(stream))
    }

    fn from_stream(stream: TcpStream) -> Self {
        let (read, writer) = stream.into_split();
        Connection {
            reader: BufReader::new(read).lines(),
            writer,
        }
    }

    /// Next decoded message. Undecodable lines are logged and dropped, never
    /// answered. `None` means the peer hung up.
    pub async fn recv(&mut self) -> Result<Option<PeerMessage>, NetError> {
        while let Some(line) = self.reader.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match PeerMessage::decode(&line) {
                Ok(msg) => {
                    debug!("recv {msg:?}");
                    return Ok(Some(msg));
                }
                Err(e) => warn!("dropping undecodable line {line:?}: {e}"),
            }
        }
        Ok(None)
    }

    pub async fn send(&mut self, msg: &PeerMessage) -> Result<(), NetError> {
        let mut line = msg.encode()?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        debug!("sent {msg:?}");
        Ok(())
    }
}
