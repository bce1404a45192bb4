// WebSocket server: accepts board clients and relays their requests to the
// application loop, writing each reply back on the same connection.

use std::fmt::Display;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Events emitted by the WebSocket server to the application layer.
#[derive(Debug)]
pub enum WsEvent {
    /// A client completed the WebSocket handshake.
    Connected { addr: String },
    /// A client's connection ended.
    Disconnected { addr: String },
    /// A text frame from a client. The application answers through `reply`.
    Request {
        addr: String,
        text: String,
        reply: oneshot::Sender<String>,
    },
}

/// Bind the server's TCP listener on `127.0.0.1:{port}`. Port 0 picks a free
/// port.
pub async fn bind(port: u16) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    info!("WebSocket server listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accept connections forever, serving each on its own task. Returns once the
/// application side of `tx` has gone away.
pub async fn run(listener: TcpListener, tx: mpsc::Sender<WsEvent>) -> anyhow::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        if tx.is_closed() {
            break;
        }
        let addr_str = addr.to_string();
        info!("Accepted TCP connection from {addr_str}");
        tokio::spawn(serve_connection(stream, addr_str, tx.clone()));
    }

    Ok(())
}

async fn serve_connection(stream: TcpStream, addr: String, tx: mpsc::Sender<WsEvent>) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed for {addr}: {e}");
            return;
        }
    };

    if tx
        .send(WsEvent::Connected { addr: addr.clone() })
        .await
        .is_err()
    {
        return;
    }

    let (write, read) = ws_stream.split();
    if process_message_stream(read, write, &tx, &addr).await.is_err() {
        return;
    }

    let _ = tx.send(WsEvent::Disconnected { addr }).await;
}

/// Relay text frames from `stream` to the application and write each reply
/// to `sink`, one request at a time. Returns `Err(())` if the application
/// channel is closed, signalling the caller to stop.
///
/// This is generic over the stream and sink so it can be tested with
/// in-memory values without opening TCP ports.
pub async fn process_message_stream<St, Si>(
    mut stream: St,
    mut sink: Si,
    tx: &mpsc::Sender<WsEvent>,
    addr: &str,
) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let (reply_tx, reply_rx) = oneshot::channel();
                let event = WsEvent::Request {
                    addr: addr.to_string(),
                    text: text.to_string(),
                    reply: reply_tx,
                };
                if tx.send(event).await.is_err() {
                    return Err(());
                }

                let reply = match reply_rx.await {
                    Ok(reply) => reply,
                    Err(_) => {
                        debug!("Request from {addr} was dropped without a reply");
                        return Err(());
                    }
                };

                if let Err(e) = sink.send(Message::Text(reply.into())).await {
                    warn!("Failed to send reply to {addr}: {e}");
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {addr} sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error from {addr}: {e}");
                break;
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
    Ok(())
}
