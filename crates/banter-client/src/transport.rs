//! WebSocket transport for the client.
//!
//! Provides [`ConnectedSocket`] which handles WebSocket I/O for event
//! transport. This is a thin layer that just sends/receives events -
//! protocol logic remains in the Sans-IO [`crate::Connection`].
//!
//! The embedder wires the two together: events read from `from_server` go
//! into [`crate::Connection::handle_event`], and events drained from
//! [`crate::Connection::take_outgoing`] go into `to_server`. When
//! `from_server` yields `None` the socket is gone and the embedder reports
//! [`crate::Connection::handle_close`].

use banter_proto::Event;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Handle to a live WebSocket with event channels.
///
/// Provides channels for event transport. Events are sent/received via
/// the channels, and an internal task handles the WebSocket I/O.
pub struct ConnectedSocket {
    /// Send events to the server.
    pub to_server: mpsc::Sender<Event>,
    /// Receive events from the server.
    pub from_server: mpsc::Receiver<Event>,
    /// Abort handle to stop the socket task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedSocket {
    /// Stop the socket task.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Connect to a messaging endpoint via WebSocket.
///
/// Returns a [`ConnectedSocket`] with channels for event transport.
pub async fn connect(url: &str) -> Result<ConnectedSocket, TransportError> {
    let (socket, _response) = connect_async(url)
        .await
        .map_err(|e| TransportError::Connection(format!("connect failed: {e}")))?;

    let (to_server_tx, to_server_rx) = mpsc::channel::<Event>(32);
    let (from_server_tx, from_server_rx) = mpsc::channel::<Event>(32);

    // Spawn socket handler
    let handle = tokio::spawn(run_socket(socket, to_server_rx, from_server_tx));

    Ok(ConnectedSocket {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Run the socket, bridging between channels and the WebSocket.
///
/// Ends when either side goes away: the server closes or errors, or the
/// embedder drops `to_server` (which sends a Close frame first).
async fn run_socket(
    socket: Socket,
    mut to_server: mpsc::Receiver<Event>,
    from_server: mpsc::Sender<Event>,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outgoing = to_server.recv() => match outgoing {
                Some(event) => {
                    if let Err(error) = send_event(&mut sink, &event).await {
                        tracing::warn!(%error, "send failed");
                        break;
                    }
                },
                None => {
                    // Embedder hung up; close the socket politely.
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                },
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => match Event::decode(text.as_str()) {
                    Ok(event) => {
                        if from_server.send(event).await.is_err() {
                            break;
                        }
                    },
                    Err(error) => {
                        tracing::warn!(%error, "dropping undecodable inbound event");
                    },
                },
                Some(Ok(Message::Binary(_))) => {
                    tracing::warn!("dropping unexpected binary frame");
                },
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {},
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(error)) => {
                    tracing::warn!(%error, "socket read failed");
                    break;
                },
            },
        }
    }
}

/// Send an event on the socket.
async fn send_event(
    sink: &mut SplitSink<Socket, Message>,
    event: &Event,
) -> Result<(), TransportError> {
    let text =
        event.encode().map_err(|e| TransportError::Protocol(format!("encode failed: {e}")))?;

    sink.send(Message::text(text))
        .await
        .map_err(|e| TransportError::Stream(format!("write failed: {e}")))?;

    Ok(())
}
