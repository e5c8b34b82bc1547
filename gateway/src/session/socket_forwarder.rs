use std::time::Duration;
use tokio::{
    net::TcpStream,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    time,
};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub type SessionStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Owns the websocket stream, forwarding frames between it and the session's
/// channels.
///
/// The session reads inbound frames from one channel and every writer task
/// pushes outbound frames onto the other, so no task ever holds the stream.
pub struct SocketForwarder {
    rx: UnboundedReceiver<Message>,
    stream: SessionStream,
    tx: UnboundedSender<Message>,
}

impl SocketForwarder {
    /// Reads going silent for this long closes the connection.
    const TIMEOUT: Duration = Duration::from_secs(90);

    pub fn new(
        stream: SessionStream,
    ) -> (Self, UnboundedReceiver<Message>, UnboundedSender<Message>) {
        let (to_user, from_forwarder) = mpsc::unbounded_channel();
        let (to_forwarder, from_user) = mpsc::unbounded_channel();

        (
            Self {
                rx: from_user,
                stream,
                tx: to_user,
            },
            from_forwarder,
            to_forwarder,
        )
    }

    pub async fn run(mut self) {
        use futures_util::{SinkExt, StreamExt};

        #[cfg(feature = "tracing")]
        tracing::debug!("starting driving loop");

        loop {
            tokio::select! {
                maybe_msg = self.rx.recv() => {
                    match maybe_msg {
                        Some(msg) => {
                            if let Err(_err) = self.stream.send(msg).await {
                                #[cfg(feature = "tracing")]
                                tracing::warn!("sending failed: {_err}");

                                break;
                            }
                        }
                        None => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!("writer channel ended, closing socket");

                            let _res = self.stream.close(None).await;

                            break;
                        }
                    }
                }
                try_msg = time::timeout(Self::TIMEOUT, self.stream.next()) => {
                    match try_msg {
                        Ok(Some(Ok(msg))) => {
                            if self.tx.send(msg).is_err() {
                                break;
                            }
                        }
                        Ok(Some(Err(_err))) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!("socket errored: {_err}");

                            break;
                        }
                        Ok(None) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!("socket ended");

                            break;
                        }
                        Err(_elapsed) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!("socket timed out");

                            break;
                        }
                    }
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("leaving loop");
    }
}
