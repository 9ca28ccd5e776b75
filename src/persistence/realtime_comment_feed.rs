use crate::domain;
use crate::domain::comment::{CommentChange, CommentSubscription};
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, Error, anyhow, bail};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, interval_at};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{Instrument, debug, debug_span, warn};
use url::Url;
use uuid::Uuid;

/// The backend drops sockets that stay silent for longer than this
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
/// Changes waiting for the subscriber before the socket stops reading
const CHANGE_BUFFER: usize = 16;
const CHANNEL_TOPIC: &str = "realtime:comments_channel";

type RealtimeSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Builds the websocket URL of the backend's realtime endpoint
fn realtime_url(backend_url: &Url, api_key: &str) -> Result<Url, Error> {
    let mut socket_url = backend_url
        .join("realtime/v1/websocket")
        .context("building the realtime URL")?;
    let scheme = match socket_url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => bail!("backend scheme {other} has no websocket counterpart"),
    };
    socket_url
        .set_scheme(scheme)
        .map_err(|_| anyhow!("could not switch realtime URL to {scheme}"))?;
    socket_url
        .query_pairs_mut()
        .append_pair("apikey", api_key)
        .append_pair("vsn", "1.0.0");

    Ok(socket_url)
}

fn join_message(task_id: Uuid, access_token: &str) -> Value {
    json!({
        "topic": CHANNEL_TOPIC,
        "event": "phx_join",
        "payload": {
            "config": {
                "broadcast": { "ack": false, "self": false },
                "presence": { "key": "" },
                "postgres_changes": [{
                    "event": "*",
                    "schema": "public",
                    "table": "comments",
                    "filter": format!("todo_id=eq.{task_id}"),
                }],
            },
            "access_token": access_token,
        },
        "ref": "1",
    })
}

fn heartbeat_message(message_ref: u64) -> Value {
    json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": message_ref.to_string(),
    })
}

fn leave_message(message_ref: u64) -> Value {
    json!({
        "topic": CHANNEL_TOPIC,
        "event": "phx_leave",
        "payload": {},
        "ref": message_ref.to_string(),
    })
}

#[derive(Deserialize)]
struct PhoenixMessage {
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(PartialEq, Eq, Debug)]
enum Incoming {
    Change(CommentChange),
    /// The channel could not be joined or was shut down by the server
    ChannelClosed(String),
    Ignored,
}

fn interpret(text: &str) -> Incoming {
    let Ok(message) = serde_json::from_str::<PhoenixMessage>(text) else {
        return Incoming::Ignored;
    };
    let status = message.payload.get("status").and_then(Value::as_str);

    match message.event.as_str() {
        "postgres_changes" => {
            let change_type = message
                .payload
                .pointer("/data/type")
                .and_then(Value::as_str);
            match change_type {
                Some("INSERT") => Incoming::Change(CommentChange::Inserted),
                Some("UPDATE") => Incoming::Change(CommentChange::Updated),
                Some("DELETE") => Incoming::Change(CommentChange::Deleted),
                _ => Incoming::Ignored,
            }
        }
        "phx_reply" | "system" if status == Some("error") => {
            let reason = message
                .payload
                .pointer("/response/reason")
                .or_else(|| message.payload.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unknown reason");
            Incoming::ChannelClosed(reason.to_owned())
        }
        closing @ ("phx_error" | "phx_close") => Incoming::ChannelClosed(closing.to_owned()),
        _ => Incoming::Ignored,
    }
}

/// Owns the socket for one subscription: keeps it alive, forwards changes, and leaves the channel
/// once the subscriber lets go
async fn pump_changes(
    mut socket: RealtimeSocket,
    changes: mpsc::Sender<CommentChange>,
    mut release: oneshot::Receiver<()>,
) {
    let mut heartbeat = interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);
    let mut message_ref: u64 = 1;

    loop {
        tokio::select! {
            _ = &mut release => break,
            _ = heartbeat.tick() => {
                message_ref += 1;
                let sent = socket
                    .send(Message::Text(heartbeat_message(message_ref).to_string()))
                    .await;
                if let Err(send_err) = sent {
                    warn!("Realtime heartbeat failed, dropping the feed: {send_err}");
                    return;
                }
            }
            incoming = socket.next() => match incoming {
                Some(Ok(Message::Text(text))) => match interpret(&text) {
                    Incoming::Change(change) => {
                        if changes.send(change).await.is_err() {
                            break;
                        }
                    }
                    Incoming::ChannelClosed(reason) => {
                        warn!("Realtime channel closed: {reason}");
                        break;
                    }
                    Incoming::Ignored => {}
                },
                Some(Ok(Message::Close(_))) | None => {
                    debug!("Realtime socket closed by the backend");
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(read_err)) => {
                    warn!("Realtime socket failed: {read_err}");
                    return;
                }
            },
        }
    }

    message_ref += 1;
    let left = socket
        .send(Message::Text(leave_message(message_ref).to_string()))
        .await;
    if let Err(leave_err) = left {
        debug!("Could not leave the realtime channel: {leave_err}");
    }
    if let Err(close_err) = socket.close(None).await {
        debug!("Could not close the realtime socket: {close_err}");
    }
    debug!("Realtime subscription released");
}

/// Change feed backed by the backend's realtime websocket. Every subscription gets its own socket.
pub struct RealtimeCommentFeed;

impl domain::comment::driven_ports::CommentChangeFeed for RealtimeCommentFeed {
    async fn subscribe(
        &self,
        task_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<CommentSubscription, Error> {
        let socket_url = realtime_url(ext_cxn.backend_url(), ext_cxn.api_key())?;
        let (mut socket, _) = connect_async(socket_url.as_str())
            .await
            .context("connecting to the realtime socket")?;
        socket
            .send(Message::Text(
                join_message(task_id, ext_cxn.bearer_token()).to_string(),
            ))
            .await
            .context("joining the comment channel")?;

        let (change_sender, change_receiver) = mpsc::channel(CHANGE_BUFFER);
        let (release_sender, release_receiver) = oneshot::channel();
        tokio::spawn(
            pump_changes(socket, change_sender, release_receiver)
                .instrument(debug_span!("comment_feed", %task_id)),
        );

        Ok(CommentSubscription::new(change_receiver, release_sender))
    }
}
