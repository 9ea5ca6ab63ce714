//! Discord gateway (v10) client: HELLO, IDENTIFY / RESUME, heartbeats and
//! reconnects. Dispatch events are fanned out over a broadcast channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::{frame::coding::CloseCode, CloseFrame};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::{DiscordError, Result};

pub const DEFAULT_GATEWAY: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// Gateway opcodes.
pub mod op {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RESUME: u8 = 6;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Gateway intent bits.
pub mod intents {
    pub const GUILD_MESSAGES: u64 = 1 << 9;
    pub const GUILD_MESSAGE_REACTIONS: u64 = 1 << 10;
    pub const MESSAGE_CONTENT: u64 = 1 << 15;

    /// What the moderation bot needs: reactions plus the reacted message's content.
    pub const MODERATION: u64 = GUILD_MESSAGES | GUILD_MESSAGE_REACTIONS | MESSAGE_CONTENT;
}

/// Consecutive failed connections before the client gives up.
const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Pseudo-event sent to subscribers once the client has given up reconnecting.
pub const CLOSED_EVENT: &str = "GATEWAY_CLOSED";

/// A raw gateway event.
#[derive(Debug, Clone)]
pub struct GatewayEvent {
    pub event: Option<String>,
    pub data: Value,
}

#[derive(Debug, Default)]
struct Session {
    id: Option<String>,
    seq: Option<u64>,
    /// Host handed out in READY; resumes must connect there.
    resume_url: Option<String>,
}

/// Async gateway client with auto-reconnect and heartbeat.
///
/// ```rust,no_run
/// use gw2style_discord::gateway::GatewayClient;
///
/// #[tokio::main]
/// async fn main() {
///     let gw = GatewayClient::new("mytoken", None);
///     let mut events = gw.subscribe();
///     gw.connect();  // spawns background task, returns immediately
///     while let Ok(event) = events.recv().await {
///         if let Some(name) = &event.event {
///             println!("{name}: {:?}", event.data);
///         }
///     }
/// }
/// ```
pub struct GatewayClient {
    token: String,
    gateway_url: String,
    sender: broadcast::Sender<GatewayEvent>,
    session: Arc<Mutex<Session>>,
}

impl GatewayClient {
    pub fn new(token: impl Into<String>, gateway_url: Option<&str>) -> Self {
        let token = {
            let t = token.into();
            t.strip_prefix("Bot ").map(str::to_owned).unwrap_or(t)
        };
        let (sender, _) = broadcast::channel(256);
        Self {
            token,
            gateway_url: gateway_url.unwrap_or(DEFAULT_GATEWAY).to_owned(),
            sender,
            session: Arc::new(Mutex::new(Session::default())),
        }
    }

    /// Subscribe to broadcast gateway events.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.sender.subscribe()
    }

    /// Spawns a background task that maintains the gateway connection.
    /// Returns immediately; use [`GatewayClient::subscribe`] to receive events.
    pub fn connect(&self) -> JoinHandle<()> {
        let conn = Connection {
            token: self.token.clone(),
            url: self.gateway_url.clone(),
            tx: self.sender.clone(),
            session: Arc::clone(&self.session),
        };

        tokio::spawn(async move {
            let mut attempts = 0u32;
            loop {
                match conn.run_once().await {
                    Ok(()) => {
                        attempts = 0;
                    }
                    Err(DiscordError::GatewayClosed { code, reason }) if is_fatal_close(code) => {
                        error!(code, %reason, "Gateway: closed with a non-recoverable code");
                        break;
                    }
                    Err(e) => {
                        attempts += 1;
                        if attempts > MAX_RECONNECT_ATTEMPTS {
                            error!("Gateway: max reconnect attempts reached: {e}");
                            break;
                        }
                        let delay = Duration::from_secs(u64::min(2u64.pow(attempts), 30));
                        warn!("Gateway: disconnected ({e}), reconnecting in {delay:?} (attempt {attempts})");
                        let _ = conn.tx.send(GatewayEvent {
                            event: Some("RECONNECTING".into()),
                            data: json!({ "attempt": attempts }),
                        });
                        sleep(delay).await;
                    }
                }
            }
            let _ = conn.tx.send(GatewayEvent {
                event: Some(CLOSED_EVENT.into()),
                data: Value::Null,
            });
        })
    }
}

/// Authentication failures and bad intents will never succeed on retry.
fn is_fatal_close(code: u16) -> bool {
    matches!(code, 4004 | 4010 | 4011 | 4012 | 4013 | 4014)
}

/// READY's resume host comes without the version and encoding query, so
/// the one from the configured URL is carried over.
fn resume_target(resume_url: &str, gateway_url: &str) -> String {
    if resume_url.contains('?') {
        return resume_url.to_owned();
    }
    match gateway_url.split_once('?') {
        Some((_, query)) => format!("{}/?{query}", resume_url.trim_end_matches('/')),
        None => resume_url.to_owned(),
    }
}

struct Connection {
    token: String,
    url: String,
    tx: broadcast::Sender<GatewayEvent>,
    session: Arc<Mutex<Session>>,
}

impl Connection {
    fn identify_payload(&self) -> Value {
        json!({
            "op": op::IDENTIFY,
            "d": {
                "token": self.token,
                "intents": intents::MODERATION,
                "properties": { "os": std::env::consts::OS, "browser": "gw2style", "device": "gw2style" }
            }
        })
    }

    async fn run_once(&self) -> Result<()> {
        let url = {
            let session = self.session.lock().await;
            match (&session.id, session.seq, &session.resume_url) {
                (Some(_), Some(_), Some(resume)) => resume_target(resume, &self.url),
                _ => self.url.clone(),
            }
        };
        let (ws, _) = connect_async(url.as_str()).await?;
        let (sink, mut stream) = ws.split();

        // HELLO comes first and sets the heartbeat cadence.
        let hb_interval = loop {
            let Some(msg) = stream.next().await else {
                return Err(DiscordError::Other("gateway closed before HELLO".into()));
            };
            if let Message::Text(t) = msg? {
                let payload: Value = serde_json::from_str(t.as_str())?;
                if payload["op"].as_u64() == Some(u64::from(op::HELLO)) {
                    let ms = payload["d"]["heartbeat_interval"].as_u64().unwrap_or(41_250);
                    break Duration::from_millis(ms);
                }
            }
        };
        debug!(interval_ms = hb_interval.as_millis() as u64, "Gateway: hello");

        // Identify or resume
        let handshake = {
            let session = self.session.lock().await;
            match (&session.id, session.seq) {
                (Some(sid), Some(s)) => {
                    info!("Gateway: resuming session");
                    json!({ "op": op::RESUME, "d": { "token": self.token, "session_id": sid, "seq": s } })
                }
                _ => self.identify_payload(),
            }
        };

        let sink = Arc::new(Mutex::new(sink));
        sink.lock().await.send(Message::Text(handshake.to_string().into())).await?;

        // Heartbeat task. A beat still unacknowledged when the next one is due
        // means the connection is dead; the task closes it and exits.
        let acked = Arc::new(AtomicBool::new(true));
        let acked_hb = Arc::clone(&acked);
        let sink_hb = Arc::clone(&sink);
        let session_hb = Arc::clone(&self.session);
        let mut hb_task = tokio::spawn(async move {
            loop {
                sleep(hb_interval).await;
                if !acked_hb.swap(false, Ordering::AcqRel) {
                    warn!("Gateway: heartbeat not acknowledged, dropping connection");
                    let frame = CloseFrame {
                        code: CloseCode::from(4000),
                        reason: "heartbeat not acknowledged".into(),
                    };
                    let _ = sink_hb.lock().await.send(Message::Close(Some(frame))).await;
                    return "heartbeat not acknowledged";
                }
                let seq_val = session_hb.lock().await.seq;
                let msg = json!({ "op": op::HEARTBEAT, "d": seq_val }).to_string();
                if sink_hb.lock().await.send(Message::Text(msg.into())).await.is_err() {
                    return "heartbeat send failed";
                }
            }
        });

        let result = async {
            loop {
                let next = tokio::select! {
                    next = stream.next() => next,
                    stopped = &mut hb_task => {
                        let reason = stopped.unwrap_or("heartbeat task ended");
                        return Err(DiscordError::Other(reason.into()));
                    }
                };
                let Some(msg) = next else { break };
                let text = match msg? {
                    Message::Text(t) => t.as_str().to_owned(),
                    Message::Close(frame) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.to_string()))
                            .unwrap_or((1000, String::new()));
                        return Err(DiscordError::GatewayClosed { code, reason });
                    }
                    _ => continue,
                };
                let payload: Value = serde_json::from_str(&text)?;
                let op_code = payload["op"].as_u64().unwrap_or(255) as u8;
                let data = payload.get("d").cloned().unwrap_or(Value::Null);
                let event_name = payload.get("t").and_then(|v| v.as_str()).map(str::to_owned);
                if let Some(s) = payload.get("s").and_then(|v| v.as_u64()) {
                    self.session.lock().await.seq = Some(s);
                }

                match op_code {
                    op::DISPATCH => {
                        if event_name.as_deref() == Some("READY") {
                            let mut session = self.session.lock().await;
                            if let Some(sid) = data.get("session_id").and_then(|v| v.as_str()) {
                                session.id = Some(sid.to_owned());
                            }
                            session.resume_url = data
                                .get("resume_gateway_url")
                                .and_then(|v| v.as_str())
                                .map(str::to_owned);
                            info!("Gateway: ready");
                        }
                        let _ = self.tx.send(GatewayEvent { event: event_name, data });
                    }
                    op::HEARTBEAT => {
                        let s = self.session.lock().await.seq;
                        let msg = json!({ "op": op::HEARTBEAT, "d": s }).to_string();
                        sink.lock().await.send(Message::Text(msg.into())).await?;
                    }
                    op::RECONNECT => {
                        info!("Gateway: server requested reconnect");
                        return Ok(());
                    }
                    op::INVALID_SESSION => {
                        let resumable = data.as_bool().unwrap_or(false);
                        warn!(resumable, "Gateway: invalid session");
                        if !resumable {
                            *self.session.lock().await = Session::default();
                        }
                        sleep(Duration::from_secs(2)).await;
                        return Ok(());
                    }
                    op::HEARTBEAT_ACK => {
                        acked.store(true, Ordering::Release);
                        debug!("Gateway: heartbeat ack");
                    }
                    _ => {}
                }
            }
            Err::<(), DiscordError>(DiscordError::Other("gateway stream ended".into()))
        }
        .await;

        hb_task.abort();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// A one-shot fake gateway: HELLO, expect IDENTIFY, then READY and one reaction.
    async fn fake_gateway() -> (String, tokio::sync::oneshot::Receiver<Value>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (identify_tx, identify_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let hello = json!({ "op": 10, "d": { "heartbeat_interval": 60_000 } });
            ws.send(Message::Text(hello.to_string().into())).await.unwrap();

            let identify = loop {
                if let Some(Ok(Message::Text(t))) = ws.next().await {
                    break serde_json::from_str::<Value>(t.as_str()).unwrap();
                }
            };
            identify_tx.send(identify).unwrap();

            let ready = json!({
                "op": 0, "s": 1, "t": "READY",
                "d": { "session_id": "abc", "user": { "id": "999", "username": "gw2style-bot" } }
            });
            ws.send(Message::Text(ready.to_string().into())).await.unwrap();
            let reaction = json!({
                "op": 0, "s": 2, "t": "MESSAGE_REACTION_ADD",
                "d": { "user_id": "1", "channel_id": "2", "message_id": "3", "emoji": { "id": null, "name": "✅" } }
            });
            ws.send(Message::Text(reaction.to_string().into())).await.unwrap();

            // Keep the socket open until the client goes away.
            while ws.next().await.is_some() {}
        });

        (format!("ws://{addr}"), identify_rx)
    }

    #[tokio::test]
    async fn identifies_and_broadcasts_dispatches() {
        let (url, identify_rx) = fake_gateway().await;
        let gw = GatewayClient::new("Bot sekrit", Some(&url));
        let mut events = gw.subscribe();
        let handle = gw.connect();

        let identify = identify_rx.await.unwrap();
        assert_eq!(identify["op"], 2);
        assert_eq!(identify["d"]["token"], "sekrit");
        assert_eq!(identify["d"]["intents"], intents::MODERATION);

        let ready = events.recv().await.unwrap();
        assert_eq!(ready.event.as_deref(), Some("READY"));
        let reaction = events.recv().await.unwrap();
        assert_eq!(reaction.event.as_deref(), Some("MESSAGE_REACTION_ADD"));
        assert_eq!(reaction.data["emoji"]["name"], "✅");

        assert_eq!(gw.session.lock().await.id.as_deref(), Some("abc"));
        assert_eq!(gw.session.lock().await.seq, Some(2));
        handle.abort();
    }

    /// Reads text frames until one arrives and returns it parsed.
    async fn first_text<S>(ws: &mut tokio_tungstenite::WebSocketStream<S>) -> Value
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        loop {
            if let Some(Ok(Message::Text(t))) = ws.next().await {
                break serde_json::from_str(t.as_str()).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn unacknowledged_heartbeat_reconnects_and_resumes_at_ready_host() {
        use std::sync::atomic::AtomicUsize;

        let resume_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let resume_url = format!("ws://{}", resume_listener.local_addr().unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let beats = Arc::new(AtomicUsize::new(0));

        // Original host: hands out a session, then swallows heartbeats without ever sending op 11.
        let beats_srv = Arc::clone(&beats);
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let hello = json!({ "op": 10, "d": { "heartbeat_interval": 50 } });
            ws.send(Message::Text(hello.to_string().into())).await.unwrap();
            first_text(&mut ws).await;

            let ready = json!({
                "op": 0, "s": 1, "t": "READY",
                "d": {
                    "session_id": "silent",
                    "resume_gateway_url": resume_url,
                    "user": { "id": "999", "username": "gw2style-bot" }
                }
            });
            ws.send(Message::Text(ready.to_string().into())).await.unwrap();

            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Text(t) = msg {
                    if serde_json::from_str::<Value>(t.as_str()).unwrap()["op"] == 1 {
                        beats_srv.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        });

        // Resume host: reports the first frame the client sends.
        let (resume_tx, resume_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let (stream, _) = resume_listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let hello = json!({ "op": 10, "d": { "heartbeat_interval": 60_000 } });
            ws.send(Message::Text(hello.to_string().into())).await.unwrap();
            resume_tx.send(first_text(&mut ws).await).unwrap();
            while ws.next().await.is_some() {}
        });

        let gw = GatewayClient::new("sekrit", Some(&format!("ws://{addr}")));
        let mut events = gw.subscribe();
        let handle = gw.connect();

        let resume = tokio::time::timeout(Duration::from_secs(10), resume_rx)
            .await
            .expect("client kept the silent connection")
            .unwrap();
        assert_eq!(resume["op"], 6);
        assert_eq!(resume["d"]["token"], "sekrit");
        assert_eq!(resume["d"]["session_id"], "silent");
        assert_eq!(resume["d"]["seq"], 1);

        // One beat went unanswered, the next was never sent.
        assert_eq!(beats.load(Ordering::SeqCst), 1);

        let ready = events.recv().await.unwrap();
        assert_eq!(ready.event.as_deref(), Some("READY"));
        let reconnecting = events.recv().await.unwrap();
        assert_eq!(reconnecting.event.as_deref(), Some("RECONNECTING"));
        handle.abort();
    }

    #[test]
    fn resume_host_keeps_the_configured_query() {
        assert_eq!(
            resume_target("wss://gateway-us-east1-b.discord.gg", DEFAULT_GATEWAY),
            "wss://gateway-us-east1-b.discord.gg/?v=10&encoding=json"
        );
        assert_eq!(
            resume_target("wss://resume.example/?v=10", DEFAULT_GATEWAY),
            "wss://resume.example/?v=10"
        );
        assert_eq!(resume_target("ws://127.0.0.1:9", "ws://127.0.0.1:8"), "ws://127.0.0.1:9");
    }

    #[test]
    fn moderation_intents() {
        assert_eq!(intents::MODERATION, 512 | 1024 | 32768);
        assert!(is_fatal_close(4004));
        assert!(!is_fatal_close(1001));
    }
}
