use crate::config::GatewayConfig;
use crate::core::dispatch::{GatewayDispatch, OpCode};
use crate::domain::ports::RestClient;
use crate::utils::error::{PincerError, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Gateway intent bits.
pub struct Intents;

impl Intents {
    pub const NONE: u32 = 0;
    pub const GUILDS: u32 = 1 << 0;
    pub const GUILD_MEMBERS: u32 = 1 << 1;
    pub const GUILD_BANS: u32 = 1 << 2;
    pub const GUILD_EMOJIS_AND_STICKERS: u32 = 1 << 3;
    pub const GUILD_INTEGRATIONS: u32 = 1 << 4;
    pub const GUILD_WEBHOOKS: u32 = 1 << 5;
    pub const GUILD_INVITES: u32 = 1 << 6;
    pub const GUILD_VOICE_STATES: u32 = 1 << 7;
    pub const GUILD_PRESENCES: u32 = 1 << 8;
    pub const GUILD_MESSAGES: u32 = 1 << 9;
    pub const GUILD_MESSAGE_REACTIONS: u32 = 1 << 10;
    pub const GUILD_MESSAGE_TYPING: u32 = 1 << 11;
    pub const DIRECT_MESSAGES: u32 = 1 << 12;
    pub const DIRECT_MESSAGE_REACTIONS: u32 = 1 << 13;
    pub const DIRECT_MESSAGE_TYPING: u32 = 1 << 14;
    pub const MESSAGE_CONTENT: u32 = 1 << 15;
}

/// Close codes after which reconnecting cannot succeed.
pub fn is_fatal_close_code(code: u16) -> bool {
    matches!(code, 4004 | 4010..=4014)
}

/// How one websocket session ended.
#[derive(Debug)]
enum SessionEnd {
    Reconnect { resume: bool },
    Stopped,
    Fatal(PincerError),
}

/// A single gateway connection with reconnect/resume handling.
///
/// Every DISPATCH frame is forwarded unchanged on the channel given to
/// [`Gateway::run`]; the gateway itself only interprets READY.
#[derive(Debug)]
pub struct Gateway {
    url: String,
    token: String,
    intents: u32,
    version: u8,
    reconnect_delay: Duration,
    session_id: Option<String>,
    resume_url: Option<String>,
    seq: Arc<Mutex<Option<u64>>>,
}

impl Gateway {
    pub fn new(url: impl Into<String>, token: impl Into<String>, intents: u32) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            intents,
            version: GatewayConfig::VERSION,
            reconnect_delay: Duration::from_secs(GatewayConfig::RECONNECT_DELAY_SECS),
            session_id: None,
            resume_url: None,
            seq: Arc::new(Mutex::new(None)),
        }
    }

    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// `GET gateway/bot` → the websocket URL to connect to.
    pub async fn fetch_url(http: &dyn RestClient) -> Result<String> {
        let body = http.get("gateway/bot", None).await?.unwrap_or(Value::Null);
        body.get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PincerError::GatewayError {
                message: "gateway/bot response has no url".to_string(),
            })
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn seq(&self) -> Option<u64> {
        self.seq.lock().ok().and_then(|s| *s)
    }

    /// Runs until the receiving side of `events` is dropped or Discord closes
    /// with a fatal code.
    pub async fn run(&mut self, events: mpsc::UnboundedSender<GatewayDispatch>) -> Result<()> {
        let mut resume = false;

        loop {
            let base = match (&self.resume_url, resume) {
                (Some(url), true) => url.clone(),
                _ => self.url.clone(),
            };
            let url = format!(
                "{}/?v={}&encoding=json",
                base.trim_end_matches('/'),
                self.version
            );

            tracing::info!("🔌 Connecting to gateway {}", base);

            match self.session(&url, resume, &events).await {
                Ok(SessionEnd::Reconnect { resume: r }) => {
                    tracing::info!("🔁 Gateway asked to reconnect (resume: {})", r);
                    resume = r;
                }
                Ok(SessionEnd::Stopped) => {
                    tracing::info!("Gateway event receiver closed, stopping");
                    return Ok(());
                }
                Ok(SessionEnd::Fatal(err)) => {
                    tracing::error!("❌ Gateway closed: {}", err);
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(
                        "⚠️ Gateway connection error: {}, reconnecting in {:?}",
                        err,
                        self.reconnect_delay
                    );
                    tokio::time::sleep(self.reconnect_delay).await;
                    resume = self.session_id.is_some();
                }
            }
        }
    }

    async fn session(
        &mut self,
        url: &str,
        resume: bool,
        events: &mpsc::UnboundedSender<GatewayDispatch>,
    ) -> Result<SessionEnd> {
        let (ws, _) = connect_async(url).await?;
        let (mut write, mut read) = ws.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let writer = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if write.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let mut heartbeat: Option<JoinHandle<()>> = None;
        let result = self
            .read_loop(&mut read, &out_tx, &mut heartbeat, resume, events)
            .await;

        if let Some(task) = heartbeat {
            task.abort();
        }
        drop(out_tx);
        writer.abort();

        result
    }

    async fn read_loop<S>(
        &mut self,
        read: &mut S,
        out: &mpsc::UnboundedSender<Message>,
        heartbeat: &mut Option<JoinHandle<()>>,
        resume: bool,
        events: &mpsc::UnboundedSender<GatewayDispatch>,
    ) -> Result<SessionEnd>
    where
        S: futures_util::Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
            + Unpin,
    {
        while let Some(msg) = read.next().await {
            let text = match msg? {
                Message::Text(text) => text,
                Message::Close(frame) => {
                    let code = frame.map(|f| u16::from(f.code));
                    return match code {
                        Some(code) if is_fatal_close_code(code) => {
                            Ok(SessionEnd::Fatal(PincerError::GatewayError {
                                message: format!("closed with fatal code {}", code),
                            }))
                        }
                        _ => Err(PincerError::GatewayError {
                            message: format!("closed with code {:?}", code),
                        }),
                    };
                }
                _ => continue,
            };

            let dispatch = match GatewayDispatch::from_text(text.as_str()) {
                Ok(dispatch) => dispatch,
                Err(err) => {
                    tracing::warn!("Ignoring unparsable gateway frame: {}", err);
                    continue;
                }
            };

            match dispatch.op {
                OpCode::Hello => {
                    let interval = heartbeat_interval(&dispatch.d);
                    tracing::debug!("💓 Heartbeat interval {} ms", interval);

                    if let Some(task) = heartbeat.take() {
                        task.abort();
                    }
                    *heartbeat = Some(self.spawn_heartbeat(Duration::from_millis(interval), out.clone()));

                    let hello_reply = match (&self.session_id, resume) {
                        (Some(session_id), true) => self.resume_frame(session_id),
                        _ => self.identify_frame(),
                    };
                    send(out, hello_reply)?;
                }
                OpCode::Dispatch => {
                    if let Some(s) = dispatch.s {
                        if let Ok(mut seq) = self.seq.lock() {
                            *seq = Some(s);
                        }
                    }

                    if dispatch.event_name() == Some("READY") {
                        self.session_id = dispatch.d["session_id"].as_str().map(str::to_string);
                        self.resume_url = dispatch.d["resume_gateway_url"]
                            .as_str()
                            .map(str::to_string);
                        tracing::info!("✅ Gateway session {:?} ready", self.session_id);
                    }

                    if events.send(dispatch).is_err() {
                        return Ok(SessionEnd::Stopped);
                    }
                }
                OpCode::Heartbeat => {
                    send(out, heartbeat_frame(&self.seq))?;
                }
                OpCode::Reconnect => {
                    return Ok(SessionEnd::Reconnect { resume: true });
                }
                OpCode::InvalidSession => {
                    let resumable = dispatch.d.as_bool().unwrap_or(false);
                    if !resumable {
                        self.session_id = None;
                        self.resume_url = None;
                        if let Ok(mut seq) = self.seq.lock() {
                            *seq = None;
                        }
                    }
                    return Ok(SessionEnd::Reconnect { resume: resumable });
                }
                OpCode::HeartbeatAck => {
                    tracing::trace!("heartbeat acknowledged");
                }
                other => {
                    tracing::debug!("Unhandled gateway opcode {:?}", other);
                }
            }
        }

        Err(PincerError::GatewayError {
            message: "connection closed without close frame".to_string(),
        })
    }

    fn spawn_heartbeat(&self, period: Duration, out: mpsc::UnboundedSender<Message>) -> JoinHandle<()> {
        let seq = Arc::clone(&self.seq);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if out.send(heartbeat_frame(&seq)).is_err() {
                    break;
                }
            }
        })
    }

    fn identify_frame(&self) -> Message {
        let frame = GatewayDispatch::new(
            OpCode::Identify,
            json!({
                "token": self.token,
                "intents": self.intents,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "pincer",
                    "device": "pincer",
                }
            }),
        );
        Message::Text(frame.to_text().into())
    }

    fn resume_frame(&self, session_id: &str) -> Message {
        let frame = GatewayDispatch::new(
            OpCode::Resume,
            json!({
                "token": self.token,
                "session_id": session_id,
                "seq": self.seq(),
            }),
        );
        Message::Text(frame.to_text().into())
    }
}

/// `heartbeat_interval` from a Hello payload in ms; missing or zero falls
/// back to the default.
fn heartbeat_interval(hello: &Value) -> u64 {
    hello["heartbeat_interval"]
        .as_u64()
        .filter(|ms| *ms > 0)
        .unwrap_or(GatewayConfig::DEFAULT_HEARTBEAT_MS)
}

fn heartbeat_frame(seq: &Mutex<Option<u64>>) -> Message {
    let last = seq.lock().ok().and_then(|s| *s);
    Message::Text(GatewayDispatch::new(OpCode::Heartbeat, json!(last)).to_text().into())
}

fn send(out: &mpsc::UnboundedSender<Message>, msg: Message) -> Result<()> {
    out.send(msg).map_err(|_| PincerError::GatewayError {
        message: "gateway writer stopped".to_string(),
    })
}
