use crate::core::commands::CommandRegistry;
use crate::core::components::ComponentRegistry;
use crate::core::dispatch::GatewayDispatch;
use crate::core::gateway::{Gateway, Intents};
use crate::core::http::HttpClient;
use crate::core::middleware::InteractionMiddleware;
use crate::core::sync::ChatCommandHandler;
use crate::core::throttle::{DefaultThrottler, Throttler};
use crate::config::GatewayConfig;
use crate::domain::command::AppCommand;
use crate::domain::interaction::Interaction;
use crate::domain::ports::{ErrorHandler, RestClient};
use crate::domain::user::{PartialApplication, PartialGuild, User};
use crate::utils::error::{PincerError, Result};
use crate::utils::snowflake::Snowflake;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc;

/// READY payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ready {
    #[serde(rename = "v")]
    pub version: u8,
    pub user: User,
    #[serde(default)]
    pub guilds: Vec<PartialGuild>,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_gateway_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<PartialApplication>,
}

impl Ready {
    pub fn guild_ids(&self) -> Vec<Snowflake> {
        self.guilds.iter().map(|g| g.id).collect()
    }
}

/// User hooks for gateway events. Every method defaults to doing nothing.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_ready(&self, _client: &Client, _ready: &Ready) -> Result<()> {
        Ok(())
    }

    /// Runs after the interaction middleware replied.
    async fn on_interaction_create(&self, _client: &Client, _interaction: &Interaction) -> Result<()> {
        Ok(())
    }

    /// Any other dispatch, named `on_{event}` in lower case
    /// (`on_message_create`, `on_guild_create`, ...).
    async fn on_event(&self, _client: &Client, _name: &str, _payload: &Value) -> Result<()> {
        Ok(())
    }
}

struct NoEvents;

impl EventHandler for NoEvents {}

pub struct ClientBuilder {
    token: String,
    intents: u32,
    api_version: u8,
    max_retries: u32,
    api_base: Option<String>,
    gateway_url: Option<String>,
    reconnect_delay: Duration,
    commands: CommandRegistry,
    components: ComponentRegistry,
    throttler: Arc<dyn Throttler>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    events: Arc<dyn EventHandler>,
}

impl ClientBuilder {
    pub fn intents(mut self, intents: u32) -> Self {
        self.intents = intents;
        self
    }

    pub fn api_version(mut self, version: u8) -> Self {
        self.api_version = version;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Skips `GET gateway/bot` and connects here instead.
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn commands(mut self, commands: CommandRegistry) -> Self {
        self.commands = commands;
        self
    }

    pub fn components(mut self, components: ComponentRegistry) -> Self {
        self.components = components;
        self
    }

    pub fn throttler(mut self, throttler: impl Throttler + 'static) -> Self {
        self.throttler = Arc::new(throttler);
        self
    }

    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn event_handler(mut self, handler: impl EventHandler + 'static) -> Self {
        self.events = Arc::new(handler);
        self
    }

    pub fn build(self) -> Result<Client> {
        let mut http = HttpClient::builder(self.token.clone())
            .version(self.api_version)
            .max_retries(self.max_retries);
        if let Some(base) = self.api_base {
            http = http.base_url(base);
        }

        Ok(Client {
            token: self.token,
            intents: self.intents,
            api_version: self.api_version,
            gateway_url: self.gateway_url,
            reconnect_delay: self.reconnect_delay,
            http: Arc::new(http.build()?),
            commands: Arc::new(self.commands),
            components: Arc::new(self.components),
            throttler: self.throttler,
            error_handler: self.error_handler,
            events: self.events,
            bot: Arc::new(OnceLock::new()),
        })
    }
}

/// Bot entry point: REST client, command registries and the gateway loop.
#[derive(Clone)]
pub struct Client {
    token: String,
    intents: u32,
    api_version: u8,
    gateway_url: Option<String>,
    reconnect_delay: Duration,
    http: Arc<HttpClient>,
    commands: Arc<CommandRegistry>,
    components: Arc<ComponentRegistry>,
    throttler: Arc<dyn Throttler>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    events: Arc<dyn EventHandler>,
    bot: Arc<OnceLock<User>>,
}

impl Client {
    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            token: token.into(),
            intents: Intents::NONE,
            api_version: GatewayConfig::VERSION,
            max_retries: GatewayConfig::MAX_RETRIES,
            api_base: None,
            gateway_url: None,
            reconnect_delay: Duration::from_secs(GatewayConfig::RECONNECT_DELAY_SECS),
            commands: CommandRegistry::new(),
            components: ComponentRegistry::new(),
            throttler: Arc::new(DefaultThrottler::new()),
            error_handler: None,
            events: Arc::new(NoEvents),
        }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// The bot user, known once [`Client::run`] or [`Client::sync_commands`]
    /// fetched it.
    pub fn bot(&self) -> Option<&User> {
        self.bot.get()
    }

    /// `GET users/@me`; the bot's id doubles as the application id.
    pub async fn fetch_bot(&self) -> Result<User> {
        if let Some(user) = self.bot.get() {
            return Ok(user.clone());
        }

        let body = self
            .http
            .get("users/@me", None)
            .await?
            .ok_or_else(|| PincerError::NotFound {
                reason: "users/@me returned no body".to_string(),
            })?;
        let user: User = serde_json::from_value(body)?;
        let _ = self.bot.set(user.clone());
        Ok(user)
    }

    fn rest(&self) -> Arc<dyn RestClient> {
        self.http.clone()
    }

    fn command_sync(&self, application_id: Snowflake) -> ChatCommandHandler {
        ChatCommandHandler::new(self.rest(), application_id, Arc::clone(&self.commands))
    }

    fn middleware(&self) -> InteractionMiddleware {
        InteractionMiddleware {
            http: self.rest(),
            commands: Arc::clone(&self.commands),
            components: Arc::clone(&self.components),
            throttler: Arc::clone(&self.throttler),
            error_handler: self.error_handler.clone(),
        }
    }

    /// Syncs the registered commands without connecting to the gateway.
    pub async fn sync_commands(&self, guilds: &[Snowflake]) -> Result<()> {
        let bot = self.fetch_bot().await?;
        self.command_sync(bot.id).initialize(guilds).await
    }

    /// Commands Discord currently stores for this application.
    pub async fn remote_commands(&self, guilds: &[Snowflake]) -> Result<Vec<AppCommand>> {
        let bot = self.fetch_bot().await?;
        self.command_sync(bot.id).get_commands(guilds).await
    }

    /// Connects and dispatches events until the gateway stops.
    pub async fn run(&self) -> Result<()> {
        let bot = self.fetch_bot().await?;
        tracing::info!("🤖 Logged in as {} ({})", bot, bot.id);

        let url = match &self.gateway_url {
            Some(url) => url.clone(),
            None => Gateway::fetch_url(self.http.as_ref()).await?,
        };

        let session = Session {
            client: self.clone(),
            sync: Arc::new(self.command_sync(bot.id)),
            middleware: self.middleware(),
        };

        let mut gateway = Gateway::new(url, self.token.clone(), self.intents)
            .version(self.api_version)
            .reconnect_delay(self.reconnect_delay);

        let (tx, mut rx) = mpsc::unbounded_channel::<GatewayDispatch>();
        let gateway_task = tokio::spawn(async move { gateway.run(tx).await });

        while let Some(dispatch) = rx.recv().await {
            let session = session.clone();
            tokio::spawn(async move {
                let event = dispatch.event_name().unwrap_or("UNKNOWN").to_string();
                if let Err(err) = session.handle(dispatch).await {
                    tracing::error!("❌ Handler for {} failed: {}", event, err);
                }
            });
        }

        gateway_task.await.map_err(|e| PincerError::GatewayError {
            message: format!("gateway task failed: {}", e),
        })?
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("intents", &self.intents)
            .field("api_version", &self.api_version)
            .field("commands", &self.commands.len())
            .field("components", &self.components.len())
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct Session {
    client: Client,
    sync: Arc<ChatCommandHandler>,
    middleware: InteractionMiddleware,
}

impl Session {
    async fn handle(&self, dispatch: GatewayDispatch) -> Result<()> {
        let events = &self.client.events;

        match dispatch.event_name() {
            Some("READY") => {
                let ready: Ready = serde_json::from_value(dispatch.d.clone())?;
                tracing::info!("✅ Ready in {} guilds", ready.guilds.len());

                if let Err(err) = self.sync.initialize(&ready.guild_ids()).await {
                    tracing::error!("❌ Command sync failed: {}", err);
                }
                events.on_ready(&self.client, &ready).await
            }
            Some("INTERACTION_CREATE") => {
                let (_, interaction) = self.middleware.interaction_create(&dispatch).await?;
                events.on_interaction_create(&self.client, &interaction).await
            }
            Some(name) => {
                let name = format!("on_{}", name.to_lowercase());
                events.on_event(&self.client, &name, &dispatch.d).await
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ready_guild_ids() {
        let ready: Ready = serde_json::from_value(json!({
            "v": 10,
            "user": {"id": "1", "username": "pincer", "bot": true},
            "guilds": [{"id": "11", "unavailable": true}, {"id": "12", "unavailable": true}],
            "session_id": "abc",
            "resume_gateway_url": "wss://gateway-us-east1-b.discord.gg"
        }))
        .unwrap();

        assert_eq!(ready.guild_ids(), vec![Snowflake(11), Snowflake(12)]);
        assert_eq!(ready.session_id, "abc");
    }

    #[test]
    fn test_builder_defaults() {
        let client = Client::builder("token").build().unwrap();
        assert_eq!(client.http().url(), format!("https://discord.com/api/v{}", GatewayConfig::VERSION));
        assert!(client.commands().is_empty());
        assert!(client.bot().is_none());
    }
}
