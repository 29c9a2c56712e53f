use crate::core::commands::CommandRegistry;
use crate::domain::command::AppCommand;
use crate::domain::ports::RestClient;
use crate::utils::conversion::remove_none;
use crate::utils::error::{PincerError, Result};
use crate::utils::snowflake::Snowflake;
use futures_util::future::try_join_all;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Keeps the commands Discord stores for the application in line with the
/// local [`CommandRegistry`].
pub struct ChatCommandHandler {
    http: Arc<dyn RestClient>,
    registry: Arc<CommandRegistry>,
    prefix: String,
    initialized: AtomicBool,
}

impl ChatCommandHandler {
    pub fn new(http: Arc<dyn RestClient>, application_id: Snowflake, registry: Arc<CommandRegistry>) -> Self {
        tracing::debug!("{} commands registered.", registry.len());
        Self {
            http,
            registry,
            prefix: format!("applications/{}", application_id),
            initialized: AtomicBool::new(false),
        }
    }

    fn endpoint(&self, cmd: &AppCommand) -> Result<String> {
        let id = cmd.id.ok_or_else(|| PincerError::NotFound {
            reason: format!("command `{}` has no id", cmd.name),
        })?;

        Ok(match cmd.guild_id {
            Some(guild_id) => format!("{}/guilds/{}/commands/{}", self.prefix, guild_id, id),
            None => format!("{}/commands/{}", self.prefix, id),
        })
    }

    fn collection_endpoint(&self, guild_id: Option<Snowflake>) -> String {
        match guild_id {
            Some(guild_id) => format!("{}/guilds/{}/commands", self.prefix, guild_id),
            None => format!("{}/commands", self.prefix),
        }
    }

    /// Global commands followed by the commands of every given guild.
    pub async fn get_commands(&self, guilds: &[Snowflake]) -> Result<Vec<AppCommand>> {
        let global_route = self.collection_endpoint(None);
        let global = self.http.get(&global_route, None);
        let per_guild = try_join_all(guilds.iter().map(|guild| {
            let route = self.collection_endpoint(Some(*guild));
            async move { self.http.get(&route, None).await }
        }));

        let (global, per_guild) = futures_util::future::try_join(global, per_guild).await?;

        let mut commands = parse_commands(global)?;
        for list in per_guild {
            commands.extend(parse_commands(list)?);
        }
        Ok(commands)
    }

    pub async fn remove_command(&self, cmd: &AppCommand) -> Result<()> {
        match cmd.guild_id {
            Some(guild_id) => tracing::info!(
                "Removing command `{}` with guild id {} from Discord",
                cmd.name,
                guild_id
            ),
            None => tracing::info!("Removing global command `{}` from Discord", cmd.name),
        }

        self.http.delete(&self.endpoint(cmd)?).await?;
        Ok(())
    }

    /// POST is an upsert on Discord's side, so this both creates and updates.
    pub async fn add_command(&self, cmd: &AppCommand) -> Result<()> {
        tracing::info!("Updated or registered command `{}` to Discord", cmd.name);

        self.http
            .post(&self.collection_endpoint(cmd.guild_id), cmd.to_payload())
            .await?;
        Ok(())
    }

    pub async fn add_commands(&self, commands: &[AppCommand]) -> Result<()> {
        try_join_all(commands.iter().map(|cmd| self.add_command(cmd))).await?;
        Ok(())
    }

    /// PATCHes a remote command with a partial body; `null` members are dropped.
    pub async fn update_command(&self, cmd: &AppCommand, changes: Value) -> Result<Option<AppCommand>> {
        tracing::info!("Updating command `{}` on Discord", cmd.name);

        let updated = self.http.patch(&self.endpoint(cmd)?, remove_none(changes)).await?;
        Ok(updated.map(serde_json::from_value).transpose()?)
    }

    /// Syncs once per handler; later calls return immediately.
    pub async fn initialize(&self, guilds: &[Snowflake]) -> Result<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let local = self.registry.build_local_commands();

        let remote = match self.get_commands(guilds).await {
            Ok(commands) => commands,
            Err(PincerError::Forbidden { .. }) => {
                tracing::error!("Cannot retrieve slash commands, skipping...");
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        let to_remove: Vec<&AppCommand> = remote
            .iter()
            .filter(|target| {
                !local
                    .iter()
                    .any(|reg| reg.name == target.name && reg.guild_id == target.guild_id)
            })
            .collect();

        try_join_all(to_remove.iter().map(|cmd| self.remove_command(cmd))).await?;

        let remaining: Vec<&AppCommand> = remote
            .iter()
            .filter(|cmd| !to_remove.iter().any(|r| std::ptr::eq(*r, *cmd)))
            .collect();

        for cmd in local.iter().filter(|c| !remaining.iter().any(|r| c.matches(r))) {
            self.add_command(cmd).await?;
        }

        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

fn parse_commands(body: Option<Value>) -> Result<Vec<AppCommand>> {
    match body {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::commands::Command;
    use crate::domain::interaction::{CommandArgs, MessageContext};
    use crate::domain::message::Response;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeDiscord {
        remote: Value,
        forbidden: bool,
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl RestClient for FakeDiscord {
        async fn get(&self, route: &str, _params: Option<Value>) -> Result<Option<Value>> {
            self.calls.lock().unwrap().push(("GET".into(), route.into()));
            if self.forbidden {
                return Err(PincerError::Forbidden {
                    reason: "Missing Access".into(),
                });
            }
            if route.contains("/guilds/") {
                return Ok(Some(json!([])));
            }
            Ok(Some(self.remote.clone()))
        }
        async fn post(&self, route: &str, body: Value) -> Result<Option<Value>> {
            self.calls
                .lock()
                .unwrap()
                .push(("POST".into(), format!("{} {}", route, body["name"].as_str().unwrap_or(""))));
            Ok(Some(body))
        }
        async fn patch(&self, route: &str, _body: Value) -> Result<Option<Value>> {
            self.calls.lock().unwrap().push(("PATCH".into(), route.into()));
            Ok(None)
        }
        async fn put(&self, route: &str, _body: Value) -> Result<Option<Value>> {
            self.calls.lock().unwrap().push(("PUT".into(), route.into()));
            Ok(None)
        }
        async fn delete(&self, route: &str) -> Result<Option<Value>> {
            self.calls.lock().unwrap().push(("DELETE".into(), route.into()));
            Ok(None)
        }
    }

    async fn pong(_ctx: MessageContext, _args: CommandArgs) -> Result<Response> {
        Ok("pong".into())
    }

    fn registry() -> Arc<CommandRegistry> {
        let mut registry = CommandRegistry::new();
        registry.register(Command::chat_input("ping").handler(pong)).unwrap();
        registry
            .register(Command::chat_input("echo").description("Echo back").handler(pong))
            .unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_initialize_removes_stale_and_adds_changed() {
        let fake = Arc::new(FakeDiscord {
            remote: json!([
                {"id": "1", "application_id": "9", "type": 1, "name": "ping",
                 "description": "Description not set", "default_permission": true},
                {"id": "2", "application_id": "9", "type": 1, "name": "old",
                 "description": "gone", "default_permission": true}
            ]),
            ..Default::default()
        });

        let handler = ChatCommandHandler::new(fake.clone(), Snowflake(9), registry());
        handler.initialize(&[]).await.unwrap();

        let calls = fake.calls.lock().unwrap().clone();
        assert!(calls.contains(&("DELETE".into(), "applications/9/commands/2".into())));
        assert!(calls.contains(&("POST".into(), "applications/9/commands echo".into())));
        assert!(!calls.iter().any(|(m, r)| m == "POST" && r.ends_with(" ping")));
    }

    #[tokio::test]
    async fn test_initialize_runs_once() {
        let fake = Arc::new(FakeDiscord {
            remote: json!([]),
            ..Default::default()
        });
        let handler = ChatCommandHandler::new(fake.clone(), Snowflake(9), registry());

        handler.initialize(&[]).await.unwrap();
        let first = fake.calls.lock().unwrap().len();
        handler.initialize(&[]).await.unwrap();

        assert!(handler.is_initialized());
        assert_eq!(fake.calls.lock().unwrap().len(), first);
    }

    #[tokio::test]
    async fn test_forbidden_listing_still_uploads() {
        let fake = Arc::new(FakeDiscord {
            remote: json!([]),
            forbidden: true,
            ..Default::default()
        });
        let handler = ChatCommandHandler::new(fake.clone(), Snowflake(9), registry());

        handler.initialize(&[]).await.unwrap();

        let posts = fake
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == "POST")
            .count();
        assert_eq!(posts, 2);
    }

    #[tokio::test]
    async fn test_guild_lists_are_fetched() {
        let fake = Arc::new(FakeDiscord {
            remote: json!([]),
            ..Default::default()
        });
        let handler = ChatCommandHandler::new(fake.clone(), Snowflake(9), registry());

        handler
            .get_commands(&[Snowflake(11), Snowflake(12)])
            .await
            .unwrap();

        let calls = fake.calls.lock().unwrap().clone();
        assert!(calls.contains(&("GET".into(), "applications/9/guilds/11/commands".into())));
        assert!(calls.contains(&("GET".into(), "applications/9/guilds/12/commands".into())));
    }

    #[tokio::test]
    async fn test_update_requires_id() {
        let fake = Arc::new(FakeDiscord::default());
        let handler = ChatCommandHandler::new(fake.clone(), Snowflake(9), registry());

        let mut cmd = AppCommand::new(crate::domain::command::AppCommandType::ChatInput, "ping", "d");
        assert!(handler.update_command(&cmd, json!({"description": "x"})).await.is_err());

        cmd.id = Some(Snowflake(5));
        cmd.guild_id = Some(Snowflake(77));
        handler.update_command(&cmd, json!({"description": "x"})).await.unwrap();
        assert!(fake
            .calls
            .lock()
            .unwrap()
            .contains(&("PATCH".into(), "applications/9/guilds/77/commands/5".into())));
    }
}
