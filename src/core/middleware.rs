use crate::core::commands::{CommandRegistry, RegisteredCommand};
use crate::core::components::ComponentRegistry;
use crate::core::dispatch::GatewayDispatch;
use crate::core::throttle::Throttler;
use crate::domain::command::AppCommandType;
use crate::domain::interaction::{CommandArgs, CommandPath, Interaction, InteractionType, MessageContext};
use crate::domain::message::Response;
use crate::domain::ports::{ErrorHandler, RestClient};
use crate::utils::error::{PincerError, Result};
use serde_json::Value;
use std::sync::Arc;

pub const INTERACTION_CREATE_EVENT: &str = "on_interaction_create";

/// Runs commands and component handlers for INTERACTION_CREATE dispatches.
#[derive(Clone)]
pub struct InteractionMiddleware {
    pub http: Arc<dyn RestClient>,
    pub commands: Arc<CommandRegistry>,
    pub components: Arc<ComponentRegistry>,
    pub throttler: Arc<dyn Throttler>,
    pub error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl InteractionMiddleware {
    /// Handles the interaction and returns the event to hand to user code.
    pub async fn interaction_create(&self, payload: &GatewayDispatch) -> Result<(&'static str, Interaction)> {
        let interaction: Interaction = serde_json::from_value(payload.d.clone())?;

        match interaction.kind {
            InteractionType::ApplicationCommand => self.handle_command(&interaction).await?,
            InteractionType::MessageComponent => self.handle_component(&interaction).await?,
            other => tracing::debug!("Interaction type {:?} is not handled", other),
        }

        Ok((INTERACTION_CREATE_EVENT, interaction))
    }

    async fn handle_command(&self, interaction: &Interaction) -> Result<()> {
        let Some(path) = interaction.command_path() else {
            tracing::warn!("Application command interaction {} has no name", interaction.id);
            return Ok(());
        };
        let kind = interaction
            .data
            .as_ref()
            .and_then(|d| d.kind)
            .unwrap_or(AppCommandType::ChatInput);

        let Some(command) = self.commands.find(
            &path.name,
            interaction.guild_id,
            kind,
            path.group.as_deref(),
            path.sub_group.as_deref(),
        ) else {
            tracing::warn!("Received interaction for unknown command `{}`", path.name);
            return Ok(());
        };

        let ctx = MessageContext::from_interaction(interaction, command.qualified_name())?;
        tracing::debug!(
            "⚡ Running command `{}` for {}",
            command.qualified_name(),
            ctx.author
        );

        let response = match self.run_command(&command, &ctx, interaction, &path).await {
            Ok(response) => response,
            Err(err) => self.on_error(ctx, err).await?,
        };

        self.send_response(interaction, response).await
    }

    async fn run_command(
        &self,
        command: &RegisteredCommand,
        ctx: &MessageContext,
        interaction: &Interaction,
        path: &CommandPath,
    ) -> Result<Response> {
        self.throttler.handle(ctx, command)?;
        let args = build_args(command, interaction, path);
        command.handler.call(ctx.clone(), args).await
    }

    async fn handle_component(&self, interaction: &Interaction) -> Result<()> {
        let Some(data) = interaction.data.as_ref() else {
            return Ok(());
        };
        let Some(custom_id) = data.custom_id.as_deref() else {
            return Ok(());
        };
        let Some(handler) = self.components.get(custom_id) else {
            tracing::debug!("No handler registered for component `{}`", custom_id);
            return Ok(());
        };

        let ctx = MessageContext::from_interaction(interaction, custom_id)?;
        let values = data.values.clone().unwrap_or_default();

        let response = match handler.call(ctx.clone(), values).await {
            Ok(response) => response,
            Err(err) => self.on_error(ctx, err).await?,
        };

        self.send_response(interaction, response).await
    }

    async fn on_error(&self, ctx: MessageContext, err: PincerError) -> Result<Response> {
        match &self.error_handler {
            Some(hook) => {
                tracing::warn!("Command `{}` failed: {}", ctx.command_name, err);
                hook.on_command_error(ctx, err).await
            }
            None => Err(err),
        }
    }

    /// First message answers the interaction, the rest become follow-ups.
    async fn send_response(&self, interaction: &Interaction, response: Response) -> Result<()> {
        let mut messages = response.messages.into_iter();

        let Some(first) = messages.next() else {
            tracing::debug!("Handler for interaction {} returned nothing", interaction.id);
            return Ok(());
        };

        interaction.reply(self.http.as_ref(), &first).await?;
        for message in messages {
            interaction.followup(self.http.as_ref(), &message).await?;
        }
        Ok(())
    }
}

fn build_args(command: &RegisteredCommand, interaction: &Interaction, path: &CommandPath) -> CommandArgs {
    let declared = command.app.options.as_deref().unwrap_or_default();
    let mut args = CommandArgs::from_options(declared, &path.options);

    let Some(data) = interaction.data.as_ref() else {
        return args;
    };
    let Some(target) = data.target_id else {
        return args;
    };

    let target_key = target.to_string();
    let resolved = |kind: &str| -> Option<Value> {
        data.resolved
            .as_ref()
            .and_then(|r| r.get(kind))
            .and_then(|m| m.get(&target_key))
            .cloned()
    };

    args.insert("target_id", Some(Value::String(target_key.clone())));
    match command.app.kind {
        AppCommandType::User => {
            args.insert("user", resolved("users"));
            args.insert("member", resolved("members"));
        }
        AppCommandType::Message => {
            args.insert("message", resolved("messages"));
        }
        _ => {}
    }

    args
}

impl std::fmt::Debug for InteractionMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionMiddleware")
            .field("commands", &self.commands.len())
            .field("components", &self.components.len())
            .field("error_handler", &self.error_handler.is_some())
            .finish_non_exhaustive()
    }
}
