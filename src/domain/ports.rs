use crate::domain::interaction::{CommandArgs, MessageContext};
use crate::domain::message::Response;
use crate::utils::error::{PincerError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

/// The REST verbs domain objects need. Implemented by
/// [`crate::core::http::HttpClient`]; tests substitute recorders.
#[async_trait]
pub trait RestClient: Send + Sync {
    async fn get(&self, route: &str, params: Option<Value>) -> Result<Option<Value>>;
    async fn post(&self, route: &str, body: Value) -> Result<Option<Value>>;
    async fn patch(&self, route: &str, body: Value) -> Result<Option<Value>>;
    async fn put(&self, route: &str, body: Value) -> Result<Option<Value>>;
    async fn delete(&self, route: &str) -> Result<Option<Value>>;
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(&self, ctx: MessageContext, args: CommandArgs) -> Result<Response>;
}

#[async_trait]
impl<F, Fut> CommandHandler for F
where
    F: Fn(MessageContext, CommandArgs) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    async fn call(&self, ctx: MessageContext, args: CommandArgs) -> Result<Response> {
        (self)(ctx, args).await
    }
}

/// Handler bound to a button or select menu. `values` holds the selected
/// option values for select menus and is empty for buttons.
#[async_trait]
pub trait ComponentHandler: Send + Sync {
    async fn call(&self, ctx: MessageContext, values: Vec<String>) -> Result<Response>;
}

#[async_trait]
impl<F, Fut> ComponentHandler for F
where
    F: Fn(MessageContext, Vec<String>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    async fn call(&self, ctx: MessageContext, values: Vec<String>) -> Result<Response> {
        (self)(ctx, values).await
    }
}

/// Hook run when a command or component handler fails.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn on_command_error(&self, ctx: MessageContext, error: PincerError) -> Result<Response>;
}

#[async_trait]
impl<F, Fut> ErrorHandler for F
where
    F: Fn(MessageContext, PincerError) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    async fn on_command_error(&self, ctx: MessageContext, error: PincerError) -> Result<Response> {
        (self)(ctx, error).await
    }
}
