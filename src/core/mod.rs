pub mod client;
pub mod commands;
pub mod components;
pub mod dispatch;
pub mod gateway;
pub mod http;
pub mod middleware;
pub mod ratelimiter;
pub mod sync;
pub mod throttle;

pub use client::{Client, ClientBuilder, EventHandler, Ready};
pub use commands::{Command, CommandArg, CommandRegistry, Group, Subgroup};
pub use components::ComponentRegistry;
pub use gateway::{Gateway, Intents};
pub use http::{HttpClient, RequestOptions};
pub use throttle::{DefaultThrottler, Throttler};
