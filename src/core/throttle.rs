use crate::core::commands::RegisteredCommand;
use crate::domain::command::ThrottleScope;
use crate::domain::interaction::MessageContext;
use crate::utils::error::{PincerError, Result};
use crate::utils::snowflake::Snowflake;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Decides whether a command invocation may run.
pub trait Throttler: Send + Sync {
    fn handle(&self, ctx: &MessageContext, command: &RegisteredCommand) -> Result<()>;
}

/// Timestamps of the calls made inside the current period.
#[derive(Debug, Default, Clone)]
pub struct SlidingWindow {
    calls: VecDeque<Instant>,
}

impl SlidingWindow {
    /// Records a call at `now`, or returns how long until one is allowed.
    pub fn hit(&mut self, now: Instant, limit: usize, period: Duration) -> std::result::Result<(), Duration> {
        while let Some(&oldest) = self.calls.front() {
            if now.duration_since(oldest) >= period {
                self.calls.pop_front();
            } else {
                break;
            }
        }

        if self.calls.len() >= limit {
            let oldest = self.calls.front().copied().unwrap_or(now);
            return Err((oldest + period).saturating_duration_since(now));
        }

        self.calls.push_back(now);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

type WindowKey = (String, Option<Snowflake>);

/// `cooldown` calls per `cooldown_scale` seconds, counted per scope key.
#[derive(Debug, Default)]
pub struct DefaultThrottler {
    windows: Mutex<HashMap<WindowKey, SlidingWindow>>,
}

impl DefaultThrottler {
    pub fn new() -> Self {
        Self::default()
    }

    fn scope_key(ctx: &MessageContext, scope: ThrottleScope) -> Option<Snowflake> {
        match scope {
            ThrottleScope::Guild => ctx.guild_id,
            ThrottleScope::Channel => ctx.channel_id,
            ThrottleScope::Global => None,
            ThrottleScope::User | ThrottleScope::Unknown(_) => Some(ctx.author.id),
        }
    }
}

impl Throttler for DefaultThrottler {
    fn handle(&self, ctx: &MessageContext, command: &RegisteredCommand) -> Result<()> {
        if command.cooldown == 0 {
            return Ok(());
        }

        let key = (
            command.qualified_name(),
            Self::scope_key(ctx, command.cooldown_scope),
        );
        let period = Duration::try_from_secs_f64(command.cooldown_scale).map_err(|_| {
            PincerError::InvalidConfigValueError {
                field: format!("cooldown_scale of `{}`", command.qualified_name()),
                value: command.cooldown_scale.to_string(),
                reason: "Cooldown scale must be a finite, non-negative number of seconds".to_string(),
            }
        })?;

        let mut windows = self.windows.lock().map_err(|_| PincerError::HandlerError {
            message: "throttle state poisoned".to_string(),
        })?;

        windows
            .entry(key)
            .or_default()
            .hit(Instant::now(), command.cooldown as usize, period)
            .map_err(|wait| {
                tracing::debug!("Command `{}` is on cooldown for {:?}", command.qualified_name(), wait);
                PincerError::CommandCooldown {
                    command: command.qualified_name(),
                    retry_after: wait.as_secs_f64(),
                }
            })
    }
}
