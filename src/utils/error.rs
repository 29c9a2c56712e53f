use thiserror::Error;

#[derive(Error, Debug)]
pub enum PincerError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Gateway transport error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    // HTTP status classes returned by the REST API
    #[error("Not modified: {reason}")]
    NotModified { reason: String },

    #[error("Bad request: {reason}")]
    BadRequest { reason: String },

    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Not found: {reason}")]
    NotFound { reason: String },

    #[error("Method not allowed: {reason}")]
    MethodNotAllowed { reason: String },

    #[error("Rate limited: {reason}")]
    RateLimited { reason: String },

    #[error("Server error: {message}")]
    ServerError { message: String },

    #[error("Unexpected HTTP status {status}: {reason}")]
    UnexpectedStatus { status: u16, reason: String },

    // Command registration
    #[error("Invalid command name: {message}")]
    InvalidCommandName { message: String },

    #[error("Invalid command guild: {message}")]
    InvalidCommandGuild { message: String },

    #[error("Command description too long: {message}")]
    CommandDescriptionTooLong { message: String },

    #[error("Command already registered: {message}")]
    CommandAlreadyRegistered { message: String },

    #[error("Too many arguments: {message}")]
    TooManyArguments { message: String },

    #[error("Invalid argument annotation: {message}")]
    InvalidArgumentAnnotation { message: String },

    #[error("Invalid component: {message}")]
    InvalidComponent { message: String },

    #[error("Command `{command}` is on cooldown, retry in {retry_after:.1}s")]
    CommandCooldown { command: String, retry_after: f64 },

    #[error("Command handler failed: {message}")]
    HandlerError { message: String },

    #[error("Gateway error: {message}")]
    GatewayError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value `{value}` for `{field}`: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PincerError {
    /// Builds the error matching an HTTP status the REST API is known to
    /// return for client mistakes. `None` for statuses without a dedicated
    /// variant.
    pub fn from_status(status: u16, reason: impl Into<String>) -> Option<Self> {
        let reason = reason.into();
        let err = match status {
            304 => Self::NotModified { reason },
            400 => Self::BadRequest { reason },
            401 => Self::Unauthorized { reason },
            403 => Self::Forbidden { reason },
            404 => Self::NotFound { reason },
            405 => Self::MethodNotAllowed { reason },
            429 => Self::RateLimited { reason },
            _ => return None,
        };
        Some(err)
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Self::HandlerError {
            message: message.into(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotModified { .. } | Self::CommandCooldown { .. } => ErrorSeverity::Low,
            Self::ApiError(_)
            | Self::WebSocketError(_)
            | Self::RateLimited { .. }
            | Self::ServerError { .. } => ErrorSeverity::Medium,
            Self::Unauthorized { .. } | Self::GatewayError { .. } | Self::IoError(_) => {
                ErrorSeverity::Critical
            }
            _ => ErrorSeverity::High,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Unauthorized { .. } => "Discord rejected the bot token".to_string(),
            Self::Forbidden { .. } => "The bot lacks permission for this action".to_string(),
            Self::NotFound { .. } => "The requested Discord resource does not exist".to_string(),
            Self::ServerError { .. } => "Discord kept failing with server errors".to_string(),
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => format!("Invalid configuration: {}", self),
            _ => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "Check the token in the [bot] section or DISCORD_TOKEN",
            Self::Forbidden { .. } => "Re-invite the bot with the applications.commands scope",
            Self::RateLimited { .. } | Self::ServerError { .. } | Self::ApiError(_) => {
                "Wait a moment and try again"
            }
            Self::GatewayError { .. } | Self::WebSocketError(_) => {
                "Check the configured intents and that the token is valid"
            }
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => "Fix the TOML file and run again",
            Self::InvalidCommandName { .. }
            | Self::InvalidCommandGuild { .. }
            | Self::CommandDescriptionTooLong { .. }
            | Self::CommandAlreadyRegistered { .. }
            | Self::TooManyArguments { .. }
            | Self::InvalidArgumentAnnotation { .. }
            | Self::InvalidComponent { .. } => "Adjust the command declaration",
            _ => "Run again with --verbose for details",
        }
    }
}

pub type Result<T> = std::result::Result<T, PincerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_known_codes() {
        assert!(matches!(
            PincerError::from_status(404, "Not Found"),
            Some(PincerError::NotFound { .. })
        ));
        assert!(matches!(
            PincerError::from_status(403, "Forbidden"),
            Some(PincerError::Forbidden { .. })
        ));
        assert!(PincerError::from_status(502, "Bad Gateway").is_none());
        assert!(PincerError::from_status(200, "OK").is_none());
    }

    #[test]
    fn test_severity() {
        let err = PincerError::Unauthorized {
            reason: "401".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);

        let err = PincerError::CommandCooldown {
            command: "ping".to_string(),
            retry_after: 1.0,
        };
        assert_eq!(err.severity(), ErrorSeverity::Low);
    }
}
