use crate::utils::error::{PincerError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(PincerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" | "ws" | "wss" => Ok(()),
            scheme => Err(PincerError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(PincerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(PincerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| PincerError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PincerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(PincerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("bot.api_base", "https://discord.com/api").is_ok());
        assert!(validate_url("bot.api_base", "http://127.0.0.1:8080").is_ok());
        assert!(validate_url("gateway", "wss://gateway.discord.gg").is_ok());
        assert!(validate_url("bot.api_base", "").is_err());
        assert!(validate_url("bot.api_base", "invalid-url").is_err());
        assert!(validate_url("bot.api_base", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("bot.max_retries", 5, 1).is_ok());
        assert!(validate_positive_number("bot.max_retries", 0, 1).is_err());
    }

    #[test]
    fn test_validate_required_field() {
        let present = Some("token".to_string());
        let missing: Option<String> = None;

        assert_eq!(validate_required_field("bot.token", &present).unwrap(), "token");
        assert!(matches!(
            validate_required_field("bot.token", &missing),
            Err(PincerError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("bot.token", "abc").is_ok());
        assert!(validate_non_empty_string("bot.token", "   ").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("bot.api_version", 10, 8, 10).is_ok());
        assert!(validate_range("bot.api_version", 7, 8, 10).is_err());
        assert!(validate_range("commands.cooldown_scale", 0.5, 1.0, 3600.0).is_err());
    }
}
