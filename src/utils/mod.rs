pub mod conversion;
pub mod error;
pub mod logger;
pub mod snowflake;
pub mod validation;
