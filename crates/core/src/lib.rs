pub mod config;
pub mod errors;
pub mod locale;
pub mod merge;
pub mod models;
pub mod phrase;
pub mod validate;

pub use config::{ProjectConfig, CONFIG_FILE_NAME};
pub use errors::{
    ConfigError, ConvertError, ConvertResult, InvocationRule, SchemaError, ValidationError,
};
pub use locale::{expand as expand_locale, LocaleMapping};
pub use merge::{deep_merge, override_merge};
pub use models::*;
pub use phrase::{to_phrase, to_tokens, Token};
pub use validate::validate;
