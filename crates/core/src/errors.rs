use std::path::PathBuf;

use thiserror::Error;

use crate::models::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationRule {
    Length,
    Uppercase,
    Digit,
}

impl InvocationRule {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Length => "must be between 2 and 50 characters",
            Self::Uppercase => "must not contain uppercase letters",
            Self::Digit => "must not contain digits",
        }
    }
}

/// Structural problems in a canonical model, or platform constraints broken while encoding.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("[{locale}] {path} is missing `{field}`")]
    MissingField {
        locale: String,
        path: String,
        field: &'static str,
    },
    #[error("[{locale}] {path}.{field} must be {expected}")]
    InvalidField {
        locale: String,
        path: String,
        field: &'static str,
        expected: &'static str,
    },
    #[error("[{locale}] intent `{intent}` is defined more than once")]
    DuplicateIntent { locale: String, intent: String },
    #[error("intent `{intent}`: phrase \"{phrase}\" uses `{{{placeholder}}}` but no input has that name")]
    UnknownPlaceholder {
        intent: String,
        placeholder: String,
        phrase: String,
    },
    #[error("intent `{intent}`: input `{input}` has an object type without any platform key")]
    MissingPlatformKey { intent: String, input: String },
    #[error("intent `{intent}`: input `{input}` has no {platform} type")]
    MissingPlatformType {
        platform: Platform,
        intent: String,
        input: String,
    },
    #[error("intent `{intent}`: input `{input}` references unknown input type `{type_name}`")]
    UnresolvedInputType {
        intent: String,
        input: String,
        type_name: String,
    },
    #[error("[{locale}] input type `{input_type}` has no values")]
    EmptyValues { locale: String, input_type: String },
    #[error("[{locale}] {platform} block at {path} must be {expected}")]
    MalformedPassthrough {
        locale: String,
        platform: Platform,
        path: String,
        expected: &'static str,
    },
    #[error("invocation name \"{invocation}\" {}", .rule.describe())]
    InvalidInvocation {
        invocation: String,
        rule: InvocationRule,
    },
    #[error("intent `{intent}`: sample \"{sample}\" must not contain digits, spell numbers out")]
    DigitInSample { intent: String, sample: String },
    #[error("[{locale}] model could not be read: {message}")]
    Malformed { locale: String, message: String },
}

impl ValidationError {
    pub fn missing(locale: &str, path: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            locale: locale.to_string(),
            path: path.into(),
            field,
        }
    }

    pub fn invalid(
        locale: &str,
        path: impl Into<String>,
        field: &'static str,
        expected: &'static str,
    ) -> Self {
        Self::InvalidField {
            locale: locale.to_string(),
            path: path.into(),
            field,
            expected,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no locale mapping configured for language `{locale}`")]
    MissingLocaleMapping { locale: String },
    #[error("locale mapping for language `{locale}` is empty")]
    EmptyLocaleMapping { locale: String },
    #[error("unknown platform `{0}`")]
    UnknownPlatform(String),
    #[error("could not read config file `{path}`: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// A platform file that does not have the shape the decoder needs.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{file}: missing required key `{key}`")]
    MissingKey { file: String, key: String },
    #[error("{file}: {message}")]
    InvalidShape { file: String, message: String },
    #[error("{file}: {source}")]
    Json {
        file: String,
        source: serde_json::Error,
    },
}

impl SchemaError {
    pub fn missing(file: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingKey {
            file: file.into(),
            key: key.into(),
        }
    }

    pub fn shape(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidShape {
            file: file.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub type ConvertResult<T> = Result<T, ConvertError>;
