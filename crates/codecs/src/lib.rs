pub mod alexa;
pub mod dialogflow;

use std::path::PathBuf;

use forge_core::{
    CanonicalModel, Input, InputType, InputTypeRef, Intent, Platform, SchemaError,
    ValidationError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

pub use alexa::{AlexaCodec, AlexaModel, LocalizedAlexaModel};
pub use dialogflow::{dialogflow_language, DialogflowAgent, DialogflowCodec};

/// A derived artifact, addressed relative to the platform's output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformFile {
    pub path: PathBuf,
    pub contents: Value,
    /// Same path for every locale, so each locale's build overwrites it.
    pub shared: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ResolvedType<'a> {
    Builtin(String),
    Custom(&'a InputType),
}

/// Resolves an input's type for `platform`. Object types pick the platform's
/// entry; builtins are returned normalized by `builtin`; everything else must
/// name an input type of the model.
pub(crate) fn resolve_input_type<'a>(
    model: &'a CanonicalModel,
    intent: &Intent,
    input: &Input,
    platform: Platform,
    builtin: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedType<'a>, ValidationError> {
    let type_name = match &input.input_type {
        InputTypeRef::Named(name) => name.as_str(),
        InputTypeRef::PerPlatform(table) => table
            .get(platform.key())
            .map(String::as_str)
            .ok_or_else(|| ValidationError::MissingPlatformType {
                platform,
                intent: intent.name.clone(),
                input: input.name.clone(),
            })?,
    };

    if let Some(builtin) = builtin(type_name) {
        return Ok(ResolvedType::Builtin(builtin));
    }

    let reference = type_name.trim_start_matches('@');
    model
        .input_type(reference)
        .map(ResolvedType::Custom)
        .ok_or_else(|| ValidationError::UnresolvedInputType {
            intent: intent.name.clone(),
            input: input.name.clone(),
            type_name: type_name.to_string(),
        })
}

/// Serializes `item`, applies `overlay` with `merge`, and reads it back.
pub(crate) fn overlay<T>(
    item: T,
    overlay: Option<&Value>,
    merge: fn(&mut Value, &Value),
    what: &str,
) -> Result<T, SchemaError>
where
    T: Serialize + DeserializeOwned,
{
    let Some(overlay) = overlay else {
        return Ok(item);
    };

    let mut value = to_value(&item, what)?;
    merge(&mut value, overlay);
    from_value(value, what)
}

pub(crate) fn to_value<T: Serialize>(item: &T, what: &str) -> Result<Value, SchemaError> {
    serde_json::to_value(item).map_err(|source| SchemaError::Json {
        file: what.to_string(),
        source,
    })
}

pub(crate) fn from_value<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, SchemaError> {
    serde_json::from_value(value).map_err(|source| SchemaError::Json {
        file: what.to_string(),
        source,
    })
}

/// Keys of `actual` whose value differs from `defaults`, ignoring `skip`.
pub(crate) fn diff_against(
    actual: &Map<String, Value>,
    defaults: &Map<String, Value>,
    skip: &[&str],
) -> Map<String, Value> {
    actual
        .iter()
        .filter(|(key, _)| !skip.contains(&key.as_str()))
        .filter(|(key, value)| defaults.get(key.as_str()) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

pub(crate) fn non_empty(map: Map<String, Value>) -> Option<Value> {
    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}
