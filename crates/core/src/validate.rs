//! Shape checks over a raw canonical model document, run before any codec.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::errors::ValidationError;
use crate::models::Platform;
use crate::phrase::placeholders;

const ALEXA_ROOT_KEY: &str = "interactionModel";
const DIALOGFLOW_ROOT_KEYS: [&str; 2] = ["intents", "entities"];

/// Checks `document` against the canonical model's structural invariants and
/// returns the first violation found.
pub fn validate(document: &Value, locale: &str) -> Result<(), ValidationError> {
    let root = document.as_object().ok_or_else(|| ValidationError::Malformed {
        locale: locale.to_string(),
        message: "model document must be a JSON object".to_string(),
    })?;

    if let Some(invocation) = root.get("invocation") {
        if !invocation.is_string() {
            return Err(ValidationError::invalid(locale, "model", "invocation", "a string"));
        }
    }

    if let Some(intents) = root.get("intents") {
        let intents = intents
            .as_array()
            .ok_or_else(|| ValidationError::invalid(locale, "model", "intents", "an array"))?;
        validate_intents(intents, locale)?;
    }

    if let Some(input_types) = root.get("inputTypes") {
        let input_types = input_types.as_array().ok_or_else(|| {
            ValidationError::invalid(locale, "model", "inputTypes", "an array")
        })?;
        for (index, input_type) in input_types.iter().enumerate() {
            validate_input_type(input_type, index, locale)?;
        }
    }

    for platform in Platform::ALL {
        if let Some(block) = root.get(platform.key()) {
            validate_model_passthrough(platform, block, locale)?;
        }
    }

    Ok(())
}

fn validate_intents(intents: &[Value], locale: &str) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();

    for (index, intent) in intents.iter().enumerate() {
        let path = format!("intents[{index}]");
        let intent = intent
            .as_object()
            .ok_or_else(|| {
                ValidationError::invalid(locale, "model", "intents", "an array of objects")
            })?;

        let name = required_str(intent, &path, "name", locale)?;
        if !seen.insert(name.to_string()) {
            return Err(ValidationError::DuplicateIntent {
                locale: locale.to_string(),
                intent: name.to_string(),
            });
        }
        let path = format!("intent `{name}`");

        let phrases = intent
            .get("phrases")
            .ok_or_else(|| ValidationError::missing(locale, path.as_str(), "phrases"))?
            .as_array()
            .ok_or_else(|| {
                ValidationError::invalid(locale, path.as_str(), "phrases", "an array of strings")
            })?;

        let mut input_names = HashSet::new();
        if let Some(inputs) = intent.get("inputs") {
            let inputs = inputs
                .as_array()
                .ok_or_else(|| {
                    ValidationError::invalid(locale, path.as_str(), "inputs", "an array")
                })?;
            for input in inputs {
                input_names.insert(validate_input(input, name, locale)?);
            }
        }

        for phrase in phrases {
            let phrase = phrase.as_str().ok_or_else(|| {
                ValidationError::invalid(locale, path.as_str(), "phrases", "an array of strings")
            })?;
            for placeholder in placeholders(phrase) {
                if !input_names.contains(placeholder.as_str()) {
                    return Err(ValidationError::UnknownPlaceholder {
                        intent: name.to_string(),
                        placeholder,
                        phrase: phrase.to_string(),
                    });
                }
            }
        }

        nested_passthrough_objects(intent, &path, locale)?;
    }

    Ok(())
}

fn validate_input<'a>(
    input: &'a Value,
    intent: &str,
    locale: &str,
) -> Result<&'a str, ValidationError> {
    let path = format!("intent `{intent}` input");
    let input = input
        .as_object()
        .ok_or_else(|| {
            ValidationError::invalid(locale, path.as_str(), "inputs", "an array of objects")
        })?;

    let name = required_str(input, &path, "name", locale)?;
    let path = format!("intent `{intent}` input `{name}`");

    match input.get("type") {
        None => return Err(ValidationError::missing(locale, path, "type")),
        Some(Value::String(_)) => {}
        Some(Value::Object(table)) => {
            let platform_keys = Platform::ALL
                .iter()
                .filter(|platform| table.contains_key(platform.key()))
                .count();
            if platform_keys == 0 {
                return Err(ValidationError::MissingPlatformKey {
                    intent: intent.to_string(),
                    input: name.to_string(),
                });
            }
            if table.values().any(|value| !value.is_string()) {
                return Err(ValidationError::invalid(
                    locale,
                    path,
                    "type",
                    "a table of platform type names",
                ));
            }
        }
        Some(_) => {
            return Err(ValidationError::invalid(
                locale,
                path,
                "type",
                "a type name or a platform table",
            ))
        }
    }

    nested_passthrough_objects(input, &path, locale)?;
    Ok(name)
}

fn validate_input_type(
    input_type: &Value,
    index: usize,
    locale: &str,
) -> Result<(), ValidationError> {
    let path = format!("inputTypes[{index}]");
    let input_type = input_type
        .as_object()
        .ok_or_else(|| {
            ValidationError::invalid(locale, "model", "inputTypes", "an array of objects")
        })?;

    let name = required_str(input_type, &path, "name", locale)?;
    let path = format!("input type `{name}`");

    let values = input_type
        .get("values")
        .ok_or_else(|| ValidationError::missing(locale, path.as_str(), "values"))?
        .as_array()
        .ok_or_else(|| ValidationError::invalid(locale, path.as_str(), "values", "an array"))?;
    if values.is_empty() {
        return Err(ValidationError::EmptyValues {
            locale: locale.to_string(),
            input_type: name.to_string(),
        });
    }

    for (value_index, value) in values.iter().enumerate() {
        let value_path = format!("{path} values[{value_index}]");
        let value = value.as_object().ok_or_else(|| {
            ValidationError::invalid(locale, path.as_str(), "values", "an array of objects")
        })?;

        match value.get("value") {
            None => return Err(ValidationError::missing(locale, value_path, "value")),
            Some(Value::String(text)) if !text.is_empty() => {}
            Some(_) => {
                return Err(ValidationError::invalid(
                    locale,
                    value_path,
                    "value",
                    "a non-empty string",
                ))
            }
        }

        if let Some(synonyms) = value.get("synonyms") {
            let all_strings = synonyms
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string));
            if !all_strings {
                return Err(ValidationError::invalid(
                    locale,
                    value_path,
                    "synonyms",
                    "an array of strings",
                ));
            }
        }

        if value.get("id").is_some_and(|id| !id.is_string()) {
            return Err(ValidationError::invalid(locale, value_path, "id", "a string"));
        }
    }

    nested_passthrough_objects(input_type, &path, locale)
}

fn validate_model_passthrough(
    platform: Platform,
    block: &Value,
    locale: &str,
) -> Result<(), ValidationError> {
    let malformed = |path: String, expected: &'static str| ValidationError::MalformedPassthrough {
        locale: locale.to_string(),
        platform,
        path,
        expected,
    };

    let Some(map) = block.as_object() else {
        return Err(malformed(platform.key().to_string(), "an object"));
    };

    match platform {
        Platform::Alexa => {
            let nests = map.len() == 1
                && map.get(ALEXA_ROOT_KEY).is_some_and(Value::is_object);
            if !nests {
                return Err(malformed(
                    platform.key().to_string(),
                    "an object with the single key `interactionModel`",
                ));
            }
        }
        Platform::Dialogflow => {
            for (key, value) in map {
                if !DIALOGFLOW_ROOT_KEYS.contains(&key.as_str()) {
                    return Err(malformed(
                        format!("{}.{key}", platform.key()),
                        "one of `intents` or `entities`",
                    ));
                }
                let entries_are_objects = value
                    .as_array()
                    .is_some_and(|items| items.iter().all(Value::is_object));
                if !entries_are_objects {
                    return Err(malformed(
                        format!("{}.{key}", platform.key()),
                        "an array of objects",
                    ));
                }
            }
        }
    }

    Ok(())
}

fn nested_passthrough_objects(
    owner: &Map<String, Value>,
    path: &str,
    locale: &str,
) -> Result<(), ValidationError> {
    for platform in Platform::ALL {
        if owner.get(platform.key()).is_some_and(|block| !block.is_object()) {
            return Err(ValidationError::MalformedPassthrough {
                locale: locale.to_string(),
                platform,
                path: path.to_string(),
                expected: "an object",
            });
        }
    }
    Ok(())
}

fn required_str<'a>(
    map: &'a Map<String, Value>,
    path: &str,
    field: &'static str,
    locale: &str,
) -> Result<&'a str, ValidationError> {
    map.get(field)
        .ok_or_else(|| ValidationError::missing(locale, path, field))?
        .as_str()
        .ok_or_else(|| ValidationError::invalid(locale, path, field, "a string"))
}
