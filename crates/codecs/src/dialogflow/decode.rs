use forge_core::{
    to_phrase, CanonicalModel, ConvertResult, Input, InputType, InputTypeRef, Intent, Platform,
    SchemaError, Token, TypeValue,
};
use serde_json::{Map, Value};
use tracing::debug;

use super::{
    custom_intent_defaults, entity_defaults, fallback_intent_defaults, parameter_defaults,
    welcome_intent_defaults, DialogflowAgent, DialogflowCodec, DialogflowEntity,
    DialogflowIntent, EntityEntry, IntentParameter, UserSaysRecord, SYSTEM_ENTITY_PREFIX,
};
use crate::{diff_against, non_empty, to_value};

/// Keys rewritten by every export.
const VOLATILE_KEYS: [&str; 2] = ["id", "lastUpdate"];

impl DialogflowCodec {
    /// Rebuilds the canonical model from an agent export. The agent carries no
    /// invocation name, so it is left empty.
    ///
    /// The default intents and any intent with neither samples nor parameters
    /// go to the `dialogflow` block instead of `intents`.
    pub fn decode(&self, agent: &DialogflowAgent, locale: &str) -> ConvertResult<CanonicalModel> {
        let mut model = CanonicalModel::default();
        let mut block_intents = Vec::new();
        let mut block_entities = Vec::new();

        for intent in &agent.intents {
            if intent.is_fallback() || intent.is_welcome() {
                let defaults = if intent.is_fallback() {
                    fallback_intent_defaults()
                } else {
                    welcome_intent_defaults()
                };
                if let Some(entry) = default_intent_entry(intent, &defaults)? {
                    block_intents.push(entry);
                }
                continue;
            }

            let records = agent
                .usersays
                .get(&intent.name)
                .map(Vec::as_slice)
                .unwrap_or_default();
            if records.is_empty() && intent.parameters().is_empty() {
                debug!(intent = %intent.name, "intent without samples kept as passthrough");
                let diff = descriptor_diff(intent, &custom_intent_defaults(&intent.name), &[])?;
                block_intents.push(named_entry(&intent.name, diff));
                continue;
            }
            model.intents.push(intent_from(intent, records)?);
        }

        for entity in &agent.entities {
            let Some(entries) = agent.entries.get(&entity.name) else {
                debug!(entity = %entity.name, locale, "entity without entries kept as passthrough");
                block_entities.push(to_value(entity, &entity.name)?);
                continue;
            };
            model.input_types.push(input_type_from(entity, entries)?);
        }

        let mut block = Map::new();
        if !block_intents.is_empty() {
            block.insert("intents".to_string(), Value::Array(block_intents));
        }
        if !block_entities.is_empty() {
            block.insert("entities".to_string(), Value::Array(block_entities));
        }
        model.dialogflow = non_empty(block);

        debug!(
            locale,
            intents = model.intents.len(),
            input_types = model.input_types.len(),
            "decoded dialogflow agent"
        );
        Ok(model)
    }
}

/// Diff of a default intent against its built-in descriptor. The name is
/// always kept so the entry can be matched again on encode.
fn default_intent_entry(
    intent: &DialogflowIntent,
    defaults: &Value,
) -> Result<Option<Value>, SchemaError> {
    let renamed = defaults.get("name").and_then(Value::as_str) != Some(intent.name.as_str());
    let diff = descriptor_diff(intent, defaults, &[])?;
    if diff.is_none() && !renamed {
        return Ok(None);
    }
    Ok(Some(named_entry(&intent.name, diff)))
}

fn named_entry(name: &str, diff: Option<Value>) -> Value {
    let mut entry = Map::new();
    entry.insert("name".to_string(), Value::String(name.to_string()));
    if let Some(Value::Object(diff)) = diff {
        entry.extend(diff);
    }
    Value::Object(entry)
}

fn intent_from(intent: &DialogflowIntent, records: &[UserSaysRecord]) -> ConvertResult<Intent> {
    let inputs = intent
        .parameters()
        .iter()
        .map(input_from)
        .collect::<Result<Vec<_>, _>>()?;

    let phrases = records.iter().map(phrase_from).collect();

    Ok(Intent {
        name: intent.name.clone(),
        phrases,
        inputs,
        alexa: None,
        dialogflow: descriptor_diff(
            intent,
            &custom_intent_defaults(&intent.name),
            &["parameters"],
        )?,
    })
}

/// Keys of an intent descriptor that differ from `defaults`. The first
/// response is diffed key by key, later responses are kept whole.
fn descriptor_diff(
    intent: &DialogflowIntent,
    defaults: &Value,
    response_skip: &[&str],
) -> Result<Option<Value>, SchemaError> {
    let actual = to_value(intent, &intent.name)?;
    let (Some(actual), Some(defaults)) = (actual.as_object(), defaults.as_object()) else {
        return Err(SchemaError::shape(&intent.name, "intent must be a JSON object"));
    };

    let mut skip = vec!["name", "responses"];
    skip.extend(VOLATILE_KEYS);
    let mut diff = diff_against(actual, defaults, &skip);

    let actual_responses = response_list(actual);
    let default_response = response_list(defaults)
        .first()
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut responses = Vec::new();
    if let Some(first) = actual_responses.first().and_then(Value::as_object) {
        let mut skip = response_skip.to_vec();
        skip.extend(VOLATILE_KEYS);
        let first_diff = diff_against(first, &default_response, &skip);
        responses.push(Value::Object(first_diff));
    }
    responses.extend(actual_responses.iter().skip(1).cloned());

    let unchanged = responses.len() == 1 && responses[0].as_object().is_some_and(Map::is_empty);
    if !responses.is_empty() && !unchanged {
        diff.insert("responses".to_string(), Value::Array(responses));
    }

    Ok(non_empty(diff))
}

fn response_list(descriptor: &Map<String, Value>) -> &[Value] {
    descriptor
        .get("responses")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn input_from(parameter: &IntentParameter) -> Result<Input, SchemaError> {
    let input_type = if parameter.data_type.starts_with(SYSTEM_ENTITY_PREFIX) {
        InputTypeRef::for_platform(Platform::Dialogflow, parameter.data_type.clone())
    } else {
        InputTypeRef::named(parameter.data_type.trim_start_matches('@'))
    };

    let actual = to_value(parameter, &parameter.name)?;
    let defaults = parameter_defaults(&parameter.name);
    let dialogflow = match (actual.as_object(), defaults.as_object()) {
        (Some(actual), Some(defaults)) => {
            let mut skip = vec!["name", "dataType"];
            skip.extend(VOLATILE_KEYS);
            non_empty(diff_against(actual, defaults, &skip))
        }
        _ => None,
    };

    Ok(Input {
        dialogflow,
        ..Input::new(parameter.name.clone(), input_type)
    })
}

/// Chunks carrying an alias are placeholders named by the alias; the chunk
/// text is only the sample value.
fn phrase_from(record: &UserSaysRecord) -> String {
    let tokens: Vec<Token> = record
        .data
        .iter()
        .map(|chunk| match chunk.alias.as_deref() {
            Some(alias) if !alias.is_empty() => Token::placeholder(alias),
            _ => Token::literal(chunk.text.clone()),
        })
        .collect();
    to_phrase(&tokens)
}

fn input_type_from(
    entity: &DialogflowEntity,
    entries: &[EntityEntry],
) -> Result<InputType, SchemaError> {
    let values = entries
        .iter()
        .map(|entry| {
            TypeValue::new(entry.value.clone()).with_synonyms(
                entry
                    .synonyms
                    .iter()
                    .filter(|synonym| **synonym != entry.value)
                    .cloned(),
            )
        })
        .collect();

    let actual = to_value(entity, &entity.name)?;
    let defaults = entity_defaults(&entity.name);
    let dialogflow = match (actual.as_object(), defaults.as_object()) {
        (Some(actual), Some(defaults)) => {
            let mut skip = vec!["name"];
            skip.extend(VOLATILE_KEYS);
            non_empty(diff_against(actual, defaults, &skip))
        }
        _ => None,
    };

    Ok(InputType {
        name: entity.name.clone(),
        values,
        alexa: None,
        dialogflow,
    })
}
