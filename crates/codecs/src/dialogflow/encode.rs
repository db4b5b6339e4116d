use forge_core::{
    override_merge, to_tokens, CanonicalModel, ConvertResult, InputType, Intent, Platform,
    SchemaError, ValidationError,
};
use serde_json::{Map, Value};
use tracing::debug;

use super::{
    custom_intent_defaults, dialogflow_language, entity_defaults, fallback_intent_defaults,
    parameter_defaults, welcome_intent_defaults, DialogflowAgent, DialogflowCodec,
    DialogflowEntity, DialogflowIntent, EntityEntry, IntentParameter, UserSaysChunk,
    UserSaysRecord, FALLBACK_INTENT_NAME, SYSTEM_ENTITY_PREFIX, WELCOME_EVENT,
    WELCOME_INTENT_NAME,
};
use crate::{from_value, resolve_input_type, to_value, ResolvedType};

const PASSTHROUGH: &str = "dialogflow block";

impl DialogflowCodec {
    /// Builds the agent file set for `locale`.
    ///
    /// Entity files are collected in memory, one per input type name, in the
    /// order the types are first referenced.
    pub fn encode(&self, model: &CanonicalModel, locale: &str) -> ConvertResult<DialogflowAgent> {
        let mut agent = DialogflowAgent {
            language: dialogflow_language(locale),
            ..DialogflowAgent::default()
        };

        let mut block_intents = BlockEntries::new(model, "intents");
        let block_entities = BlockEntries::new(model, "entities");

        let fallback = block_intents.take(|entry| {
            entry_name(entry) == Some(FALLBACK_INTENT_NAME)
                || entry.get("fallbackIntent") == Some(&Value::Bool(true))
        });
        agent
            .intents
            .push(descriptor(fallback_intent_defaults(), [fallback.as_ref()])?);

        let welcome = block_intents.take(|entry| {
            entry_name(entry) == Some(WELCOME_INTENT_NAME)
                || entry
                    .pointer("/events/0/name")
                    .and_then(Value::as_str)
                    == Some(WELCOME_EVENT)
        });
        agent
            .intents
            .push(descriptor(welcome_intent_defaults(), [welcome.as_ref()])?);

        for intent in &model.intents {
            let mut parameters = Vec::with_capacity(intent.inputs.len());
            for input in &intent.inputs {
                let data_type =
                    match resolve_input_type(model, intent, input, Platform::Dialogflow, builtin)? {
                        ResolvedType::Builtin(name) => name,
                        ResolvedType::Custom(input_type) => {
                            if !agent.entities.iter().any(|entity| entity.name == input_type.name) {
                                agent.entities.push(entity_from(input_type)?);
                                agent
                                    .entries
                                    .insert(input_type.name.clone(), entries_from(input_type));
                            }
                            format!("@{}", input_type.name)
                        }
                    };

                let mut parameter = parameter_defaults(&input.name);
                parameter["dataType"] = Value::String(data_type);
                if let Some(overlay) = &input.dialogflow {
                    override_merge(&mut parameter, overlay);
                }
                let what = format!("intent `{}` input `{}`", intent.name, input.name);
                parameters.push(from_value::<IntentParameter>(parameter, &what)?);
            }

            let mut defaults = custom_intent_defaults(&intent.name);
            defaults["responses"][0]["parameters"] = to_value(&parameters, &intent.name)?;
            let block_entry =
                block_intents.take(|entry| entry_name(entry) == Some(intent.name.as_str()));
            agent.intents.push(descriptor(
                defaults,
                [block_entry.as_ref(), intent.dialogflow.as_ref()],
            )?);

            if !intent.phrases.is_empty() {
                let records = intent
                    .phrases
                    .iter()
                    .map(|phrase| usersays_record(intent, phrase, &parameters))
                    .collect::<Result<Vec<_>, _>>()?;
                agent.usersays.insert(intent.name.clone(), records);
            }
        }

        for entry in block_intents.remaining() {
            let name = entry_name(&entry)
                .ok_or_else(|| SchemaError::missing(PASSTHROUGH, "intents[].name"))?
                .to_string();
            debug!(intent = %name, "emitting dialogflow-only intent");
            agent
                .intents
                .push(descriptor(custom_intent_defaults(&name), [Some(&entry)])?);
        }

        for entry in block_entities.remaining() {
            let name = entry_name(&entry)
                .ok_or_else(|| SchemaError::missing(PASSTHROUGH, "entities[].name"))?
                .to_string();
            match agent.entities.iter_mut().find(|entity| entity.name == name) {
                Some(entity) => {
                    let mut value = to_value(&*entity, PASSTHROUGH)?;
                    override_merge(&mut value, &entry);
                    *entity = from_value(value, PASSTHROUGH)?;
                }
                None => {
                    let mut value = entity_defaults(&name);
                    override_merge(&mut value, &entry);
                    agent.entities.push(from_value(value, PASSTHROUGH)?);
                }
            }
        }

        Ok(agent)
    }
}

fn builtin(name: &str) -> Option<String> {
    if name.starts_with(SYSTEM_ENTITY_PREFIX) {
        Some(name.to_string())
    } else if name.starts_with(&SYSTEM_ENTITY_PREFIX[1..]) {
        Some(format!("@{name}"))
    } else {
        None
    }
}

/// Entries of one array in the model-level dialogflow block, consumed as they
/// are matched.
struct BlockEntries {
    entries: Vec<Option<Value>>,
}

impl BlockEntries {
    fn new(model: &CanonicalModel, key: &str) -> Self {
        let entries = model
            .dialogflow
            .as_ref()
            .and_then(|block| block.get(key))
            .and_then(Value::as_array)
            .map(|items| items.iter().cloned().map(Some).collect())
            .unwrap_or_default();
        Self { entries }
    }

    fn take(&mut self, predicate: impl Fn(&Value) -> bool) -> Option<Value> {
        self.entries
            .iter_mut()
            .find(|entry| matches!(entry, Some(value) if predicate(value)))
            .and_then(Option::take)
    }

    fn remaining(self) -> impl Iterator<Item = Value> {
        self.entries.into_iter().flatten()
    }
}

fn entry_name(entry: &Value) -> Option<&str> {
    entry.get("name").and_then(Value::as_str)
}

/// Applies override blocks to an intent descriptor. `responses` merge
/// element by element so parameters survive.
fn descriptor<'a>(
    mut value: Value,
    overlays: impl IntoIterator<Item = Option<&'a Value>>,
) -> Result<DialogflowIntent, SchemaError> {
    for overlay in overlays.into_iter().flatten() {
        let mut overlay = overlay.clone();
        let responses = overlay
            .as_object_mut()
            .and_then(|map| map.remove("responses"));

        if let Some(Value::Array(responses)) = responses {
            let target = value
                .as_object_mut()
                .and_then(|map| map.get_mut("responses"))
                .and_then(Value::as_array_mut)
                .ok_or_else(|| SchemaError::shape(PASSTHROUGH, "intent has no responses"))?;
            for (index, response) in responses.into_iter().enumerate() {
                match target.get_mut(index) {
                    Some(existing) => override_merge(existing, &response),
                    None => target.push(response),
                }
            }
        }

        override_merge(&mut value, &overlay);
    }

    from_value(value, PASSTHROUGH)
}

fn entity_from(input_type: &InputType) -> Result<DialogflowEntity, SchemaError> {
    let mut value = entity_defaults(&input_type.name);
    if let Some(overlay) = &input_type.dialogflow {
        override_merge(&mut value, overlay);
    }
    from_value(value, &format!("input type `{}`", input_type.name))
}

/// The value is listed as its own first synonym.
fn entries_from(input_type: &InputType) -> Vec<EntityEntry> {
    input_type
        .values
        .iter()
        .map(|value| {
            let synonyms = std::iter::once(value.value.clone())
                .chain(
                    value
                        .synonyms
                        .iter()
                        .filter(|synonym| **synonym != value.value)
                        .cloned(),
                )
                .collect();
            EntityEntry {
                value: value.value.clone(),
                synonyms,
            }
        })
        .collect()
}

fn usersays_record(
    intent: &Intent,
    phrase: &str,
    parameters: &[IntentParameter],
) -> Result<UserSaysRecord, ValidationError> {
    let data = to_tokens(phrase)
        .into_iter()
        .filter(|token| token.is_placeholder || !token.text.is_empty())
        .map(|token| {
            if !token.is_placeholder {
                return Ok(UserSaysChunk {
                    text: token.text,
                    user_defined: false,
                    alias: None,
                    meta: None,
                });
            }

            let parameter = parameters
                .iter()
                .find(|parameter| parameter.name == token.text)
                .ok_or_else(|| ValidationError::UnknownPlaceholder {
                    intent: intent.name.clone(),
                    placeholder: token.text.clone(),
                    phrase: phrase.to_string(),
                })?;
            Ok(UserSaysChunk {
                alias: Some(parameter.name.clone()),
                meta: Some(parameter.data_type.clone()),
                text: token.text,
                user_defined: true,
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    Ok(UserSaysRecord {
        data,
        is_template: false,
        count: 0,
        extra: Map::new(),
    })
}
