//! Skill interaction model codec.

mod layout;

use forge_core::{
    deep_merge, expand_locale, CanonicalModel, ConvertResult, Input, InputType,
    InputTypeRef, Intent, InvocationRule, LocaleMapping, Platform, SchemaError, TypeValue,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::{from_value, non_empty, overlay, resolve_input_type, to_value, ResolvedType};

pub use layout::{
    detect_layout, AskToolVersion, LayoutProbe, LegacyLayout, SkillLayout, SkillPackageLayout,
};

pub const BUILTIN_PREFIX: &str = "AMAZON.";

const INVOCATION_MIN_LEN: usize = 2;
const INVOCATION_MAX_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlexaModel {
    pub interaction_model: InteractionModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionModel {
    pub language_model: LanguageModel,
    /// `dialog`, `prompts` and anything else next to the language model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageModel {
    #[serde(default)]
    pub invocation_name: String,
    #[serde(default)]
    pub intents: Vec<AlexaIntent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<SlotType>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlexaIntent {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<Vec<Slot>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    #[serde(rename = "type")]
    pub slot_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotType {
    pub name: String,
    #[serde(default)]
    pub values: Vec<SlotTypeValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotTypeValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: SlotValueName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotValueName {
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
}

impl AlexaModel {
    /// Reads a schema document, reporting missing structure as a [`SchemaError`].
    pub fn from_document(document: Value, file: &str) -> Result<Self, SchemaError> {
        let interaction = document
            .get("interactionModel")
            .ok_or_else(|| SchemaError::missing(file, "interactionModel"))?;
        if !interaction.is_object() {
            return Err(SchemaError::shape(file, "`interactionModel` must be an object"));
        }
        if interaction.get("languageModel").is_none() {
            return Err(SchemaError::missing(file, "interactionModel.languageModel"));
        }

        from_value(document, file)
    }

    pub fn to_document(&self) -> Result<Value, SchemaError> {
        to_value(self, "interaction model")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalizedAlexaModel {
    pub locale: String,
    pub model: AlexaModel,
}

pub fn is_builtin(name: &str) -> bool {
    name.starts_with(BUILTIN_PREFIX)
}

pub fn check_invocation(invocation: &str) -> Result<(), ValidationError> {
    let rule = if !(INVOCATION_MIN_LEN..=INVOCATION_MAX_LEN).contains(&invocation.chars().count()) {
        Some(InvocationRule::Length)
    } else if invocation.chars().any(char::is_uppercase) {
        Some(InvocationRule::Uppercase)
    } else if invocation.chars().any(|ch| ch.is_ascii_digit()) {
        Some(InvocationRule::Digit)
    } else {
        None
    };

    match rule {
        Some(rule) => Err(ValidationError::InvalidInvocation {
            invocation: invocation.to_string(),
            rule,
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlexaCodec;

impl AlexaCodec {
    pub fn new() -> Self {
        Self
    }

    /// Builds one interaction model per concrete locale `locale` expands to.
    pub fn encode(
        &self,
        model: &CanonicalModel,
        locale: &str,
        mapping: &LocaleMapping,
    ) -> ConvertResult<Vec<LocalizedAlexaModel>> {
        let locales = expand_locale(locale, mapping)?;
        let interaction = self.encode_model(model)?;

        Ok(locales
            .into_iter()
            .map(|locale| LocalizedAlexaModel {
                locale,
                model: interaction.clone(),
            })
            .collect())
    }

    pub fn encode_model(&self, model: &CanonicalModel) -> ConvertResult<AlexaModel> {
        check_invocation(&model.invocation)?;

        let mut types: Vec<SlotType> = Vec::new();
        let mut intents = Vec::with_capacity(model.intents.len());

        for intent in &model.intents {
            if let Some(sample) = intent
                .phrases
                .iter()
                .find(|sample| sample.chars().any(|ch| ch.is_ascii_digit()))
            {
                return Err(ValidationError::DigitInSample {
                    intent: intent.name.clone(),
                    sample: sample.clone(),
                }
                .into());
            }

            let mut slots = Vec::with_capacity(intent.inputs.len());
            for input in &intent.inputs {
                let resolved = resolve_input_type(model, intent, input, Platform::Alexa, builtin)?;
                let slot_type = match resolved {
                    ResolvedType::Builtin(name) => name,
                    ResolvedType::Custom(input_type) => {
                        if !types.iter().any(|existing| existing.name == input_type.name) {
                            types.push(slot_type_from(input_type)?);
                        }
                        input_type.name.clone()
                    }
                };

                let slot = Slot {
                    name: input.name.clone(),
                    slot_type,
                    extra: Map::new(),
                };
                slots.push(overlay(
                    slot,
                    input.alexa.as_ref(),
                    deep_merge,
                    &format!("intent `{}` input `{}` alexa block", intent.name, input.name),
                )?);
            }

            let alexa_intent = AlexaIntent {
                name: intent.name.clone(),
                samples: Some(intent.phrases.clone()),
                slots: Some(slots),
                extra: Map::new(),
            };
            intents.push(overlay(
                alexa_intent,
                intent.alexa.as_ref(),
                deep_merge,
                &format!("intent `{}` alexa block", intent.name),
            )?);
        }

        // builtin intents in the alexa block may still use these
        for input_type in &model.input_types {
            if !types.iter().any(|existing| existing.name == input_type.name) {
                debug!(input_type = %input_type.name, "emitting input type no intent references");
                types.push(slot_type_from(input_type)?);
            }
        }

        let generated = AlexaModel {
            interaction_model: InteractionModel {
                language_model: LanguageModel {
                    invocation_name: model.invocation.clone(),
                    intents,
                    types,
                    extra: Map::new(),
                },
                extra: Map::new(),
            },
        };

        apply_passthrough(generated, model.alexa.as_ref()).map_err(Into::into)
    }

    pub fn decode(&self, alexa: &AlexaModel) -> ConvertResult<CanonicalModel> {
        let language_model = &alexa.interaction_model.language_model;

        let mut builtin_intents = Vec::new();
        let mut intents = Vec::new();
        for intent in &language_model.intents {
            if is_builtin(&intent.name) {
                builtin_intents.push(to_value(intent, "interaction model")?);
            } else {
                intents.push(intent_from(intent));
            }
        }

        let input_types = language_model.types.iter().map(input_type_from).collect();

        let mut language_extra = language_model.extra.clone();
        if !builtin_intents.is_empty() {
            language_extra.insert("intents".to_string(), Value::Array(builtin_intents));
        }

        let mut interaction_extra = alexa.interaction_model.extra.clone();
        if !language_extra.is_empty() {
            interaction_extra.insert("languageModel".to_string(), Value::Object(language_extra));
        }

        let passthrough = non_empty(interaction_extra)
            .map(|interaction| json!({ "interactionModel": interaction }));

        Ok(CanonicalModel {
            invocation: language_model.invocation_name.clone(),
            intents,
            input_types,
            alexa: passthrough,
            dialogflow: None,
        })
    }
}

fn builtin(name: &str) -> Option<String> {
    is_builtin(name).then(|| name.to_string())
}

fn slot_type_from(input_type: &InputType) -> Result<SlotType, SchemaError> {
    let slot_type = SlotType {
        name: input_type.name.clone(),
        values: input_type
            .values
            .iter()
            .map(|value| SlotTypeValue {
                id: value.id.clone(),
                name: SlotValueName {
                    value: value.value.clone(),
                    synonyms: value.synonyms.clone(),
                },
            })
            .collect(),
        extra: Map::new(),
    };

    overlay(
        slot_type,
        input_type.alexa.as_ref(),
        deep_merge,
        &format!("input type `{}` alexa block", input_type.name),
    )
}

/// Merges the model's alexa block over the generated document. Intents in the
/// block are appended; types are appended unless one with the same name was
/// generated; everything else merges with the passthrough winning.
fn apply_passthrough(
    generated: AlexaModel,
    passthrough: Option<&Value>,
) -> Result<AlexaModel, SchemaError> {
    let Some(passthrough) = passthrough else {
        return Ok(generated);
    };

    let what = "alexa block";
    let mut rest = passthrough.clone();
    let language = rest
        .get_mut("interactionModel")
        .and_then(|interaction| interaction.get_mut("languageModel"))
        .and_then(Value::as_object_mut);

    let (extra_intents, extra_types) = match language {
        Some(language) => (language.remove("intents"), language.remove("types")),
        None => (None, None),
    };

    let mut document = to_value(&generated, what)?;
    deep_merge(&mut document, &rest);
    let mut merged: AlexaModel = from_value(document, what)?;

    let language_model = &mut merged.interaction_model.language_model;
    if let Some(intents) = extra_intents {
        let intents: Vec<AlexaIntent> = from_value(intents, what)?;
        language_model.intents.extend(intents);
    }
    if let Some(types) = extra_types {
        let types: Vec<SlotType> = from_value(types, what)?;
        for slot_type in types {
            if !language_model.types.iter().any(|existing| existing.name == slot_type.name) {
                language_model.types.push(slot_type);
            }
        }
    }

    Ok(merged)
}

fn intent_from(intent: &AlexaIntent) -> Intent {
    let inputs = intent
        .slots
        .iter()
        .flatten()
        .map(|slot| {
            let input_type = if is_builtin(&slot.slot_type) {
                InputTypeRef::for_platform(Platform::Alexa, slot.slot_type.clone())
            } else {
                InputTypeRef::named(slot.slot_type.clone())
            };
            Input {
                alexa: non_empty(slot.extra.clone()),
                ..Input::new(slot.name.clone(), input_type)
            }
        })
        .collect();

    Intent {
        name: intent.name.clone(),
        phrases: intent.samples.clone().unwrap_or_default(),
        inputs,
        alexa: non_empty(intent.extra.clone()),
        dialogflow: None,
    }
}

fn input_type_from(slot_type: &SlotType) -> InputType {
    InputType {
        name: slot_type.name.clone(),
        values: slot_type
            .values
            .iter()
            .map(|value| TypeValue {
                value: value.name.value.clone(),
                synonyms: value.name.synonyms.clone(),
                id: value.id.clone(),
            })
            .collect(),
        alexa: non_empty(slot_type.extra.clone()),
        dialogflow: None,
    }
}
