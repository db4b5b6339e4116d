//! Agent export codec: one file per intent, usersays per intent, entity and entries per type.

mod decode;
mod encode;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use forge_core::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{from_value, to_value, PlatformFile};

pub const SYSTEM_ENTITY_PREFIX: &str = "@sys.";
pub const FALLBACK_INTENT_NAME: &str = "Default Fallback Intent";
pub const WELCOME_INTENT_NAME: &str = "Default Welcome Intent";
pub const WELCOME_EVENT: &str = "WELCOME";

const INTENTS_DIR: &str = "intents";
const ENTITIES_DIR: &str = "entities";
const USERSAYS_MARKER: &str = "_usersays_";
const ENTRIES_MARKER: &str = "_entries_";

const DEFAULT_PRIORITY: i64 = 500_000;

/// Regional variants that get their own usersays and entries files.
const REGIONAL_LANGUAGES: [&str; 4] = ["pt-br", "zh-cn", "zh-hk", "zh-tw"];

fn enabled() -> bool {
    true
}

fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

pub fn dialogflow_language(locale: &str) -> String {
    let lower = locale.to_lowercase();
    if REGIONAL_LANGUAGES.contains(&lower.as_str()) {
        return lower;
    }
    lower.split('-').next().unwrap_or_default().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogflowIntent {
    pub name: String,
    #[serde(default = "enabled")]
    pub auto: bool,
    #[serde(default)]
    pub contexts: Vec<Value>,
    #[serde(default)]
    pub responses: Vec<IntentResponse>,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default = "enabled")]
    pub webhook_used: bool,
    #[serde(default)]
    pub webhook_for_slot_filling: bool,
    #[serde(default)]
    pub fallback_intent: bool,
    #[serde(default)]
    pub events: Vec<IntentEvent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DialogflowIntent {
    pub fn is_fallback(&self) -> bool {
        self.fallback_intent
    }

    pub fn is_welcome(&self) -> bool {
        self.events
            .first()
            .is_some_and(|event| event.name == WELCOME_EVENT)
    }

    pub fn parameters(&self) -> &[IntentParameter] {
        self.responses
            .first()
            .map(|response| response.parameters.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    #[serde(default)]
    pub parameters: Vec<IntentParameter>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentParameter {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub is_list: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentEvent {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSaysRecord {
    pub data: Vec<UserSaysChunk>,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub count: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSaysChunk {
    pub text: String,
    #[serde(default)]
    pub user_defined: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogflowEntity {
    pub name: String,
    #[serde(default = "enabled")]
    pub is_overridable: bool,
    #[serde(default)]
    pub is_enum: bool,
    #[serde(default)]
    pub automated_expansion: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEntry {
    pub value: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

/// The per-locale file set of an agent export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogflowAgent {
    /// Suffix of usersays and entries files, see [`dialogflow_language`].
    pub language: String,
    pub intents: Vec<DialogflowIntent>,
    /// Keyed by intent name.
    pub usersays: BTreeMap<String, Vec<UserSaysRecord>>,
    pub entities: Vec<DialogflowEntity>,
    /// Keyed by entity name.
    pub entries: BTreeMap<String, Vec<EntityEntry>>,
}

impl DialogflowAgent {
    /// Lays the agent out as files relative to the agent directory.
    pub fn to_files(&self) -> Result<Vec<PlatformFile>, SchemaError> {
        let language = &self.language;
        let mut files = Vec::new();

        for intent in &self.intents {
            files.push(PlatformFile {
                path: Path::new(INTENTS_DIR).join(format!("{}.json", intent.name)),
                contents: to_value(intent, &intent.name)?,
                shared: true,
            });
            if let Some(records) = self.usersays.get(&intent.name) {
                files.push(PlatformFile {
                    path: Path::new(INTENTS_DIR)
                        .join(format!("{}{USERSAYS_MARKER}{language}.json", intent.name)),
                    contents: to_value(records, &intent.name)?,
                    shared: false,
                });
            }
        }

        for entity in &self.entities {
            files.push(PlatformFile {
                path: Path::new(ENTITIES_DIR).join(format!("{}.json", entity.name)),
                contents: to_value(entity, &entity.name)?,
                shared: true,
            });
            if let Some(entries) = self.entries.get(&entity.name) {
                files.push(PlatformFile {
                    path: Path::new(ENTITIES_DIR)
                        .join(format!("{}{ENTRIES_MARKER}{language}.json", entity.name)),
                    contents: to_value(entries, &entity.name)?,
                    shared: false,
                });
            }
        }

        Ok(files)
    }

    /// Classifies exported files by directory and name. Usersays and entries
    /// files for other languages are ignored.
    pub fn from_files<I>(files: I, language: &str) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (PathBuf, Value)>,
    {
        let mut agent = Self {
            language: language.to_string(),
            ..Self::default()
        };

        for (path, contents) in files {
            let file = path.display().to_string();
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let dir = path
                .parent()
                .and_then(|parent| parent.file_name())
                .and_then(|name| name.to_str())
                .unwrap_or_default();

            match dir {
                INTENTS_DIR => match stem.split_once(USERSAYS_MARKER) {
                    Some((intent, suffix)) if suffix == language => {
                        agent.usersays.insert(intent.to_string(), from_value(contents, &file)?);
                    }
                    Some(_) => {}
                    None => agent.intents.push(intent_from_document(contents, &file)?),
                },
                ENTITIES_DIR => match stem.split_once(ENTRIES_MARKER) {
                    Some((entity, suffix)) if suffix == language => {
                        agent.entries.insert(entity.to_string(), from_value(contents, &file)?);
                    }
                    Some(_) => {}
                    None => agent.entities.push(entity_from_document(contents, &file)?),
                },
                _ => {}
            }
        }

        agent.intents.sort_by(|a, b| a.name.cmp(&b.name));
        agent.entities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(agent)
    }
}

fn intent_from_document(contents: Value, file: &str) -> Result<DialogflowIntent, SchemaError> {
    if !contents.is_object() {
        return Err(SchemaError::shape(file, "intent file must be a JSON object"));
    }
    if contents.get("name").is_none() {
        return Err(SchemaError::missing(file, "name"));
    }
    from_value(contents, file)
}

fn entity_from_document(contents: Value, file: &str) -> Result<DialogflowEntity, SchemaError> {
    if !contents.is_object() {
        return Err(SchemaError::shape(file, "entity file must be a JSON object"));
    }
    if contents.get("name").is_none() {
        return Err(SchemaError::missing(file, "name"));
    }
    from_value(contents, file)
}

pub(crate) fn custom_intent_defaults(name: &str) -> Value {
    json!({
        "name": name,
        "auto": true,
        "contexts": [],
        "responses": [{
            "resetContexts": false,
            "affectedContexts": [],
            "parameters": [],
            "defaultResponsePlatforms": {},
            "speech": []
        }],
        "priority": DEFAULT_PRIORITY,
        "webhookUsed": true,
        "webhookForSlotFilling": false,
        "fallbackIntent": false,
        "events": []
    })
}

pub(crate) fn fallback_intent_defaults() -> Value {
    json!({
        "name": FALLBACK_INTENT_NAME,
        "auto": true,
        "contexts": [],
        "responses": [{
            "resetContexts": false,
            "action": "input.unknown",
            "affectedContexts": [],
            "parameters": [],
            "defaultResponsePlatforms": {},
            "speech": []
        }],
        "priority": DEFAULT_PRIORITY,
        "webhookUsed": true,
        "webhookForSlotFilling": false,
        "fallbackIntent": true,
        "events": []
    })
}

pub(crate) fn welcome_intent_defaults() -> Value {
    json!({
        "name": WELCOME_INTENT_NAME,
        "auto": true,
        "contexts": [],
        "responses": [{
            "resetContexts": false,
            "action": "input.welcome",
            "affectedContexts": [],
            "parameters": [],
            "defaultResponsePlatforms": {},
            "speech": []
        }],
        "priority": DEFAULT_PRIORITY,
        "webhookUsed": true,
        "webhookForSlotFilling": false,
        "fallbackIntent": false,
        "events": [{ "name": WELCOME_EVENT }]
    })
}

pub(crate) fn entity_defaults(name: &str) -> Value {
    json!({
        "name": name,
        "isOverridable": true,
        "isEnum": false,
        "isRegexp": false,
        "automatedExpansion": false,
        "allowFuzzyExtraction": false
    })
}

pub(crate) fn parameter_defaults(name: &str) -> Value {
    json!({
        "name": name,
        "value": format!("${name}"),
        "isList": false
    })
}

/// Dialogflow codec; see [`DialogflowCodec::encode`] and [`DialogflowCodec::decode`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DialogflowCodec;

impl DialogflowCodec {
    pub fn new() -> Self {
        Self
    }
}
