use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{SchemaError, ValidationError};
use crate::validate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Alexa,
    Dialogflow,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Alexa, Platform::Dialogflow];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "alexa" | "alexaskill" | "alexa-skill" => Some(Self::Alexa),
            "dialogflow" | "googleaction" | "google-action" => Some(Self::Dialogflow),
            _ => None,
        }
    }

    /// Key of the passthrough namespace and of object-typed input entries.
    pub fn key(self) -> &'static str {
        match self {
            Self::Alexa => "alexa",
            Self::Dialogflow => "dialogflow",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalModel {
    #[serde(default)]
    pub invocation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intents: Vec<Intent>,
    #[serde(rename = "inputTypes", default, skip_serializing_if = "Vec::is_empty")]
    pub input_types: Vec<InputType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alexa: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogflow: Option<Value>,
}

impl CanonicalModel {
    /// Validates a raw model document and converts it into the typed model.
    pub fn from_document(document: Value, locale: &str) -> Result<Self, ValidationError> {
        validate(&document, locale)?;
        serde_json::from_value(document).map_err(|err| ValidationError::Malformed {
            locale: locale.to_string(),
            message: err.to_string(),
        })
    }

    pub fn to_document(&self) -> Result<Value, SchemaError> {
        serde_json::to_value(self).map_err(|source| SchemaError::Json {
            file: "canonical model".to_string(),
            source,
        })
    }

    pub fn intent(&self, name: &str) -> Option<&Intent> {
        self.intents.iter().find(|intent| intent.name == name)
    }

    pub fn input_type(&self, name: &str) -> Option<&InputType> {
        self.input_types.iter().find(|input_type| input_type.name == name)
    }

    pub fn passthrough(&self, platform: Platform) -> Option<&Value> {
        match platform {
            Platform::Alexa => self.alexa.as_ref(),
            Platform::Dialogflow => self.dialogflow.as_ref(),
        }
    }

    pub fn passthrough_mut(&mut self, platform: Platform) -> &mut Option<Value> {
        match platform {
            Platform::Alexa => &mut self.alexa,
            Platform::Dialogflow => &mut self.dialogflow,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub name: String,
    #[serde(default)]
    pub phrases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<Input>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alexa: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogflow: Option<Value>,
}

impl Intent {
    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|input| input.name == name)
    }

    pub fn passthrough(&self, platform: Platform) -> Option<&Value> {
        match platform {
            Platform::Alexa => self.alexa.as_ref(),
            Platform::Dialogflow => self.dialogflow.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    pub name: String,
    #[serde(rename = "type")]
    pub input_type: InputTypeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alexa: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogflow: Option<Value>,
}

impl Input {
    pub fn new(name: impl Into<String>, input_type: InputTypeRef) -> Self {
        Self {
            name: name.into(),
            input_type,
            alexa: None,
            dialogflow: None,
        }
    }

    pub fn passthrough(&self, platform: Platform) -> Option<&Value> {
        match platform {
            Platform::Alexa => self.alexa.as_ref(),
            Platform::Dialogflow => self.dialogflow.as_ref(),
        }
    }
}

/// Either a bare type name or a per-platform type table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputTypeRef {
    Named(String),
    PerPlatform(BTreeMap<String, String>),
}

impl InputTypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn for_platform(platform: Platform, name: impl Into<String>) -> Self {
        let mut table = BTreeMap::new();
        table.insert(platform.key().to_string(), name.into());
        Self::PerPlatform(table)
    }

    /// Type name `platform` sees for this input, if it sees one.
    pub fn type_for(&self, platform: Platform) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::PerPlatform(table) => table.get(platform.key()).map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputType {
    pub name: String,
    pub values: Vec<TypeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alexa: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogflow: Option<Value>,
}

impl InputType {
    pub fn passthrough(&self, platform: Platform) -> Option<&Value> {
        match platform {
            Platform::Alexa => self.alexa.as_ref(),
            Platform::Dialogflow => self.dialogflow.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeValue {
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl TypeValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            synonyms: Vec::new(),
            id: None,
        }
    }

    pub fn with_synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_platform_aliases() {
        assert_eq!(Platform::parse("AlexaSkill"), Some(Platform::Alexa));
        assert_eq!(Platform::parse("googleAction"), Some(Platform::Dialogflow));
        assert_eq!(Platform::parse("bixby"), None);
    }

    #[test]
    fn input_type_accepts_string_or_table() {
        let input: Input = serde_json::from_value(json!({
            "name": "city",
            "type": { "alexa": "AMAZON.US_CITY", "dialogflow": "@sys.geo-city" }
        }))
        .unwrap();
        match input.input_type {
            InputTypeRef::PerPlatform(table) => {
                assert_eq!(table.get("alexa").map(String::as_str), Some("AMAZON.US_CITY"));
            }
            other => panic!("unexpected type ref {other:?}"),
        }

        let input: Input =
            serde_json::from_value(json!({ "name": "name", "type": "CustomName" })).unwrap();
        assert_eq!(input.input_type, InputTypeRef::named("CustomName"));
    }

    #[test]
    fn omits_empty_sections_when_serialized() {
        let model = CanonicalModel {
            invocation: "my test app".to_string(),
            intents: vec![Intent {
                name: "HelloWorldIntent".to_string(),
                phrases: vec!["hello".to_string()],
                ..Intent::default()
            }],
            ..CanonicalModel::default()
        };

        let doc = serde_json::to_value(&model).unwrap();
        assert_eq!(
            doc,
            json!({
                "invocation": "my test app",
                "intents": [{ "name": "HelloWorldIntent", "phrases": ["hello"] }]
            })
        );
    }
}
