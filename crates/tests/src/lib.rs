//! Fixtures shared by the integration tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use forge_core::{CanonicalModel, LocaleMapping};
use serde_json::{json, Value};

pub fn hello_world_document() -> Value {
    json!({
        "invocation": "my test app",
        "intents": [
            {
                "name": "HelloWorldIntent",
                "phrases": ["hello", "say hello", "say hello world"]
            },
            {
                "name": "MyNameIsIntent",
                "phrases": ["{name}", "my name is {name}", "i am {name}", "you can call me {name}"],
                "inputs": [
                    { "name": "name", "type": { "alexa": "AMAZON.US_FIRST_NAME", "dialogflow": "@sys.given-name" } }
                ]
            },
            {
                "name": "FavoriteCityIntent",
                "phrases": ["i like {city}", "{city} is my favorite"],
                "inputs": [{ "name": "city", "type": "CityType" }]
            }
        ],
        "inputTypes": [
            {
                "name": "CityType",
                "values": [
                    { "value": "berlin", "synonyms": ["capital of germany"] },
                    { "value": "paris", "id": "FR_PARIS" }
                ]
            }
        ],
        "alexa": {
            "interactionModel": {
                "languageModel": {
                    "intents": [
                        { "name": "AMAZON.CancelIntent", "samples": [] },
                        { "name": "AMAZON.HelpIntent", "samples": [] },
                        { "name": "AMAZON.StopIntent", "samples": [] }
                    ]
                }
            }
        }
    })
}

pub fn hello_world(locale: &str) -> CanonicalModel {
    CanonicalModel::from_document(hello_world_document(), locale)
        .expect("fixture model is valid")
}

pub fn english_locales() -> LocaleMapping {
    let mut mapping = LocaleMapping::new();
    mapping.insert(
        "en".to_string(),
        vec!["en-US".to_string(), "en-GB".to_string()],
    );
    mapping
}

/// Writes `document` as `<models_dir>/<locale>.json`.
pub fn write_model(models_dir: &Path, locale: &str, document: &Value) {
    forge_storage::write_tab_json(&models_dir.join(format!("{locale}.json")), document)
        .expect("fixture model is written");
}

/// Canonical intents sorted by name, for comparisons where file order is
/// not preserved.
pub fn sorted(mut model: CanonicalModel) -> CanonicalModel {
    model.intents.sort_by(|a, b| a.name.cmp(&b.name));
    model.input_types.sort_by(|a, b| a.name.cmp(&b.name));
    model
}

/// The data a canonical model owns outright: intent names with their phrase
/// sets, and custom type names with their values.
#[derive(Debug, PartialEq, Eq)]
pub struct OwnedData {
    pub intents: BTreeMap<String, BTreeSet<String>>,
    pub input_types: BTreeMap<String, Vec<(String, Vec<String>)>>,
}

impl OwnedData {
    pub fn of(model: &CanonicalModel) -> Self {
        let intents = model
            .intents
            .iter()
            .map(|intent| (intent.name.clone(), intent.phrases.iter().cloned().collect()))
            .collect();
        let input_types = model
            .input_types
            .iter()
            .map(|input_type| {
                let values = input_type
                    .values
                    .iter()
                    .map(|value| (value.value.clone(), value.synonyms.clone()))
                    .collect();
                (input_type.name.clone(), values)
            })
            .collect();
        Self {
            intents,
            input_types,
        }
    }
}
