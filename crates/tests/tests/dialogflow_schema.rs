use std::path::PathBuf;

use forge_codecs::{DialogflowAgent, DialogflowCodec};
use forge_core::{CanonicalModel, InputTypeRef, Platform};
use forge_tests::{hello_world, sorted, OwnedData};
use serde_json::json;

/// Encodes, lays the agent out as files, and reads it back the way the
/// builder does after a directory walk.
fn through_files(model: &CanonicalModel, locale: &str) -> CanonicalModel {
    let codec = DialogflowCodec::new();
    let agent = codec.encode(model, locale).unwrap();
    let files = agent
        .to_files()
        .unwrap()
        .into_iter()
        .map(|file| (file.path, file.contents))
        .collect::<Vec<_>>();
    let agent = DialogflowAgent::from_files(files, &agent.language).unwrap();
    codec.decode(&agent, locale).unwrap()
}

#[test]
fn round_trip_keeps_owned_data() {
    let model = hello_world("en-US");
    let decoded = through_files(&model, "en-US");
    assert_eq!(OwnedData::of(&decoded), OwnedData::of(&model));
}

#[test]
fn round_trip_restores_inputs() {
    let decoded = sorted(through_files(&hello_world("en-US"), "en-US"));

    let city = &decoded.intent("FavoriteCityIntent").unwrap().inputs[0];
    assert_eq!(city.input_type, InputTypeRef::named("CityType"));

    let name = &decoded.intent("MyNameIsIntent").unwrap().inputs[0];
    assert_eq!(
        name.input_type,
        InputTypeRef::for_platform(Platform::Dialogflow, "@sys.given-name")
    );
    assert_eq!(decoded.dialogflow, None);
}

#[test]
fn hello_world_usersays_annotates_placeholder() {
    let model = CanonicalModel::from_document(
        json!({
            "invocation": "my test app",
            "intents": [{
                "name": "HelloWorldIntent",
                "phrases": ["Hello", "Hi {name}"],
                "inputs": [{ "name": "name", "type": "CustomName" }]
            }],
            "inputTypes": [{ "name": "CustomName", "values": [{ "value": "Bob" }] }]
        }),
        "en-US",
    )
    .unwrap();

    let files = DialogflowCodec::new()
        .encode(&model, "en-US")
        .unwrap()
        .to_files()
        .unwrap();
    let usersays = files
        .iter()
        .find(|file| file.path == PathBuf::from("intents/HelloWorldIntent_usersays_en.json"))
        .unwrap();

    assert_eq!(
        usersays.contents[1]["data"],
        json!([
            { "text": "Hi ", "userDefined": false },
            { "text": "name", "userDefined": true, "alias": "name", "meta": "@CustomName" }
        ])
    );

    let entries = files
        .iter()
        .find(|file| file.path == PathBuf::from("entities/CustomName_entries_en.json"))
        .unwrap();
    assert_eq!(entries.contents, json!([{ "value": "Bob", "synonyms": ["Bob"] }]));
}

#[test]
fn default_intents_are_always_written() {
    let files = DialogflowCodec::new()
        .encode(&hello_world("de-DE"), "de-DE")
        .unwrap()
        .to_files()
        .unwrap();
    let paths: Vec<_> = files.iter().map(|file| file.path.clone()).collect();

    assert!(paths.contains(&PathBuf::from("intents/Default Fallback Intent.json")));
    assert!(paths.contains(&PathBuf::from("intents/Default Welcome Intent.json")));
    assert!(paths.contains(&PathBuf::from("intents/MyNameIsIntent_usersays_de.json")));
}

#[test]
fn dialogflow_only_intents_pass_through() {
    let mut model = hello_world("en-US");
    model.dialogflow = Some(json!({
        "intents": [{ "name": "SmallTalkIntent", "priority": 250000 }]
    }));

    let agent = DialogflowCodec::new().encode(&model, "en-US").unwrap();
    let small_talk = agent
        .intents
        .iter()
        .find(|intent| intent.name == "SmallTalkIntent")
        .unwrap();
    assert_eq!(small_talk.priority, 250000);
    assert!(small_talk.webhook_used);
    assert!(!agent.usersays.contains_key("SmallTalkIntent"));
}
