use std::sync::Arc;

use forge_builder::{BuildTask, BuilderSettings, ModelBuilder};
use forge_core::{Platform, ProjectConfig};
use forge_observability::ConversionMetrics;
use forge_storage::{read_json, FsModelStore, ModelStore};
use forge_tests::{english_locales, hello_world, hello_world_document, write_model};
use serde_json::json;

fn settings(output_dir: &std::path::Path, ask_cli_version: Option<&str>) -> BuilderSettings {
    BuilderSettings {
        output_dir: output_dir.to_path_buf(),
        locales: english_locales(),
        ask_cli_version: ask_cli_version.map(str::to_string),
    }
}

#[test]
fn builds_every_planned_task() {
    let project = tempfile::tempdir().unwrap();
    let models = project.path().join("models");
    write_model(&models, "en", &hello_world_document());
    write_model(&models, "de-DE", &hello_world_document());

    let store = Arc::new(FsModelStore::new(&models));
    let locales = store.locales().unwrap();
    assert_eq!(locales, vec!["de-DE", "en"]);

    let builder = ModelBuilder::new(
        store,
        settings(&project.path().join("platforms"), Some("1.7.23")),
        ConversionMetrics::shared(),
    );
    assert_eq!(builder.layout_name(), "legacy");

    for task in ModelBuilder::<FsModelStore>::plan(&locales, &Platform::ALL) {
        builder.build(&task).unwrap();
    }

    let alexa = builder.platform_dir(Platform::Alexa);
    let us = read_json(&alexa.join("models/en-US.json")).unwrap();
    let gb = read_json(&alexa.join("models/en-GB.json")).unwrap();
    assert_eq!(us, gb);
    assert!(alexa.join("models/de-DE.json").exists());

    let dialogflow = builder.platform_dir(Platform::Dialogflow);
    assert!(dialogflow.join("intents/MyNameIsIntent_usersays_en.json").exists());
    assert!(dialogflow.join("intents/MyNameIsIntent_usersays_de.json").exists());
    assert!(dialogflow.join("entities/CityType_entries_de.json").exists());
}

#[test]
fn reverse_alexa_keeps_dialogflow_data() {
    let project = tempfile::tempdir().unwrap();
    let models = project.path().join("models");
    let mut document = hello_world_document();
    document["intents"][0]["dialogflow"] = json!({ "priority": 750000 });
    write_model(&models, "en-US", &document);

    let store = Arc::new(FsModelStore::new(&models));
    let builder = ModelBuilder::new(
        Arc::clone(&store),
        settings(&project.path().join("platforms"), None),
        ConversionMetrics::shared(),
    );

    builder
        .build(&BuildTask {
            locale: "en-US".to_string(),
            platform: Platform::Alexa,
        })
        .unwrap();

    let path = builder
        .platform_dir(Platform::Alexa)
        .join("skill-package/interactionModels/custom/en-US.json");
    let mut alexa = read_json(&path).unwrap();
    alexa["interactionModel"]["languageModel"]["invocationName"] = json!("renamed app");
    forge_storage::write_json(&path, &alexa).unwrap();

    let report = builder.reverse(Platform::Alexa, "en-US").unwrap();
    assert_eq!(report.intents, 3);

    store.invalidate("en-US");
    let model = store.get("en-US").unwrap();
    assert_eq!(model.invocation, "renamed app");

    let hello = model.intent("HelloWorldIntent").unwrap();
    assert_eq!(hello.dialogflow, Some(json!({ "priority": 750000 })));

    let name = &model.intent("MyNameIsIntent").unwrap().inputs[0];
    assert_eq!(name.input_type, hello_world("en-US").intents[1].inputs[0].input_type);
}

#[test]
fn missing_model_fails_only_its_task() {
    let project = tempfile::tempdir().unwrap();
    let models = project.path().join("models");
    write_model(&models, "en-US", &hello_world_document());

    let metrics = ConversionMetrics::shared();
    let builder = ModelBuilder::new(
        Arc::new(FsModelStore::new(&models)),
        settings(&project.path().join("platforms"), None),
        Arc::clone(&metrics),
    );

    let tasks = ModelBuilder::<FsModelStore>::plan(
        &["en-US".to_string(), "fr-FR".to_string()],
        &[Platform::Dialogflow],
    );
    let outcomes: Vec<_> = tasks.iter().map(|task| builder.build(task)).collect();

    assert!(outcomes[0].is_ok());
    assert!(outcomes[1].is_err());
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.tasks_total, 2);
    assert_eq!(snapshot.tasks_failed, 1);
}

#[test]
fn config_supplies_builder_settings() {
    let config = ProjectConfig::from_toml_str(
        r#"
        [locales]
        en = ["en-US", "en-GB"]

        [alexa]
        ask_cli_version = "2.30.0"
        "#,
        std::path::Path::new("nluforge.toml"),
    )
    .unwrap();

    let settings = BuilderSettings::from_config(&config, "out".into());
    assert_eq!(settings.locales, english_locales());
    assert_eq!(settings.ask_cli_version.as_deref(), Some("2.30.0"));
}
