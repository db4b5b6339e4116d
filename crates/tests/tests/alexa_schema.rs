use forge_codecs::alexa::{detect_layout, LayoutProbe};
use forge_codecs::{AlexaCodec, AlexaModel};
use forge_core::{ConvertError, InputTypeRef, LocaleMapping, Platform, ValidationError};
use forge_tests::{english_locales, hello_world, hello_world_document, OwnedData};
use serde_json::json;

#[test]
fn round_trip_keeps_owned_data() {
    let codec = AlexaCodec::new();
    let model = hello_world("en-US");

    let alexa = codec.encode_model(&model).unwrap();
    let decoded = codec.decode(&alexa).unwrap();

    assert_eq!(OwnedData::of(&decoded), OwnedData::of(&model));
    assert_eq!(decoded.invocation, "my test app");
    assert_eq!(decoded.alexa, model.alexa);
}

#[test]
fn schema_document_survives_decode_and_encode() {
    let codec = AlexaCodec::new();
    let alexa = codec.encode_model(&hello_world("en-US")).unwrap();

    let again = codec.encode_model(&codec.decode(&alexa).unwrap()).unwrap();
    assert_eq!(again.to_document().unwrap(), alexa.to_document().unwrap());
}

#[test]
fn builtin_intents_stay_in_passthrough() {
    let document = json!({
        "interactionModel": {
            "languageModel": {
                "invocationName": "my test app",
                "intents": [
                    { "name": "AMAZON.StopIntent", "samples": [] },
                    { "name": "HelloWorldIntent", "samples": ["hello"] }
                ],
                "types": []
            },
            "dialog": { "delegationStrategy": "ALWAYS" }
        }
    });
    let alexa = AlexaModel::from_document(document, "en-US.json").unwrap();
    let model = AlexaCodec::new().decode(&alexa).unwrap();

    let names: Vec<_> = model.intents.iter().map(|intent| intent.name.as_str()).collect();
    assert_eq!(names, vec!["HelloWorldIntent"]);

    let block = model.alexa.unwrap();
    assert_eq!(
        block["interactionModel"]["languageModel"]["intents"],
        json!([{ "name": "AMAZON.StopIntent", "samples": [] }])
    );
    assert_eq!(block["interactionModel"]["dialog"], json!({ "delegationStrategy": "ALWAYS" }));
}

#[test]
fn builtin_slot_types_decode_to_platform_table() {
    let alexa = AlexaCodec::new().encode_model(&hello_world("en-US")).unwrap();
    let model = AlexaCodec::new().decode(&alexa).unwrap();

    let input = &model.intent("MyNameIsIntent").unwrap().inputs[0];
    assert_eq!(
        input.input_type,
        InputTypeRef::for_platform(Platform::Alexa, "AMAZON.US_FIRST_NAME")
    );
}

#[test]
fn language_fan_out_writes_identical_models() {
    let localized = AlexaCodec::new()
        .encode(&hello_world("en"), "en", &english_locales())
        .unwrap();

    assert_eq!(localized.len(), 2);
    assert_eq!(localized[0].locale, "en-US");
    assert_eq!(localized[1].locale, "en-GB");
    assert_eq!(localized[0].model, localized[1].model);

    let layout = detect_layout(None, LayoutProbe::default());
    assert_ne!(
        layout.model_path(&localized[0].locale),
        layout.model_path(&localized[1].locale)
    );
}

#[test]
fn unmapped_language_is_config_error() {
    let err = AlexaCodec::new()
        .encode(&hello_world("de"), "de", &LocaleMapping::new())
        .unwrap_err();
    assert!(matches!(err, ConvertError::Config(_)));
}

#[test]
fn uppercase_invocation_is_rejected() {
    let mut document = hello_world_document();
    document["invocation"] = json!("MyApp");
    let model = forge_core::CanonicalModel::from_document(document, "en-US").unwrap();

    let err = AlexaCodec::new().encode_model(&model).unwrap_err();
    assert!(matches!(
        err,
        ConvertError::Validation(ValidationError::InvalidInvocation { .. })
    ));
}
