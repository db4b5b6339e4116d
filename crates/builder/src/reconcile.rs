//! Folds data owned by other platforms back into a freshly decoded model.

use forge_core::{CanonicalModel, Input, InputTypeRef, Intent, Platform};
use serde_json::Value;

/// `decoded` came from `platform`'s files. Passthrough blocks of every other
/// platform are taken from `existing`, matched by intent, input and type name.
/// Dialogflow carries no invocation name, so an empty one is filled in too.
pub fn reconcile(
    mut decoded: CanonicalModel,
    existing: &CanonicalModel,
    platform: Platform,
) -> CanonicalModel {
    if decoded.invocation.is_empty() {
        decoded.invocation = existing.invocation.clone();
    }
    if platform == Platform::Dialogflow {
        restore_sampleless_intents(&mut decoded, existing);
        restore_unsent_types(&mut decoded, existing);
    }

    for other in Platform::ALL.into_iter().filter(|other| *other != platform) {
        *decoded.passthrough_mut(other) = existing.passthrough(other).cloned();

        for intent in &mut decoded.intents {
            let Some(previous) = existing.intent(&intent.name) else {
                continue;
            };
            *platform_slot(&mut intent.alexa, &mut intent.dialogflow, other) =
                previous.passthrough(other).cloned();

            for input in &mut intent.inputs {
                if let Some(previous) = previous.input(&input.name) {
                    restore_input(input, previous, platform, other);
                }
            }
        }

        for input_type in &mut decoded.input_types {
            if let Some(previous) = existing.input_type(&input_type.name) {
                *platform_slot(&mut input_type.alexa, &mut input_type.dialogflow, other) =
                    previous.passthrough(other).cloned();
            }
        }
    }

    decoded
}

/// An intent with no phrases and no inputs decodes as a `dialogflow.intents`
/// entry. Entries the stored model holds as canonical intents move back.
fn restore_sampleless_intents(decoded: &mut CanonicalModel, existing: &CanonicalModel) {
    let Some(Value::Object(block)) = decoded.dialogflow.as_mut() else {
        return;
    };
    let Some(Value::Array(entries)) = block.remove("intents") else {
        return;
    };

    let mut kept = Vec::new();
    for entry in entries {
        let Value::Object(mut fields) = entry else {
            kept.push(entry);
            continue;
        };
        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| {
                existing
                    .intent(name)
                    .is_some_and(|intent| intent.phrases.is_empty() && intent.inputs.is_empty())
            })
            .map(str::to_string);
        let Some(name) = name else {
            kept.push(Value::Object(fields));
            continue;
        };

        fields.remove("name");
        decoded.intents.push(Intent {
            name,
            dialogflow: (!fields.is_empty()).then_some(Value::Object(fields)),
            ..Intent::default()
        });
    }

    if !kept.is_empty() {
        block.insert("intents".to_string(), Value::Array(kept));
    }
    if block.is_empty() {
        decoded.dialogflow = None;
    }
}

/// Input types no intent uses on Dialogflow never reach the agent, so the
/// decoded model cannot carry them.
fn restore_unsent_types(decoded: &mut CanonicalModel, existing: &CanonicalModel) {
    let sent = |name: &str| {
        existing
            .intents
            .iter()
            .flat_map(|intent| &intent.inputs)
            .filter_map(|input| input.input_type.type_for(Platform::Dialogflow))
            .any(|used| used.trim_start_matches('@') == name)
    };

    for input_type in &existing.input_types {
        if !sent(&input_type.name) && decoded.input_type(&input_type.name).is_none() {
            decoded.input_types.push(input_type.clone());
        }
    }
}

fn platform_slot<'a, T>(
    alexa: &'a mut T,
    dialogflow: &'a mut T,
    platform: Platform,
) -> &'a mut T {
    match platform {
        Platform::Alexa => alexa,
        Platform::Dialogflow => dialogflow,
    }
}

fn restore_input(input: &mut Input, previous: &Input, platform: Platform, other: Platform) {
    *platform_slot(&mut input.alexa, &mut input.dialogflow, other) =
        previous.passthrough(other).cloned();

    let InputTypeRef::PerPlatform(table) = &previous.input_type else {
        return;
    };
    let Some(other_type) = table.get(other.key()) else {
        return;
    };

    let own_type = match &input.input_type {
        InputTypeRef::Named(name) => Some(name.clone()),
        InputTypeRef::PerPlatform(own) => own.get(platform.key()).cloned(),
    };
    let mut merged = table.clone();
    merged.insert(other.key().to_string(), other_type.clone());
    match own_type {
        Some(own_type) => {
            merged.insert(platform.key().to_string(), own_type);
        }
        None => {
            merged.remove(platform.key());
        }
    }
    input.input_type = InputTypeRef::PerPlatform(merged);
}
