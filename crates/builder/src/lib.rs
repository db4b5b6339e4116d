pub mod reconcile;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use forge_codecs::alexa::{detect_layout, LayoutProbe, SkillLayout};
use forge_codecs::{
    dialogflow_language, AlexaCodec, AlexaModel, DialogflowAgent, DialogflowCodec,
};
use forge_core::{CanonicalModel, LocaleMapping, Platform, ProjectConfig};
use forge_observability::ConversionMetrics;
use forge_storage::{read_json, read_tree, reset_dir, write_json, write_tree, ModelStore};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub use reconcile::reconcile;

const ALEXA_DIR: &str = "alexa";
const DIALOGFLOW_DIR: &str = "dialogflow";

/// One unit of concurrent work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTask {
    pub locale: String,
    pub platform: Platform,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub run_id: Uuid,
    pub locale: String,
    pub platform: Platform,
    pub files: Vec<PathBuf>,
    /// Shared Dialogflow descriptors this task rewrote with contents that
    /// differ from what another locale wrote earlier in the run.
    pub shared_conflicts: Vec<PathBuf>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReverseReport {
    pub run_id: Uuid,
    pub locale: String,
    pub platform: Platform,
    pub intents: usize,
    pub input_types: usize,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BuilderSettings {
    pub output_dir: PathBuf,
    pub locales: LocaleMapping,
    pub ask_cli_version: Option<String>,
}

impl BuilderSettings {
    pub fn from_config(config: &ProjectConfig, output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            locales: config.locales.clone(),
            ask_cli_version: config.alexa.ask_cli_version.clone(),
        }
    }
}

/// Converts canonical models to platform files and back.
///
/// Safe to share between tasks: the store guards its own cache and Dialogflow
/// writes, whose intent files are shared by every language, are serialized.
pub struct ModelBuilder<S> {
    store: Arc<S>,
    settings: BuilderSettings,
    layout: Box<dyn SkillLayout>,
    metrics: Arc<ConversionMetrics>,
    run_id: Uuid,
    alexa: AlexaCodec,
    dialogflow: DialogflowCodec,
    /// Shared Dialogflow descriptors written so far, with the writing locale.
    dialogflow_writes: Mutex<HashMap<PathBuf, (String, Value)>>,
}

impl<S> ModelBuilder<S>
where
    S: ModelStore,
{
    pub fn new(store: Arc<S>, settings: BuilderSettings, metrics: Arc<ConversionMetrics>) -> Self {
        let alexa_dir = settings.output_dir.join(ALEXA_DIR);
        let probe = LayoutProbe {
            has_skill_package: alexa_dir.join("skill-package").is_dir(),
            has_legacy_models: alexa_dir.join("models").is_dir(),
        };
        let layout = detect_layout(settings.ask_cli_version.as_deref(), probe);

        Self {
            store,
            settings,
            layout,
            metrics,
            run_id: Uuid::new_v4(),
            alexa: AlexaCodec::new(),
            dialogflow: DialogflowCodec::new(),
            dialogflow_writes: Mutex::new(HashMap::new()),
        }
    }

    pub fn layout_name(&self) -> &'static str {
        self.layout.name()
    }

    pub fn platform_dir(&self, platform: Platform) -> PathBuf {
        match platform {
            Platform::Alexa => self.settings.output_dir.join(ALEXA_DIR),
            Platform::Dialogflow => self.settings.output_dir.join(DIALOGFLOW_DIR),
        }
    }

    /// Every (locale, platform) pair, locales outermost.
    pub fn plan(locales: &[String], platforms: &[Platform]) -> Vec<BuildTask> {
        locales
            .iter()
            .flat_map(|locale| {
                platforms.iter().map(move |platform| BuildTask {
                    locale: locale.clone(),
                    platform: *platform,
                })
            })
            .collect()
    }

    /// Removes previously generated model files of `platform`.
    pub fn clean(&self, platform: Platform) -> Result<()> {
        let dir = self.platform_dir(platform);
        match platform {
            Platform::Alexa => reset_dir(&dir.join(self.layout.models_dir()))?,
            Platform::Dialogflow => {
                reset_dir(&dir.join("intents"))?;
                reset_dir(&dir.join("entities"))?;
            }
        }
        Ok(())
    }

    /// Forward build of one task. Returns the paths written, relative to the
    /// platform directory.
    #[instrument(skip(self), fields(run_id = %self.run_id))]
    pub fn build(&self, task: &BuildTask) -> Result<BuildReport> {
        let started = Instant::now();
        self.metrics.inc_task();

        let result = self.build_inner(task);
        self.metrics.observe_task(started.elapsed());
        if result.is_err() {
            self.metrics.inc_failure();
        }

        let (files, shared_conflicts) = result?;
        self.metrics.add_files_written(files.len());
        info!(
            locale = %task.locale,
            platform = %task.platform,
            files = files.len(),
            "build task finished"
        );

        Ok(BuildReport {
            run_id: self.run_id,
            locale: task.locale.clone(),
            platform: task.platform,
            files,
            shared_conflicts,
            finished_at: Utc::now(),
        })
    }

    fn build_inner(&self, task: &BuildTask) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        let model = self.store.get(&task.locale)?;
        self.metrics.inc_model_loaded();
        let dir = self.platform_dir(task.platform);

        match task.platform {
            Platform::Alexa => {
                let models = self
                    .alexa
                    .encode(&model, &task.locale, &self.settings.locales)
                    .with_context(|| format!("alexa build failed for {}", task.locale))?;

                let mut written = Vec::with_capacity(models.len());
                for localized in models {
                    let path = self.layout.model_path(&localized.locale);
                    write_json(&dir.join(&path), &localized.model.to_document()?)?;
                    written.push(path);
                }
                Ok((written, Vec::new()))
            }
            Platform::Dialogflow => {
                let agent = self
                    .dialogflow
                    .encode(&model, &task.locale)
                    .with_context(|| format!("dialogflow build failed for {}", task.locale))?;
                let files = agent.to_files()?;

                let mut shared = self.dialogflow_writes.lock();
                let mut conflicts = Vec::new();
                for file in files.iter().filter(|file| file.shared) {
                    let previous = shared.insert(
                        file.path.clone(),
                        (task.locale.clone(), file.contents.clone()),
                    );
                    if let Some((owner, contents)) = previous {
                        if owner != task.locale && contents != file.contents {
                            warn!(
                                path = %file.path.display(),
                                locale = %task.locale,
                                previous = %owner,
                                "shared dialogflow descriptor differs between locales, last write wins"
                            );
                            conflicts.push(file.path.clone());
                        }
                    }
                }
                write_tree(
                    &dir,
                    files.iter().map(|file| (file.path.as_path(), &file.contents)),
                )?;
                Ok((files.into_iter().map(|file| file.path).collect(), conflicts))
            }
        }
    }

    /// Reads `platform`'s files for `locale` and writes the canonical model.
    /// Data of other platforms already in the stored model is kept.
    #[instrument(skip(self), fields(run_id = %self.run_id))]
    pub fn reverse(&self, platform: Platform, locale: &str) -> Result<ReverseReport> {
        let started = Instant::now();
        self.metrics.inc_task();

        let result = self.reverse_inner(platform, locale);
        self.metrics.observe_task(started.elapsed());
        if result.is_err() {
            self.metrics.inc_failure();
        }

        let model = result?;
        info!(
            locale,
            platform = %platform,
            intents = model.intents.len(),
            "reverse task finished"
        );

        Ok(ReverseReport {
            run_id: self.run_id,
            locale: locale.to_string(),
            platform,
            intents: model.intents.len(),
            input_types: model.input_types.len(),
            finished_at: Utc::now(),
        })
    }

    fn reverse_inner(&self, platform: Platform, locale: &str) -> Result<CanonicalModel> {
        let decoded = match platform {
            Platform::Alexa => self.read_alexa(locale)?,
            Platform::Dialogflow => self.read_dialogflow(locale)?,
        };

        self.store.invalidate(locale);
        let model = if self.store.contains(locale) {
            let existing = self
                .store
                .get(locale)
                .with_context(|| format!("failed loading stored model for {locale}"))?;
            reconcile(decoded, &existing, platform)
        } else {
            debug!(locale, "no stored model, keeping decoded model as is");
            decoded
        };

        let model = CanonicalModel::from_document(model.to_document()?, locale)
            .with_context(|| format!("reversed model for {locale} is invalid"))?;
        self.store.put(locale, &model)?;
        Ok(model)
    }

    fn read_alexa(&self, locale: &str) -> Result<CanonicalModel> {
        let path = self.platform_dir(Platform::Alexa).join(self.layout.model_path(locale));
        let document = read_json(&path)?;
        let alexa = AlexaModel::from_document(document, &path.display().to_string())?;
        Ok(self.alexa.decode(&alexa)?)
    }

    fn read_dialogflow(&self, locale: &str) -> Result<CanonicalModel> {
        let dir = self.platform_dir(Platform::Dialogflow);
        let files = read_tree(&dir)?;
        if files.is_empty() {
            bail!("no dialogflow files found in {}", dir.display());
        }
        let agent = DialogflowAgent::from_files(files, &dialogflow_language(locale))?;
        Ok(self.dialogflow.decode(&agent, locale)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::{Input, InputType, InputTypeRef, Intent, TypeValue};
    use forge_storage::{write_json, FsModelStore, MemoryModelStore};
    use serde_json::json;
    use std::path::Path;

    fn hello_world() -> CanonicalModel {
        CanonicalModel {
            invocation: "my test app".to_string(),
            intents: vec![Intent {
                name: "HelloWorldIntent".to_string(),
                phrases: vec!["hello".to_string(), "my name is {name}".to_string()],
                inputs: vec![Input::new("name", InputTypeRef::named("CustomName"))],
                ..Intent::default()
            }],
            input_types: vec![InputType {
                name: "CustomName".to_string(),
                values: vec![TypeValue::new("Bob").with_synonyms(["Bobby"])],
                ..InputType::default()
            }],
            ..CanonicalModel::default()
        }
    }

    fn builder(dir: &Path, store: MemoryModelStore) -> ModelBuilder<MemoryModelStore> {
        let mut locales = LocaleMapping::new();
        locales.insert("en".to_string(), vec!["en-US".to_string(), "en-GB".to_string()]);
        let settings = BuilderSettings {
            output_dir: dir.to_path_buf(),
            locales,
            ask_cli_version: Some("2.22.4".to_string()),
        };
        ModelBuilder::new(Arc::new(store), settings, ConversionMetrics::shared())
    }

    #[test]
    fn plans_every_locale_platform_pair() {
        let tasks = ModelBuilder::<MemoryModelStore>::plan(
            &["en".to_string(), "de-DE".to_string()],
            &Platform::ALL,
        );
        assert_eq!(tasks.len(), 4);
        assert_eq!(
            tasks[1],
            BuildTask {
                locale: "en".to_string(),
                platform: Platform::Dialogflow,
            }
        );
    }

    #[test]
    fn alexa_build_fans_out_locales() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryModelStore::new().with_model("en", hello_world());
        let builder = builder(dir.path(), store);

        let report = builder
            .build(&BuildTask {
                locale: "en".to_string(),
                platform: Platform::Alexa,
            })
            .unwrap();

        assert_eq!(report.files.len(), 2);
        let alexa_dir = builder.platform_dir(Platform::Alexa);
        let us = read_json(&alexa_dir.join(&report.files[0])).unwrap();
        let gb = read_json(&alexa_dir.join(&report.files[1])).unwrap();
        assert_eq!(us, gb);
        assert!(report.files[0].ends_with("en-US.json"));
        assert_eq!(builder.layout_name(), "skill-package");
    }

    #[test]
    fn dialogflow_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryModelStore::new().with_model("en-US", hello_world());
        let builder = builder(dir.path(), store);

        let report = builder
            .build(&BuildTask {
                locale: "en-US".to_string(),
                platform: Platform::Dialogflow,
            })
            .unwrap();
        assert!(report
            .files
            .contains(&PathBuf::from("intents/HelloWorldIntent_usersays_en.json")));

        builder.reverse(Platform::Dialogflow, "en-US").unwrap();
        let model = builder.store.get("en-US").unwrap();
        assert_eq!(*model, hello_world());
    }

    #[test]
    fn failed_task_is_counted() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = hello_world();
        model.invocation = "My Test App".to_string();
        let builder = builder(dir.path(), MemoryModelStore::new().with_model("en-US", model));

        let err = builder
            .build(&BuildTask {
                locale: "en-US".to_string(),
                platform: Platform::Alexa,
            })
            .unwrap_err();
        assert!(err.to_string().contains("alexa build failed"));

        let snapshot = builder.metrics.snapshot();
        assert_eq!(snapshot.tasks_total, 1);
        assert_eq!(snapshot.tasks_failed, 1);
    }

    #[test]
    fn reverse_refuses_to_replace_unreadable_model() {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join("models");
        let stored = json!({
            "invocation": "my test app",
            "intents": [{ "name": "HelloWorldIntent", "phrases": ["hello"], "alexa": { "x": 1 } }],
            "inputTypes": [{ "name": "Broken", "values": [] }],
            "alexa": { "interactionModel": {} }
        });
        write_json(&models.join("en-US.json"), &stored).unwrap();

        let source = builder(
            dir.path(),
            MemoryModelStore::new().with_model("en-US", hello_world()),
        );
        source
            .build(&BuildTask {
                locale: "en-US".to_string(),
                platform: Platform::Dialogflow,
            })
            .unwrap();

        let settings = source.settings.clone();
        let builder = ModelBuilder::new(
            Arc::new(FsModelStore::new(&models)),
            settings,
            ConversionMetrics::shared(),
        );
        let err = builder.reverse(Platform::Dialogflow, "en-US").unwrap_err();
        assert!(err.to_string().contains("failed loading stored model"));
        assert_eq!(read_json(&models.join("en-US.json")).unwrap(), stored);
    }

    #[test]
    fn reverse_without_stored_model_writes_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let source = builder(
            dir.path(),
            MemoryModelStore::new().with_model("en-US", hello_world()),
        );
        source
            .build(&BuildTask {
                locale: "en-US".to_string(),
                platform: Platform::Dialogflow,
            })
            .unwrap();

        let fresh = ModelBuilder::new(
            Arc::new(MemoryModelStore::new()),
            source.settings.clone(),
            ConversionMetrics::shared(),
        );
        let report = fresh.reverse(Platform::Dialogflow, "en-US").unwrap();
        assert_eq!(report.intents, 1);
        assert_eq!(fresh.store.get("en-US").unwrap().invocation, "");
    }

    #[test]
    fn differing_shared_descriptor_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut german = hello_world();
        german.intents[0].dialogflow = Some(json!({ "priority": 250000 }));
        let store = MemoryModelStore::new()
            .with_model("en-US", hello_world())
            .with_model("de-DE", german);
        let builder = builder(dir.path(), store);

        let first = builder
            .build(&BuildTask {
                locale: "en-US".to_string(),
                platform: Platform::Dialogflow,
            })
            .unwrap();
        assert!(first.shared_conflicts.is_empty());

        let second = builder
            .build(&BuildTask {
                locale: "de-DE".to_string(),
                platform: Platform::Dialogflow,
            })
            .unwrap();
        assert_eq!(
            second.shared_conflicts,
            vec![PathBuf::from("intents/HelloWorldIntent.json")]
        );
    }
}
