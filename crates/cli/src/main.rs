use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use forge_builder::{BuildTask, BuilderSettings, ModelBuilder};
use forge_core::{to_tokens, validate, Platform, ProjectConfig, CONFIG_FILE_NAME};
use forge_observability::{init_tracing, ConversionMetrics, LogFormat};
use forge_storage::{read_json, FsModelStore, ModelStore};
use tokio::task::JoinSet;
use tracing::warn;

#[derive(Debug, Parser)]
#[command(name = "nluforge")]
#[command(about = "Convert language models between Alexa and Dialogflow")]
struct Cli {
    #[arg(long, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Overrides `[project] models_dir`.
    #[arg(long, env = "NLUFORGE_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// Overrides `[project] output_dir`.
    #[arg(long, env = "NLUFORGE_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    #[arg(long, env = "NLUFORGE_LOG")]
    log: Option<String>,

    #[arg(long, default_value = "compact", value_parser = parse_log_format)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate platform files from canonical models.
    Build {
        /// Locales to build; defaults to every model in the models directory.
        #[arg(long = "locale")]
        locales: Vec<String>,
        /// Platforms to build; defaults to `[build] platforms`.
        #[arg(long = "platform", value_parser = parse_platform)]
        platforms: Vec<Platform>,
        /// Keep previously generated files instead of clearing them first.
        #[arg(long)]
        no_clean: bool,
    },
    /// Rebuild canonical models from platform files.
    Reverse {
        #[arg(long, value_parser = parse_platform)]
        platform: Platform,
        #[arg(long = "locale", required = true)]
        locales: Vec<String>,
    },
    /// Check canonical models without converting them.
    Validate {
        #[arg(long = "locale")]
        locales: Vec<String>,
    },
    /// Print the token sequence of a phrase.
    Tokens { phrase: String },
}

fn parse_platform(value: &str) -> Result<Platform, String> {
    Platform::parse(value).ok_or_else(|| format!("unknown platform `{value}`"))
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    LogFormat::parse(value).ok_or_else(|| format!("unknown log format `{value}`"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing("nluforge", cli.log.as_deref(), cli.log_format);

    let config = ProjectConfig::load(&cli.config)
        .with_context(|| format!("failed loading {}", cli.config.display()))?;
    let models_dir = cli
        .models_dir
        .clone()
        .unwrap_or_else(|| config.project.models_dir.clone());
    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| config.project.output_dir.clone());
    let store = Arc::new(FsModelStore::new(models_dir));

    match cli.command {
        Command::Build {
            locales,
            platforms,
            no_clean,
        } => {
            let locales = if locales.is_empty() {
                store.locales()?
            } else {
                locales
            };
            let platforms = if platforms.is_empty() {
                config.platforms()?
            } else {
                platforms
            };
            if locales.is_empty() {
                bail!("no models found in {}", store.dir().display());
            }

            let metrics = ConversionMetrics::shared();
            let settings = BuilderSettings::from_config(&config, output_dir);
            let builder = Arc::new(ModelBuilder::new(store, settings, metrics.clone()));
            if !no_clean {
                for platform in &platforms {
                    builder.clean(*platform)?;
                }
            }

            let tasks = ModelBuilder::<FsModelStore>::plan(&locales, &platforms);
            let failures = run_builds(builder, tasks).await?;
            println!("{}", serde_json::to_string_pretty(&metrics.snapshot())?);
            if failures > 0 {
                bail!("{failures} build task(s) failed");
            }
        }
        Command::Reverse { platform, locales } => {
            let metrics = ConversionMetrics::shared();
            let settings = BuilderSettings::from_config(&config, output_dir);
            let builder = Arc::new(ModelBuilder::new(store, settings, metrics.clone()));

            let failures = run_reverse(builder, platform, locales).await?;
            println!("{}", serde_json::to_string_pretty(&metrics.snapshot())?);
            if failures > 0 {
                bail!("{failures} reverse task(s) failed");
            }
        }
        Command::Validate { locales } => {
            let locales = if locales.is_empty() {
                store.locales()?
            } else {
                locales
            };

            let mut failures = 0;
            for locale in &locales {
                let path = store.model_path(locale);
                let outcome = read_json(&path).and_then(|document| {
                    validate(&document, locale).map_err(anyhow::Error::from)
                });
                match outcome {
                    Ok(()) => println!("{locale}: ok"),
                    Err(err) => {
                        failures += 1;
                        println!("{locale}: {err:#}");
                    }
                }
            }
            if failures > 0 {
                bail!("{failures} model(s) failed validation");
            }
        }
        Command::Tokens { phrase } => {
            println!("{}", serde_json::to_string_pretty(&to_tokens(&phrase))?);
        }
    }

    Ok(())
}

/// Runs every task on the blocking pool. A failing task does not stop the
/// others; the number of failures is returned.
async fn run_builds<S>(builder: Arc<ModelBuilder<S>>, tasks: Vec<BuildTask>) -> Result<usize>
where
    S: ModelStore + 'static,
{
    let mut set = JoinSet::new();
    for task in tasks {
        let builder = Arc::clone(&builder);
        set.spawn_blocking(move || {
            let outcome = builder.build(&task);
            (task, outcome)
        });
    }

    let mut failures = 0;
    while let Some(joined) = set.join_next().await {
        let (task, outcome) = joined.context("build task panicked")?;
        match outcome {
            Ok(report) => println!("{}", serde_json::to_string(&report)?),
            Err(err) => {
                failures += 1;
                warn!(
                    locale = %task.locale,
                    platform = %task.platform,
                    error = %format!("{err:#}"),
                    "build task failed"
                );
                eprintln!("{} / {}: {err:#}", task.locale, task.platform);
            }
        }
    }
    Ok(failures)
}

async fn run_reverse<S>(
    builder: Arc<ModelBuilder<S>>,
    platform: Platform,
    locales: Vec<String>,
) -> Result<usize>
where
    S: ModelStore + 'static,
{
    let mut set = JoinSet::new();
    for locale in locales {
        let builder = Arc::clone(&builder);
        set.spawn_blocking(move || {
            let outcome = builder.reverse(platform, &locale);
            (locale, outcome)
        });
    }

    let mut failures = 0;
    while let Some(joined) = set.join_next().await {
        let (locale, outcome) = joined.context("reverse task panicked")?;
        match outcome {
            Ok(report) => println!("{}", serde_json::to_string(&report)?),
            Err(err) => {
                failures += 1;
                warn!(
                    locale = %locale,
                    platform = %platform,
                    error = %format!("{err:#}"),
                    "reverse task failed"
                );
                eprintln!("{locale} / {platform}: {err:#}");
            }
        }
    }
    Ok(failures)
}
