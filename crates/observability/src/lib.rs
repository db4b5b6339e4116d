use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ConversionMetrics {
    tasks_total: AtomicU64,
    tasks_failed: AtomicU64,
    files_written: AtomicU64,
    models_loaded: AtomicU64,
    total_task_millis: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub tasks_total: u64,
    pub tasks_failed: u64,
    pub files_written: u64,
    pub models_loaded: u64,
    pub avg_task_millis: f64,
}

impl ConversionMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_task(&self) {
        self.tasks_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failure(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_files_written(&self, files: usize) {
        self.files_written.fetch_add(files as u64, Ordering::Relaxed);
    }

    pub fn inc_model_loaded(&self) {
        self.models_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_task(&self, duration: Duration) {
        self.total_task_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let tasks = self.tasks_total.load(Ordering::Relaxed);
        let millis = self.total_task_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            tasks_total: tasks,
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            files_written: self.files_written.load(Ordering::Relaxed),
            models_loaded: self.models_loaded.load(Ordering::Relaxed),
            avg_task_millis: if tasks == 0 {
                0.0
            } else {
                millis as f64 / tasks as f64
            },
        }
    }
}

/// Installs the global subscriber once. `filter` takes precedence over
/// `RUST_LOG`; without either, the engine crates log at `info`.
pub fn init_tracing(service_name: &str, filter: Option<&str>, format: LogFormat) {
    TRACING_INIT.get_or_init(|| {
        let filter = filter
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .or_else(|| EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| {
                EnvFilter::new(format!(
                    "{}=info,forge_builder=info,forge_storage=warn,forge_codecs=warn",
                    service_name
                ))
            });

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);

        match format {
            LogFormat::Json => builder
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .init(),
            LogFormat::Compact => builder.compact().init(),
        }
    });
}
