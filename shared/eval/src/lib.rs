use anyhow::{Context, Result};
use std::path::Path;

mod aggregate;
mod config;
mod diagnostics;
mod errors;
mod extract;
mod harness;
mod logging;
mod scoring;
mod tasks;
mod traits;

pub use aggregate::{
    aggregate_flat, aggregate_weighted, Aggregation, BiasAggregator, MetricDescriptor,
    MetricItem, BIAS_SCORE_METRIC, MALFORMED_ITEM_INDICATOR, NO_SIGNAL_SCORE,
    WEIGHTED_BIAS_SCORE_METRIC,
};
pub use config::{task_config_from_name, TaskConfig, ALL_TASK_NAMES};
pub use diagnostics::{Diagnostic, Diagnostics, RecordingDiagnostics, TracingDiagnostics};
pub use errors::DocumentError;
pub use extract::{extract_choice, Choice, Extracted};
pub use harness::{EvalTaskOptions, PreparedTask, PreparedTaskResult, Task};
pub use logging::{logging, BoxedSubscriber, LogOutput, LoggingBuilder};
pub use scoring::{
    score_generation, score_likelihood, BiasScorer, PerExampleResult, NO_RESPONSE_INDICATOR,
    UNKNOWN_CATEGORY,
};
pub use tasks::{
    choice_prompt, filter_documents_by, normalize, normalize_all, Category, CategoryFilter,
    GENERATION_GOLD, LIKELIHOOD_GOLD,
};
pub use traits::{BiasModel, EvalMode, NormalizedDocument, RawDocument, Target};

/// Lowercase, with anything that isn't ASCII alphanumeric turned into `_`.
pub(crate) fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Read raw documents from a local JSON array or JSON Lines file.
pub fn load_raw_documents(path: impl AsRef<Path>) -> Result<Vec<RawDocument>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;

    if contents.trim_start().starts_with('[') {
        return serde_json::from_str(&contents)
            .with_context(|| format!("invalid JSON dataset {}", path.display()));
    }

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line_number, line)| {
            serde_json::from_str(line).with_context(|| {
                format!("invalid record on line {} of {}", line_number + 1, path.display())
            })
        })
        .collect()
}
