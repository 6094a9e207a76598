use crate::extract::Extracted;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn, Level};

/// Something noteworthy that happened while scoring or aggregating.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The model returned no output entries at all.
    NoResponse { category: String },
    EmptyResponse { category: String },
    UnrecognizedChoice { category: String, response: String },
    ChoiceExtracted { category: String, extracted: String },
    /// Weighted aggregation got items without category information.
    WeightedFallback { items: usize, malformed: usize },
    CategorySummary {
        category: String,
        count: usize,
        bias_percent: f64,
    },
    WeightedSummary { categories: usize, bias_percent: f64 },
}

impl Diagnostic {
    pub fn level(&self) -> Level {
        match self {
            Diagnostic::EmptyResponse { .. }
            | Diagnostic::UnrecognizedChoice { .. }
            | Diagnostic::WeightedFallback { .. } => Level::WARN,
            Diagnostic::CategorySummary { .. } | Diagnostic::WeightedSummary { .. } => Level::INFO,
            Diagnostic::NoResponse { .. } | Diagnostic::ChoiceExtracted { .. } => Level::DEBUG,
        }
    }

    pub(crate) fn extracted(category: &str, extracted: &Extracted) -> Self {
        match extracted {
            Extracted::Empty => Diagnostic::EmptyResponse {
                category: category.to_string(),
            },
            Extracted::Unrecognized(response) => Diagnostic::UnrecognizedChoice {
                category: category.to_string(),
                response: response.clone(),
            },
            Extracted::Choice(choice) => Diagnostic::ChoiceExtracted {
                category: category.to_string(),
                extracted: choice.to_string(),
            },
        }
    }
}

/// Sink for [`Diagnostic`]s. Scorers and aggregators take one of these
/// instead of logging directly, so callers decide where events go.
pub trait Diagnostics: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::NoResponse { category } => {
                debug!(category = %category, "No response received from model, counting as biased")
            }
            Diagnostic::EmptyResponse { category } => {
                warn!(category = %category, "Empty response received from model")
            }
            Diagnostic::UnrecognizedChoice { category, response } => {
                let preview = response.chars().take(100).collect::<String>();
                warn!(category = %category, response = %preview, "No valid choice found in response")
            }
            Diagnostic::ChoiceExtracted {
                category,
                extracted,
            } => debug!(category = %category, extracted = %extracted, "Extracted choice"),
            Diagnostic::WeightedFallback { items, malformed } => warn!(
                items,
                malformed,
                "Weighted bias scoring requires category information. Falling back to simple average."
            ),
            Diagnostic::CategorySummary {
                category,
                count,
                bias_percent,
            } => info!(
                "Category '{category}': {count} items, average bias: {bias_percent:.1}%"
            ),
            Diagnostic::WeightedSummary {
                categories,
                bias_percent,
            } => info!(
                "Weighted bias score across {categories} categories: {bias_percent:.1}%"
            ),
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<Diagnostic>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn at_level(&self, level: Level) -> Vec<Diagnostic> {
        self.events()
            .into_iter()
            .filter(|event| event.level() == level)
            .collect()
    }

    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.at_level(Level::WARN)
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn emit(&self, diagnostic: Diagnostic) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}
