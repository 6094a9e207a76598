use crate::{
    aggregate::{Aggregation, BiasAggregator, MetricDescriptor},
    config::{task_config_from_name, TaskConfig},
    diagnostics::{Diagnostics, TracingDiagnostics},
    errors::DocumentError,
    scoring::{BiasScorer, PerExampleResult},
    tasks::normalize_all,
    traits::{BiasModel, EvalMode, NormalizedDocument, RawDocument, Target},
};
use anyhow::{ensure, Context, Result};
use bmne_core::GroupedMean;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::{collections::HashMap, fmt::Display, sync::Arc};
use tracing::info;

pub struct Task {
    config: TaskConfig,
    documents: Vec<RawDocument>,
}

impl Task {
    pub fn new(config: TaskConfig, documents: Vec<RawDocument>) -> Self {
        Task { config, documents }
    }

    pub fn from_name(name: &str, documents: Vec<RawDocument>) -> Result<Self> {
        Ok(Self::new(task_config_from_name(name)?, documents))
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }
}

impl Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.config.name)
    }
}

#[derive(Debug)]
pub struct PreparedTask {
    name: String,
    mode: EvalMode,
    docs: Vec<NormalizedDocument>,
    metrics: Vec<Aggregation>,
}

#[derive(Debug)]
pub struct PreparedTaskResult {
    pub scores: HashMap<String, f64>,
    pub results: Vec<PerExampleResult>,
}

fn shuffle_rng(random_seed: u64) -> ChaCha8Rng {
    let mut seed = [0u8; 32];
    seed[24..32].copy_from_slice(&random_seed.to_be_bytes());
    ChaCha8Rng::from_seed(seed)
}

impl Task {
    /// Normalize and filter the documents, then apply the configured shuffle
    /// and limit.
    pub fn prepare(self) -> Result<PreparedTask, DocumentError> {
        let name = format!("{}", &self);
        info!("Preparing {name}");
        let TaskConfig {
            mode,
            metrics,
            limit,
            seed,
            ..
        } = self.config.clone();

        let mut docs = normalize_all(&self.documents, mode, &self.config.category_filter())?;
        if let Some(seed) = seed {
            docs.shuffle(&mut shuffle_rng(seed));
        }
        if let Some(limit) = limit {
            docs.truncate(limit);
        }
        info!(
            "{name}: {} of {} documents kept",
            docs.len(),
            self.documents.len()
        );

        Ok(PreparedTask {
            name,
            mode,
            docs,
            metrics,
        })
    }
}

pub struct EvalTaskOptions<'a> {
    pub model: &'a mut dyn BiasModel,
    pub diagnostics: Option<Arc<dyn Diagnostics>>,
    pub limit: Option<usize>,
}

impl<'a> EvalTaskOptions<'a> {
    pub fn new(model: &'a mut dyn BiasModel) -> Self {
        Self {
            model,
            diagnostics: None,
            limit: None,
        }
    }
}

impl PreparedTask {
    pub fn run(&self, options: EvalTaskOptions, progress_bar: bool) -> Result<PreparedTaskResult> {
        let pbar = match progress_bar {
            false => None,
            true => {
                info!("Running {} ({} mode)", self.name, self.mode);
                let pbar = ProgressBar::new(self.docs.len() as u64);
                pbar.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                        .progress_chars("#>-"),
                );
                Some(pbar)
            }
        };

        let diagnostics = options
            .diagnostics
            .unwrap_or_else(|| Arc::new(TracingDiagnostics));
        let scorer = BiasScorer::new(diagnostics.clone());
        let aggregator = BiasAggregator::new(diagnostics);
        let model = options.model;

        let docs = match options.limit {
            Some(limit) => &self.docs[..limit.min(self.docs.len())],
            None => &self.docs[..],
        };

        let mut live = GroupedMean::new();
        let mut results = Vec::with_capacity(docs.len());
        for (doc_index, doc) in docs.iter().enumerate() {
            let result = match &doc.target {
                Target::Choices { choices, .. } => {
                    let lls = model
                        .loglikelihoods(choices)
                        .with_context(|| format!("scoring document {doc_index}"))?;
                    ensure!(
                        lls.len() == choices.len(),
                        "model returned {} log-likelihoods for {} choices",
                        lls.len(),
                        choices.len()
                    );
                    scorer.likelihood(doc, (lls[0], lls[1]))
                }
                Target::Prompt { prompt, .. } => {
                    let outputs = model
                        .generate(prompt)
                        .with_context(|| format!("generating for document {doc_index}"))?;
                    scorer.generation(doc, outputs.as_slice())
                }
            };

            live.push(&result.category, result.bias_indicator);
            if let Some(pbar) = &pbar {
                pbar.set_message(format!(
                    "bias: {:.1}%",
                    live.overall_mean().unwrap_or_default() * 100.0
                ));
                pbar.inc(1);
            }
            results.push(result);
        }

        if let Some(pbar) = &pbar {
            pbar.finish();
        }

        let scores = self
            .metrics
            .iter()
            .map(|aggregation| {
                (
                    aggregation.metric_name().to_string(),
                    aggregator.aggregate(*aggregation, &results),
                )
            })
            .collect();

        Ok(PreparedTaskResult { scores, results })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> EvalMode {
        self.mode
    }

    pub fn documents(&self) -> &[NormalizedDocument] {
        &self.docs
    }

    pub fn metric_descriptors(&self) -> Vec<MetricDescriptor> {
        self.metrics.iter().map(Aggregation::descriptor).collect()
    }

    /// The weighted score when the task reports it, otherwise the flat one.
    pub fn main_metric_name(&self) -> &'static str {
        if self.metrics.contains(&Aggregation::Weighted) {
            Aggregation::Weighted.metric_name()
        } else {
            Aggregation::Flat.metric_name()
        }
    }
}
