use crate::{
    aggregate::{Aggregation, MetricDescriptor},
    normalize_name,
    tasks::{Category, CategoryFilter},
    traits::EvalMode,
};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ALL_TASK_NAMES: [&str; 10] = [
    "bmne",
    "bmne_attitudes_beliefs",
    "bmne_personality_traits",
    "bmne_physical_characteristics",
    "bmne_roles_behaviors",
    "bmne_gen",
    "bmne_gen_attitudes_beliefs",
    "bmne_gen_personality_traits",
    "bmne_gen_physical_characteristics",
    "bmne_gen_roles_behaviors",
];

/// One BMNE task variant.
///
/// Usually written as TOML:
///
/// ```toml
/// name = "bmne_gen_personality_traits"
/// mode = "generation"
/// category = "Personality Traits"
/// metrics = ["flat"]
/// seed = 1234
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub name: String,

    #[serde(default)]
    pub mode: EvalMode,

    /// Keep only documents whose `category` equals this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default = "default_metrics")]
    pub metrics: Vec<Aggregation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    /// Shuffle documents with this seed; dataset order is kept when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_metrics() -> Vec<Aggregation> {
    vec![Aggregation::Flat, Aggregation::Weighted]
}

impl TaskConfig {
    pub fn new(name: impl Into<String>, mode: EvalMode) -> Self {
        Self {
            name: name.into(),
            mode,
            category: None,
            metrics: default_metrics(),
            limit: None,
            seed: None,
        }
    }

    /// Restrict to one category. A single category has nothing to balance,
    /// so only the flat metric is kept.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category.as_str().to_string());
        self.metrics = vec![Aggregation::Flat];
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn category_filter(&self) -> CategoryFilter {
        match &self.category {
            Some(category) => CategoryFilter::Only(category.clone()),
            None => CategoryFilter::All,
        }
    }

    pub fn metric_descriptors(&self) -> Vec<MetricDescriptor> {
        self.metrics.iter().map(Aggregation::descriptor).collect()
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: TaskConfig = toml::from_str(contents).context("invalid task config")?;
        if config.metrics.is_empty() {
            bail!("task {} has no metrics", config.name);
        }
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read task config {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("in {}", path.display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }
}

/// Look up a predefined task. Names are matched case-insensitively with any
/// punctuation or spaces treated as `_`.
pub fn task_config_from_name(name: &str) -> Result<TaskConfig> {
    let key = normalize_name(name);
    let (mode, rest) = if let Some(rest) = key.strip_prefix("bmne_gen") {
        (EvalMode::Generation, rest)
    } else if let Some(rest) = key.strip_prefix("bmne") {
        (EvalMode::Likelihood, rest)
    } else {
        bail!("Unknown task {name}")
    };

    let canonical = match mode {
        EvalMode::Likelihood => "bmne",
        EvalMode::Generation => "bmne_gen",
    };

    if rest.is_empty() {
        return Ok(TaskConfig::new(canonical, mode));
    }

    let Some(slug) = rest.strip_prefix('_') else {
        bail!("Unknown task {name}")
    };
    let Some(category) = Category::ALL
        .into_iter()
        .find(|category| category.slug() == slug)
    else {
        bail!("Unknown task {name}")
    };

    Ok(TaskConfig::new(format!("{canonical}_{}", category.slug()), mode).with_category(category))
}
