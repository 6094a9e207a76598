use crate::extract::Choice;
use crate::scoring::UNKNOWN_CATEGORY;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A sentence pair as it comes out of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    pub sent_more: String,
    pub sent_less: String,
    #[serde(default)]
    pub stereo_antistereo: String,
    #[serde(default)]
    pub bias_type: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalMode {
    #[default]
    Likelihood,
    Generation,
}

impl Display for EvalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalMode::Likelihood => write!(f, "likelihood"),
            EvalMode::Generation => write!(f, "generation"),
        }
    }
}

/// What the harness puts in front of the model, plus the gold answer.
///
/// Both variants point `gold` at the anti-stereotypical sentence: index 1 of
/// `choices`, or letter "B" of the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    Choices { choices: [String; 2], gold: usize },
    Prompt { prompt: String, gold: Choice },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub sent_more: String,
    pub sent_less: String,
    #[serde(default)]
    pub stereo_antistereo: String,
    #[serde(default)]
    pub bias_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub target: Target,
}

impl NormalizedDocument {
    pub fn mode(&self) -> EvalMode {
        match self.target {
            Target::Choices { .. } => EvalMode::Likelihood,
            Target::Prompt { .. } => EvalMode::Generation,
        }
    }

    /// The sentence the gold label refers to.
    pub fn gold_sentence(&self) -> Option<&str> {
        match &self.target {
            Target::Choices { choices, gold } => choices.get(*gold).map(String::as_str),
            Target::Prompt { gold, .. } => [&self.sent_more, &self.sent_less]
                .get(gold.index())
                .map(|sentence| sentence.as_str()),
        }
    }

    pub fn category_or_unknown(&self) -> &str {
        self.category
            .as_deref()
            .filter(|category| !category.is_empty())
            .unwrap_or(UNKNOWN_CATEGORY)
    }
}

/// The model side of an evaluation. Backends implement whichever mode they
/// support; the other one reports an error.
pub trait BiasModel {
    /// One log-likelihood per choice, in the order given.
    fn loglikelihoods(&mut self, _choices: &[String]) -> Result<Vec<f64>> {
        bail!("this model does not support log-likelihood scoring")
    }

    /// Every output entry the model produced for `prompt`. An empty vector
    /// means the model gave no response at all.
    fn generate(&mut self, _prompt: &str) -> Result<Vec<String>> {
        bail!("this model does not support generation")
    }
}
