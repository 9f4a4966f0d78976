//! AI Matching Client: scores one resume against one job through the model.
//!
//! `ResumeAnalyzer` is the seam the batch orchestrator depends on;
//! `GeminiResumeAnalyzer` is the production implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::llm_client::{AiError, GeminiClient};
use crate::matching::file_reader::ResumeFile;
use crate::matching::prompts::{resume_analysis_prompt, resume_analysis_schema};
use crate::models::job::Job;

/// Job information embedded in the analysis prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct JobContext {
    pub title: String,
    pub skills: Vec<String>,
    pub description: Option<String>,
}

impl From<&Job> for JobContext {
    fn from(job: &Job) -> Self {
        Self {
            title: job.title.clone(),
            skills: job.skills.clone(),
            description: job.description.clone(),
        }
    }
}

/// Structured analysis of one resume. `match_score` is always within 0..=100.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeAnalysis {
    pub candidate_name: String,
    pub current_role: String,
    pub match_score: u8,
    pub analysis: String,
    pub skills_found: Vec<String>,
    pub experience_years: f64,
}

/// The model's output as sent. Only a syntactically invalid or non-object
/// body is an error; missing or odd fields are coerced.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    #[serde(default)]
    candidate_name: Option<String>,
    #[serde(default)]
    current_role: Option<String>,
    #[serde(default)]
    match_score: Value,
    #[serde(default)]
    analysis: Option<String>,
    #[serde(default)]
    skills_found: Value,
    #[serde(default)]
    experience_years: Value,
}

impl From<RawAnalysis> for ResumeAnalysis {
    fn from(raw: RawAnalysis) -> Self {
        Self {
            candidate_name: raw.candidate_name.unwrap_or_default().trim().to_string(),
            current_role: raw.current_role.unwrap_or_default().trim().to_string(),
            match_score: coerce_score(&raw.match_score),
            analysis: raw.analysis.unwrap_or_default(),
            skills_found: raw
                .skills_found
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|s| s.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default(),
            experience_years: coerce_number(&raw.experience_years)
                .filter(|y| *y >= 0.0)
                .unwrap_or(0.0),
        }
    }
}

/// Reads a JSON number or numeric string. Anything else is `None`.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Rounds and clamps into 0..=100; invalid or missing values become 0.
pub fn coerce_score(value: &Value) -> u8 {
    coerce_number(value)
        .map(|n| n.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(0)
}

#[async_trait]
pub trait ResumeAnalyzer: Send + Sync {
    /// Fails with `MissingCredential` when analysis cannot run at all.
    fn ensure_configured(&self) -> Result<(), AiError>;

    async fn analyze(&self, file: &ResumeFile, job: &JobContext)
        -> Result<ResumeAnalysis, AiError>;
}

pub struct GeminiResumeAnalyzer(pub GeminiClient);

#[async_trait]
impl ResumeAnalyzer for GeminiResumeAnalyzer {
    fn ensure_configured(&self) -> Result<(), AiError> {
        self.0.ensure_configured().map(|_| ())
    }

    async fn analyze(
        &self,
        file: &ResumeFile,
        job: &JobContext,
    ) -> Result<ResumeAnalysis, AiError> {
        self.ensure_configured()?;

        info!("Sending {} to Gemini for resume analysis", file.name);
        let prompt = resume_analysis_prompt(job);
        let raw: RawAnalysis = self
            .0
            .generate_json(&prompt, &file.inline_data(), &resume_analysis_schema())
            .await?;

        let analysis = ResumeAnalysis::from(raw);
        info!(
            "Parsed analysis for {}: score {}",
            file.name, analysis.match_score
        );
        Ok(analysis)
    }
}
