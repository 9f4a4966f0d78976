//! JD Extractor: pulls posting fields out of a job-description PDF, and
//! turns a publish request into a new job record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::GeminiClient;
use crate::matching::file_reader::ResumeFile;
use crate::matching::prompts::{jd_extraction_schema, JD_EXTRACTION_INSTRUCTION};
use crate::models::job::{Job, JobStatus};

pub const PDF_MIME: &str = "application/pdf";

const DEFAULT_DEPARTMENT: &str = "Engineering";
const DEFAULT_EMPLOYMENT_TYPE: &str = "Full-time";
const DEFAULT_LOCATION: &str = "Remote";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedJobDetails {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub location: String,
    #[serde(rename = "type", default)]
    pub employment_type: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// Sends a job-description PDF to the model and returns the extracted fields.
pub async fn extract_job_details(
    file: &ResumeFile,
    llm: &GeminiClient,
) -> Result<ExtractedJobDetails, AppError> {
    if file.mime_type != PDF_MIME {
        return Err(AppError::Validation(
            "Please upload a PDF file for the Job Description.".to_string(),
        ));
    }

    info!("Extracting job details from {}", file.name);
    let details = llm
        .generate_json::<ExtractedJobDetails>(
            JD_EXTRACTION_INSTRUCTION,
            &file.inline_data(),
            &jd_extraction_schema(),
        )
        .await?;
    Ok(details)
}

/// Body of `POST /api/v1/jobs`. Blank fields take the posting defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishJobRequest {
    pub title: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(rename = "type", default)]
    pub employment_type: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub jd_file_name: Option<String>,
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Builds the record for a newly published job.
pub fn build_job(request: PublishJobRequest, now: DateTime<Utc>) -> Result<Job, AppError> {
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }

    let skills = if request.skills.is_empty() {
        let first_word = title.split_whitespace().next().unwrap_or_default().to_string();
        vec!["New Role".to_string(), first_word]
    } else {
        request.skills
    };

    Ok(Job {
        id: format!("j-{}", now.timestamp_millis()),
        department: or_default(request.department, DEFAULT_DEPARTMENT),
        location: or_default(request.location, DEFAULT_LOCATION),
        employment_type: or_default(request.employment_type, DEFAULT_EMPLOYMENT_TYPE),
        status: JobStatus::Active,
        applicants_count: 0,
        matches_count: 0,
        skills,
        description: request.description.filter(|d| !d.trim().is_empty()),
        jd_url: None,
        jd_file_name: request.jd_file_name,
        user_id: None,
        title,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_extracted_details_deserialize_type_field() {
        let json = r#"{
            "title": "Platform Engineer",
            "department": "Infrastructure",
            "location": "Lisbon",
            "type": "Contract",
            "skills": ["Kubernetes", "Terraform"]
        }"#;
        let details: ExtractedJobDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.employment_type, "Contract");
        assert_eq!(details.skills.len(), 2);
    }

    #[test]
    fn test_build_job_applies_defaults() {
        let job = build_job(
            PublishJobRequest {
                title: "Product Designer".to_string(),
                ..Default::default()
            },
            now(),
        )
        .unwrap();

        assert_eq!(job.id, format!("j-{}", now().timestamp_millis()));
        assert_eq!(job.department, "Engineering");
        assert_eq!(job.location, "Remote");
        assert_eq!(job.employment_type, "Full-time");
        assert_eq!(job.status, JobStatus::Active);
        assert_eq!(job.skills, vec!["New Role", "Product"]);
        assert_eq!(job.applicants_count, 0);
        assert_eq!(job.matches_count, 0);
    }

    #[test]
    fn test_build_job_keeps_extracted_skills() {
        let job = build_job(
            PublishJobRequest {
                title: "Data Engineer".to_string(),
                location: Some("Austin".to_string()),
                skills: vec!["SQL".to_string()],
                ..Default::default()
            },
            now(),
        )
        .unwrap();
        assert_eq!(job.location, "Austin");
        assert_eq!(job.skills, vec!["SQL"]);
    }

    #[test]
    fn test_build_job_rejects_blank_title() {
        let result = build_job(
            PublishJobRequest {
                title: "   ".to_string(),
                ..Default::default()
            },
            now(),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_extraction_rejects_non_pdf() {
        let llm = GeminiClient::new(Some("k".into()), "m".into(), "http://127.0.0.1:9".into());
        let file = ResumeFile::new("jd.docx", None, Bytes::from_static(b"PK"));
        let result = extract_job_details(&file, &llm).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
