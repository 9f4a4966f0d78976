use serde::{Deserialize, Serialize};

use super::null_default;

/// Scores strictly above this count as a high-confidence match.
pub const HIGH_MATCH_THRESHOLD: u8 = 80;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Active,
    Paused,
    Draft,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_default")]
    pub department: String,
    #[serde(default, deserialize_with = "null_default")]
    pub location: String,
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub employment_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub status: JobStatus,
    #[serde(default, deserialize_with = "null_default")]
    pub applicants_count: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub matches_count: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jd_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jd_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Counter fields written back after each analyzed resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCounters {
    pub applicants_count: u32,
    pub matches_count: u32,
}

impl Job {
    /// Returns the job as it looks after one more applicant with `match_score`.
    /// Applicants always grow by one; matches only above the threshold.
    pub fn record_applicant(self, match_score: u8) -> Job {
        let matches_count = if match_score > HIGH_MATCH_THRESHOLD {
            self.matches_count + 1
        } else {
            self.matches_count
        };
        Job {
            applicants_count: self.applicants_count + 1,
            matches_count,
            ..self
        }
    }

    pub fn counters(&self) -> JobCounters {
        JobCounters {
            applicants_count: self.applicants_count,
            matches_count: self.matches_count,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_job() -> Job {
    Job {
        id: "j-1".to_string(),
        title: "Senior Rust Engineer".to_string(),
        department: "Engineering".to_string(),
        location: "Berlin".to_string(),
        employment_type: "Full-time".to_string(),
        status: JobStatus::Active,
        applicants_count: 5,
        matches_count: 2,
        skills: vec!["Rust".to_string(), "Tokio".to_string()],
        description: None,
        jd_url: None,
        jd_file_name: None,
        user_id: None,
    }
}
