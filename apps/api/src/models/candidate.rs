use serde::{Deserialize, Serialize};

use super::{lenient_score, null_default};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum CandidateStatus {
    #[default]
    New,
    Interviewing,
    Shortlisted,
    Rejected,
    #[serde(rename = "Offer Sent")]
    OfferSent,
    #[serde(other)]
    Unknown,
}

/// A candidate record. The list endpoint of the persistence API omits
/// `resumeBase64`, so it is optional here; an empty string means the resume
/// was scored but not retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub role: String,
    #[serde(default, deserialize_with = "null_default")]
    pub company: String,
    #[serde(default, deserialize_with = "null_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_default")]
    pub applied_date: String,
    #[serde(default, deserialize_with = "null_default")]
    pub status: CandidateStatus,
    #[serde(default, deserialize_with = "lenient_score")]
    pub match_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_jd_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}
