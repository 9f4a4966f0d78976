//! Candidate record construction for one analyzed resume.

use chrono::{DateTime, Utc};

use crate::matching::analyzer::ResumeAnalysis;
use crate::matching::file_reader::ResumeFile;
use crate::models::candidate::{Candidate, CandidateStatus};
use crate::models::job::Job;

/// Resumes at or above this size are scored but not stored, to stay under
/// the persistence API's request payload ceiling.
pub const RESUME_INLINE_LIMIT: usize = 1024 * 1024;

const EXTRACTED_COMPANY: &str = "Extracted Profile";
const DEFAULT_LOCATION: &str = "Remote";
const APPLIED_DATE_FORMAT: &str = "%b %-d, %Y";

/// Builds the record persisted for `file` after analysis against `job`.
/// `index` is the file's queue position and keeps ids unique within a batch.
pub fn build_candidate(
    analysis: &ResumeAnalysis,
    file: &ResumeFile,
    job: &Job,
    index: usize,
    now: DateTime<Utc>,
) -> Candidate {
    let name = non_empty(&analysis.candidate_name).unwrap_or_else(|| file.display_stem());
    let role = non_empty(&analysis.current_role).unwrap_or_else(|| job.title.clone());
    let location = non_empty(&job.location).unwrap_or_else(|| DEFAULT_LOCATION.to_string());

    let resume_base64 = if file.size() < RESUME_INLINE_LIMIT {
        file.to_base64()
    } else {
        String::new()
    };

    Candidate {
        id: format!("c-{}-{index}", now.timestamp_millis()),
        name,
        role,
        company: EXTRACTED_COMPANY.to_string(),
        location,
        applied_date: now.format(APPLIED_DATE_FORMAT).to_string(),
        status: CandidateStatus::New,
        match_score: analysis.match_score,
        avatar: None,
        associated_jd_id: Some(job.id.clone()),
        analysis: Some(analysis.analysis.clone()),
        resume_base64: Some(resume_base64),
        resume_mime_type: Some(file.mime_type.clone()),
        user_id: None,
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use base64::{engine::general_purpose::STANDARD, Engine};
    use bytes::Bytes;
    use chrono::TimeZone;

    use crate::models::job::sample_job;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 9, 14, 0, 0).unwrap()
    }

    fn analysis(score: u8) -> ResumeAnalysis {
        ResumeAnalysis {
            candidate_name: "Jane Doe".to_string(),
            current_role: "Backend Engineer".to_string(),
            match_score: score,
            analysis: "Solid distributed systems work.".to_string(),
            skills_found: vec!["Rust".to_string()],
            experience_years: 7.0,
        }
    }

    #[test]
    fn test_small_resume_is_stored_and_round_trips() {
        let content = b"%PDF-1.7 small resume".to_vec();
        let file = ResumeFile::new("jane.pdf", None, Bytes::from(content.clone()));

        let candidate = build_candidate(&analysis(85), &file, &sample_job(), 0, now());

        let stored = candidate.resume_base64.unwrap();
        assert!(!stored.is_empty());
        assert_eq!(STANDARD.decode(stored).unwrap(), content);
        assert_eq!(candidate.resume_mime_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn test_resume_at_limit_is_not_stored_but_still_scored() {
        let file = ResumeFile::new(
            "big.pdf",
            None,
            Bytes::from(vec![7u8; RESUME_INLINE_LIMIT]),
        );

        let candidate = build_candidate(&analysis(72), &file, &sample_job(), 0, now());

        assert_eq!(candidate.resume_base64.as_deref(), Some(""));
        assert_eq!(candidate.match_score, 72);
        assert_eq!(
            candidate.analysis.as_deref(),
            Some("Solid distributed systems work.")
        );
    }

    #[test]
    fn test_fixed_fields_and_date_format() {
        let file = ResumeFile::new("jane.pdf", None, Bytes::from_static(b"x"));
        let candidate = build_candidate(&analysis(50), &file, &sample_job(), 3, now());

        assert_eq!(candidate.id, format!("c-{}-3", now().timestamp_millis()));
        assert_eq!(candidate.company, "Extracted Profile");
        assert_eq!(candidate.status, CandidateStatus::New);
        assert_eq!(candidate.applied_date, "Oct 9, 2026");
        assert_eq!(candidate.location, "Berlin");
        assert_eq!(candidate.associated_jd_id.as_deref(), Some("j-1"));
    }

    #[test]
    fn test_blank_ai_fields_fall_back() {
        let mut blank = analysis(40);
        blank.candidate_name = "  ".to_string();
        blank.current_role = String::new();
        let mut job = sample_job();
        job.location = String::new();
        let file = ResumeFile::new("john_smith-cv.pdf", None, Bytes::from_static(b"x"));

        let candidate = build_candidate(&blank, &file, &job, 0, now());

        assert_eq!(candidate.name, "john smith cv");
        assert_eq!(candidate.role, "Senior Rust Engineer");
        assert_eq!(candidate.location, "Remote");
    }
}
