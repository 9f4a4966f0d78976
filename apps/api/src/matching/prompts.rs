// Prompt text for the matching module.
// Reuses cross-cutting fragments from llm_client::prompts.

use serde_json::{json, Value};

use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::matching::analyzer::JobContext;

/// Characters of a job description embedded in the analysis prompt.
pub const DESCRIPTION_PROMPT_LIMIT: usize = 1000;

pub const JD_EXTRACTION_INSTRUCTION: &str =
    "Analyze this Job Description PDF and extract details in JSON format. Infer if not clear.";

/// Builds the deterministic resume-vs-role instruction.
pub fn resume_analysis_prompt(job: &JobContext) -> String {
    let mut prompt = format!(
        "Perform a Deep-Match Analysis of this resume against the following role:\n\
         - Title: {}\n\
         - Key Skills: {}\n",
        job.title,
        job.skills.join(", ")
    );

    if let Some(description) = job.description.as_deref().filter(|d| !d.is_empty()) {
        let truncated: String = description.chars().take(DESCRIPTION_PROMPT_LIMIT).collect();
        prompt.push_str(&format!("- Job Description: {truncated}...\n"));
    }

    prompt.push_str(
        "\nYou must extract the following strictly:\n\
         1. candidateName: Look for the most prominent name at the top. If not found, use a short, professional placeholder.\n\
         2. matchScore: A number from 0-100 indicating how well they fit the Key Skills and Title.\n\
         3. currentRole: Their latest job title.\n\
         4. experienceYears: Number of years of experience.\n\
         5. analysis: A short rationale for the score.\n\
         6. skillsFound: The Key Skills evidenced in the resume.\n\n",
    );
    prompt.push_str(JSON_ONLY_INSTRUCTION);
    prompt
}

/// Response schema for resume analysis.
pub fn resume_analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "candidateName": { "type": "STRING" },
            "currentRole": { "type": "STRING" },
            "matchScore": { "type": "NUMBER" },
            "analysis": { "type": "STRING" },
            "skillsFound": { "type": "ARRAY", "items": { "type": "STRING" } },
            "experienceYears": { "type": "NUMBER" }
        },
        "required": ["candidateName", "currentRole", "matchScore", "analysis", "skillsFound", "experienceYears"]
    })
}

/// Response schema for job-description extraction.
pub fn jd_extraction_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "department": { "type": "STRING" },
            "location": { "type": "STRING" },
            "type": { "type": "STRING" },
            "skills": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["title", "department", "location", "type", "skills"]
    })
}
