// Resume matching pipeline: upload queue, per-resume AI analysis against one
// job, candidate persistence and job counter updates.
// All model calls go through llm_client; all records go through store.

pub mod analyzer;
pub mod batch;
pub mod candidate;
pub mod file_reader;
pub mod handlers;
pub mod jd_extractor;
pub mod prompts;
pub mod queue;
