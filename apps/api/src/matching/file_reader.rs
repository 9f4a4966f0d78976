//! File Reader: turns an uploaded file into the base64 payload the AI client submits.

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;

use crate::llm_client::InlineData;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;
const FALLBACK_MIME: &str = "application/octet-stream";

/// One uploaded file held in memory for the lifetime of the queue.
#[derive(Debug, Clone)]
pub struct ResumeFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl ResumeFile {
    /// Builds a file from upload parts. A missing or generic declared content
    /// type falls back to a guess from the file extension.
    pub fn new(name: impl Into<String>, declared_mime: Option<&str>, bytes: Bytes) -> Self {
        let name = name.into();
        let mime_type = declared_mime
            .map(str::trim)
            .filter(|m| !m.is_empty() && *m != FALLBACK_MIME)
            .map(String::from)
            .unwrap_or_else(|| guess_mime(&name));
        Self {
            name,
            mime_type,
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Human-readable size, e.g. "0.3 MB".
    pub fn size_label(&self) -> String {
        format!("{:.1} MB", self.size() as f64 / BYTES_PER_MIB)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn inline_data(&self) -> InlineData {
        InlineData {
            mime_type: self.mime_type.clone(),
            data: self.to_base64(),
        }
    }

    /// File name without extension, separators turned into spaces.
    /// Used as the candidate name when the model finds none.
    pub fn display_stem(&self) -> String {
        let stem = match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => self.name.as_str(),
        };
        stem.replace(['_', '-'], " ")
    }
}

fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or(FALLBACK_MIME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_mime_wins() {
        let file = ResumeFile::new("cv.bin", Some("application/pdf"), Bytes::new());
        assert_eq!(file.mime_type, "application/pdf");
    }

    #[test]
    fn test_mime_guessed_from_extension() {
        let pdf = ResumeFile::new("cv.pdf", None, Bytes::new());
        assert_eq!(pdf.mime_type, "application/pdf");

        let png = ResumeFile::new("scan.png", Some("application/octet-stream"), Bytes::new());
        assert_eq!(png.mime_type, "image/png");

        let docx = ResumeFile::new("cv.docx", None, Bytes::new());
        assert_eq!(
            docx.mime_type,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
    }

    #[test]
    fn test_unknown_extension_uses_fallback() {
        let file = ResumeFile::new("resume", None, Bytes::new());
        assert_eq!(file.mime_type, FALLBACK_MIME);
    }

    #[test]
    fn test_base64_decodes_to_original_bytes() {
        let content = b"%PDF-1.7 resume body".to_vec();
        let file = ResumeFile::new("cv.pdf", None, Bytes::from(content.clone()));

        let decoded = STANDARD.decode(file.to_base64()).unwrap();
        assert_eq!(decoded, content);
    }

    #[test]
    fn test_size_label_one_decimal_megabytes() {
        let file = ResumeFile::new("cv.pdf", None, Bytes::from(vec![0u8; 1536 * 1024]));
        assert_eq!(file.size_label(), "1.5 MB");
    }

    #[test]
    fn test_display_stem() {
        let file = ResumeFile::new("jane_doe-resume.v2.pdf", None, Bytes::new());
        assert_eq!(file.display_stem(), "jane doe resume.v2");

        let hidden = ResumeFile::new(".profile", None, Bytes::new());
        assert_eq!(hidden.display_stem(), ".profile");
    }
}
