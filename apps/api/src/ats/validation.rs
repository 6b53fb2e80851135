use crate::ats::errors::SessionError;
use crate::ats::models::PendingFile;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const PDF_MIME: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Accepts exactly one PDF: declared as PDF (MIME type, or a `.pdf` name when
/// the browser sent no useful type) and starting with the PDF header.
pub fn validate_pdf(file: Option<&PendingFile>) -> Result<&PendingFile, SessionError> {
    let file = file.ok_or_else(|| {
        SessionError::Validation("Please select a resume to upload.".to_string())
    })?;

    let declared_pdf = match file.content_type.as_deref() {
        Some(ct) if ct.eq_ignore_ascii_case(PDF_MIME) => true,
        None | Some("application/octet-stream") => {
            file.file_name.to_ascii_lowercase().ends_with(".pdf")
        }
        Some(_) => false,
    };
    if !declared_pdf {
        return Err(SessionError::Validation(
            "Only PDF files are supported.".to_string(),
        ));
    }

    if file.is_empty() {
        return Err(SessionError::Validation("The selected file is empty.".to_string()));
    }
    if file.len() > MAX_UPLOAD_BYTES {
        return Err(SessionError::Validation(
            "Resume must be 10 MB or smaller.".to_string(),
        ));
    }
    if !file.bytes.starts_with(PDF_MAGIC) {
        return Err(SessionError::Validation(
            "The selected file is not a valid PDF.".to_string(),
        ));
    }

    Ok(file)
}
