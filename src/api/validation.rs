use crate::api::errors::ApiError;
use crate::services::documents::extension_of;

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn validate_password_len(password: &str) -> Result<(), ApiError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )))
    }
}

pub(crate) fn validate_document_upload(
    filename: &str,
    content_type: &str,
    allowed_extensions: &[String],
) -> Result<(), ApiError> {
    let extension = extension_of(filename)
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    if !allowed_extensions.iter().any(|allowed| allowed == &extension) {
        return Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")));
    }

    let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if mime_allowed_for_extension(&mime, &extension) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "MIME type '{mime}' does not match extension '.{extension}'"
        )))
    }
}

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

fn mime_allowed_for_extension(mime: &str, extension: &str) -> bool {
    // Browsers often send no type or octet-stream for markdown.
    if mime.is_empty() || mime == "application/octet-stream" {
        return true;
    }
    match extension {
        "txt" => mime == "text/plain",
        "md" => matches!(mime, "text/markdown" | "text/x-markdown" | "text/plain"),
        "pdf" => mime == "application/pdf",
        "docx" => mime == DOCX_MIME || mime == "application/zip",
        _ => false,
    }
}
