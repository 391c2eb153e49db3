use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use watchly_core::models::{FileRole, MovieMetadata};
use watchly_core::AppError;
use watchly_storage::StagedBatch;

/// Largest accepted text field, in bytes
pub const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

fn multipart_error(e: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
}

/// Drain a multipart body: text fields become metadata, file fields are streamed into
/// `batch`. Unknown text fields are ignored.
///
/// A part counts as a file when its name is a file role or when it carries a file name,
/// so a `video` part sent without a file name still goes through the staging limits.
pub async fn read_upload(
    multipart: &mut Multipart,
    batch: &mut StagedBatch,
) -> Result<MovieMetadata, AppError> {
    let mut metadata = MovieMetadata::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        if file_name.is_none() && FileRole::from_field_name(&name).is_none() {
            let value = read_text(field, &name).await?;
            if !metadata.set_field(&name, value) {
                tracing::debug!(field = %name, "Ignoring unknown form field");
            }
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        batch
            .stage(
                &name,
                file_name.as_deref(),
                content_type.as_deref(),
                Box::pin(field),
            )
            .await?;
    }

    Ok(metadata)
}

/// Read a text field chunk by chunk, refusing anything above [`MAX_TEXT_FIELD_BYTES`].
async fn read_text(mut field: Field<'_>, name: &str) -> Result<String, AppError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if buf.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::Validation(format!(
                "Form field '{}' exceeds {} bytes",
                name, MAX_TEXT_FIELD_BYTES
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8(buf)
        .map_err(|_| AppError::Validation(format!("Form field '{}' is not valid UTF-8", name)))
}
