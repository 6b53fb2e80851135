//! Temporary storage for resumes under analysis.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use tracing::{info, warn};
use uuid::Uuid;

use crate::ats::errors::UploadError;
use crate::ats::models::PendingFile;

/// S3 minimum part size; files at or below it go up in a single PUT.
const PART_SIZE: usize = 5 * 1024 * 1024;
const PRESIGN_TTL: Duration = Duration::from_secs(60 * 60);

/// Receives upload progress as a percentage (0 – 100).
#[derive(Clone)]
pub struct UploadProgress {
    sink: Arc<dyn Fn(u8) + Send + Sync>,
}

impl UploadProgress {
    pub fn new(sink: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    pub fn report(&self, sent: usize, total: usize) {
        let percent = if total == 0 {
            100
        } else {
            ((sent as f64 / total as f64) * 100.0).round().min(100.0) as u8
        };
        (self.sink)(percent);
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores the file under `destination` and returns a URL the analysis
    /// backend can fetch it from.
    async fn upload(
        &self,
        file: &PendingFile,
        destination: &str,
        progress: UploadProgress,
    ) -> Result<String, UploadError>;

    /// Called once the result is displayed. Stores that keep uploads around
    /// (the default) do nothing.
    async fn discard(&self, _url: &str) -> Result<(), UploadError> {
        Ok(())
    }
}

/// S3 / MinIO backed store. Returns presigned GET URLs.
#[derive(Clone)]
pub struct S3DocumentStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3DocumentStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    async fn put_single(&self, key: &str, file: &PendingFile) -> Result<(), UploadError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/pdf")
            .body(ByteStream::from(file.bytes.clone()))
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn put_multipart(
        &self,
        key: &str,
        file: &PendingFile,
        progress: &UploadProgress,
    ) -> Result<(), UploadError> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/pdf")
            .send()
            .await
            .map_err(classify)?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| UploadError::Rejected("storage returned no upload id".to_string()))?
            .to_string();

        match self.upload_parts(key, &upload_id, file, progress).await {
            Ok(parts) => {
                self.client
                    .complete_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(
                        CompletedMultipartUpload::builder()
                            .set_parts(Some(parts))
                            .build(),
                    )
                    .send()
                    .await
                    .map_err(classify)?;
                Ok(())
            }
            Err(e) => {
                if let Err(abort) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!("Failed to abort multipart upload {upload_id}: {}", DisplayErrorContext(&abort));
                }
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        file: &PendingFile,
        progress: &UploadProgress,
    ) -> Result<Vec<CompletedPart>, UploadError> {
        let total = file.len();
        let mut parts = Vec::new();
        let mut offset = 0;

        while offset < total {
            let end = (offset + PART_SIZE).min(total);
            let part_number = parts.len() as i32 + 1;
            let out = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(file.bytes.slice(offset..end)))
                .send()
                .await
                .map_err(classify)?;

            parts.push(
                CompletedPart::builder()
                    .set_e_tag(out.e_tag().map(String::from))
                    .part_number(part_number)
                    .build(),
            );
            offset = end;
            progress.report(offset, total);
        }

        Ok(parts)
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn upload(
        &self,
        file: &PendingFile,
        destination: &str,
        progress: UploadProgress,
    ) -> Result<String, UploadError> {
        let key = format!("{}/{}.pdf", destination.trim_matches('/'), Uuid::new_v4());
        progress.report(0, file.len());

        if file.len() > PART_SIZE {
            self.put_multipart(&key, file, &progress).await?;
        } else {
            self.put_single(&key, file).await?;
        }
        progress.report(file.len(), file.len());
        info!("Uploaded resume to s3://{}/{}", self.bucket, key);

        let presign = PresigningConfig::expires_in(PRESIGN_TTL)
            .map_err(|e| UploadError::Rejected(format!("invalid presign config: {e}")))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .presigned(presign)
            .await
            .map_err(classify)?;

        Ok(presigned.uri().to_string())
    }
}

/// Service responses become `Rejected`; anything that never reached the
/// service is `Transport`.
fn classify<E, R>(err: SdkError<E, R>) -> UploadError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::ServiceError(_) => UploadError::Rejected(message),
        _ => UploadError::Transport(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_progress_percentages() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress = UploadProgress::new(move |p| sink.lock().unwrap().push(p));

        progress.report(0, 200);
        progress.report(50, 200);
        progress.report(200, 200);
        progress.report(0, 0);

        assert_eq!(*seen.lock().unwrap(), vec![0, 25, 100, 100]);
    }

    struct NullStore;

    #[async_trait]
    impl DocumentStore for NullStore {
        async fn upload(
            &self,
            _file: &PendingFile,
            destination: &str,
            _progress: UploadProgress,
        ) -> Result<String, UploadError> {
            Ok(format!("memory://{destination}"))
        }
    }

    #[tokio::test]
    async fn test_default_discard_is_noop() {
        assert!(NullStore.discard("memory://x").await.is_ok());
    }
}
