//! Recording media host fake.

use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use watchly_storage::{
    MediaHost, MediaHostError, MediaHostResult, RemoteAsset, ResourceKind, UploadOptions,
};

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub kind: ResourceKind,
    pub contents: Vec<u8>,
    pub options: UploadOptions,
    pub asset_id: String,
}

#[derive(Default)]
pub struct FakeMediaHost {
    uploads: Mutex<Vec<RecordedUpload>>,
    deletes: Mutex<Vec<(String, ResourceKind)>>,
    failing_kind: Option<(ResourceKind, String)>,
    counter: AtomicUsize,
}

impl FakeMediaHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every upload of `kind` with the given host message.
    pub fn failing(kind: ResourceKind, message: &str) -> Self {
        Self {
            failing_kind: Some((kind, message.to_string())),
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn upload_kinds(&self) -> Vec<ResourceKind> {
        self.uploads().iter().map(|u| u.kind).collect()
    }

    pub fn deletes(&self) -> Vec<(String, ResourceKind)> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaHost for FakeMediaHost {
    async fn upload(
        &self,
        path: &Path,
        kind: ResourceKind,
        options: &UploadOptions,
    ) -> MediaHostResult<RemoteAsset> {
        // The staged file must still exist while it is being forwarded
        let contents = tokio::fs::read(path).await?;

        if let Some((failing, message)) = &self.failing_kind {
            if *failing == kind {
                return Err(MediaHostError::Rejected {
                    status: 401,
                    message: message.clone(),
                });
            }
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let asset_id = format!("watchly/{}-{}", kind.as_str(), n);
        let extension = match kind {
            ResourceKind::Image => "jpg",
            ResourceKind::Video => "mp4",
        };
        let asset = RemoteAsset {
            asset_id: asset_id.clone(),
            url: format!(
                "https://res.cloudinary.com/demo/{}/upload/{}.{}",
                kind.as_str(),
                asset_id,
                extension
            ),
            format: Some(extension.to_string()),
            duration_seconds: (kind == ResourceKind::Video).then_some(42.5),
            byte_size: contents.len() as i64,
            width: Some(1280),
            height: Some(720),
            created_at: Utc::now(),
        };

        self.uploads.lock().unwrap().push(RecordedUpload {
            kind,
            contents,
            options: options.clone(),
            asset_id,
        });
        Ok(asset)
    }

    async fn delete(&self, asset_id: &str, kind: ResourceKind) -> MediaHostResult<()> {
        self.deletes
            .lock()
            .unwrap()
            .push((asset_id.to_string(), kind));
        Ok(())
    }
}
