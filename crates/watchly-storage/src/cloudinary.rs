//! Cloudinary Upload API client.
//!
//! Every request is signed: the signed parameters are sorted by name, joined as
//! `k=v&k=v`, suffixed with the API secret and hashed with SHA-256.
//! Large videos are sent as sequential byte-range chunks sharing one upload id.

use crate::traits::{
    MediaHost, MediaHostError, MediaHostResult, RemoteAsset, ResourceKind, UploadOptions,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;
use watchly_core::CloudinaryConfig;

/// Parameters covered by the signature, keyed by name
type Params = BTreeMap<&'static str, String>;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: Option<String>,
    url: Option<String>,
    format: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    bytes: i64,
    width: Option<i32>,
    height: Option<i32>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

struct Credentials<'a> {
    cloud_name: &'a str,
    api_key: &'a str,
    api_secret: &'a str,
}

/// [`MediaHost`] backed by the Cloudinary Upload API
#[derive(Clone)]
pub struct CloudinaryUploader {
    client: Client,
    config: CloudinaryConfig,
}

impl CloudinaryUploader {
    /// Build the HTTP client. Missing credentials are reported per call, not here.
    pub fn new(config: &CloudinaryConfig) -> MediaHostResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn credentials(&self) -> MediaHostResult<Credentials<'_>> {
        fn required<'a>(value: &'a Option<String>, name: &str) -> MediaHostResult<&'a str> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| MediaHostError::NotConfigured(format!("{} is not set", name)))
        }

        Ok(Credentials {
            cloud_name: required(&self.config.cloud_name, "CLOUDINARY_CLOUD_NAME")?,
            api_key: required(&self.config.api_key, "CLOUDINARY_API_KEY")?,
            api_secret: required(&self.config.api_secret, "CLOUDINARY_API_SECRET")?,
        })
    }

    fn endpoint(&self, cloud_name: &str, kind: ResourceKind, action: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            cloud_name,
            kind.as_str(),
            action
        )
    }

    fn upload_params(&self, options: &UploadOptions) -> Params {
        let mut params = Params::new();
        params.insert("timestamp", Utc::now().timestamp().to_string());
        if !self.config.folder.is_empty() {
            params.insert("folder", self.config.folder.clone());
        }
        if let Some(transformation) = &options.transformation {
            params.insert("transformation", transformation.clone());
        }
        if !options.eager.is_empty() {
            params.insert("eager", options.eager.join("|"));
            if options.eager_async {
                params.insert("eager_async", "true".to_string());
            }
        }
        params
    }

    /// Signed params plus `api_key` and `signature` as a multipart form
    fn signed_form(params: &Params, creds: &Credentials<'_>) -> Form {
        let signature = sign(params, creds.api_secret);
        let mut form = Form::new()
            .text("api_key", creds.api_key.to_string())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(*key, value.clone());
        }
        form
    }

    async fn upload_whole(
        &self,
        url: &str,
        path: &Path,
        file_name: String,
        size: u64,
        params: &Params,
        creds: &Credentials<'_>,
    ) -> MediaHostResult<UploadResponse> {
        let file = File::open(path).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, size).file_name(file_name);
        let form = Self::signed_form(params, creds).part("file", part);

        let response = self.client.post(url).multipart(form).send().await?;
        parse_json(response).await
    }

    async fn upload_chunked(
        &self,
        url: &str,
        path: &Path,
        file_name: String,
        size: u64,
        params: &Params,
        creds: &Credentials<'_>,
    ) -> MediaHostResult<UploadResponse> {
        let chunk_size = self.config.chunk_size_bytes.max(1);
        let upload_id = uuid::Uuid::new_v4().simple().to_string();
        let mut file = File::open(path).await?;
        let mut offset: u64 = 0;
        let mut last = None;

        while offset < size {
            let mut buf = Vec::with_capacity(chunk_size.min(size - offset) as usize);
            (&mut file).take(chunk_size).read_to_end(&mut buf).await?;
            if buf.is_empty() {
                return Err(MediaHostError::InvalidResponse(format!(
                    "file shrank while uploading ({} of {} bytes sent)",
                    offset, size
                )));
            }
            let end = offset + buf.len() as u64 - 1;

            let part = Part::bytes(buf).file_name(file_name.clone());
            let form = Self::signed_form(params, creds).part("file", part);
            let response = self
                .client
                .post(url)
                .header("X-Unique-Upload-Id", upload_id.as_str())
                .header("Content-Range", format!("bytes {}-{}/{}", offset, end, size))
                .multipart(form)
                .send()
                .await?;

            tracing::debug!(
                upload_id = %upload_id,
                range_start = offset,
                range_end = end,
                total = size,
                "Sent upload chunk"
            );

            last = Some(ensure_success(response).await?);
            offset = end + 1;
        }

        let body = last.ok_or_else(|| {
            MediaHostError::InvalidResponse("no chunks were sent".to_string())
        })?;
        serde_json::from_str(&body).map_err(|e| MediaHostError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl MediaHost for CloudinaryUploader {
    async fn upload(
        &self,
        path: &Path,
        kind: ResourceKind,
        options: &UploadOptions,
    ) -> MediaHostResult<RemoteAsset> {
        let start = Instant::now();
        let creds = self.credentials()?;
        let url = self.endpoint(creds.cloud_name, kind, "upload");
        let params = self.upload_params(options);
        let size = tokio::fs::metadata(path).await?.len();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let chunked = options.chunked && size > self.config.chunk_size_bytes;
        let result = if chunked {
            self.upload_chunked(&url, path, file_name, size, &params, &creds)
                .await
        } else {
            self.upload_whole(&url, path, file_name, size, &params, &creds)
                .await
        };

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    kind = %kind,
                    size_bytes = size,
                    duration_ms = duration_ms,
                    "Cloudinary upload failed"
                );
                return Err(e);
            }
        };

        let url = response
            .secure_url
            .or(response.url)
            .ok_or_else(|| MediaHostError::InvalidResponse("missing asset url".to_string()))?;

        tracing::info!(
            asset_id = %response.public_id,
            kind = %kind,
            size_bytes = size,
            chunked = chunked,
            duration_ms = duration_ms,
            "Cloudinary upload completed"
        );

        Ok(RemoteAsset {
            asset_id: response.public_id,
            url,
            format: response.format,
            duration_seconds: response.duration,
            byte_size: if response.bytes > 0 {
                response.bytes
            } else {
                size as i64
            },
            width: response.width,
            height: response.height,
            created_at: response.created_at.unwrap_or_else(Utc::now),
        })
    }

    async fn delete(&self, asset_id: &str, kind: ResourceKind) -> MediaHostResult<()> {
        let start = Instant::now();
        let creds = self.credentials()?;
        let url = self.endpoint(creds.cloud_name, kind, "destroy");

        let mut params = Params::new();
        params.insert("public_id", asset_id.to_string());
        params.insert("timestamp", Utc::now().timestamp().to_string());
        let form = Self::signed_form(&params, &creds);

        let response = self.client.post(&url).multipart(form).send().await?;
        let body: DestroyResponse = parse_json(response).await?;

        if body.result != "ok" {
            return Err(MediaHostError::Rejected {
                status: 200,
                message: format!("Failed to delete {} {}: {}", kind, asset_id, body.result),
            });
        }

        tracing::info!(
            asset_id = %asset_id,
            kind = %kind,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Cloudinary asset deleted"
        );
        Ok(())
    }
}

/// SHA-256 hex of `k=v&k=v` (sorted, empty values skipped) followed by the secret.
fn sign(params: &Params, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn string_to_sign(params: &Params) -> String {
    params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Body text of a 2xx response, or the host's own error message.
async fn ensure_success(response: Response) -> MediaHostResult<String> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }

    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            }
        });
    Err(MediaHostError::Rejected {
        status: status.as_u16(),
        message,
    })
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> MediaHostResult<T> {
    let body = ensure_success(response).await?;
    serde_json::from_str(&body).map_err(|e| MediaHostError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config(api_base: String, chunk_size_bytes: u64) -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: Some("demo".to_string()),
            api_key: Some("key1234".to_string()),
            api_secret: Some("secret".to_string()),
            api_base,
            folder: "watchly".to_string(),
            chunk_size_bytes,
            timeout_secs: 10,
        }
    }

    fn temp_file(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    const IMAGE_RESPONSE: &str = r#"{
        "public_id": "watchly/thumb-1",
        "secure_url": "https://res.cloudinary.com/demo/image/upload/watchly/thumb-1.jpg",
        "format": "jpg",
        "bytes": 1234,
        "width": 300,
        "height": 200,
        "created_at": "2024-05-01T10:00:00Z"
    }"#;

    #[test]
    fn test_signature_sorts_and_skips_empty() {
        let mut params = Params::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("folder", "watchly".to_string());
        params.insert("transformation", String::new());

        assert_eq!(string_to_sign(&params), "folder=watchly&timestamp=1315060510");

        let mut hasher = Sha256::new();
        hasher.update(b"folder=watchly&timestamp=1315060510abcd");
        assert_eq!(sign(&params, "abcd"), hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_video_params_include_eager() {
        let uploader = CloudinaryUploader::new(&config("http://localhost".into(), 10)).unwrap();
        let params = uploader.upload_params(&UploadOptions::video());
        assert_eq!(params["eager"], "c_fill,h_720,w_1280|c_fill,h_480,w_854");
        assert_eq!(params["eager_async"], "true");
        assert_eq!(params["folder"], "watchly");
        assert!(!params.contains_key("transformation"));
    }

    #[tokio::test]
    async fn test_upload_parses_asset() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1_1/demo/image/upload")
            .match_body(Matcher::Regex("c_fill,h_200,w_300".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(IMAGE_RESPONSE)
            .expect(1)
            .create_async()
            .await;

        let uploader = CloudinaryUploader::new(&config(server.url(), 1024)).unwrap();
        let file = temp_file(b"jpeg bytes");
        let asset = uploader
            .upload(file.path(), ResourceKind::Image, &UploadOptions::thumbnail())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(asset.asset_id, "watchly/thumb-1");
        assert!(asset.url.ends_with("thumb-1.jpg"));
        assert_eq!(asset.byte_size, 1234);
        assert_eq!(asset.width, Some(300));
        assert_eq!(asset.duration_seconds, None);
    }

    #[tokio::test]
    async fn test_host_error_message_is_verbatim() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1_1/demo/video/upload")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"message":"Invalid API key"}}"#)
            .create_async()
            .await;

        let uploader = CloudinaryUploader::new(&config(server.url(), 1024)).unwrap();
        let file = temp_file(b"video bytes");
        let err = uploader
            .upload(file.path(), ResourceKind::Video, &UploadOptions::video())
            .await
            .unwrap_err();

        assert!(matches!(err, MediaHostError::Rejected { status: 401, .. }));
        assert_eq!(err.to_string(), "Invalid API key");
    }

    #[tokio::test]
    async fn test_chunked_upload_sends_ranges() {
        let mut server = mockito::Server::new_async().await;
        let partial = r#"{"done": false}"#;
        let first = server
            .mock("POST", "/v1_1/demo/video/upload")
            .match_header("content-range", "bytes 0-4/12")
            .match_header("x-unique-upload-id", Matcher::Any)
            .with_status(200)
            .with_body(partial)
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("POST", "/v1_1/demo/video/upload")
            .match_header("content-range", "bytes 5-9/12")
            .with_status(200)
            .with_body(partial)
            .expect(1)
            .create_async()
            .await;
        let last = server
            .mock("POST", "/v1_1/demo/video/upload")
            .match_header("content-range", "bytes 10-11/12")
            .with_status(200)
            .with_body(
                r#"{"public_id":"watchly/video-1","secure_url":"https://res.cloudinary.com/demo/video/upload/watchly/video-1.mp4","format":"mp4","duration":12.5,"bytes":12,"width":1920,"height":1080}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let uploader = CloudinaryUploader::new(&config(server.url(), 5)).unwrap();
        let file = temp_file(b"0123456789ab");
        let asset = uploader
            .upload(file.path(), ResourceKind::Video, &UploadOptions::video())
            .await
            .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        last.assert_async().await;
        assert_eq!(asset.asset_id, "watchly/video-1");
        assert_eq!(asset.duration_seconds, Some(12.5));
        assert_eq!(asset.byte_size, 12);
    }

    #[tokio::test]
    async fn test_delete_checks_result() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("POST", "/v1_1/demo/image/destroy")
            .match_body(Matcher::Regex("watchly/thumb-1".to_string()))
            .with_status(200)
            .with_body(r#"{"result":"ok"}"#)
            .create_async()
            .await;
        let missing = server
            .mock("POST", "/v1_1/demo/video/destroy")
            .with_status(200)
            .with_body(r#"{"result":"not found"}"#)
            .create_async()
            .await;

        let uploader = CloudinaryUploader::new(&config(server.url(), 1024)).unwrap();
        uploader
            .delete("watchly/thumb-1", ResourceKind::Image)
            .await
            .unwrap();
        let err = uploader
            .delete("watchly/video-9", ResourceKind::Video)
            .await
            .unwrap_err();

        ok.assert_async().await;
        missing.assert_async().await;
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let mut cfg = config("http://localhost:1".to_string(), 1024);
        cfg.api_secret = None;
        let uploader = CloudinaryUploader::new(&cfg).unwrap();
        let file = temp_file(b"x");

        let err = uploader
            .upload(file.path(), ResourceKind::Image, &UploadOptions::thumbnail())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaHostError::NotConfigured(_)));
    }
}
