//! HTTP実装
//!
//! エンドポイント:
//! - POST {base}/process-image
//! - POST {base}/process-video
//! - POST {base}/process-video-tracking
//! - GET  {base}/download-video/{name}
//! - GET  {root}/health

use super::AnalysisService;
use crate::error::Result as AppResult;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, warn};
use vehicle_vision_common::{artifact_file_name, Error, Operation, Result, Subject};

/// エラーメッセージに含めるレスポンス本文の最大文字数
const MAX_ERROR_BODY_CHARS: usize = 200;

/// 解析サーバーのHTTPクライアント
///
/// タイムアウトは設定しない。応答のない呼び出しは完了まで待ち続ける。
pub struct HttpService {
    client: reqwest::Client,
    base_url: String,
}

/// `/health` のレスポンス
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
}

impl HttpService {
    pub fn new(base_url: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// 成果物のダウンロードURL
    ///
    /// ファイル名は1つのパス要素としてパーセントエンコードする。
    pub fn artifact_url(&self, name: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.endpoint_url("download-video"))
            .map_err(|e| Error::TransportFailure(format!("URLが不正です: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::TransportFailure(format!("URLが不正です: {}", self.base_url)))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }

    /// ヘルスチェックURL（`/api` の外側にある）
    pub fn health_url(&self) -> String {
        let root = self.base_url.strip_suffix("/api").unwrap_or(&self.base_url);
        format!("{}/health", root)
    }

    pub async fn health_check(&self) -> Result<HealthStatus> {
        let url = self.health_url();
        let response = self.client.get(&url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::TransportFailure(format!("HTTP {}", status)));
        }

        let body = response.bytes().await.map_err(transport)?;
        serde_json::from_slice(&body)
            .map_err(|e| Error::MalformedResponse(format!("ヘルスチェック応答: {}", e)))
    }
}

impl AnalysisService for HttpService {
    async fn analyze(&self, operation: Operation, subject: &Subject) -> Result<Vec<u8>> {
        let url = self.endpoint_url(operation.endpoint());

        let part = Part::bytes(subject.bytes().to_vec())
            .file_name(subject.name().to_string())
            .mime_str(&subject.upload_mime())
            .map_err(transport)?;
        let form = Form::new().part("file", part);

        debug!(%operation, %url, file = subject.name(), size = subject.size(), "アップロード開始");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%operation, %status, "解析リクエストが失敗");
            return Err(Error::TransportFailure(format!(
                "HTTP {} {}",
                status,
                truncate(&body)
            )));
        }

        let body = response.bytes().await.map_err(transport)?;
        debug!(%operation, bytes = body.len(), "レスポンス受信");
        Ok(body.to_vec())
    }

    async fn fetch_artifact(&self, reference: &str) -> Result<Vec<u8>> {
        let name = artifact_file_name(reference).ok_or(Error::NoArtifact)?;
        let url = self.artifact_url(name)?;

        debug!(%url, "成果物ダウンロード開始");
        let response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NoArtifact);
        }
        if !status.is_success() {
            return Err(Error::TransportFailure(format!("HTTP {}", status)));
        }

        // ファイルがない場合、サーバーは200でJSONのエラーを返す
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);

        let body = response.bytes().await.map_err(transport)?;

        if is_json {
            return Err(artifact_json_error(&body));
        }
        if body.is_empty() {
            return Err(Error::MalformedResponse("空のファイルが返されました".into()));
        }

        Ok(body.to_vec())
    }
}

fn transport(err: reqwest::Error) -> Error {
    if err.is_connect() {
        Error::TransportFailure(format!("サーバーに接続できません ({})", err))
    } else {
        Error::TransportFailure(err.to_string())
    }
}

/// 成果物の代わりに返されたJSONをエラーに変換
///
/// `{"error": ...}` はファイルがないことを示すので `NoArtifact` とする。
fn artifact_json_error(body: &[u8]) -> Error {
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string));

    match message {
        Some(message) => {
            warn!(server_message = %message, "成果物がサーバーにありません");
            Error::NoArtifact
        }
        None => Error::MalformedResponse("動画ではなくJSONが返されました".into()),
    }
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        let head: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}…", head)
    } else {
        body.to_string()
    }
}
