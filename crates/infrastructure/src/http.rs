use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use syncer_core::{SyncError, SyncResult};

pub(crate) fn build_client(
    collaborator: &str,
    timeout_seconds: u64,
    default_headers: HeaderMap,
) -> SyncResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .connect_timeout(Duration::from_secs(timeout_seconds))
        .default_headers(default_headers)
        .build()
        .map_err(|e| SyncError::unavailable(collaborator, format!("无法创建HTTP客户端: {e}")))
}

/// 非 2xx 响应转为错误，携带响应体便于排查
pub(crate) async fn ensure_success(collaborator: &str, response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::unavailable(
        collaborator,
        format!("HTTP {status} {url}: {body}"),
    ))
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    collaborator: &str,
    response: Response,
) -> SyncResult<T> {
    let response = ensure_success(collaborator, response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| SyncError::unavailable(collaborator, format!("无法解析响应: {e}")))
}
