use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::path::Path;

use crate::utils::error::{AppError, AppResult};

const APPLICATION_NAME: &str = "Tabletop Image Uploads";

/// Google Drive 文件覆盖上传
///
/// 只负责把本地文件的内容写入已有的远程文件，访问令牌由外部获取。
pub struct DriveUploader {
    client: Client,
    headers: HeaderMap,
    base_url: String,
    access_token: String,
}

impl DriveUploader {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(APPLICATION_NAME));
        DriveUploader {
            client: Client::new(),
            headers,
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    pub fn upload_url(&self, file_id: &str) -> String {
        format!(
            "{}/{}?uploadType=media&fields=id",
            self.base_url.trim_end_matches('/'),
            file_id
        )
    }

    /// 用本地文件替换远程文件内容
    pub async fn upload_image(&self, local_file: &Path, target: &str, mime_type: &str) -> AppResult<()> {
        let bytes = tokio::fs::read(local_file).await?;
        log::info!("正在上传 {} ({} 字节) -> {}", local_file.display(), bytes.len(), target);

        let response = self
            .client
            .patch(self.upload_url(target))
            .headers(self.headers.clone())
            .bearer_auth(&self.access_token)
            .header(CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("上传 {} 失败: {}", target, status);
            return Err(AppError::UploadFailed {
                status: status.as_u16(),
                body,
            });
        }

        log::info!("上传完成: {}", target);
        Ok(())
    }
}
