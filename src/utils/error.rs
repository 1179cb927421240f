use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("找不到牌堆: {0}")]
    DeckNotFound(String),

    #[error("牌堆结构异常 '{name}': {reason}")]
    MalformedDeck {
        name: String,
        reason: String,
    },

    #[error("上传失败: {status} {body}")]
    UploadFailed {
        status: u16,
        body: String,
    },

    #[error("渲染错误: {0}")]
    RenderError(String),

    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP请求错误: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Serde JSON错误: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Serde YAML错误: {0}")]
    SerdeYamlError(#[from] serde_yaml::Error),

    #[error("CSV错误: {0}")]
    CsvError(#[from] csv::Error),

    #[error("配置错误: {0}")]
    ConfigError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub(crate) fn malformed(name: &str, reason: impl Into<String>) -> Self {
        AppError::MalformedDeck {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
