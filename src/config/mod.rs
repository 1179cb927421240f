use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::utils::error::AppError;

/// 每张贴图固定 10 列，与 TTS 的 CustomDeck 网格一致
pub const SHEET_COLUMNS: u32 = 10;

/// 引擎按每 100 个 ID 划分一张贴图
pub const DECK_ID_BLOCK: i64 = 100;

pub const DEFAULT_DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

/// 输出模式，对应环境变量 OUTPUT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// 按页导出，用于打印
    Printer,
    /// 只导出贴图
    Sheet,
    /// 导出贴图、上传并同步存档
    Upload,
}

impl FromStr for OutputMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "printer" => Ok(OutputMode::Printer),
            "" | "sheet" => Ok(OutputMode::Sheet),
            "upload" => Ok(OutputMode::Upload),
            other => Err(AppError::ConfigError(format!("未知的输出模式: {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub output_mode: OutputMode,
    pub save_game_path: PathBuf,
    pub decks_file: PathBuf,
    pub icons_file: PathBuf,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub drive_access_token: Option<String>,
    pub drive_upload_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_mode: OutputMode::Sheet,
            save_game_path: PathBuf::from("./generated_tts_save.json"),
            decks_file: PathBuf::from("decks.yaml"),
            icons_file: PathBuf::from("icons.yaml"),
            data_dir: PathBuf::from("."),
            output_dir: PathBuf::from("./_output"),
            drive_access_token: None,
            drive_upload_url: DEFAULT_DRIVE_UPLOAD_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// 从环境变量读取配置，未设置的项使用默认值
    ///
    /// 任何一项取值非法都直接返回错误，不会退回默认配置。
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 用给定的查找函数读取配置，`from_env` 传入进程环境变量
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let path = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);

        let output_mode = match lookup("OUTPUT") {
            Some(v) => v.parse()?,
            None => defaults.output_mode,
        };

        let drive_access_token = lookup("GOOGLE_DRIVE_ACCESS_TOKEN").filter(|t| !t.trim().is_empty());

        Ok(Self {
            output_mode,
            save_game_path: path("SAVE_GAME_PATH", defaults.save_game_path),
            decks_file: path("DECKS_FILE", defaults.decks_file),
            icons_file: path("ICONS_FILE", defaults.icons_file),
            data_dir: path("DATA_DIR", defaults.data_dir),
            output_dir: path("OUTPUT_DIR", defaults.output_dir),
            drive_access_token,
            drive_upload_url: lookup("DRIVE_UPLOAD_BASE_URL").unwrap_or(defaults.drive_upload_url),
        })
    }

    /// 上传模式下必须提供访问令牌
    pub fn validate(&self) -> Result<(), AppError> {
        if self.output_mode == OutputMode::Upload && self.drive_access_token.is_none() {
            return Err(AppError::ConfigError(
                "上传模式需要设置 GOOGLE_DRIVE_ACCESS_TOKEN".to_string(),
            ));
        }
        Ok(())
    }
}
