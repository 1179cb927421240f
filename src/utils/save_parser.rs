use std::fs;
use std::path::Path;

use crate::models::{Ordered, SaveDocument};
use crate::utils::error::AppResult;

/// 读取 TTS 存档，字段类型不符时直接报错
pub fn load_save_document(path: &Path) -> AppResult<Ordered<SaveDocument>> {
    log::debug!("正在读取存档，路径: {}", path.display());
    let content = fs::read_to_string(path)?;
    let document: Ordered<SaveDocument> = serde_json::from_str(&content)?;
    log::info!("已读取存档，顶层对象 {} 个", document.object_states.len());
    Ok(document)
}

/// 以格式化 JSON 写回存档，键顺序与读入时一致
pub fn write_save_document(path: &Path, document: &Ordered<SaveDocument>) -> AppResult<()> {
    let content = serde_json::to_string_pretty(document)?;
    fs::write(path, content)?;
    log::info!("存档已写回: {}", path.display());
    Ok(())
}
