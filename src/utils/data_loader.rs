use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{CardRecord, DeckManifest, IconMap};
use crate::utils::error::AppResult;

// 加载卡牌 CSV，每一行对应一张卡牌，行号决定卡牌在牌堆中的位置
pub fn load_card_records(path: &Path) -> AppResult<Vec<CardRecord>> {
    log::debug!("正在加载卡牌数据，路径: {}", path.display());
    let mut rdr = csv::Reader::from_path(path)?;
    let mut records = Vec::new();

    for (index, result) in rdr.deserialize().enumerate() {
        let line_num = index + 2; // +1 for header, +1 for 1-based index
        let record: CardRecord = result?;
        if record.title.trim().is_empty() {
            log::warn!("{} 第 {} 行标题为空，仍按一张卡牌处理", path.display(), line_num);
        }
        log::trace!("成功解析第 {} 行: {:?}", line_num, record);
        records.push(record);
    }

    log::debug!("卡牌数据加载完成，共 {} 条", records.len());
    Ok(records)
}

// 加载牌堆清单
pub fn load_deck_manifest(path: &Path) -> AppResult<DeckManifest> {
    log::debug!("正在加载牌堆清单，路径: {}", path.display());
    let content = fs::read_to_string(path)?;
    let manifest: DeckManifest = serde_yaml::from_str(&content)?;
    log::info!("已加载 {} 个牌堆配置", manifest.decks.len());
    Ok(manifest)
}

// 加载图标映射，相对路径以清单所在目录为基准
pub fn load_icon_map(path: &Path) -> AppResult<IconMap> {
    if !path.exists() {
        log::warn!("图标映射文件不存在: {}，卡牌将不显示图标", path.display());
        return Ok(HashMap::new());
    }

    let content = fs::read_to_string(path)?;
    let raw: HashMap<String, PathBuf> = serde_yaml::from_str(&content)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let icons: IconMap = raw
        .into_iter()
        .map(|(key, icon)| {
            let resolved = if icon.is_absolute() { icon } else { base.join(icon) };
            (key, resolved)
        })
        .collect();

    log::info!("已加载 {} 个图标", icons.len());
    Ok(icons)
}
