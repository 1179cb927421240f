use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// CSV 中的一行卡牌数据
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardRecord {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub snark: String,
    #[serde(default)]
    pub bonus1: String,
    #[serde(default)]
    pub bonus2: String,
    #[serde(default)]
    pub bonus3: String,
    #[serde(default)]
    pub art: String,
}

impl CardRecord {
    pub fn bonuses(&self) -> [(&'static str, &str); 3] {
        [
            ("bonus1", self.bonus1.as_str()),
            ("bonus2", self.bonus2.as_str()),
            ("bonus3", self.bonus3.as_str()),
        ]
    }
}

/// 图标键 -> SVG 文件路径
pub type IconMap = HashMap<String, PathBuf>;
