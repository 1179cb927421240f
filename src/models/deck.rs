use serde::Deserialize;

/// decks.yaml 中的一项
#[derive(Debug, Clone, Deserialize)]
pub struct DeckSpec {
    pub name: String,
    /// 云端贴图文件 ID
    #[serde(default)]
    pub upload_target: Option<String>,
}

impl DeckSpec {
    /// 存档中牌堆的昵称
    pub fn save_nickname(&self) -> String {
        Self::nickname_for(&self.name)
    }

    pub fn nickname_for(name: &str) -> String {
        format!("{name}_deck")
    }

    pub fn csv_file_name(&self) -> String {
        format!("{}_deck.csv", self.name)
    }

    pub fn sheet_file_name(&self) -> String {
        format!("{}.png", self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeckManifest {
    pub decks: Vec<DeckSpec>,
}
