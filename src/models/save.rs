use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::models::ordered::Ordered;

/// TTS 存档根节点
///
/// 只对 `ObjectStates` 建模，其余字段原样保存在 `extra` 中，写回时不做改动。
/// 每一层对象都包在 `Ordered` 里，写回后键的顺序与读入时一致。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDocument {
    #[serde(rename = "ObjectStates", default)]
    pub object_states: Vec<Ordered<GameObject>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 存档中的通用对象节点，可能是袋子、牌堆或单张卡牌
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameObject {
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Nickname", default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(rename = "GUID", default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(rename = "CardID", default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<i64>,
    #[serde(rename = "DeckIDs", default, skip_serializing_if = "Option::is_none")]
    pub deck_ids: Option<Vec<i64>>,
    // 键是贴图编号（"1"、"52" 等），值是贴图网格信息
    #[serde(rename = "CustomDeck", default, skip_serializing_if = "Option::is_none")]
    pub custom_deck: Option<CustomDecks>,
    #[serde(rename = "ContainedObjects", default, skip_serializing_if = "Option::is_none")]
    pub contained_objects: Option<Vec<Ordered<GameObject>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomDeckEntry {
    #[serde(rename = "NumWidth")]
    pub num_width: u32,
    #[serde(rename = "NumHeight")]
    pub num_height: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub type CustomDecks = Ordered<BTreeMap<String, Ordered<CustomDeckEntry>>>;

pub const BAG_TYPE: &str = "Bag";

impl GameObject {
    /// 只有 Name 为 "Bag" 且内容非空时才需要展开
    pub fn is_expandable_bag(&self) -> bool {
        self.name.as_deref() == Some(BAG_TYPE)
            && self
                .contained_objects
                .as_ref()
                .is_some_and(|objects| !objects.is_empty())
    }

    pub fn has_nickname(&self, nickname: &str) -> bool {
        self.nickname.as_deref() == Some(nickname)
    }

    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or("<unnamed>")
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_survive_round_trip() {
        let raw = json!({
            "SaveName": "Warrior Test",
            "ObjectStates": [{
                "Name": "DeckCustom",
                "Transform": {"posX": 1.5, "posY": 0.0},
                "Nickname": "warrior_deck",
                "DeckIDs": [5200, 5201],
                "CustomDeck": {
                    "52": {"FaceURL": "http://x/face.png", "NumWidth": 10, "NumHeight": 1, "BackIsHidden": true}
                },
                "ContainedObjects": [
                    {"Name": "Card", "Nickname": "A", "CardID": 5200, "GUID": "abc123", "Tags": ["x"]},
                    {"Name": "Card", "Nickname": "B", "CardID": 5201, "GUID": "def456"}
                ],
                "GUID": "deck01"
            }],
            "VersionNumber": "v13.2.1"
        });

        let text = raw.to_string();
        let doc: Ordered<SaveDocument> = serde_json::from_str(&text).unwrap();
        let deck = &doc.object_states[0];
        assert_eq!(deck.deck_ids.as_deref(), Some(&[5200, 5201][..]));
        assert_eq!(deck.custom_deck.as_ref().unwrap()["52"].num_width, 10);
        assert_eq!(deck.extra["Transform"]["posX"], json!(1.5));

        // Value 的相等比较不看键顺序，这里必须比较序列化后的文本
        assert_eq!(serde_json::to_string(&doc).unwrap(), text);
    }

    #[test]
    fn multi_sheet_custom_deck_keeps_file_order() {
        let text = r#"{"ObjectStates":[{"Name":"DeckCustom","CustomDeck":{"52":{"NumWidth":10,"NumHeight":2},"1":{"NumHeight":1,"FaceURL":"f","NumWidth":10}}}],"SaveName":"x"}"#;
        let doc: Ordered<SaveDocument> = serde_json::from_str(text).unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), text);
    }

    #[test]
    fn mistyped_deck_ids_are_rejected_at_load() {
        let raw = json!({"ObjectStates": [{"Name": "Deck", "DeckIDs": ["x"]}]});
        assert!(serde_json::from_value::<Ordered<SaveDocument>>(raw).is_err());
    }

    #[test]
    fn only_non_empty_bags_expand() {
        let empty = fixtures::bag("empty", Vec::new());
        let full = fixtures::bag("full", vec![fixtures::card(100, "A")]);
        let deck = fixtures::deck("d", &[100], &["A"]);
        assert!(!empty.is_expandable_bag());
        assert!(full.is_expandable_bag());
        assert!(!deck.is_expandable_bag());
    }
}
