use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{self, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

/// 记住 JSON 对象读入时的键顺序，写回时按原顺序输出
///
/// 内部类型照常用 serde derive 建模。新出现的键排在原有键之后，
/// 被删掉的键直接忽略。比较相等时只看内部值。
#[derive(Debug, Clone, Default)]
pub struct Ordered<T> {
    inner: T,
    key_order: Vec<String>,
}

impl<T> From<T> for Ordered<T> {
    fn from(inner: T) -> Self {
        Self {
            inner,
            key_order: Vec::new(),
        }
    }
}

impl<T> Deref for Ordered<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for Ordered<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: PartialEq> PartialEq for Ordered<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

/// 按记录的顺序重排键，未记录的键保持相对顺序排在最后
fn restore_key_order(map: Map<String, Value>, key_order: &[String]) -> Map<String, Value> {
    if key_order.is_empty() {
        return map;
    }
    let rank: HashMap<&str, usize> = key_order
        .iter()
        .enumerate()
        .map(|(index, key)| (key.as_str(), index))
        .collect();
    let mut entries: Vec<(String, Value)> = map.into_iter().collect();
    entries.sort_by_key(|(key, _)| rank.get(key.as_str()).copied().unwrap_or(usize::MAX));
    entries.into_iter().collect()
}

impl<'de, T> Deserialize<'de> for Ordered<T>
where
    T: de::DeserializeOwned,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let key_order = map.keys().cloned().collect();
        let inner = serde_json::from_value(Value::Object(map)).map_err(de::Error::custom)?;
        Ok(Self { inner, key_order })
    }
}

impl<T: Serialize> Serialize for Ordered<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match serde_json::to_value(&self.inner).map_err(ser::Error::custom)? {
            Value::Object(map) => restore_key_order(map, &self.key_order).serialize(serializer),
            _ => Err(ser::Error::custom("只能保留 JSON 对象的键顺序")),
        }
    }
}
