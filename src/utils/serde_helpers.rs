/// 推送载荷的序列化/反序列化辅助模块

use serde::{Deserialize, Deserializer, Serializer};

/// 处理可选的内容引用：后端有时只给ID字符串，有时给展开后的对象
/// (例如: "p1" 或 {"_id": "p1", "caption": "..."})
pub mod content_ref {
    use super::*;

    pub fn serialize<S>(id: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match id {
            Some(id) => serializer.serialize_str(id),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RefValue {
            Id(String),
            Object {
                #[serde(alias = "_id")]
                id: String,
            },
        }

        let value = Option::<RefValue>::deserialize(deserializer)?;
        Ok(value
            .map(|v| match v {
                RefValue::Id(s) => s,
                RefValue::Object { id } => id,
            })
            .filter(|id| !id.is_empty()))
    }
}
