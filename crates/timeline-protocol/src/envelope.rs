use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One record in the shared timeline, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: i64,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// What a [`MutationEnvelope`] does to the entry with its `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationType {
    #[default]
    Upsert,
    Delete,
}

impl MutationType {
    /// Only the exact string `"DELETE"` deletes; anything else upserts.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "DELETE" => MutationType::Delete,
            _ => MutationType::Upsert,
        }
    }
}

/// Absent, null, non-string or unknown `type` values all fall back to upsert.
impl<'de> Deserialize<'de> for MutationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(value
            .as_str()
            .map(MutationType::from_wire)
            .unwrap_or_default())
    }
}

/// Client → Server mutation.
/// Wire: `{ "id": 1, "start_date": "2020", "end_date": "2021", "title": "t", "description": "", "type": "UPSERT" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationEnvelope {
    pub id: i64,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: MutationType,
}

impl MutationEnvelope {
    /// Parse a raw frame. Fails on non-JSON, non-objects, a missing or
    /// non-integer `id`, or non-string entry fields.
    pub fn parse(raw: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(raw)
    }

    pub fn upsert(entry: TimelineEntry) -> Self {
        Self {
            id: entry.id,
            start_date: entry.start_date,
            end_date: entry.end_date,
            title: entry.title,
            description: entry.description,
            kind: MutationType::Upsert,
        }
    }

    pub fn delete(id: i64) -> Self {
        Self {
            id,
            start_date: String::new(),
            end_date: String::new(),
            title: String::new(),
            description: String::new(),
            kind: MutationType::Delete,
        }
    }

    /// The entry this envelope would write on upsert.
    pub fn to_entry(&self) -> TimelineEntry {
        TimelineEntry {
            id: self.id,
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_type_defaults_to_upsert() {
        let env = MutationEnvelope::parse(br#"{"id":1,"title":"t2"}"#).unwrap();
        assert_eq!(env.kind, MutationType::Upsert);
        assert_eq!(env.start_date, "");
    }

    #[test]
    fn unknown_or_odd_type_defaults_to_upsert() {
        for raw in [
            r#"{"id":1,"type":"PATCH"}"#,
            r#"{"id":1,"type":"delete"}"#,
            r#"{"id":1,"type":null}"#,
            r#"{"id":1,"type":7}"#,
        ] {
            let env = MutationEnvelope::parse(raw.as_bytes()).unwrap();
            assert_eq!(env.kind, MutationType::Upsert, "{raw}");
        }
    }

    #[test]
    fn delete_needs_only_id() {
        let env = MutationEnvelope::parse(br#"{"id":42,"type":"DELETE"}"#).unwrap();
        assert_eq!(env, MutationEnvelope::delete(42));
    }

    #[test]
    fn id_is_required() {
        assert!(MutationEnvelope::parse(br#"{"title":"no id"}"#).is_err());
        assert!(MutationEnvelope::parse(br#"{"id":"1"}"#).is_err());
        assert!(MutationEnvelope::parse(b"not json").is_err());
    }
}
