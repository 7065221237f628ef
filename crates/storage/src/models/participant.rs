use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;
use uuid::Uuid;

/// Column name to value mapping of one results row, in the column order of the uploaded file.
///
/// Serializes as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantData(Vec<(String, String)>);

impl ParticipantData {
    pub fn new(columns: Vec<(String, String)>) -> Self {
        Self(columns)
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn columns(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn into_columns(self) -> Vec<(String, String)> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for ParticipantData {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for ParticipantData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParticipantData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = ParticipantData;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of column names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut columns = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    columns.push((key, value));
                }
                Ok(ParticipantData(columns))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// One ingested results row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Uuid,
    pub event_id: Uuid,
    /// Zero-based position of the row in the uploaded file
    pub row_index: i32,
    /// Race section the row was listed under, when the file has sections
    pub race: Option<String>,
    #[schema(value_type = Object)]
    pub data: ParticipantData,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParticipantData {
        ParticipantData::new(vec![
            ("SEXO".to_string(), "M".to_string()),
            ("NOMBRE".to_string(), "Ana".to_string()),
            ("DORSAL".to_string(), "001".to_string()),
        ])
    }

    #[test]
    fn serializes_columns_in_file_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, r#"{"SEXO":"M","NOMBRE":"Ana","DORSAL":"001"}"#);
    }

    #[test]
    fn deserialization_keeps_key_order() {
        let data: ParticipantData =
            serde_json::from_str(r#"{"Z":"1","A":"2","M":"3"}"#).unwrap();
        let keys: Vec<&str> = data.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Z", "A", "M"]);
    }

    #[test]
    fn get_looks_up_exact_column() {
        let data = sample();
        assert_eq!(data.get("NOMBRE"), Some("Ana"));
        assert_eq!(data.get("nombre"), None);
    }
}
