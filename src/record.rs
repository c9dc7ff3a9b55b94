use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::UNKNOWN_VOLUME;

/// The fixed column set of a match result row, in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    CourtStation,
    CauseNo,
    NameOfDeceased,
    StatusAtGp,
    VolumeNo,
    DatePublished,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Id,
        Field::CourtStation,
        Field::CauseNo,
        Field::NameOfDeceased,
        Field::StatusAtGp,
        Field::VolumeNo,
        Field::DatePublished,
    ];

    /// Fields considered by the free-text search. Everything but the id.
    pub const SEARCHABLE: [Field; 6] = [
        Field::CourtStation,
        Field::CauseNo,
        Field::NameOfDeceased,
        Field::StatusAtGp,
        Field::VolumeNo,
        Field::DatePublished,
    ];

    /// Wire/CSV name, as emitted by the registry backend.
    pub fn name(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::CourtStation => "courtStation",
            Field::CauseNo => "causeNo",
            Field::NameOfDeceased => "nameOfDeceased",
            Field::StatusAtGp => "statusAtGP",
            Field::VolumeNo => "volumeNo",
            Field::DatePublished => "datePublished",
        }
    }

    /// Column heading for rendering.
    pub fn label(self) -> &'static str {
        match self {
            Field::Id => "No.",
            Field::CourtStation => "Court Station",
            Field::CauseNo => "Cause No.",
            Field::NameOfDeceased => "Name of Deceased",
            Field::StatusAtGp => "Status at G.P.",
            Field::VolumeNo => "Volume No.",
            Field::DatePublished => "Date Published",
        }
    }

    /// Resolve a user- or file-supplied column name. Case, punctuation and
    /// underscores are ignored, so "cause_no", "Cause No." and "causeNo"
    /// all resolve to the same field.
    pub fn parse(name: &str) -> Option<Field> {
        let wanted = normalize_key(name);
        Field::ALL.into_iter().find(|f| {
            normalize_key(f.name()) == wanted || normalize_key(f.label()) == wanted
        })
    }
}

/// Lowercase a column name and drop everything non-alphanumeric.
pub fn normalize_key(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// One matched registry entry (a probate cause), as returned by the backend
/// matcher. Every field is optional; the backend omits or nulls anything it
/// could not extract, and extra fields in the payload are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRecord {
    #[serde(alias = "_id", deserialize_with = "stringish")]
    pub id: Option<String>,
    #[serde(
        rename = "courtStation",
        alias = "court_station",
        deserialize_with = "stringish"
    )]
    pub court_station: Option<String>,
    #[serde(rename = "causeNo", alias = "cause_no", deserialize_with = "stringish")]
    pub cause_no: Option<String>,
    #[serde(
        rename = "nameOfDeceased",
        alias = "name_of_deceased",
        deserialize_with = "stringish"
    )]
    pub name_of_deceased: Option<String>,
    #[serde(
        rename = "statusAtGP",
        alias = "status_at_gp",
        alias = "status",
        deserialize_with = "stringish"
    )]
    pub status_at_gp: Option<String>,
    #[serde(rename = "volumeNo", alias = "volume_no", deserialize_with = "stringish")]
    pub volume_no: Option<String>,
    #[serde(
        rename = "datePublished",
        alias = "date_published",
        deserialize_with = "stringish"
    )]
    pub date_published: Option<String>,
}

impl MatchRecord {
    /// Field accessor with nulls normalized to "". All searching, sorting
    /// and exporting goes through here, so a missing field never needs a
    /// guard anywhere else.
    pub fn field(&self, field: Field) -> &str {
        let value = match field {
            Field::Id => &self.id,
            Field::CourtStation => &self.court_station,
            Field::CauseNo => &self.cause_no,
            Field::NameOfDeceased => &self.name_of_deceased,
            Field::StatusAtGp => &self.status_at_gp,
            Field::VolumeNo => &self.volume_no,
            Field::DatePublished => &self.date_published,
        };
        value.as_deref().unwrap_or("")
    }

    pub fn set_field(&mut self, field: Field, value: Option<String>) {
        let slot = match field {
            Field::Id => &mut self.id,
            Field::CourtStation => &mut self.court_station,
            Field::CauseNo => &mut self.cause_no,
            Field::NameOfDeceased => &mut self.name_of_deceased,
            Field::StatusAtGp => &mut self.status_at_gp,
            Field::VolumeNo => &mut self.volume_no,
            Field::DatePublished => &mut self.date_published,
        };
        *slot = value;
    }

    /// Grouping key: the volume number, or the sentinel bucket when the
    /// record has none (null or empty string).
    pub fn volume_key(&self) -> &str {
        match self.volume_no.as_deref() {
            Some(v) if !v.is_empty() => v,
            _ => UNKNOWN_VOLUME,
        }
    }
}

// The backend is loose about scalar types: ids and volume numbers show up as
// strings or numbers, and court stations are sometimes nested objects with a
// "name". Everything lands as an Option<String>.
fn stringish<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(m) => m
            .get("name")
            .and_then(|n| n.as_str())
            .map(|n| n.to_string()),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_payload() {
        let rec: MatchRecord = serde_json::from_str(
            r#"{"id":"7","courtStation":"Nakuru","causeNo":"E123",
                "nameOfDeceased":"John Doe","statusAtGP":"Published",
                "volumeNo":"12","datePublished":"2024-03-01"}"#,
        )
        .unwrap();
        assert_eq!(rec.field(Field::CourtStation), "Nakuru");
        assert_eq!(rec.field(Field::StatusAtGp), "Published");
        assert_eq!(rec.volume_key(), "12");
    }

    #[test]
    fn accepts_snake_case_and_ignores_unknown_fields() {
        let rec: MatchRecord = serde_json::from_str(
            r#"{"_id":"abc","court_station":"Eldoret","cause_no":"44",
                "name_of_deceased":"Jane Roe","status_at_gp":"Pending",
                "volume_no":9,"date_published":null,"score":0.91}"#,
        )
        .unwrap();
        assert_eq!(rec.id.as_deref(), Some("abc"));
        assert_eq!(rec.field(Field::VolumeNo), "9");
        assert_eq!(rec.field(Field::DatePublished), "");
    }

    #[test]
    fn numeric_id_and_nested_court_station() {
        let rec: MatchRecord = serde_json::from_str(
            r#"{"id":42,"courtStation":{"name":"Mombasa","code":"MSA"}}"#,
        )
        .unwrap();
        assert_eq!(rec.id.as_deref(), Some("42"));
        assert_eq!(rec.court_station.as_deref(), Some("Mombasa"));
    }

    #[test]
    fn missing_fields_read_as_empty() {
        let rec: MatchRecord = serde_json::from_str("{}").unwrap();
        for field in Field::ALL {
            assert_eq!(rec.field(field), "");
        }
    }

    #[test]
    fn volume_key_sentinel_for_null_and_empty() {
        let none: MatchRecord = serde_json::from_str("{}").unwrap();
        let empty: MatchRecord = serde_json::from_str(r#"{"volumeNo":""}"#).unwrap();
        assert_eq!(none.volume_key(), UNKNOWN_VOLUME);
        assert_eq!(empty.volume_key(), UNKNOWN_VOLUME);
    }

    #[test]
    fn field_parse_is_forgiving() {
        assert_eq!(Field::parse("cause_no"), Some(Field::CauseNo));
        assert_eq!(Field::parse("Cause No."), Some(Field::CauseNo));
        assert_eq!(Field::parse("statusAtGP"), Some(Field::StatusAtGp));
        assert_eq!(Field::parse("bogus"), None);
    }
}
