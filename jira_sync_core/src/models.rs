use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One issue as returned by the tracker search endpoint.
///
/// Only the fields the sync consumes are typed; every other entry of the
/// `fields` object (custom attribute slots included) lands in `RecordFields::extra`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawRecord {
    /// Issue key (e.g. `CSI-1234`). Unique; the conflict target in storage.
    pub key: String,
    #[serde(default)]
    pub fields: RecordFields,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecordFields {
    pub summary: Option<String>,
    pub status: Option<NamedRef>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub reporter: Option<Person>,
    pub priority: Option<NamedRef>,
    pub components: Option<Vec<Component>>,
    /// Either a plain string or a rich-text document; interpreted by `extract`.
    pub description: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RecordFields {
    /// Look up a tracker extension field by id (e.g. `customfield_10900`).
    pub fn custom(&self, field_id: &str) -> Option<&serde_json::Value> {
        self.extra.get(field_id)
    }
}

/// `{"name": ...}` objects such as status and priority.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Person {
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Component {
    #[serde(default)]
    pub name: Option<String>,
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchPage {
    pub issues: Vec<RawRecord>,
    pub total: u64,
}

/// Operational status fields extracted from a description body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DescriptionFields {
    pub display_name: Option<String>,
    pub monitor_groups: Option<String>,
    pub monitor_type: Option<String>,
    pub monitor_status: Option<String>,
    pub down_since: Option<NaiveDateTime>,
    pub failed_locations: Option<String>,
    pub reason: Option<String>,
}

/// Value held by a custom attribute slot.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomValue {
    Absent,
    Scalar(String),
    Composite(serde_json::Map<String, serde_json::Value>),
}

/// Flattened, storage-ready projection of a `RawRecord`.
///
/// Field order mirrors the column order of the sync table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedRecord {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub created_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
    pub reporter: Option<String>,
    pub priority: Option<String>,
    pub display_name: Option<String>,
    pub monitor_groups: Option<String>,
    pub monitor_type: Option<String>,
    pub monitor_status: Option<String>,
    pub down_since: Option<NaiveDateTime>,
    pub failed_locations: Option<String>,
    pub reason: Option<String>,
    pub permfix: String,
    pub team: String,
    pub rca: String,
    pub components: String,
    pub product: String,
    pub team_resp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_record_keeps_custom_slots_in_extra() {
        let v = serde_json::json!({
            "key": "CSI-1",
            "fields": {
                "summary": "Monitor down",
                "status": {"name": "Open"},
                "reporter": null,
                "customfield_10900": {"value": "SRE"},
                "customfield_12351": null
            }
        });
        let rec: RawRecord = serde_json::from_value(v).unwrap();
        assert_eq!(rec.key, "CSI-1");
        assert_eq!(rec.fields.summary.as_deref(), Some("Monitor down"));
        assert_eq!(
            rec.fields.status.as_ref().and_then(|s| s.name.as_deref()),
            Some("Open")
        );
        assert!(rec.fields.reporter.is_none());
        assert_eq!(
            rec.fields.custom("customfield_10900"),
            Some(&serde_json::json!({"value": "SRE"}))
        );
        assert_eq!(
            rec.fields.custom("customfield_12351"),
            Some(&serde_json::Value::Null)
        );
    }

    #[test]
    fn search_page_defaults_missing_members() {
        let page: SearchPage = serde_json::from_str("{}").unwrap();
        assert!(page.issues.is_empty());
        assert_eq!(page.total, 0);
    }
}
