//! Record mapper: flattens a `RawRecord` plus its extracted description fields
//! into a `MappedRecord`.

use crate::models::{CustomValue, DescriptionFields, MappedRecord, RawRecord};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Text stored for a custom attribute that has no value.
pub const NULL_TEXT: &str = "";

/// Layout of tracker timestamps (`2024-01-05T10:00:00.000+0000`).
const TRACKER_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Tracker extension fields copied into dedicated columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomSlot {
    Permfix,
    Team,
    Rca,
    Product,
    TeamResp,
}

impl CustomSlot {
    pub const ALL: [CustomSlot; 5] = [
        CustomSlot::Permfix,
        CustomSlot::Team,
        CustomSlot::Rca,
        CustomSlot::Product,
        CustomSlot::TeamResp,
    ];

    pub fn field_id(self) -> &'static str {
        match self {
            CustomSlot::Permfix => "customfield_12351",
            CustomSlot::Team => "customfield_10900",
            CustomSlot::Rca => "customfield_12350",
            CustomSlot::Product => "customfield_12024",
            CustomSlot::TeamResp => "customfield_12357",
        }
    }

    /// Read this slot from a record.
    ///
    /// A present object slot contributes its `value` member; a bare scalar slot is
    /// taken as-is.
    pub fn read(self, record: &RawRecord) -> CustomValue {
        match record.fields.custom(self.field_id()) {
            None | Some(Value::Null) => CustomValue::Absent,
            Some(Value::Object(slot)) => match slot.get("value") {
                Some(v) => CustomValue::from_json(v),
                None => CustomValue::Absent,
            },
            Some(other) => CustomValue::from_json(other),
        }
    }
}

impl CustomValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CustomValue::Absent,
            Value::String(s) => CustomValue::Scalar(s.clone()),
            Value::Object(map) => CustomValue::Composite(map.clone()),
            other => CustomValue::Scalar(other.to_string()),
        }
    }

    /// Storage text: composites as compact JSON with sorted keys, scalars verbatim,
    /// absent values as [`NULL_TEXT`].
    pub fn to_column_text(&self) -> String {
        match self {
            CustomValue::Absent => NULL_TEXT.to_string(),
            CustomValue::Scalar(s) => s.clone(),
            CustomValue::Composite(map) => {
                let sorted: std::collections::BTreeMap<&String, &Value> = map.iter().collect();
                serde_json::to_string(&sorted).unwrap_or_else(|_| NULL_TEXT.to_string())
            }
        }
    }
}

/// Display names of all components, comma-separated.
pub fn join_components(record: &RawRecord) -> String {
    record
        .fields
        .components
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|c| c.name.as_deref().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a tracker timestamp. Unparseable input is logged and treated as missing.
pub fn parse_tracker_timestamp(field: &str, raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_str(raw, TRACKER_TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .inspect_err(|e| tracing::warn!(field, raw, error = %e, "unparseable tracker timestamp"))
        .ok()
}

#[tracing::instrument(level = "debug", skip_all, fields(key = %record.key))]
pub fn map_record(record: &RawRecord, description: Option<&DescriptionFields>) -> MappedRecord {
    let f = &record.fields;
    let d = description.cloned().unwrap_or_default();
    let slot = |s: CustomSlot| s.read(record).to_column_text();

    MappedRecord {
        key: record.key.clone(),
        summary: f.summary.clone().unwrap_or_default(),
        status: f
            .status
            .as_ref()
            .and_then(|s| s.name.clone())
            .unwrap_or_default(),
        created_date: parse_tracker_timestamp("created", f.created.as_deref()),
        updated_date: parse_tracker_timestamp("updated", f.updated.as_deref()),
        reporter: f.reporter.as_ref().and_then(|p| p.display_name.clone()),
        priority: f.priority.as_ref().and_then(|p| p.name.clone()),
        display_name: d.display_name,
        monitor_groups: d.monitor_groups,
        monitor_type: d.monitor_type,
        monitor_status: d.monitor_status,
        down_since: d.down_since,
        failed_locations: d.failed_locations,
        reason: d.reason,
        permfix: slot(CustomSlot::Permfix),
        team: slot(CustomSlot::Team),
        rca: slot(CustomSlot::Rca),
        components: join_components(record),
        product: slot(CustomSlot::Product),
        team_resp: slot(CustomSlot::TeamResp),
    }
}
