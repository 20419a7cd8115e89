//! Description extractor.
//!
//! Monitoring alerts land in the tracker with a description body shaped like
//!
//! ```text
//! Display Name: checkout-api
//! Monitor Groups: Payments
//! Monitor Type: URL
//! Monitor status: Down
//! Down since: March 3, 2024, 2:15 PM UTC
//! Failed locations: Dallas, London
//! Reason: Connection timed out
//! ```
//!
//! either as a plain string or as a rich-text document (blocks of inline items).
//! Each line is classified by the first label phrase it contains, in the order
//! given by [`Label::PRIORITY`].

use crate::models::DescriptionFields;
use chrono::NaiveDateTime;
use serde_json::Value;

/// Timestamp layout of the "Down since" value once the trailing zone token is dropped.
pub const DOWN_SINCE_FORMAT: &str = "%B %d, %Y, %I:%M %p";

/// A description field label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    DisplayName,
    MonitorGroups,
    MonitorType,
    MonitorStatus,
    DownSince,
    FailedLocations,
    Reason,
}

impl Label {
    /// Match order when several phrases occur on the same line. First match wins.
    pub const PRIORITY: [Label; 7] = [
        Label::DisplayName,
        Label::MonitorGroups,
        Label::MonitorType,
        Label::MonitorStatus,
        Label::DownSince,
        Label::FailedLocations,
        Label::Reason,
    ];

    /// Case-sensitive phrase searched for in each line.
    pub fn phrase(self) -> &'static str {
        match self {
            Label::DisplayName => "Display Name",
            Label::MonitorGroups => "Monitor Groups",
            Label::MonitorType => "Monitor Type",
            Label::MonitorStatus => "Monitor status",
            Label::DownSince => "Down since",
            Label::FailedLocations => "Failed locations",
            Label::Reason => "Reason",
        }
    }

    pub fn detect(line: &str) -> Option<Label> {
        Self::PRIORITY
            .into_iter()
            .find(|label| line.contains(label.phrase()))
    }
}

/// One inline item of a rich-text block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    HardBreak,
    Other,
}

/// A description body in one of the two shapes the tracker produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionBody {
    Plain(String),
    Rich(Vec<Vec<Inline>>),
}

impl DescriptionBody {
    /// Interpret the raw `description` field.
    ///
    /// Returns `None` for a missing, null or empty description and for shapes that
    /// are neither a string nor a document object with a `content` array.
    pub fn from_value(value: Option<&Value>) -> Option<Self> {
        match value? {
            Value::String(s) if !s.is_empty() => Some(Self::Plain(s.clone())),
            Value::Object(doc) => {
                let blocks = doc.get("content")?.as_array()?;
                if blocks.is_empty() {
                    return None;
                }
                Some(Self::Rich(blocks.iter().map(parse_block).collect()))
            }
            _ => None,
        }
    }

    /// Flatten to text lines. Rich blocks end with a line break each.
    pub fn lines(&self) -> Vec<String> {
        match self {
            DescriptionBody::Plain(s) => s.lines().map(str::to_string).collect(),
            DescriptionBody::Rich(blocks) => {
                let mut text = String::new();
                for block in blocks {
                    for inline in block {
                        match inline {
                            Inline::Text(t) => text.push_str(t),
                            Inline::HardBreak => text.push('\n'),
                            Inline::Other => {}
                        }
                    }
                    text.push('\n');
                }
                text.lines().map(str::to_string).collect()
            }
        }
    }
}

fn parse_block(block: &Value) -> Vec<Inline> {
    let Some(items) = block.get("content").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| match item.get("type").and_then(Value::as_str) {
            Some("text") => Inline::Text(
                item.get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            ),
            Some("hardBreak") => Inline::HardBreak,
            _ => Inline::Other,
        })
        .collect()
}

/// Split a line into its label and the raw text after the first colon.
///
/// Lines without a known label, or with a label but no colon, yield `None`.
pub fn classify_line(line: &str) -> Option<(Label, &str)> {
    let label = Label::detect(line)?;
    let (_, value) = line.split_once(':')?;
    Some((label, value))
}

/// Parse the value of a "Down since" line, e.g. `March 3, 2024, 2:15 PM UTC`.
///
/// The final whitespace-delimited token (a zone abbreviation) is dropped before parsing.
pub fn parse_down_since(raw: &str) -> Option<NaiveDateTime> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let Some((_, head)) = tokens.split_last() else {
        tracing::warn!(raw, "empty down_since value");
        return None;
    };
    let cleaned = head.join(" ");
    match NaiveDateTime::parse_from_str(&cleaned, DOWN_SINCE_FORMAT) {
        Ok(ts) => Some(ts),
        Err(e) => {
            tracing::warn!(raw, cleaned = %cleaned, error = %e, "unparseable down_since value");
            None
        }
    }
}

#[tracing::instrument(level = "debug", skip(body))]
pub fn extract_fields(body: &DescriptionBody) -> DescriptionFields {
    let mut fields = DescriptionFields::default();
    for line in body.lines() {
        let Some((label, raw)) = classify_line(&line) else {
            continue;
        };
        let text = || Some(raw.trim().to_string());
        match label {
            Label::DisplayName => fields.display_name = text(),
            Label::MonitorGroups => fields.monitor_groups = text(),
            Label::MonitorType => fields.monitor_type = text(),
            Label::MonitorStatus => fields.monitor_status = text(),
            Label::DownSince => fields.down_since = parse_down_since(raw),
            Label::FailedLocations => fields.failed_locations = text(),
            Label::Reason => fields.reason = text(),
        }
    }
    fields
}

/// Extract fields from a raw `description` value.
///
/// `None` means there was no usable description at all, which callers treat the
/// same as an all-absent `DescriptionFields`.
pub fn extract_description(value: Option<&Value>) -> Option<DescriptionFields> {
    DescriptionBody::from_value(value).map(|body| extract_fields(&body))
}
