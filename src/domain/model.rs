use serde::{Deserialize, Serialize};

/// One row of the raw event export. Every cell is nullable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEvent {
    pub user_id: Option<String>,
    pub event_name: Option<String>,
    pub event_property: Option<String>,
    pub created_at: Option<String>,
}

/// Properties looked up in a parsed `event_property` payload, untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFields {
    pub house_id: Option<serde_json::Value>,
    pub page_type: Option<serde_json::Value>,
    pub rent_price: Option<serde_json::Value>,
    pub sale_price: Option<serde_json::Value>,
    pub estate_name: Option<serde_json::Value>,
    pub region_name: Option<serde_json::Value>,
    pub house_address: Option<serde_json::Value>,
}

/// A raw event after payload parsing and type normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedEvent {
    pub raw: RawEvent,
    pub house_id: Option<String>,
    pub page_type: Option<String>,
    pub rent_price: Option<f64>,
    pub sale_price: Option<f64>,
    pub estate_name: Option<String>,
    pub region_name: Option<String>,
    pub house_address: Option<String>,
    /// Unix seconds; 0 when `created_at` is missing or unparseable.
    pub timestamp: i64,
    pub payload_unparsed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub feedback_type: String,
    pub user_id: String,
    pub item_id: String,
    pub timestamp: i64,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub item_id: String,
    pub timestamp: i64,
    pub labels: String,
    pub categories: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub labels: String,
    pub comment: String,
}

/// Output of the extraction transform. Feedback and items are `None` when no
/// row carried a house_id.
#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub feedback: Option<Vec<FeedbackRecord>>,
    pub items: Option<Vec<ItemRecord>>,
    pub users: Vec<UserRecord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub output_dir: String,
    pub feedback_rows: usize,
    pub item_rows: usize,
    pub user_rows: usize,
    pub sample_written: bool,
}

// Gorse API payloads.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GorseItem {
    #[serde(rename = "ItemId")]
    pub item_id: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Labels")]
    pub labels: Vec<String>,
    #[serde(rename = "Categories")]
    pub categories: Vec<String>,
    #[serde(rename = "Comment")]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GorseFeedback {
    #[serde(rename = "FeedbackType")]
    pub feedback_type: String,
    #[serde(rename = "UserId")]
    pub user_id: String,
    #[serde(rename = "ItemId")]
    pub item_id: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Comment")]
    pub comment: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RowAffected {
    #[serde(rename = "RowAffected")]
    pub row_affected: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
    #[serde(rename = "Score", default)]
    pub score: Option<f64>,
}
