use crate::core::gorse_client::{body_preview, GorseClient};
use crate::core::Storage;
use crate::domain::model::{GorseFeedback, GorseItem, RowAffected};
use crate::utils::error::{EtlError, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A row of `items.csv` as written by the extraction pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemRow {
    pub item_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub labels: String,
    #[serde(default)]
    pub categories: String,
    #[serde(default)]
    pub comment: String,
}

/// A row of `feedback.csv` as written by the extraction pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackRow {
    pub feedback_type: String,
    pub user_id: String,
    pub item_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub comment: String,
}

/// Pipe-joined labels; tokens without a `key:value` colon are dropped.
pub fn split_labels(labels: &str) -> Vec<String> {
    labels
        .split('|')
        .filter(|token| token.contains(':'))
        .map(str::to_string)
        .collect()
}

pub fn split_categories(categories: &str) -> Vec<String> {
    if categories.is_empty() {
        return Vec::new();
    }
    categories.split('|').map(str::to_string).collect()
}

impl From<ItemRow> for GorseItem {
    fn from(row: ItemRow) -> Self {
        GorseItem {
            labels: split_labels(&row.labels),
            categories: split_categories(&row.categories),
            item_id: row.item_id,
            timestamp: row.timestamp,
            comment: row.comment,
        }
    }
}

impl From<FeedbackRow> for GorseFeedback {
    fn from(row: FeedbackRow) -> Self {
        GorseFeedback {
            feedback_type: row.feedback_type,
            user_id: row.user_id,
            item_id: row.item_id,
            timestamp: row.timestamp,
            comment: row.comment,
        }
    }
}

fn read_rows<R: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<Vec<R>> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let mut reader = csv::Reader::from_reader(data);
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<R>, csv::Error>>()
        .map_err(EtlError::from)
}

pub async fn read_items<S: Storage>(storage: &S, path: &str) -> Result<Vec<GorseItem>> {
    let data = storage.read_file(path).await?;
    let rows: Vec<ItemRow> = read_rows(&data)?;
    Ok(rows.into_iter().map(GorseItem::from).collect())
}

pub async fn read_feedback<S: Storage>(storage: &S, path: &str) -> Result<Vec<GorseFeedback>> {
    let data = storage.read_file(path).await?;
    let rows: Vec<FeedbackRow> = read_rows(&data)?;
    Ok(rows.into_iter().map(GorseFeedback::from).collect())
}

/// How a successful batch is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMode {
    /// The number of records sent.
    BatchLen,
    /// `RowAffected` from the response body, batch length when absent.
    RowAffected,
}

/// Where and how one kind of record is sent.
#[derive(Debug, Clone)]
pub struct BatchTarget {
    pub label: &'static str,
    pub path: &'static str,
    pub method: Method,
    pub batch_size: usize,
    pub count_mode: CountMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub label: String,
    pub total: usize,
    pub uploaded: usize,
    pub batches: usize,
    /// 1-based numbers of batches that failed.
    pub failed_batches: Vec<usize>,
}

impl fmt::Display for UploadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.uploaded, self.total)
    }
}

pub struct BatchUploader<'a> {
    client: &'a GorseClient,
    delay: Duration,
}

impl<'a> BatchUploader<'a> {
    pub fn new(client: &'a GorseClient, delay: Duration) -> Self {
        Self { client, delay }
    }

    async fn send_one<T: Serialize + Sync>(&self, target: &BatchTarget, batch: &[T]) -> Result<usize> {
        let response = self
            .client
            .send_batch(target.method.clone(), target.path, batch)
            .await?;

        match target.count_mode {
            CountMode::BatchLen => Ok(batch.len()),
            CountMode::RowAffected => {
                let text = response.text().await?;
                let body: RowAffected = serde_json::from_str(&text)?;
                Ok(body.row_affected.unwrap_or(batch.len()))
            }
        }
    }

    /// Sends `records` batch by batch in input order. A failed batch is
    /// logged and skipped; the next batch is always attempted.
    pub async fn upload<T: Serialize + Sync>(&self, target: &BatchTarget, records: &[T]) -> UploadReport {
        let mut report = UploadReport {
            label: target.label.to_string(),
            total: records.len(),
            ..UploadReport::default()
        };

        for (index, batch) in records.chunks(target.batch_size.max(1)).enumerate() {
            let number = index + 1;
            report.batches += 1;

            match self.send_one(target, batch).await {
                Ok(affected) => {
                    report.uploaded += affected;
                    tracing::info!("✓ Batch {}: Uploaded {} {}", number, affected, target.label);
                }
                Err(EtlError::HttpStatusError { status, body }) => {
                    report.failed_batches.push(number);
                    tracing::error!("✗ Batch {}: Failed with status {}", number, status);
                    tracing::error!("  Response: {}", body_preview(&body));
                }
                Err(EtlError::SerializationError(e)) => {
                    report.failed_batches.push(number);
                    tracing::error!("✗ Batch {}: Unreadable response: {}", number, e);
                }
                Err(e) => {
                    report.failed_batches.push(number);
                    tracing::error!("✗ Batch {}: Error: {}", number, e);
                }
            }

            tokio::time::sleep(self.delay).await;
        }

        tracing::info!("Total {} uploaded: {}", target.label, report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_labels_drops_tokens_without_colon() {
        assert_eq!(
            split_labels("estate:黃埔花園|region:黃埔"),
            vec!["estate:黃埔花園", "region:黃埔"]
        );
        assert_eq!(split_labels("estate:A|garbage|"), vec!["estate:A"]);
        assert!(split_labels("").is_empty());
    }

    #[test]
    fn test_split_categories() {
        assert_eq!(split_categories("rental|sale"), vec!["rental", "sale"]);
        assert_eq!(split_categories("sale"), vec!["sale"]);
        assert!(split_categories("").is_empty());
    }

    #[test]
    fn test_item_rows_reshape_into_api_records() {
        let csv = "item_id,timestamp,labels,categories,comment\nH1,1704067200,estate:A|region:B,rental,\"{\"\"rent_price\"\":2000.0}\"\nH2,0,,,{}\n";
        let rows: Vec<ItemRow> = read_rows(csv.as_bytes()).unwrap();
        let items: Vec<GorseItem> = rows.into_iter().map(GorseItem::from).collect();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item_id, "H1");
        assert_eq!(items[0].timestamp, "1704067200");
        assert_eq!(items[0].labels, vec!["estate:A", "region:B"]);
        assert_eq!(items[0].categories, vec!["rental"]);
        assert_eq!(items[0].comment, r#"{"rent_price":2000.0}"#);
        assert!(items[1].labels.is_empty());
        assert!(items[1].categories.is_empty());

        let json = serde_json::to_value(&items[0]).unwrap();
        assert_eq!(json["ItemId"], "H1");
        assert_eq!(json["Categories"][0], "rental");
    }

    #[test]
    fn test_feedback_rows_reshape_into_api_records() {
        let csv = "feedback_type,user_id,item_id,timestamp,comment\ncontact_agent,U1,H1,1759818321,weight:3.0\n";
        let rows: Vec<FeedbackRow> = read_rows(csv.as_bytes()).unwrap();
        let feedback = GorseFeedback::from(rows[0].clone());

        let json = serde_json::to_value(&feedback).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "FeedbackType": "contact_agent",
                "UserId": "U1",
                "ItemId": "H1",
                "Timestamp": "1759818321",
                "Comment": "weight:3.0"
            })
        );
    }

    #[tokio::test]
    async fn test_unreadable_row_affected_fails_batch() {
        use crate::config::GorseConfig;
        use httpmock::prelude::*;

        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/feedback");
            then.status(200).body("ok");
        });
        let client = GorseClient::new(GorseConfig::new(server.url("/api"), "k")).unwrap();
        let uploader = BatchUploader::new(&client, Duration::ZERO);
        let target = BatchTarget {
            label: "feedback entries",
            path: "feedback",
            method: Method::POST,
            batch_size: 20,
            count_mode: CountMode::RowAffected,
        };
        let feedback = vec![GorseFeedback::from(FeedbackRow {
            feedback_type: "view_listing".to_string(),
            user_id: "U1".to_string(),
            item_id: "H1".to_string(),
            ..FeedbackRow::default()
        })];

        let err = uploader.send_one(&target, &feedback).await.unwrap_err();
        assert!(matches!(err, EtlError::SerializationError(_)));
        assert_eq!(err.category(), crate::utils::error::ErrorCategory::Data);

        let report = uploader.upload(&target, &feedback).await;
        mock.assert_hits(2);
        assert_eq!(report.uploaded, 0);
        assert_eq!(report.failed_batches, vec![1]);
    }

    #[test]
    fn test_upload_report_display() {
        let report = UploadReport {
            label: "items".to_string(),
            total: 25,
            uploaded: 20,
            batches: 2,
            failed_batches: vec![2],
        };
        assert_eq!(report.to_string(), "20/25");
    }
}
