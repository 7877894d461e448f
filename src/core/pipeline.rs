use crate::core::builders::{build_feedback, build_items, build_users};
use crate::core::extract::{extract_fields, normalize};
use crate::core::property_parser::LayeredParser;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{LoadReport, ParsedEvent, RawEvent, TransformResult};
use crate::utils::encoding::{decode_with_fallback, CANDIDATE_ENCODINGS};
use crate::utils::error::{EtlError, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub const FEEDBACK_FILE: &str = "feedback.csv";
pub const ITEMS_FILE: &str = "items.csv";
pub const USERS_FILE: &str = "users.csv";
pub const SAMPLE_FILE: &str = "test_sample.csv";

const FEEDBACK_HEADERS: [&str; 5] = ["feedback_type", "user_id", "item_id", "timestamp", "comment"];
const ITEM_HEADERS: [&str; 5] = ["item_id", "timestamp", "labels", "categories", "comment"];
const USER_HEADERS: [&str; 3] = ["user_id", "labels", "comment"];

const REQUIRED_COLUMNS: [&str; 4] = ["user_id", "event_name", "event_property", "created_at"];

// Cells the tracking export writes for "no value".
const NA_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn cell(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !NA_TOKENS.contains(v))
        .map(str::to_string)
}

/// Counts reported once extraction finishes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventSummary {
    pub rows: usize,
    pub unique_users: usize,
    pub unique_properties: usize,
    pub with_house_id: usize,
    pub with_rent_price: usize,
    pub with_sale_price: usize,
    pub unparsed_payloads: usize,
    /// Event names by descending count.
    pub event_counts: Vec<(String, usize)>,
}

impl EventSummary {
    pub fn from_events(events: &[ParsedEvent]) -> Self {
        let unique_users: HashSet<&str> =
            events.iter().filter_map(|e| e.raw.user_id.as_deref()).collect();
        let unique_properties: HashSet<&str> =
            events.iter().filter_map(|e| e.house_id.as_deref()).collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for event in events {
            if let Some(name) = event.raw.event_name.as_deref() {
                *counts.entry(name).or_default() += 1;
            }
        }
        let mut event_counts: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        event_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            rows: events.len(),
            unique_users: unique_users.len(),
            unique_properties: unique_properties.len(),
            with_house_id: events.iter().filter(|e| e.house_id.is_some()).count(),
            with_rent_price: events.iter().filter(|e| e.rent_price.is_some()).count(),
            with_sale_price: events.iter().filter(|e| e.sale_price.is_some()).count(),
            unparsed_payloads: events.iter().filter(|e| e.payload_unparsed).count(),
            event_counts,
        }
    }

    pub fn log(&self) {
        tracing::info!(
            "📊 Loaded {} rows: {} unique users, {} unique properties",
            self.rows,
            self.unique_users,
            self.unique_properties
        );
        tracing::info!(
            "📊 Extraction summary: house_id={}, rent_price={}, sale_price={}",
            self.with_house_id,
            self.with_rent_price,
            self.with_sale_price
        );
        for (name, count) in &self.event_counts {
            tracing::info!("    - {}: {}", name, count);
        }
        tracing::debug!(
            "Missing values: house_id={}, rent_price={}, sale_price={}",
            self.rows - self.with_house_id,
            self.rows - self.with_rent_price,
            self.rows - self.with_sale_price
        );
    }
}

pub fn to_csv_bytes<T: Serialize>(headers: &[&str], records: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(headers)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

/// Reads the raw export into events. Missing cells and NA tokens are `None`.
pub fn read_raw_events(text: &str) -> Result<Vec<RawEvent>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    tracing::debug!("Columns: {:?}", headers.iter().collect::<Vec<_>>());

    let mut index = HashMap::new();
    for column in REQUIRED_COLUMNS {
        let position = headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| EtlError::ProcessingError {
                message: format!("missing required column '{}'", column),
            })?;
        index.insert(column, position);
    }

    let mut events = Vec::new();
    for record in reader.records() {
        let record = record?;
        let get = |column: &str| cell(index.get(column).and_then(|&i| record.get(i)));
        events.push(RawEvent {
            user_id: get("user_id"),
            event_name: get("event_name"),
            event_property: get("event_property"),
            created_at: get("created_at"),
        });
    }

    if let Some(first) = events.first() {
        tracing::debug!("First row sample: {:?}", first);
    }
    Ok(events)
}

/// Raw event CSV in, feedback/items/users CSVs out.
pub struct EventLogPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    parser: LayeredParser,
}

impl<S: Storage, C: ConfigProvider> EventLogPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            parser: LayeredParser::default(),
        }
    }

    fn output_file(&self, name: &str) -> String {
        format!("{}/{}", self.config.output_dir().trim_end_matches('/'), name)
    }

    async fn write_csv<T: Serialize>(&self, name: &str, headers: &[&str], records: &[T]) -> Result<()> {
        let data = to_csv_bytes(headers, records)?;
        self.storage.write_file(&self.output_file(name), &data).await?;
        tracing::info!("✅ {} saved ({} rows)", self.output_file(name), records.len());
        Ok(())
    }

    pub fn parse_event(&self, raw: RawEvent) -> ParsedEvent {
        let parsed = self.parser.parse(raw.event_property.as_deref());
        let unparsed = raw.event_property.is_some() && parsed.is_none();
        let fields = extract_fields(parsed.as_ref());
        normalize(raw, fields, unparsed)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for EventLogPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<ParsedEvent>> {
        let path = self.config.input_csv();
        tracing::info!("📥 Loading data from {}", path);

        let bytes = self.storage.read_file(path).await.map_err(|e| {
            if e.is_not_found() {
                EtlError::MissingInputError {
                    path: path.to_string(),
                }
            } else {
                e
            }
        })?;

        for (i, line) in String::from_utf8_lossy(&bytes).lines().take(3).enumerate() {
            let preview: String = line.chars().take(200).collect();
            tracing::debug!("Line {}: {}...", i, preview);
        }

        let (text, encoding) =
            decode_with_fallback(&bytes, &CANDIDATE_ENCODINGS).ok_or_else(|| {
                EtlError::EncodingError {
                    path: path.to_string(),
                    tried: CANDIDATE_ENCODINGS
                        .iter()
                        .map(|e| e.name())
                        .collect::<Vec<_>>()
                        .join(", "),
                }
            })?;
        tracing::info!("Successfully loaded with {} encoding", encoding);

        let raw_events = read_raw_events(&text)?;
        let events: Vec<ParsedEvent> = raw_events
            .into_iter()
            .map(|raw| self.parse_event(raw))
            .collect();

        let summary = EventSummary::from_events(&events);
        if summary.unparsed_payloads > 0 {
            tracing::warn!("⚠️ {} rows could not be parsed", summary.unparsed_payloads);
        }
        summary.log();

        Ok(events)
    }

    async fn transform(&self, data: Vec<ParsedEvent>) -> Result<TransformResult> {
        let feedback = match build_feedback(&data) {
            Ok(feedback) => {
                let mut counts: Vec<(String, usize)> = Vec::new();
                for record in &feedback {
                    match counts.iter_mut().find(|(t, _)| *t == record.feedback_type) {
                        Some((_, n)) => *n += 1,
                        None => counts.push((record.feedback_type.clone(), 1)),
                    }
                }
                tracing::info!("🔄 Built {} feedback entries", feedback.len());
                for (feedback_type, count) in counts {
                    tracing::info!("    - {}: {}", feedback_type, count);
                }
                Some(feedback)
            }
            Err(e) => {
                tracing::error!("❌ Feedback not created: {}", e);
                None
            }
        };

        let items = match build_items(&data) {
            Ok(items) => {
                let labelled = items.iter().filter(|i| !i.labels.is_empty()).count();
                tracing::info!(
                    "🔄 Built {} unique properties ({} with labels)",
                    items.len(),
                    labelled
                );
                Some(items)
            }
            Err(e) => {
                tracing::error!("❌ Items not created: {}", e);
                None
            }
        };

        let users = build_users(&data);
        tracing::info!("🔄 Built {} unique users", users.len());

        Ok(TransformResult {
            feedback,
            items,
            users,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<LoadReport> {
        let mut report = LoadReport {
            output_dir: self.config.output_dir().to_string(),
            ..LoadReport::default()
        };

        if let Some(feedback) = &result.feedback {
            self.write_csv(FEEDBACK_FILE, &FEEDBACK_HEADERS, feedback).await?;
            report.feedback_rows = feedback.len();

            let sample_rows = self.config.sample_rows();
            if sample_rows > 0 && feedback.len() > sample_rows {
                self.write_csv(SAMPLE_FILE, &FEEDBACK_HEADERS, &feedback[..sample_rows])
                    .await?;
                report.sample_written = true;
            }
        }

        if let Some(items) = &result.items {
            self.write_csv(ITEMS_FILE, &ITEM_HEADERS, items).await?;
            report.item_rows = items.len();
        }

        self.write_csv(USERS_FILE, &USER_HEADERS, &result.users).await?;
        report.user_rows = result.users.len();

        if result.feedback.is_none() || result.items.is_none() {
            return Err(EtlError::NoItemData);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn put(&self, path: &str, data: &[u8]) {
            self.files.lock().await.insert(path.to_string(), data.to_vec());
        }

        async fn get_text(&self, path: &str) -> Option<String> {
            let files = self.files.lock().await;
            files
                .get(path)
                .map(|d| String::from_utf8_lossy(d).into_owned())
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.put(path, data).await;
            Ok(())
        }

        async fn exists(&self, path: &str) -> bool {
            self.files.lock().await.contains_key(path)
        }
    }

    struct MockConfig {
        input_csv: String,
        output_dir: String,
        sample_rows: usize,
    }

    impl MockConfig {
        fn new(sample_rows: usize) -> Self {
            Self {
                input_csv: "events.csv".to_string(),
                output_dir: "out".to_string(),
                sample_rows,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn input_csv(&self) -> &str {
            &self.input_csv
        }

        fn output_dir(&self) -> &str {
            &self.output_dir
        }

        fn sample_rows(&self) -> usize {
            self.sample_rows
        }
    }

    const HEADER: &str = "user_id,event_name,event_property,created_at\n";

    #[tokio::test]
    async fn test_scenario_view_listing() {
        let storage = MockStorage::default();
        let csv = format!(
            "{}U1,view_listing,\"{{\"\"house_id\"\":\"\"H1\"\",\"\"rent_price\"\":\"\"2000\"\"}}\",2024-01-01\n",
            HEADER
        );
        storage.put("events.csv", csv.as_bytes()).await;

        let pipeline = EventLogPipeline::new(storage.clone(), MockConfig::new(10));
        let events = pipeline.extract().await.unwrap();
        let result = pipeline.transform(events).await.unwrap();
        let report = pipeline.load(result).await.unwrap();

        assert_eq!(report.feedback_rows, 1);
        assert_eq!(report.item_rows, 1);
        assert_eq!(report.user_rows, 1);
        assert!(!report.sample_written);

        assert_eq!(
            storage.get_text("out/feedback.csv").await.unwrap(),
            "feedback_type,user_id,item_id,timestamp,comment\nview_listing,U1,H1,1704067200,weight:1.0\n"
        );
        assert_eq!(
            storage.get_text("out/items.csv").await.unwrap(),
            "item_id,timestamp,labels,categories,comment\nH1,1704067200,,rental,\"{\"\"rent_price\"\":2000.0}\"\n"
        );
        assert_eq!(
            storage.get_text("out/users.csv").await.unwrap(),
            "user_id,labels,comment\nU1,,\n"
        );
    }

    #[tokio::test]
    async fn test_unparseable_rows_still_count_users() {
        let storage = MockStorage::default();
        let csv = format!(
            "{}U1,view_listing,not json,2024-01-01\nU2,view_listing,\"{{'house_id': 'H2'}}\",bad-date\nNaN,view_listing,,2024-01-01\nU3,view_listing,NaN,2024-01-01\nU4,view_listing,\"{{\"\"house_id\"\":\"\"H4\"\",\"\"rent_price\"\":NaN}}\",2024-01-01\n",
            HEADER
        );
        storage.put("events.csv", csv.as_bytes()).await;

        let pipeline = EventLogPipeline::new(storage.clone(), MockConfig::new(10));
        let events = pipeline.extract().await.unwrap();

        assert_eq!(events.len(), 5);
        assert!(events[0].payload_unparsed);
        assert_eq!(events[0].house_id, None);
        assert_eq!(events[1].house_id.as_deref(), Some("H2"));
        assert_eq!(events[1].timestamp, 0);
        assert_eq!(events[2].raw.user_id, None);
        assert!(!events[2].payload_unparsed);
        // An NA cell is a missing payload, not a failed parse.
        assert_eq!(events[3].raw.event_property, None);
        assert!(!events[3].payload_unparsed);
        // A bare NaN inside the payload keeps the row.
        assert_eq!(events[4].house_id.as_deref(), Some("H4"));
        assert_eq!(events[4].rent_price, None);
        assert!(!events[4].payload_unparsed);

        let summary = EventSummary::from_events(&events);
        assert_eq!(summary.unparsed_payloads, 1);

        let result = pipeline.transform(events).await.unwrap();
        assert_eq!(result.feedback.as_ref().unwrap().len(), 2);
        assert_eq!(result.users.len(), 4);
    }

    #[tokio::test]
    async fn test_no_house_ids_writes_users_then_fails() {
        let storage = MockStorage::default();
        let csv = format!("{}U1,view_listing,{{}},2024-01-01\n", HEADER);
        storage.put("events.csv", csv.as_bytes()).await;

        let pipeline = EventLogPipeline::new(storage.clone(), MockConfig::new(10));
        let events = pipeline.extract().await.unwrap();
        let result = pipeline.transform(events).await.unwrap();
        assert!(result.feedback.is_none());
        assert!(result.items.is_none());

        let err = pipeline.load(result).await.unwrap_err();
        assert!(matches!(err, EtlError::NoItemData));
        assert!(storage.exists("out/users.csv").await);
        assert!(!storage.exists("out/feedback.csv").await);
    }

    #[tokio::test]
    async fn test_sample_file_written_when_feedback_exceeds_sample_rows() {
        let storage = MockStorage::default();
        let mut csv = HEADER.to_string();
        for i in 0..4 {
            csv.push_str(&format!(
                "U{},contact_agent,\"{{\"\"house_id\"\": {}}}\",2024-01-01 00:00:00\n",
                i, i
            ));
        }
        storage.put("events.csv", csv.as_bytes()).await;

        let pipeline = EventLogPipeline::new(storage.clone(), MockConfig::new(3));
        let events = pipeline.extract().await.unwrap();
        let result = pipeline.transform(events).await.unwrap();
        let report = pipeline.load(result).await.unwrap();

        assert!(report.sample_written);
        let sample = storage.get_text("out/test_sample.csv").await.unwrap();
        assert_eq!(sample.lines().count(), 4);
        assert!(sample.contains("contact_agent,U0,0,1704067200,weight:3.0"));
    }

    #[tokio::test]
    async fn test_missing_input_and_missing_column() {
        let storage = MockStorage::default();
        let pipeline = EventLogPipeline::new(storage.clone(), MockConfig::new(10));
        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::MissingInputError { .. }));

        storage
            .put("events.csv", b"user_id,event_name,created_at\nU1,view_listing,2024-01-01\n")
            .await;
        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::ProcessingError { .. }));
    }

    #[test]
    fn test_summary_counts() {
        let raw = read_raw_events(
            "user_id,event_name,event_property,created_at\nU1,view_listing,x,\nU1,contact_agent,x,\nU2,view_listing,x,\n",
        )
        .unwrap();
        let events: Vec<ParsedEvent> = raw
            .into_iter()
            .map(|raw| ParsedEvent {
                raw,
                ..ParsedEvent::default()
            })
            .collect();

        let summary = EventSummary::from_events(&events);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.unique_users, 2);
        assert_eq!(
            summary.event_counts,
            vec![("view_listing".to_string(), 2), ("contact_agent".to_string(), 1)]
        );
    }
}
