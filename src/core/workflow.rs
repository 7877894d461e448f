use crate::config::UploadConfig;
use crate::core::gorse_client::GorseClient;
use crate::core::samples::{sample_feedback, sample_items};
use crate::core::uploader::{read_feedback, read_items, BatchTarget, BatchUploader, CountMode, UploadReport};
use crate::core::Storage;
use crate::domain::model::{GorseFeedback, GorseItem, Recommendation};
use crate::utils::error::{EtlError, Result};
use reqwest::Method;

/// The two upload entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Missing CSVs and a failed probe abort; items go out with `PUT`;
    /// training is triggered without waiting.
    Strict,
    /// Missing CSVs fall back to samples; items go out with `POST`; training
    /// is followed by a fixed wait and a recommendation check.
    Lenient,
}

impl UploadMode {
    fn count_mode(self) -> CountMode {
        match self {
            UploadMode::Strict => CountMode::BatchLen,
            UploadMode::Lenient => CountMode::RowAffected,
        }
    }

    pub fn items_target(self, batch_size: usize) -> BatchTarget {
        BatchTarget {
            label: "items",
            path: "items",
            method: match self {
                UploadMode::Strict => Method::PUT,
                UploadMode::Lenient => Method::POST,
            },
            batch_size,
            count_mode: self.count_mode(),
        }
    }

    pub fn feedback_target(self, batch_size: usize) -> BatchTarget {
        BatchTarget {
            label: "feedback entries",
            path: "feedback",
            method: Method::POST,
            batch_size,
            count_mode: self.count_mode(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrainingOutcome {
    Skipped,
    Triggered,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationOutcome {
    Found(Vec<Recommendation>),
    Empty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationCheck {
    pub user_id: String,
    pub outcome: RecommendationOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowReport {
    pub items: UploadReport,
    pub feedback: UploadReport,
    pub training: TrainingOutcome,
    pub recommendations: Vec<RecommendationCheck>,
}

pub struct UploadWorkflow<S: Storage> {
    storage: S,
    client: GorseClient,
    config: UploadConfig,
    mode: UploadMode,
}

impl<S: Storage> UploadWorkflow<S> {
    pub fn new(storage: S, client: GorseClient, config: UploadConfig, mode: UploadMode) -> Self {
        Self {
            storage,
            client,
            config,
            mode,
        }
    }

    fn missing(&self, path: &str, e: EtlError) -> EtlError {
        if e.is_not_found() {
            EtlError::MissingInputError {
                path: path.to_string(),
            }
        } else {
            e
        }
    }

    pub async fn load_items(&self) -> Result<Vec<GorseItem>> {
        let path = self.config.items_file.as_str();
        match read_items(&self.storage, path).await {
            Ok(items) => {
                tracing::info!("Found {} items in {}", items.len(), path);
                Ok(items)
            }
            Err(e) if e.is_not_found() && self.mode == UploadMode::Lenient => {
                tracing::warn!("⚠️ {} not found, using sample data", path);
                Ok(sample_items())
            }
            Err(e) => Err(self.missing(path, e)),
        }
    }

    pub async fn load_feedback(&self) -> Result<Vec<GorseFeedback>> {
        let path = self.config.feedback_file.as_str();
        match read_feedback(&self.storage, path).await {
            Ok(feedback) => {
                tracing::info!("Found {} feedback entries in {}", feedback.len(), path);
                Ok(feedback)
            }
            Err(e) if e.is_not_found() && self.mode == UploadMode::Lenient => {
                tracing::warn!("⚠️ {} not found, using sample data", path);
                Ok(sample_feedback())
            }
            Err(e) => Err(self.missing(path, e)),
        }
    }

    /// Strict mode refuses to start without both exports on disk.
    async fn ensure_inputs(&self) -> Result<()> {
        for path in [&self.config.items_file, &self.config.feedback_file] {
            if !self.storage.exists(path).await {
                tracing::error!("✗ Error: {} not found", path);
                return Err(EtlError::MissingInputError { path: path.clone() });
            }
        }
        Ok(())
    }

    pub async fn run(&self) -> Result<WorkflowReport> {
        if self.mode == UploadMode::Strict {
            self.ensure_inputs().await?;
            self.client.check_connection().await?;
            tracing::info!("✓ API connection successful");
        }

        let uploader = BatchUploader::new(&self.client, self.config.batch_delay());

        tracing::info!("📤 Uploading items...");
        let items = self.load_items().await?;
        let items_report = uploader
            .upload(&self.mode.items_target(self.config.item_batch_size), &items)
            .await;

        tracing::info!("📤 Uploading feedback...");
        let feedback = self.load_feedback().await?;
        let feedback_report = uploader
            .upload(&self.mode.feedback_target(self.config.feedback_batch_size), &feedback)
            .await;

        let mut report = WorkflowReport {
            items: items_report,
            feedback: feedback_report,
            training: TrainingOutcome::Skipped,
            recommendations: Vec::new(),
        };

        if report.items.uploaded == 0 || report.feedback.uploaded == 0 {
            tracing::warn!("Insufficient data uploaded. Need both items and feedback.");
            return Ok(report);
        }

        report.training = self.trigger_training().await;
        if self.mode == UploadMode::Lenient && report.training == TrainingOutcome::Triggered {
            self.wait_for_training().await;
            report.recommendations = self.check_recommendations().await;
        }

        Ok(report)
    }

    pub async fn trigger_training(&self) -> TrainingOutcome {
        tracing::info!("🧠 Triggering model training...");
        match self.client.trigger_training().await {
            Ok(()) => {
                tracing::info!("✓ Training triggered successfully");
                TrainingOutcome::Triggered
            }
            Err(e) => {
                tracing::error!("✗ Training trigger failed: {}", e);
                TrainingOutcome::Failed(e.to_string())
            }
        }
    }

    /// Gorse exposes no training status endpoint, so this is a blind,
    /// fixed-length wait.
    pub async fn wait_for_training(&self) {
        let wait = self.config.training_wait();
        tracing::info!("⏳ Waiting {:?} for training to complete...", wait);
        tokio::time::sleep(wait).await;
    }

    pub async fn check_recommendations(&self) -> Vec<RecommendationCheck> {
        tracing::info!("=== Testing Recommendations ===");
        let mut checks = Vec::with_capacity(self.config.test_users.len());

        for user_id in &self.config.test_users {
            tracing::info!("Recommendations for user {}:", user_id);
            let outcome = match self.client.recommend(user_id, self.config.recommend_count).await {
                Ok(recs) if recs.is_empty() => {
                    tracing::info!("✗ No recommendations available yet");
                    RecommendationOutcome::Empty
                }
                Ok(recs) => {
                    tracing::info!("✓ Found {} recommendations", recs.len());
                    for (i, rec) in recs.iter().take(self.config.recommend_top).enumerate() {
                        tracing::info!(
                            "  {}. Item ID: {}, Score: {}",
                            i + 1,
                            rec.id.as_deref().unwrap_or("N/A"),
                            rec.score
                                .map(|s| s.to_string())
                                .unwrap_or_else(|| "N/A".to_string())
                        );
                    }
                    RecommendationOutcome::Found(recs)
                }
                Err(e) => {
                    tracing::error!("✗ Error: {}", e);
                    RecommendationOutcome::Failed(e.to_string())
                }
            };
            checks.push(RecommendationCheck {
                user_id: user_id.clone(),
                outcome,
            });
        }
        checks
    }
}

/// Hints printed once an upload finishes.
pub fn next_steps(client: &GorseClient, config: &UploadConfig) -> Vec<String> {
    let gorse = client.config();
    let example_user = config
        .test_users
        .first()
        .map(String::as_str)
        .unwrap_or("<user_id>");

    vec![
        format!("Check dashboard: {}", gorse.dashboard_url()),
        format!("List items: GET {}", client.url("items?n=10")),
        format!("Get recommendations: GET {}", client.url("recommend/{user_id}?n=10")),
        format!(
            "curl -H \"X-API-Key: {}\" \"{}\"",
            gorse.api_key,
            client.url(&format!("recommend/{}?n={}", example_user, config.recommend_count))
        ),
    ]
}
