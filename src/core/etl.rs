use crate::core::Pipeline;
use crate::domain::model::LoadReport;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<LoadReport> {
        tracing::info!("🚀 Starting extraction");

        let events = self.pipeline.extract().await?;
        tracing::info!("📥 Extracted {} events", events.len());
        self.monitor.log_stats("extract");

        let result = self.pipeline.transform(events).await?;
        self.monitor.log_stats("transform");

        let report = self.pipeline.load(result).await;
        self.monitor.log_stats("load");
        self.monitor.log_final_stats();

        let report = report?;
        tracing::info!("💾 Output saved to: {}", report.output_dir);
        Ok(report)
    }
}
