use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct ReportEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> ReportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting report pipeline");
        self.monitor.checkpoint("Start");

        // Extract
        tracing::info!("📥 Validating report text...");
        let validated = self.pipeline.extract().await?;
        if validated.is_recognized() {
            tracing::info!(
                "✅ Recognized sections {:?}",
                validated.report.indices()
            );
        }
        self.monitor.checkpoint("Extract");

        // Transform
        tracing::info!("🔄 Analyzing holdings...");
        let result = self.pipeline.transform(validated).await?;
        let priced = result
            .returns
            .iter()
            .filter(|r| r.asset_cagr.is_available())
            .count();
        tracing::info!(
            "✅ {} assets, {} tickers, {}/{} returns computed",
            result.assets.len(),
            result.tickers.len(),
            priced,
            result.returns.len()
        );
        self.monitor.checkpoint("Transform");

        // Load
        tracing::info!("💾 Writing outputs...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("📁 Output saved to: {}", output_path);
        self.monitor.checkpoint("Load");
        self.monitor.log_summary();

        Ok(output_path)
    }
}
