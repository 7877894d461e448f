use crate::domain::model::{LoadReport, ParsedEvent, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_csv(&self) -> &str;
    fn output_dir(&self) -> &str;
    fn sample_rows(&self) -> usize;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<ParsedEvent>>;
    async fn transform(&self, data: Vec<ParsedEvent>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<LoadReport>;
}
