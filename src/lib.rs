pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::LocalStorage, AppConfig, GorseConfig, UploadConfig};
pub use core::{
    etl::EtlEngine,
    gorse_client::GorseClient,
    pipeline::EventLogPipeline,
    workflow::{UploadMode, UploadWorkflow},
};
pub use utils::error::{EtlError, Result};
