pub mod builders;
pub mod etl;
pub mod extract;
pub mod gorse_client;
pub mod pipeline;
pub mod property_parser;
pub mod python_literal;
pub mod samples;
pub mod uploader;
pub mod workflow;

pub use crate::domain::model::{ParsedEvent, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
