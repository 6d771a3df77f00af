pub mod config_integration;
pub mod pipeline_integration;
