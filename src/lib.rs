pub mod annotation;
pub mod batch;
pub mod config;
pub mod convert;
pub mod lua;
pub mod markdown;
pub mod models;
pub mod normalize;
pub mod parser;
pub mod render_config;
pub mod report;
pub mod template;
