pub mod annotator;
pub mod client;
pub mod config;
pub mod error;
pub mod line_parser;
pub mod model;
pub mod pipeline;
pub mod report;
