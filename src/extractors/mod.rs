// src/extractors/mod.rs
pub mod report;
pub mod section;
pub mod tokens;

// Re-export the parser entry point for convenience
pub use report::parse_report;
