// src/cot/mod.rs
pub mod client;
pub mod models;
