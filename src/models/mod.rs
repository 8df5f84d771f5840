// src/models/mod.rs

pub mod content;
pub mod document;
pub mod progress;
