// src/handlers/mod.rs

pub mod content;
pub mod documents;
pub mod progress;
pub mod session;
