// src/lib.rs

//! Course seat watcher library.
//!
//! Crawls a university course catalog, keeps one stored row per section and
//! notifies interested subscribers when a full section opens up.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
