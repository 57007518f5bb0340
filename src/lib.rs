//! Inkpost - storage and domain core for a markdown blogging platform
//!
//! This library provides the persistence, caching, and domain logic for a
//! blogging platform: articles, tags, likes, deduplicated view counting,
//! and paginated feeds. The HTTP layer that embeds it lives elsewhere.

pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
