//! nuCMS - A WordPress-inspired content management backend
//!
//! This library provides the REST API, persistence and the Gutenberg block
//! engine behind the nuCMS admin frontend.

pub mod api;
pub mod blocks;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
