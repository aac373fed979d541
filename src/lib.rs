//! Tomato Scraper Library
//!
//! This library scrapes search results, browse lists, detail pages and
//! celebrity profiles from Rotten Tomatoes, with a disk cache in front of
//! the network, and exposes them through REST API endpoints.

pub mod cache;
pub mod client;
pub mod config;
pub mod constants;
pub mod epg;
pub mod error;
pub mod logging;
pub mod models;
pub mod parser;
pub mod routes;
pub mod scraper;
