pub mod analyzer;
pub mod api;
pub mod bm25;
pub mod chunker;
pub mod config;
pub mod context;
pub mod data_models;
pub mod error;
pub mod extractor;
pub mod http_client;
pub mod pipeline;
pub mod ranker;
pub mod resolver;
pub mod scrapper;
pub mod searcher;
pub mod web_context;
