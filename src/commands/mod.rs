pub mod auth;
pub mod config;
pub mod documents;
pub mod fields;
pub mod fill;
pub mod parse;
pub mod utils;
