pub mod answer;
pub mod config;
pub mod db;
pub mod embed;
pub mod search;
pub mod snippet;
