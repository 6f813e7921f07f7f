pub mod branch_resolver;
pub mod catalog;
pub mod categorizer;
pub mod clock;
pub mod complaint;
pub mod config;
pub mod customer;
pub mod error;
pub mod ids;
pub mod insight;
pub mod keywords;
pub mod lexicon;
pub mod normalizer;
pub mod pipeline;
pub mod sentiment;
pub mod store;
pub mod types;
pub mod urgency;
