//! # Arbitration Core
//!
//! Shared, network-free logic for the arbitration estimator: data models,
//! workflow state, lexical hit scoring, the search plan, keyword extraction,
//! prompt construction, the embedder trait, and similarity ranking.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or other
//! runtime-bound dependencies. Everything that talks to the outside world
//! lives in the `arbitration-estimator` app crate and reaches this crate
//! through plain values or the [`embedding::Embedder`] trait.

pub mod embedding;
pub mod keywords;
pub mod models;
pub mod prompt;
pub mod rank;
pub mod scoring;
pub mod search;
pub mod state;
pub mod text;
