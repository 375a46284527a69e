//! # Arbitration Estimator
//!
//! Estimates the likely monetary outcome of an arbitration case by finding
//! comparable published awards and asking a generative model to reason
//! over them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌────────────┐
//! │  Expand  │──▶│  Search  │──▶│  Fetch   │──▶│   Rank   │──▶│ Synthesize │
//! │  (LLM)   │   │ SerpApi  │   │ ≤15 URLs │   │ embedder │   │   (LLM)    │
//! └──────────┘   └──────────┘   └──────────┘   └──────────┘   └────────────┘
//!                      │
//!                      └──▶ Failed (no credential, or zero hits)
//! ```
//!
//! Pure logic (scoring, merging, prompts, ranking, the state machine)
//! lives in the `arbitration-core` crate; this crate adds the network
//! clients, configuration, CLI and HTTP surfaces.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credentials |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`llm`] | Chat-completion client |
//! | [`expand`] | Query expansion with fallback |
//! | [`search_provider`] | SerpApi client |
//! | [`search`] | Multi-configuration search stage |
//! | [`extract`] | HTML to text |
//! | [`fetch`] | Concurrent page fetcher |
//! | [`embedding`] | Embedding backends |
//! | [`synthesize`] | Report generation |
//! | [`pipeline`] | Stage orchestration |
//! | [`server`] | HTTP API |

pub mod config;
pub mod embedding;
pub mod expand;
pub mod extract;
pub mod fetch;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod search;
pub mod search_provider;
pub mod server;
pub mod synthesize;
