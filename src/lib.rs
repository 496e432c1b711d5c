//! # rag-query
//!
//! A client for retrieval-augmented question answering. A question goes to a
//! remote answering service; the answer comes back with the source passages
//! that justify it, and both are rendered for the user.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────────┐   ┌───────────────┐
//! │  session   │──▶│ QueryController │──▶│ AnswerService │──▶ POST /api/query
//! │ ask / repl │   │  state machine  │   │   (reqwest)   │
//! └─────▲──────┘   └────────┬────────┘   └───────────────┘
//!       │                   │
//!       │   ┌───────────────▼──┐
//!       └───│ view (derive +   │
//!           │ text/JSON render)│
//!           └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ragq ask "What is the refund policy?"
//! ragq ask "What is the refund policy?" --show-passages
//! ragq --api-url https://rag.example.com repl
//! ragq health
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and base URL resolution |
//! | [`models`] | Request, result, and source types |
//! | [`error`] | Query failure taxonomy and user-facing messages |
//! | [`client`] | `AnswerService` trait and its HTTP implementation |
//! | [`controller`] | Single-flight interaction state machine |
//! | [`view`] | View derivation, passage disclosure, presenters |
//! | [`session`] | One-shot and interactive drivers |
//! | [`health`] | Service health check |

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod health;
pub mod models;
pub mod session;
pub mod view;
