//! LawMate - streaming client for a legal question-answering service.
//!
//! The service answers a question with a single HTTP response body made of
//! `data: <json>` frames carrying answer tokens and source citations. This
//! crate decodes that stream, keeps the multi-turn conversation it builds,
//! and exposes it to the command-line front end.
//!
//! Layout:
//! - [`stream`] decodes body chunks into events, independent of chunk boundaries
//! - [`conversation`] holds the message history, citation disclosure and export
//! - [`session`] runs one exchange at a time against the conversation
//! - [`client`] talks to the answering service over HTTP

pub mod cli;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod models;
pub mod session;
pub mod stream;

pub use client::AnswerClient;
pub use error::{ChatError, Result};
pub use session::{ChatSession, ExchangeReport, ExchangeState};
