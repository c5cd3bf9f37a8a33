//! # Claude Code Router
//!
//! Lets a Claude Messages API client talk to any OpenAI-compatible
//! chat-completion backend.
//!
//! ## Overview
//!
//! This library translates between:
//! - **Claude Messages API** (Anthropic) - what the client speaks
//! - **Chat Completions API** (OpenAI-style) - what the upstream speaks
//!
//! The router handles:
//! - Request routing to a configured provider and model
//! - Request conversion, including tools and tool results
//! - Live translation of upstream completion chunks into Claude SSE events,
//!   with tool-call arguments reassembled across chunks
//! - Plugin hooks at six fixed points of the request lifecycle
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use claude_code_router::config::RouterConfig;
//! use claude_code_router::plugin::{BuiltinPlugins, PluginRegistry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RouterConfig::from_file("config.toml")?;
//! config.validate()?;
//!
//! let plugins = PluginRegistry::load(&config.plugins, &BuiltinPlugins)?;
//! println!("{} plugins loaded", plugins.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Error types and HTTP status mapping
//! - [`models`] - Data structures for the Claude and chat-completion APIs
//! - [`plugin`] - Hook points, plugin trait, registry and built-in plugins
//! - [`streaming`] - Upstream SSE parsing and the stream translator
//! - [`transform`] - Request transformation logic

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod models;
pub mod plugin;
pub mod provider;
pub mod router;
pub mod streaming;
pub mod transform;

pub use config::RouterConfig;
pub use error::{Result, RouterError};
