//! Dispatch core for the Legion chat assistants
//!
//! This crate provides:
//! - The registry of built-in personas
//! - Canned fallback responses for when no backend answers
//! - The dispatcher that ties persona lookup, backend and fallback together
//! - A catalog mapping hosted model names to local replacements

pub mod catalog;
pub mod dispatcher;
pub mod fallback;
pub mod personas;

pub use dispatcher::{ChatOptions, Dispatcher};
pub use fallback::{FallbackGenerator, FALLBACK_NOTE};
pub use personas::PersonaRegistry;
