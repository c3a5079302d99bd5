//! Prompt module for LLM-based operations.
//!
//! This module provides prompt templates and response schemas for LLM tasks.

pub mod summary;

pub use summary::*;
