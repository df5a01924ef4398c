//! API data models
//!
//! This module contains data structures for the Completions API.

pub mod completion;
