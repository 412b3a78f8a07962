//! API data models
//!
//! This module contains data structures for the Replicate API.

pub mod replicate;
