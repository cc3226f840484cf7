//! Utility functions and helpers

pub mod json;
