//! Schemas of older configuration documents
//!
//! Each submodule describes the document layout of one released model
//! version, exactly as it was persisted. These types are only ever read; the
//! upgraders in [`crate::upgraders`] convert them forward.

pub mod v2_0_4;
pub mod v2_3_0;
