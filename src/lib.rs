//! Data layer of the soft-materials transport dashboard.
//!
//! The dashboard binary renders what [`data::query`] derives from a
//! [`data::DatasetStore`], and appends new measurements through it.

pub mod data;
