//! Layermap Core - Domain models, dataset registry, and configuration
//!
//! This crate contains the data model shared by every stage of the layer
//! rendering pipeline and the port through which datasets are fetched.

pub mod config;
pub mod error;
pub mod models;
pub mod ports;
pub mod registry;

pub use error::{LayermapError, Result};
