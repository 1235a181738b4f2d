//! # Model Layer
//!
//! Persistence for everything the client keeps between runs.

pub mod store;
