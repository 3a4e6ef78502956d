//! services/api/src/lib.rs
//!
//! The flashcards HTTP service: adapters for the core ports, the axum web
//! layer, and startup configuration.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
