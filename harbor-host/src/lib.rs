//! # Harbor Host
//!
//! Binary support for the Harbor application host: configuration loading,
//! turning the configured application model into an
//! [`AppHost`](harbor_core::AppHost), and the HTTP surface exposing health
//! checks and resource snapshots.

pub mod bootstrap;
pub mod config;
pub mod routes;
