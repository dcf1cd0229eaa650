//! Core logic for qrcloud.
//!
//! This crate has no web dependencies. It renders QR codes, fans each one
//! out to every healthy storage backend, and serves stored copies back.
//!
//! # Modules
//!
//! - `artifact` - Immutable generated payloads and their storage keys
//! - `encoder` - QR rendering into PNG or SVG artifacts
//! - `storage` - Backend trait, OpenDAL-backed providers and the registry
//! - `upload` - Parallel multi-destination upload coordinator
//! - `retrieval` - Result store, download fallback and purge

pub mod artifact;
pub mod encoder;
pub mod retrieval;
pub mod storage;
pub mod upload;

pub use artifact::Artifact;
