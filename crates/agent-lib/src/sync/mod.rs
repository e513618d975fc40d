//! Synchronization with DX
//!
//! This module provides:
//! - Fixed-size batching of catalog entities
//! - HTTP client with two-tier response classification
//! - Batch transmitter for the lifecycle and ingest protocols

mod batch;
mod client;
mod errors;
mod transmitter;


pub use batch::chunk;
pub use client::{ClientConfig, DxClient, DxClientBuilder};
pub use errors::TransmitError;
pub use transmitter::{
    endpoints, BatchTransmitter, SyncProtocol, TransmitSummary, INGEST_CHUNK_SIZE,
    LIFECYCLE_CHUNK_SIZE,
};
