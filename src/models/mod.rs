//! Response models for the API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing HTTP response bodies. Request bodies reuse the domain types.

pub mod responses;

// Re-export commonly used types
pub use responses::{
    EnqueueResponse, HealthResponse, ReturnsResponse, StatsResponse, TaskResultResponse,
};
