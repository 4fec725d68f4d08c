//! Data Transfer Objects for REST request/response serialization.
//!
//! Field names are camelCase to match the WebSocket messages clients
//! already consume.

pub mod event_dto;
pub mod system_dto;

pub use event_dto::*;
pub use system_dto::*;
