//! # pollcast
//!
//! Real-time notification layer of a polling backend: fans out vote
//! result updates to clients holding a WebSocket open.
//!
//! User accounts, polls and votes live in an external persistence layer.
//! This crate consumes exactly one event from it, "vote committed, here
//! are the resulting option counts", and delivers it best-effort to every
//! connection following that poll plus every connection following all
//! polls.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)          Persistence layer
//!     │                              │
//!     ├── WS Handler (ws/)           ├── VoteService (service/)
//!     ├── SubscriptionManager        │      or POST /api/v1/events/...
//!     │                              │
//!     │                        Broadcaster (ws/)
//!     │                              │
//!     └──────── TopicRegistry (domain/) ◄──┘
//!                    │
//!              Connection (domain/)
//! ```
//!
//! State is purely in memory; clients re-subscribe after a restart and
//! re-fetch current counts from the persistence layer's read API.

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
