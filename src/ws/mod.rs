//! WebSocket layer: upgrade handling, connection lifecycle, fan-out.
//!
//! Clients connect to `/ws`, optionally with `?pollId=<id>`, and receive a
//! `CONNECTION_ESTABLISHED` acknowledgment followed by `VOTE_UPDATE`
//! messages. Any text they send is echoed back as `MESSAGE_ECHO`.

pub mod broadcast;
pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;

pub use broadcast::{Broadcaster, PublishReport};
pub use messages::ServerMessage;
pub use subscription::{ConnectionSettings, HandshakeRequest, SubscriptionManager};
