//! Service layer: business logic orchestration.
//!
//! [`VoteService`] is the handle the persistence layer calls after a vote
//! commits; it publishes the new tallies through the
//! [`crate::ws::Broadcaster`].

pub mod vote_service;

pub use vote_service::VoteService;
