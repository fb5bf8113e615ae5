//! evalua-core: assessment domain model, authorization, and scoring engine.
//!
//! This crate defines exams, questions and submissions, the role-based guard
//! that gates every mutation, and the lifecycle and scoring logic that the
//! rest of evalua builds on. Storage is reached through the
//! [`store::EntityStore`] trait.

pub mod audit;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod exams;
pub mod guard;
pub mod locks;
pub mod memory;
pub mod model;
pub mod parser;
pub mod questions;
pub mod scoring;
pub mod service;
pub mod statistics;
pub mod store;
pub mod users;

pub use context::RequestContext;
pub use error::{AssessmentError, EntityKind, Result, StoreError};
pub use guard::{Actor, Operation};
pub use service::Assessment;
