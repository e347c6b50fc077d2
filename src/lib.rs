//! Catalog Workflow Engine
//!
//! This library provides the background workflow engine for the catalog
//! administration backend: a typed in-process job queue, a cancellable
//! worker loop with bounded retries, locale-specific financial computation,
//! multi-language content generation, and persisted workflow progress
//! tracking. Request handlers consume it through [`engine::WorkflowEngine`];
//! the `worker` binary runs the queue consumer and maintenance sweeps.

pub mod config;
pub mod db;
pub mod engine;
pub mod models;
pub mod services;
pub mod store;
