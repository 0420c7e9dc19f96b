//! Forex request backend library
//!
//! A bank's foreign currency request workflow: requests move through
//! `new -> validated -> approved -> accepted | declined` (or `rejected`),
//! carry uploaded attachments, and are read back fully denormalized.

pub mod auth;
pub mod config;
pub mod db;
pub mod deadline;
pub mod error;
pub mod files;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod reference;
pub mod requests;
pub mod routes;
pub mod state;
pub mod store;
