//! ScribeGate (SG) Service Library
//!
//! This library provides the token-gateway functionality of ScribeGate:
//! external applications sign bearer tokens for their users with Ed25519
//! keys registered here, and the gateway verifies those tokens and maps
//! them onto local accounts.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - Token signature verification
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `middleware` - Request authentication layers
//! - `models` - Data models
//! - `repositories` - Database access layer and store traits
//! - `services` - Business logic layer
//! - `routes` - Router assembly

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
