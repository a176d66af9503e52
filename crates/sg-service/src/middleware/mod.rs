//! Request middleware layers.

pub mod auth;
