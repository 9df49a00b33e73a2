//! Request and response models for the HTTP API.

pub mod documents;
pub mod health;
