//! HTTP handlers for sigap-api.

pub mod health;
pub mod layers;
pub mod overlap;
pub mod upload;
