//! Traits for coordinate conversion.

pub mod projection;
