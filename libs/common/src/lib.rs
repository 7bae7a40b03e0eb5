//! Common library for the VitaTrack backend
//!
//! This crate provides shared infrastructure used across the VitaTrack
//! services: database connectivity and the error types that go with it.

pub mod database;
pub mod error;
