//! Shared test utilities for pagewire
//!
//! This module provides common helpers for integration tests:
//! - An in-memory site wired through the full stack
//! - A local HTTP server for transport and CLI tests

#![allow(dead_code)]

pub mod fixtures;
pub mod server;
