//! Integration tests for pagewire
//!
//! These tests verify that multiple components work together correctly.

#[path = "../common/mod.rs"]
pub mod common;

pub mod cli;
pub mod http_transport;
pub mod navigation_flow;
