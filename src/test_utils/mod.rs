//! Test utilities for falcon-embed.
//!
//! This module provides mock implementations and test helpers for:
//! - Docker client mocks (TrackedDockerClient) with in-memory local and registry images
//! - Image inspect fixtures (inspect_json)

pub mod docker_clients;

pub use docker_clients::{BuildImageCall, TrackedDockerClient, inspect_json};
