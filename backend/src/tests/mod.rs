//! End-to-end tests that exercise the orchestrator through the HTTP router,
//! mirroring the unit tests living next to each service module.

pub mod common;
mod compare_api_test;
mod profile_api_test;
