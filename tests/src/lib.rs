//! Shared fixtures for the integration tests: synthetic hosts and recording
//! providers that can be told to fail.

pub mod fakes;
pub mod net;
