//! Shared fixtures for service tests.

mod db;

pub(crate) use context::TestContext;
pub(crate) use gateway::FakeGateway;
