//! End-to-end pipeline tests against in-memory collaborators.

mod mock_collaborators;
mod scenarios;
