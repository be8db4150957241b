//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one path through the
//! core (queue → dispatcher → app → deferred work → stack thread)
//! against mock collaborators.  All tests run on the host with no real
//! hardware required.

mod action_tests;
mod event_flow_tests;
mod mock_hw;
mod sampling_tests;
