//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one path through the
//! console against scripted interpreters and the in-memory storage backend.
//! All tests run on the host with no hardware required.

mod console_flow_tests;
mod executor_tests;
mod mock_interp;
mod reassembly_tests;
mod rpc_tests;
