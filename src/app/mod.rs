//! Application boundary: port traits only.
//!
//! The command core (`console`, `rpc`) talks to flash, configuration and the
//! terminal exclusively through the traits in [`ports`], keeping it fully
//! testable on the host without an ESP32.

pub mod ports;
