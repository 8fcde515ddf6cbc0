//! Network transports over the shared command executor.
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌──────────┐
//! │ ws frames  │──▶│  frame     │──▶│  channels  │──▶│ jsonrpc  │──▶ Executor
//! │ (httpd)    │   │ (reassemble│   │ (INBOUND)  │   │ (adapter)│
//! └────────────┘   └────────────┘   └────────────┘   └──────────┘
//!
//! POST /cmd ─────────────────────────────────────────▶ form ─────▶ Executor
//! ```

pub mod channels;
pub mod form;
pub mod frame;
pub mod jsonrpc;
