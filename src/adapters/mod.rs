//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements        | Connects to                              |
//! |----------------|-------------------|------------------------------------------|
//! | `nvs`          | StoragePort       | NVS / in-memory store                    |
//! | `config_store` | KeyValueConfig    | Flattened `config` namespace             |
//! | `stdio`        | LineEditor        | UART console via stdin/stdout            |
//! | `http_server`  | none              | ESP-IDF httpd (`/cmd`, `/config`, `/ws`) |

pub mod config_store;
pub mod http_server;
pub mod nvs;
pub mod stdio;
pub(crate) mod utils;
