//! Fuzz target: `parse_request` + `split_argv`
//!
//! Arbitrary bytes must either be rejected with a JSON-RPC error code or
//! produce a non-empty command line that the console tokenizer can process
//! without panicking.
//!
//! cargo fuzz run fuzz_jsonrpc

#![no_main]

use consolefw::console::registry::split_argv;
use consolefw::rpc::jsonrpc::{Response, parse_request};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match parse_request(data) {
        Ok(req) => {
            assert!(!req.command_line.is_empty());
            let _ = split_argv(&req.command_line, 64);
        }
        Err(code) => {
            let json = Response::error(code).to_json();
            assert!(json.contains(&code.code().to_string()));
        }
    }
});
