//! Fuzz target: `ReassemblerTable::feed`
//!
//! Decodes the input into a sequence of frame events and drives them
//! through the per-connection table. It must never panic and never yield a
//! message larger than the configured limit.
//!
//! cargo fuzz run fuzz_frame_reassembler

#![no_main]

use consolefw::rpc::frame::{FrameEvent, FrameInfo, Opcode, ReassemblerTable};
use libfuzzer_sys::fuzz_target;

const LIMIT: usize = 512;

fuzz_target!(|data: &[u8]| {
    let mut table = ReassemblerTable::new(3, LIMIT);
    let mut rest = data;

    // 5-byte header per event: conn, num, flags, len, index; then payload.
    while let [conn, num, flags, len, index, tail @ ..] = rest {
        let take = usize::from(flags >> 4).min(tail.len());
        let (payload, next) = tail.split_at(take);
        rest = next;

        let kind = if flags & 1 == 0 { Opcode::Text } else { Opcode::Binary };
        let num = u32::from(num & 0x07);
        let info = FrameInfo {
            message_opcode: kind,
            opcode: if num == 0 { kind } else { Opcode::Continuation },
            num,
            final_frame: flags & 2 != 0,
            len: u64::from(*len),
            index: u64::from(*index),
        };
        let ev = FrameEvent {
            conn: u32::from(conn & 0x07),
            info,
            payload,
        };
        if let Some(msg) = table.feed(&ev) {
            assert!(msg.data.len() <= LIMIT, "message exceeds limit");
        }
        if flags & 4 != 0 {
            table.remove(ev.conn);
        }
    }
});
