//! WebSocket path end to end: frames → reassembly → channels → dispatcher.

use consolefw::error::ReassemblyError;
use consolefw::rpc::channels::{
    Dispatcher, InboundChannel, OutboundChannel, post_inbound, try_recv_outbound,
};
use consolefw::rpc::frame::{
    FrameEvent, FrameInfo, Opcode, Outcome, Reassembler, ReassemblerTable,
};

use super::mock_interp::mock_executor;

/// Split `msg` into `frames` text frames, each delivered in two pieces
/// when it is long enough.
fn fragment(msg: &[u8], frames: usize) -> Vec<(FrameInfo, Vec<u8>)> {
    let chunk = msg.len().div_ceil(frames).max(1);
    let parts: Vec<&[u8]> = msg.chunks(chunk).collect();
    let last = parts.len() - 1;
    let mut out = Vec::new();
    for (num, part) in parts.iter().enumerate() {
        let info = |index: usize| FrameInfo {
            message_opcode: Opcode::Text,
            opcode: if num == 0 { Opcode::Text } else { Opcode::Continuation },
            num: num as u32,
            final_frame: num == last,
            len: part.len() as u64,
            index: index as u64,
        };
        let split = part.len() / 2;
        if split == 0 {
            out.push((info(0), part.to_vec()));
        } else {
            out.push((info(0), part[..split].to_vec()));
            out.push((info(split), part[split..].to_vec()));
        }
    }
    out
}

#[test]
fn fragmented_request_reaches_dispatcher() {
    let (exec, tally) = mock_executor(200);
    let inbound = InboundChannel::new();
    let outbound = OutboundChannel::new();
    let mut table = ReassemblerTable::new(4, 4096);

    let req = br#"{"method":"say","params":["over","three","frames"],"id":42}"#;
    for (info, payload) in fragment(req, 3) {
        let ev = FrameEvent {
            conn: 11,
            info,
            payload: &payload,
        };
        if let Some(msg) = table.feed(&ev) {
            assert!(post_inbound(&inbound, msg));
        }
    }

    let d = Dispatcher::new(&exec, &inbound, &outbound);
    assert_eq!(d.pump(), 1);
    let out = try_recv_outbound(&outbound).unwrap();
    assert_eq!(out.conn, 11);
    assert_eq!(out.text, r#"{"jsonrpc":"2.0","id":42,"result":"over three frames"}"#);
    assert_eq!(tally.calls(), 1);
}

#[test]
fn interleaved_connections_each_complete() {
    let mut table = ReassemblerTable::new(4, 4096);
    let a = fragment(b"say from-a", 2);
    let b = fragment(b"say from-b", 3);

    let mut done = Vec::new();
    let longest = a.len().max(b.len());
    for i in 0..longest {
        for (conn, frames) in [(1, &a), (2, &b)] {
            if let Some((info, payload)) = frames.get(i) {
                let ev = FrameEvent {
                    conn,
                    info: *info,
                    payload,
                };
                if let Some(msg) = table.feed(&ev) {
                    done.push((msg.conn, msg.data));
                }
            }
        }
    }
    done.sort();
    assert_eq!(
        done,
        [(1, b"say from-a".to_vec()), (2, b"say from-b".to_vec())]
    );
}

#[test]
fn shared_slot_rejects_second_connection() {
    let mut slot = Reassembler::new(4096);
    let a = fragment(b"say first", 2);
    let (info, payload) = &a[0];
    assert_eq!(
        slot.feed_outcome(&FrameEvent { conn: 1, info: *info, payload }),
        Outcome::Pending
    );

    let intruder = FrameEvent {
        conn: 2,
        info: FrameInfo::single(Opcode::Text, 8),
        payload: b"say nope",
    };
    assert_eq!(
        slot.feed_outcome(&intruder),
        Outcome::Dropped(ReassemblyError::OwnerMismatch)
    );

    let mut done = None;
    for (info, payload) in &a[1..] {
        done = slot.feed(&FrameEvent { conn: 1, info: *info, payload });
    }
    assert_eq!(done.unwrap().data, b"say first");
}

#[test]
fn binary_message_arrives_as_hex_and_fails_to_parse() {
    let (exec, tally) = mock_executor(200);
    let inbound = InboundChannel::new();
    let outbound = OutboundChannel::new();
    let mut table = ReassemblerTable::new(1, 4096);

    let payload = [0xde, 0xad, 0xbe, 0xef];
    let msg = table
        .feed(&FrameEvent {
            conn: 5,
            info: FrameInfo::single(Opcode::Binary, payload.len()),
            payload: &payload,
        })
        .unwrap();
    assert_eq!(msg.data, b"deadbeef");

    post_inbound(&inbound, msg);
    Dispatcher::new(&exec, &inbound, &outbound).pump();
    let out = try_recv_outbound(&outbound).unwrap();
    assert!(out.text.contains("-32700"));
    assert_eq!(tally.calls(), 0);
}
