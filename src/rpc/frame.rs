//! WebSocket frame reassembly.
//!
//! The server delivers data in pieces described by [`FrameInfo`]. A message
//! may be fragmented into several frames, and each frame may itself arrive
//! split across several deliveries:
//!
//! ```text
//!   | Frame0__ | Frame1___ | Frame2____ |
//!     ^   ^      ^           ^  ^
//!     A   B      C           D  E
//!
//! A: num=0 final=false index=0 len=8  payload=4   head
//! B: num=0 final=false index=4 len=8  payload=4   sub-split
//! C: num=1 final=false index=0 len=9  payload=9   next frame
//! D: num=2 final=true  index=0 len=10 payload=3   next frame
//! E: num=2 final=true  index=3 len=10 payload=7   sub-split, completes
//! ```
//!
//! Text payloads are copied verbatim. Binary payloads are hex-encoded (two
//! lowercase characters per byte) so the reassembled message is always
//! printable text.
//!
//! [`step`] is the pure transition function. [`Reassembler`] wraps one
//! in-flight slot bound to the connection that started it, and
//! [`ReassemblerTable`] gives every connection its own slot.

use log::{debug, warn};

use crate::error::ReassemblyError;

/// Server-assigned connection identity (socket fd on ESP-IDF).
pub type ConnId = u32;

/// Hard upper bound on concurrently tracked connections.
pub const MAX_SLOTS: usize = 16;

const HEX: &[u8; 16] = b"0123456789abcdef";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Text,
    Binary,
    Continuation,
}

/// Per-delivery frame metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Kind of the whole message (`Text` or `Binary`).
    pub message_opcode: Opcode,
    /// Kind of this frame; `Continuation` for frames after the first.
    pub opcode: Opcode,
    /// Frame number within a fragmented message, 0 for the first.
    pub num: u32,
    /// Whether this frame is the last of the message.
    pub final_frame: bool,
    /// Declared length of this frame.
    pub len: u64,
    /// Offset of this payload within the frame.
    pub index: u64,
}

impl FrameInfo {
    /// A whole message delivered in one piece.
    pub fn single(kind: Opcode, len: usize) -> Self {
        Self {
            message_opcode: kind,
            opcode: kind,
            num: 0,
            final_frame: true,
            len: len as u64,
            index: 0,
        }
    }

    fn is_message_head(&self) -> bool {
        self.num == 0 && self.index == 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FrameEvent<'a> {
    pub conn: ConnId,
    pub info: FrameInfo,
    pub payload: &'a [u8],
}

/// A fully reassembled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub conn: ConnId,
    pub kind: Opcode,
    /// Text bytes, or lowercase hex for binary messages.
    pub data: Vec<u8>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct InFlight {
    owner: ConnId,
    kind: Opcode,
    buf: Vec<u8>,
    frame_num: u32,
    frame_len: u64,
    frame_received: u64,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub enum State {
    #[default]
    Idle,
    Assembling(InFlight),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Bytes accepted, message not finished yet.
    Pending,
    Complete(Message),
    /// Frame rejected. Depending on the error the in-flight message was
    /// discarded or left untouched.
    Dropped(ReassemblyError),
}

fn expansion(kind: Opcode) -> u64 {
    match kind {
        Opcode::Binary => 2,
        _ => 1,
    }
}

/// Reserve room for one more frame of `frame_len` payload bytes.
fn reserve(
    buf: &mut Vec<u8>,
    kind: Opcode,
    frame_len: u64,
    limit: usize,
) -> Result<(), ReassemblyError> {
    let needed = frame_len
        .checked_mul(expansion(kind))
        .and_then(|n| n.checked_add(buf.len() as u64))
        .ok_or(ReassemblyError::TooLarge)?;
    if needed > limit as u64 {
        return Err(ReassemblyError::TooLarge);
    }
    let extra = needed as usize - buf.len();
    buf.try_reserve_exact(extra)
        .map_err(|_| ReassemblyError::NoMemory)
}

fn append(mut msg: InFlight, ev: &FrameEvent<'_>) -> (State, Outcome) {
    let received = msg.frame_received + ev.payload.len() as u64;
    if received > msg.frame_len {
        return (State::Idle, Outcome::Dropped(ReassemblyError::Overrun));
    }
    match msg.kind {
        Opcode::Binary => {
            for b in ev.payload {
                msg.buf.push(HEX[usize::from(b >> 4)]);
                msg.buf.push(HEX[usize::from(b & 0x0f)]);
            }
        }
        _ => msg.buf.extend_from_slice(ev.payload),
    }
    msg.frame_received = received;

    if msg.frame_received == msg.frame_len && ev.info.final_frame {
        let done = Message {
            conn: msg.owner,
            kind: msg.kind,
            data: msg.buf,
        };
        return (State::Idle, Outcome::Complete(done));
    }
    (State::Assembling(msg), Outcome::Pending)
}

/// Advance the reassembly state by one delivery.
///
/// `limit` caps the reassembled message size in bytes (after hex expansion).
pub fn step(state: State, ev: &FrameEvent<'_>, limit: usize) -> (State, Outcome) {
    let info = &ev.info;

    // Another connection owns the slot: leave its message alone.
    if let State::Assembling(msg) = &state {
        if msg.owner != ev.conn {
            return (state, Outcome::Dropped(ReassemblyError::OwnerMismatch));
        }
    }

    if info.is_message_head() {
        // A head from the owner itself restarts the message.
        let kind = match info.message_opcode {
            Opcode::Continuation => Opcode::Binary,
            k => k,
        };
        let mut buf = Vec::new();
        if let Err(e) = reserve(&mut buf, kind, info.len, limit) {
            return (State::Idle, Outcome::Dropped(e));
        }
        let msg = InFlight {
            owner: ev.conn,
            kind,
            buf,
            frame_num: 0,
            frame_len: info.len,
            frame_received: 0,
        };
        return append(msg, ev);
    }

    let State::Assembling(mut msg) = state else {
        return (State::Idle, Outcome::Dropped(ReassemblyError::MissingHead));
    };

    if info.index == 0 {
        // Next frame of a fragmented message.
        if msg.frame_received != msg.frame_len || info.num != msg.frame_num + 1 {
            return (State::Idle, Outcome::Dropped(ReassemblyError::OffsetMismatch));
        }
        if let Err(e) = reserve(&mut msg.buf, msg.kind, info.len, limit) {
            return (State::Idle, Outcome::Dropped(e));
        }
        msg.frame_num = info.num;
        msg.frame_len = info.len;
        msg.frame_received = 0;
    } else if info.num != msg.frame_num || info.index != msg.frame_received {
        return (State::Idle, Outcome::Dropped(ReassemblyError::OffsetMismatch));
    }
    append(msg, ev)
}

// ── Single slot ──────────────────────────────────────────────

/// One in-flight message slot, bound to the connection that started it.
///
/// Shared by several connections it rejects a second connection's head
/// frame while a message is assembling, without touching the first one.
pub struct Reassembler {
    state: State,
    limit: usize,
    dropped: u32,
}

impl Reassembler {
    pub fn new(limit: usize) -> Self {
        Self {
            state: State::Idle,
            limit,
            dropped: 0,
        }
    }

    /// Feed one delivery; returns the message once it is complete.
    pub fn feed(&mut self, ev: &FrameEvent<'_>) -> Option<Message> {
        match self.feed_outcome(ev) {
            Outcome::Complete(msg) => Some(msg),
            Outcome::Pending | Outcome::Dropped(_) => None,
        }
    }

    /// Like [`feed`](Self::feed) but reports why a frame was dropped.
    pub fn feed_outcome(&mut self, ev: &FrameEvent<'_>) -> Outcome {
        if ev.info.is_message_head() && self.owner() == Some(ev.conn) {
            warn!("WS[{}]: new message before previous completed, discarding", ev.conn);
        }
        let state = core::mem::take(&mut self.state);
        let (next, outcome) = step(state, ev, self.limit);
        self.state = next;
        match &outcome {
            Outcome::Dropped(e) => {
                self.dropped = self.dropped.saturating_add(1);
                warn!(
                    "WS[{}]: frame{} [{}+{}] dropped: {}",
                    ev.conn,
                    ev.info.num,
                    ev.info.index,
                    ev.payload.len(),
                    e
                );
            }
            Outcome::Complete(msg) => {
                debug!("WS[{}]: message complete, {} bytes", msg.conn, msg.data.len());
            }
            Outcome::Pending => {}
        }
        outcome
    }

    pub fn is_assembling(&self) -> bool {
        matches!(self.state, State::Assembling(_))
    }

    /// Connection owning the in-flight message, if any.
    pub fn owner(&self) -> Option<ConnId> {
        match &self.state {
            State::Assembling(msg) => Some(msg.owner),
            State::Idle => None,
        }
    }

    /// Discard any in-flight message.
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    pub fn dropped_count(&self) -> u32 {
        self.dropped
    }
}

// ── Per-connection table ─────────────────────────────────────

/// Independent [`Reassembler`] per connection.
pub struct ReassemblerTable {
    slots: heapless::Vec<(ConnId, Reassembler), MAX_SLOTS>,
    capacity: usize,
    limit: usize,
    dropped: u32,
}

impl ReassemblerTable {
    /// `capacity` is clamped to `1..=MAX_SLOTS`.
    pub fn new(capacity: usize, limit: usize) -> Self {
        Self {
            slots: heapless::Vec::new(),
            capacity: capacity.clamp(1, MAX_SLOTS),
            limit,
            dropped: 0,
        }
    }

    pub fn feed(&mut self, ev: &FrameEvent<'_>) -> Option<Message> {
        match self.feed_outcome(ev) {
            Outcome::Complete(msg) => Some(msg),
            Outcome::Pending | Outcome::Dropped(_) => None,
        }
    }

    pub fn feed_outcome(&mut self, ev: &FrameEvent<'_>) -> Outcome {
        let Some(idx) = self.slot_for(ev.conn) else {
            self.dropped = self.dropped.saturating_add(1);
            warn!("WS[{}]: no free reassembly slot, frame dropped", ev.conn);
            return Outcome::Dropped(ReassemblyError::NoSlot);
        };
        let outcome = self.slots[idx].1.feed_outcome(ev);
        if matches!(outcome, Outcome::Dropped(_)) {
            self.dropped = self.dropped.saturating_add(1);
        }
        outcome
    }

    fn slot_for(&mut self, conn: ConnId) -> Option<usize> {
        if let Some(idx) = self.slots.iter().position(|(c, _)| *c == conn) {
            return Some(idx);
        }
        let fresh = (conn, Reassembler::new(self.limit));
        if self.slots.len() < self.capacity {
            self.slots.push(fresh).ok()?;
            return Some(self.slots.len() - 1);
        }
        // Full: reuse a slot whose connection has nothing in flight.
        let idle = self.slots.iter().position(|(_, r)| !r.is_assembling())?;
        self.slots[idle] = fresh;
        Some(idle)
    }

    /// Forget a closed connection, discarding any partial message.
    pub fn remove(&mut self, conn: ConnId) {
        if let Some(idx) = self.slots.iter().position(|(c, _)| *c == conn) {
            if self.slots[idx].1.is_assembling() {
                debug!("WS[{}]: closed mid-message, discarding", conn);
            }
            self.slots.swap_remove(idx);
        }
    }

    pub fn is_assembling(&self, conn: ConnId) -> bool {
        self.slots
            .iter()
            .any(|(c, r)| *c == conn && r.is_assembling())
    }

    /// Connections currently holding a slot.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped_count(&self) -> u32 {
        self.dropped
    }
}
