//! Inter-task channels between the network task and the command dispatcher.
//!
//! Uses `embassy-sync` bounded MPMC channels. The HTTP server callback must
//! never block, so it only ever `try_send`s; the dispatcher thread owns the
//! executor and does the slow work.
//!
//! ```text
//! ┌──────────────┐  InboundMsg   ┌──────────────┐
//! │ Network task │─────────────▶│  Dispatcher   │── handle_rpc ──▶ Executor
//! │ (ws handler) │◀─────────────│  (thread)     │
//! └──────────────┘  OutboundMsg  └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

use super::frame::{ConnId, Message};
use super::jsonrpc::handle_rpc;
use crate::console::executor::CommandExecutor;
use crate::console::registry::Interpreter;

/// A reassembled WebSocket message waiting to be executed.
pub struct InboundMsg {
    pub conn: ConnId,
    pub message: Message,
}

/// A serialized response waiting to be sent.
pub struct OutboundMsg {
    pub conn: ConnId,
    pub text: String,
}

/// Channel depth for inbound messages.
pub const INBOUND_DEPTH: usize = 8;

/// Channel depth for outbound responses.
pub const OUTBOUND_DEPTH: usize = 16;

pub type InboundChannel = Channel<CriticalSectionRawMutex, InboundMsg, INBOUND_DEPTH>;
pub type OutboundChannel = Channel<CriticalSectionRawMutex, OutboundMsg, OUTBOUND_DEPTH>;

/// Network task → dispatcher.
pub static INBOUND: InboundChannel = Channel::new();

/// Dispatcher → network task.
pub static OUTBOUND: OutboundChannel = Channel::new();

/// Queue a message without blocking. Returns `false` (and logs) when full.
pub fn post_inbound(channel: &InboundChannel, message: Message) -> bool {
    let conn = message.conn;
    if channel.try_send(InboundMsg { conn, message }).is_err() {
        warn!("WS[{}]: inbound channel full, dropping message", conn);
        return false;
    }
    true
}

/// Next response to send, if any.
pub fn try_recv_outbound(channel: &OutboundChannel) -> Option<OutboundMsg> {
    channel.try_receive().ok()
}

/// Drains inbound messages through the JSON-RPC adapter.
pub struct Dispatcher<'a, I: Interpreter> {
    executor: &'a CommandExecutor<I>,
    inbound: &'a InboundChannel,
    outbound: &'a OutboundChannel,
}

impl<'a, I: Interpreter> Dispatcher<'a, I> {
    pub fn new(
        executor: &'a CommandExecutor<I>,
        inbound: &'a InboundChannel,
        outbound: &'a OutboundChannel,
    ) -> Self {
        Self {
            executor,
            inbound,
            outbound,
        }
    }

    fn process(&self, msg: &InboundMsg) {
        let Some(text) = handle_rpc(&msg.message.data, self.executor) else {
            return;
        };
        let out = OutboundMsg {
            conn: msg.conn,
            text,
        };
        if self.outbound.try_send(out).is_err() {
            warn!("WS[{}]: outbound channel full, dropping response", msg.conn);
        }
    }

    /// Process every message currently queued. Returns how many ran.
    pub fn pump(&self) -> usize {
        let mut handled = 0;
        while let Ok(msg) = self.inbound.try_receive() {
            self.process(&msg);
            handled += 1;
        }
        handled
    }

    /// Block the calling thread, handling messages as they arrive.
    pub fn run(&self) {
        info!("RPC: dispatcher started");
        futures_lite::future::block_on(async {
            loop {
                let msg = self.inbound.receive().await;
                self.process(&msg);
            }
        });
    }
}
