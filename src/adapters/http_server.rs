//! HTTP and WebSocket server wiring.
//!
//! | Route          | Handler                                            |
//! |----------------|----------------------------------------------------|
//! | `POST /cmd`    | [`handle_cmd_request`](crate::rpc::form::handle_cmd_request) |
//! | `GET /config`  | [`config_reply`](crate::rpc::form::config_reply)   |
//! | `POST /config` | [`apply_config`](crate::rpc::form::apply_config)   |
//! | `WS /ws`       | reassembly → `INBOUND` → dispatcher → `OUTBOUND`   |
//!
//! ESP-IDF's httpd hands the WebSocket handler one whole frame at a time
//! and only says whether it is a fragment. [`FragmentTracker`] rebuilds the
//! frame number and message kind the reassembler needs. It is pure and
//! host-tested; the server itself only exists on ESP-IDF.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::rpc::frame::{ConnId, FrameInfo, Opcode};

/// Frame kinds as the server reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsFrame {
    Text { fragmented: bool },
    Binary { fragmented: bool },
    Continue { final_frame: bool },
}

/// Tracks the message kind and last frame number of every fragmented
/// message in flight, per connection.
#[derive(Default)]
pub struct FragmentTracker {
    open: HashMap<ConnId, (Opcode, u32)>,
}

impl FragmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for a frame of `len` payload bytes.
    pub fn frame_info(&mut self, conn: ConnId, frame: WsFrame, len: usize) -> FrameInfo {
        let (kind, fragmented) = match frame {
            WsFrame::Text { fragmented } => (Opcode::Text, fragmented),
            WsFrame::Binary { fragmented } => (Opcode::Binary, fragmented),
            WsFrame::Continue { final_frame } => return self.continuation(conn, final_frame, len),
        };
        if fragmented {
            self.open.insert(conn, (kind, 0));
        } else {
            self.open.remove(&conn);
        }
        FrameInfo {
            message_opcode: kind,
            opcode: kind,
            num: 0,
            final_frame: !fragmented,
            len: len as u64,
            index: 0,
        }
    }

    fn continuation(&mut self, conn: ConnId, final_frame: bool, len: usize) -> FrameInfo {
        // Without a head the reassembler sees a continuation and drops it.
        let (kind, num) = match self.open.get_mut(&conn) {
            Some((kind, num)) => {
                *num += 1;
                (*kind, *num)
            }
            None => (Opcode::Continuation, 1),
        };
        if final_frame {
            self.open.remove(&conn);
        }
        FrameInfo {
            message_opcode: kind,
            opcode: Opcode::Continuation,
            num,
            final_frame,
            len: len as u64,
            index: 0,
        }
    }

    pub fn forget(&mut self, conn: ConnId) {
        self.open.remove(&conn);
    }
}

/// Reply senders by connection. [`SenderMap::get`] hands out a clone so
/// no lock is held while a send waits on the server task.
pub struct SenderMap<S> {
    senders: Mutex<HashMap<ConnId, S>>,
}

impl<S: Clone> SenderMap<S> {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, conn: ConnId, sender: S) {
        self.lock().insert(conn, sender);
    }

    pub fn remove(&self, conn: ConnId) -> bool {
        self.lock().remove(&conn).is_some()
    }

    pub fn get(&self, conn: ConnId) -> Option<S> {
        self.lock().get(&conn).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnId, S>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: Clone> Default for SenderMap<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
pub use esp::start;

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::{Arc, Mutex, PoisonError};

    use esp_idf_svc::http::Method;
    use esp_idf_svc::http::server::ws::EspHttpWsDetachedSender;
    use esp_idf_svc::http::server::{Configuration, EspHttpConnection, EspHttpServer, Request};
    use esp_idf_svc::io::{Read, Write};
    use esp_idf_svc::sys::EspError;
    use esp_idf_svc::ws::FrameType;
    use log::{debug, info, warn};

    use super::{FragmentTracker, SenderMap, WsFrame};
    use crate::adapters::config_store::ConfigStore;
    use crate::config::ConsoleConfig;
    use crate::console::executor::CommandExecutor;
    use crate::console::registry::Interpreter;
    use crate::rpc::channels::{INBOUND, OUTBOUND, post_inbound};
    use crate::rpc::form::{
        FormReply, MAX_BODY_LEN, apply_config, config_reply, handle_cmd_request, read_body,
    };
    use crate::rpc::frame::{ConnId, FrameEvent, ReassemblerTable};

    /// Reassembly state, touched only from the httpd task. Senders live in
    /// their own [`SenderMap`].
    struct WsState {
        table: ReassemblerTable,
        fragments: FragmentTracker,
    }

    /// Start the server and the outbound sender thread. The server must be
    /// kept alive by the caller.
    pub fn start<I: Interpreter + 'static>(
        executor: &'static CommandExecutor<I>,
        store: Arc<Mutex<ConfigStore>>,
        config: &ConsoleConfig,
    ) -> anyhow::Result<EspHttpServer<'static>> {
        let mut server = EspHttpServer::new(&Configuration::default())?;

        server.fn_handler("/cmd", Method::Post, move |mut req| {
            let uri = String::from(req.uri());
            let reply = handle_cmd_request(|buf| req.read(buf), &uri, executor)?;
            send_reply(req, &reply)
        })?;

        let get_store = Arc::clone(&store);
        server.fn_handler("/config", Method::Get, move |req| {
            send_reply(req, &config_reply(&get_store))
        })?;

        server.fn_handler("/config", Method::Post, move |mut req| {
            let reply = match read_body(|buf| req.read(buf), MAX_BODY_LEN)? {
                Some(body) => apply_config(&store, &body),
                None => FormReply::too_large(),
            };
            send_reply(req, &reply)
        })?;

        let senders: Arc<SenderMap<EspHttpWsDetachedSender>> = Arc::new(SenderMap::new());
        let ws_state = Mutex::new(WsState {
            table: ReassemblerTable::new(
                config.max_connections as usize,
                config.max_message_len as usize,
            ),
            fragments: FragmentTracker::new(),
        });

        let ws_senders = Arc::clone(&senders);
        server.ws_handler("/ws", move |ws| -> Result<(), EspError> {
            let conn = ws.session() as ConnId;
            if ws.is_new() {
                info!("WS[{}]: connected", conn);
                ws_senders.insert(conn, ws.create_detached_sender()?);
                return Ok(());
            }
            if ws.is_closed() {
                info!("WS[{}]: disconnected", conn);
                ws_senders.remove(conn);
                let mut st = ws_state.lock().unwrap_or_else(PoisonError::into_inner);
                st.table.remove(conn);
                st.fragments.forget(conn);
                return Ok(());
            }

            let (frame_type, len) = ws.recv(&mut [])?;
            let frame = match frame_type {
                FrameType::Text(fragmented) => WsFrame::Text { fragmented },
                FrameType::Binary(fragmented) => WsFrame::Binary { fragmented },
                FrameType::Continue(final_frame) => WsFrame::Continue { final_frame },
                other => {
                    debug!("WS[{}]: ignoring {:?}", conn, other);
                    return Ok(());
                }
            };
            let mut payload = vec![0u8; len];
            ws.recv(&mut payload)?;

            let message = {
                let mut st = ws_state.lock().unwrap_or_else(PoisonError::into_inner);
                let info = st.fragments.frame_info(conn, frame, len);
                st.table.feed(&FrameEvent {
                    conn,
                    info,
                    payload: &payload,
                })
            };
            if let Some(message) = message {
                post_inbound(&INBOUND, message);
            }
            Ok(())
        })?;

        crate::task::spawn_task(crate::task::Core::Pro, 5, 6, "ws-send\0", move || {
            futures_lite::future::block_on(async {
                loop {
                    let out = OUTBOUND.receive().await;
                    let Some(mut sender) = senders.get(out.conn) else {
                        warn!("WS[{}]: gone, dropping response", out.conn);
                        continue;
                    };
                    if let Err(e) = sender.send(FrameType::Text(false), out.text.as_bytes()) {
                        warn!("WS[{}]: send failed: {}", out.conn, e);
                    }
                }
            });
        })?;

        info!("HTTP: server started (POST /cmd, GET|POST /config, WS /ws)");
        Ok(server)
    }

    fn send_reply(
        req: Request<&mut EspHttpConnection<'_>>,
        reply: &FormReply,
    ) -> anyhow::Result<()> {
        let mut resp = req.into_response(
            reply.status,
            None,
            &[("Content-Type", reply.content_type)],
        )?;
        resp.write_all(reply.body.as_bytes())?;
        Ok(())
    }
}
