// src/server.rs
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::context::{Context, RequestSlot};
use crate::error::ServerResult;
use crate::http::{Status, serialize_response};
use crate::net;
use crate::parser;
use crate::pool::Pool;
use crate::router::{Handler, Router};
use crate::threadpool::ThreadPool;

/// Per-request read budget: a request must arrive in one read of at most
/// this many bytes.
pub const PARSE_BUFFER_CAPACITY: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub num_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
        }
    }
}

/// The accept loop plus everything a connection needs: the route table,
/// the worker pool and the recycled request slots.
pub struct Server {
    router: Router,
    workers: ThreadPool,
    slots: Arc<Pool<RequestSlot>>,
}

impl Server {
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        Ok(Self {
            router: Router::new(),
            workers: ThreadPool::new(config.num_threads)?,
            slots: Arc::new(Pool::new(RequestSlot::new)),
        })
    }

    /// Register `handler` for an exact-match `path`. Fatal past 100
    /// routes.
    pub fn attach_handler(&mut self, path: &'static str, handler: Handler) {
        self.router.attach(path, handler);
    }

    /// Bind, listen and serve forever: one request per accepted
    /// connection, handlers running on the worker pool. Returns only if
    /// the listener cannot be created; accept errors are logged and the
    /// loop keeps going.
    pub fn start(self, port: u16) -> ServerResult<()> {
        let listener = net::listen(port)?;
        info!(port, routes = self.router.len(), "listening");

        let router = Arc::new(self.router);
        loop {
            let stream = match listener.accept() {
                Ok((stream, _peer)) => stream,
                Err(err) => {
                    error!("could not accept a connection: {err}");
                    continue;
                }
            };

            let router = Arc::clone(&router);
            let slots = Arc::clone(&self.slots);
            self.workers
                .submit(move || handle_connection(stream, &router, &slots));
        }
    }
}

/// One request, start to finish: check a slot out of the pool, read,
/// parse, route, run the handler, serialize, send. Failures on the way in
/// are logged and the connection dropped; the slot goes back to the pool
/// either way.
fn handle_connection(mut stream: TcpStream, router: &Router, slots: &Arc<Pool<RequestSlot>>) {
    let mut slot = slots.acquire();
    slot.arena.reset();
    let arena = &slot.arena;

    let buffer = arena.alloc_bytes(PARSE_BUFFER_CAPACITY);
    let received = match stream.read(buffer) {
        Ok(count) => count,
        Err(err) => {
            warn!("could not receive data from the socket: {err}");
            return;
        }
    };

    let request = match parser::parse_request(arena, &buffer[..received]) {
        Ok(request) => request,
        Err(err) => {
            warn!("could not parse the HTTP request: {err}");
            return;
        }
    };
    let version = request.version;

    let wire = match router.lookup(request.path) {
        Some(handler) => {
            let mut ctx = Context::new(arena, request);
            let status = handler(&mut ctx);
            serialize_response(arena, version, status, ctx.response_headers(), ctx.content())
        }
        None => serialize_response(arena, version, Status::NotFound, &[], &[]),
    };

    if let Err(err) = stream.write_all(wire) {
        error!("could not send the response: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_every_core() {
        let config = ServerConfig::default();
        assert!(config.num_threads >= 1);
    }
}
