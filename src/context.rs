// src/context.rs
use crate::arena::{Arena, ArenaVec};
use crate::http::{Header, HeaderList, Request};
use crate::json::{self, JsonError, JsonValue};

/// Capacity of the arena owned by every pooled request slot. This is a
/// virtual-memory reservation; pages are only touched as a request
/// actually allocates, so the OS must overcommit.
pub const REQUEST_ARENA_CAPACITY: usize = 4 * 1024 * 1024 * 1024;

/// The pooled per-request object. Holding the arena here keeps the
/// expensive reservation alive across requests; the worker resets it on
/// every checkout.
pub struct RequestSlot {
    pub arena: Arena,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self {
            arena: Arena::with_capacity(REQUEST_ARENA_CAPACITY),
        }
    }
}

impl Default for RequestSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler-facing view of one request.
///
/// Everything it hands out points into the slot's arena; the `'a`
/// lifetime ends when the worker serializes the response and returns the
/// slot, so nothing can escape the request.
pub struct Context<'a> {
    pub arena: &'a Arena,
    request: Request<'a>,
    headers: HeaderList<'a>,
    content: &'a [u8],
}

impl<'a> Context<'a> {
    pub fn new(arena: &'a Arena, request: Request<'a>) -> Self {
        Self {
            arena,
            request,
            headers: ArenaVec::new_in(arena),
            content: b"",
        }
    }

    pub fn request(&self) -> &Request<'a> {
        &self.request
    }

    /// Append a response header; insertion order is preserved on the wire.
    pub fn add_header(&mut self, name: &'a [u8], value: &'a [u8]) {
        self.headers.push(Header { name, value });
    }

    /// Set the response body.
    pub fn set_content(&mut self, content: &'a [u8]) {
        self.content = content;
    }

    pub fn content(&self) -> &'a [u8] {
        self.content
    }

    pub fn response_headers(&self) -> &[Header<'a>] {
        self.headers.as_slice()
    }

    /// Run the JSON parser over the request body, allocating from the
    /// context arena.
    pub fn parse_json_body(&self) -> Result<JsonValue<'a>, JsonError> {
        json::parse(self.arena, self.request.body)
    }
}
