// src/router.rs
use arrayvec::ArrayVec;

use crate::context::Context;
use crate::http::Status;

pub const MAX_ROUTES: usize = 100;

/// A handler maps one request context to a response status; everything
/// else it wants to say goes through the context.
pub type Handler = fn(&mut Context<'_>) -> Status;

#[derive(Clone, Copy)]
struct Route {
    path: &'static str,
    handler: Handler,
}

/// Flat exact-match route table. Lookup is a linear scan and the first
/// match wins; there are no path parameters, prefixes or method filters.
pub struct Router {
    routes: ArrayVec<Route, MAX_ROUTES>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: ArrayVec::new(),
        }
    }

    /// Register a handler for an exact path. Fatal past [`MAX_ROUTES`].
    pub fn attach(&mut self, path: &'static str, handler: Handler) {
        if self.routes.is_full() {
            panic!("maximum number of handlers ({MAX_ROUTES}) reached");
        }
        self.routes.push(Route { path, handler });
    }

    pub fn lookup(&self, path: &[u8]) -> Option<Handler> {
        self.routes
            .iter()
            .find(|route| route.path.as_bytes() == path)
            .map(|route| route.handler)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::http::{Method, Request};

    fn teapot(_ctx: &mut Context<'_>) -> Status {
        Status::ImATeapot
    }

    fn ok(_ctx: &mut Context<'_>) -> Status {
        Status::Ok
    }

    fn run(router: &Router, path: &'static [u8]) -> Option<Status> {
        let arena = Arena::with_capacity(64 * 1024);
        let request = Request::new(&arena, Method::Get, path);
        let mut ctx = Context::new(&arena, request);
        router.lookup(path).map(|handler| handler(&mut ctx))
    }

    #[test]
    fn first_registration_wins() {
        let mut router = Router::new();
        router.attach("/a", teapot);
        router.attach("/a", ok);
        assert_eq!(run(&router, b"/a"), Some(Status::ImATeapot));
    }

    #[test]
    fn unknown_paths_do_not_match() {
        let mut router = Router::new();
        router.attach("/a", ok);
        assert_eq!(run(&router, b"/b"), None);
        assert_eq!(run(&router, b"/a/"), None);
    }

    #[test]
    #[should_panic(expected = "maximum number of handlers")]
    fn route_table_overflow_is_fatal() {
        let mut router = Router::new();
        for _ in 0..=MAX_ROUTES {
            router.attach("/spill", ok);
        }
    }
}
