// src/lib.rs
pub mod arena;
pub mod base64;
pub mod bytes;
pub mod client;
pub mod context;
pub mod error;
pub mod http;
pub mod json;
pub mod logging;
pub mod net;
pub mod parser;
pub mod pool;
pub mod router;
pub mod server;
pub mod threadpool;

// Re-exports for users
pub use arena::{Arena, ArenaVec, with_scratch};
pub use context::{Context, RequestSlot};
pub use error::{ServerError, ServerResult};
pub use http::{Header, Method, Request, Response, Status, Version};
pub use json::{JsonValue, JsonWriter};
pub use logging::init_logging;
pub use router::{Handler, Router};
pub use server::{Server, ServerConfig};
