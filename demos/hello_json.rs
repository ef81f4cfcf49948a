// demos/hello_json.rs
//
// Minimal JSON API: `GET /ping`, `GET /now`, `POST /greet` with a JSON
// body like {"name":"Clara"}. Run with `cargo run --example hello_json`.
use std::process;
use std::time::SystemTime;

use sonata::json::JsonWriter;
use sonata::{Context, Server, ServerConfig, Status, init_logging};

fn ping(ctx: &mut Context<'_>) -> Status {
    ctx.add_header(b"Content-Type", b"text/plain");
    ctx.set_content(b"pong");
    Status::Ok
}

fn now(ctx: &mut Context<'_>) -> Status {
    let arena = ctx.arena;
    let date = arena.format(format_args!(
        "{}",
        httpdate::fmt_http_date(SystemTime::now())
    ));
    ctx.add_header(b"Date", date);
    ctx.add_header(b"Content-Type", b"text/plain");
    ctx.set_content(date);
    Status::Ok
}

fn greet(ctx: &mut Context<'_>) -> Status {
    let Ok(value) = ctx.parse_json_body() else {
        return Status::BadRequest;
    };
    let name = value
        .as_object()
        .and_then(|object| object.get_str(b"name"))
        .unwrap_or(b"world");

    let mut writer = JsonWriter::begin(ctx.arena);
    writer.begin_object();
    writer.put_key(b"greeting");
    writer.put_string(name);
    writer.put_key(b"served_by");
    writer.put_string(b"sonata");
    writer.end_object();
    let body = writer.end();

    ctx.add_header(b"Content-Type", b"application/json");
    ctx.set_content(body);
    Status::Ok
}

fn main() {
    init_logging();

    ctrlc::set_handler(|| {
        eprintln!("\nshutting down");
        process::exit(0);
    })
    .expect("could not install the signal handler");

    let mut server = Server::new(ServerConfig::default()).expect("could not create the server");
    server.attach_handler("/ping", ping);
    server.attach_handler("/now", now);
    server.attach_handler("/greet", greet);

    if let Err(err) = server.start(8080) {
        eprintln!("server failed: {err}");
        process::exit(1);
    }
}
