use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use sonata::json::JsonWriter;
use sonata::{
    Arena, Context, Handler, Method, Request, Server, ServerConfig, Status, client,
};

fn hi(ctx: &mut Context<'_>) -> Status {
    ctx.add_header(b"Content-Type", b"text/plain");
    ctx.set_content(b"hi");
    Status::Ok
}

fn reflect(ctx: &mut Context<'_>) -> Status {
    let body = ctx.request().body;
    ctx.set_content(body);
    Status::Ok
}

fn sum(ctx: &mut Context<'_>) -> Status {
    let Ok(value) = ctx.parse_json_body() else {
        return Status::BadRequest;
    };
    let Some(object) = value.as_object() else {
        return Status::BadRequest;
    };
    let (Some(a), Some(b)) = (object.get_number(b"a"), object.get_number(b"b")) else {
        return Status::UnprocessableEntity;
    };

    let mut writer = JsonWriter::begin(ctx.arena);
    writer.begin_object();
    writer.put_key(b"sum");
    writer.put_number(a + b);
    writer.end_object();
    let body = writer.end();

    ctx.add_header(b"Content-Type", b"application/json");
    ctx.set_content(body);
    Status::Ok
}

fn start_server(port: u16, routes: &[(&'static str, Handler)]) {
    let mut server = Server::new(ServerConfig { num_threads: 2 }).unwrap();
    for &(path, handler) in routes {
        server.attach_handler(path, handler);
    }
    thread::spawn(move || {
        let _ = server.start(port);
    });
}

fn connect(port: u16) -> TcpStream {
    for _ in 0..100 {
        if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)) {
            return stream;
        }
        thread::sleep(Duration::from_millis(20));
    }
    panic!("server did not come up on port {port}");
}

fn roundtrip(port: u16, request: &[u8]) -> String {
    let mut stream = connect(port);
    stream.write_all(request).unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

#[test]
fn routed_handler_response_shape() {
    start_server(18301, &[("/echo", hi)]);

    let response = roundtrip(18301, b"GET /echo HTTP/1.1\r\nHost: x\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Access-Control-Allow-Origin: *\r\n"));
    assert!(response.contains("Content-Type: text/plain\r\n"));
    assert!(response.ends_with("\r\n\r\nhi"));
}

#[test]
fn unrouted_path_gets_a_bare_404() {
    start_server(18302, &[("/echo", hi)]);

    let response = roundtrip(18302, b"POST /nope HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(
        response,
        "HTTP/1.1 404 Not Found\r\nAccess-Control-Allow-Origin: *\r\n\r\n"
    );
}

#[test]
fn malformed_requests_close_without_a_response() {
    start_server(18303, &[("/echo", hi)]);

    let response = roundtrip(18303, b"BOGUS\r\n\r\n");
    assert!(response.is_empty());
}

#[test]
fn request_body_reaches_the_handler() {
    start_server(18304, &[("/reflect", reflect)]);

    let response = roundtrip(
        18304,
        b"PUT /reflect HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello there",
    );
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("\r\n\r\nhello there"));
}

#[test]
fn own_client_talks_to_own_server() {
    start_server(18305, &[("/echo", hi), ("/sum", sum)]);
    // make sure the listener is up before the client resolves and connects
    drop(connect(18305));

    let arena = Arena::with_capacity(16 * 1024 * 1024);
    let mut request = Request::new(&arena, Method::Get, b"/echo");
    request.add_header(b"Host", b"127.0.0.1");

    let response = client::send_request(&arena, "127.0.0.1", 18305, &request).unwrap();
    assert_eq!(response.status, Status::Ok);
    assert_eq!(
        response.header(b"Access-Control-Allow-Origin"),
        Some(b"*".as_slice())
    );
    assert_eq!(response.body, b"hi");
}

#[test]
fn json_round_trip_through_the_server() {
    start_server(18306, &[("/sum", sum)]);
    drop(connect(18306));

    let arena = Arena::with_capacity(16 * 1024 * 1024);
    let mut request = Request::new(&arena, Method::Post, b"/sum");
    request.add_header(b"Content-Type", b"application/json");
    request.body = br#"{"a":19,"b":23}"#;

    let response = client::send_request(&arena, "127.0.0.1", 18306, &request).unwrap();
    assert_eq!(response.status, Status::Ok);

    let value = sonata::json::parse(&arena, response.body).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.get_number(b"sum"), Some(42.0));
}
