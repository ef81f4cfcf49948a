// src/parser.rs
use memchr::memchr;
use thiserror::Error;

use crate::arena::{Arena, ArenaVec};
use crate::bytes::parse_i64;
use crate::http::{Header, HeaderList, Method, Request, Response, Status, Version};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unrecognized request method")]
    BadMethod,
    #[error("unrecognized HTTP version")]
    BadVersion,
    #[error("malformed header line")]
    BadHeader,
    #[error("missing CRLF line terminator")]
    BadLineEnding,
    #[error("unrecognized response status")]
    BadStatus,
}

/// Parse `METHOD SP PATH SP VERSION CRLF (HEADER CRLF)* CRLF BODY`.
///
/// The path is taken verbatim (no URI decoding) and the body is whatever
/// follows the empty line. All views point into `buffer`.
pub fn parse_request<'a>(arena: &'a Arena, buffer: &'a [u8]) -> Result<Request<'a>, ParseError> {
    let method_end = memchr(b' ', buffer).ok_or(ParseError::UnexpectedEof)?;
    let method = Method::from_bytes(&buffer[..method_end]).ok_or(ParseError::BadMethod)?;

    let path_start = method_end + 1;
    let path_end =
        path_start + memchr(b' ', &buffer[path_start..]).ok_or(ParseError::UnexpectedEof)?;
    let path = &buffer[path_start..path_end];

    let version_start = path_end + 1;
    let version_end =
        version_start + memchr(b'\r', &buffer[version_start..]).ok_or(ParseError::UnexpectedEof)?;
    let version =
        Version::from_bytes(&buffer[version_start..version_end]).ok_or(ParseError::BadVersion)?;
    if buffer.len() <= version_end + 1 {
        return Err(ParseError::UnexpectedEof);
    }
    if buffer[version_end + 1] != b'\n' {
        return Err(ParseError::BadLineEnding);
    }

    let mut cursor = version_end + 2;
    let headers = parse_headers(arena, buffer, &mut cursor)?;
    let body = &buffer[cursor..];

    Ok(Request {
        method,
        path,
        version,
        headers,
        body,
    })
}

/// Parse `VERSION SP CODE SP REASON CRLF (HEADER CRLF)* CRLF BODY`. The
/// (code, reason) pair must match the status table exactly.
pub fn parse_response<'a>(arena: &'a Arena, buffer: &'a [u8]) -> Result<Response<'a>, ParseError> {
    let version_end = memchr(b' ', buffer).ok_or(ParseError::UnexpectedEof)?;
    let version = Version::from_bytes(&buffer[..version_end]).ok_or(ParseError::BadVersion)?;

    let code_start = version_end + 1;
    let code_end =
        code_start + memchr(b' ', &buffer[code_start..]).ok_or(ParseError::UnexpectedEof)?;
    let code = parse_i64(&buffer[code_start..code_end]).ok_or(ParseError::BadStatus)?;

    let reason_start = code_end + 1;
    let reason_end =
        reason_start + memchr(b'\r', &buffer[reason_start..]).ok_or(ParseError::UnexpectedEof)?;
    let reason = &buffer[reason_start..reason_end];
    if buffer.len() <= reason_end + 1 {
        return Err(ParseError::UnexpectedEof);
    }
    if buffer[reason_end + 1] != b'\n' {
        return Err(ParseError::BadLineEnding);
    }

    let status = u16::try_from(code)
        .ok()
        .and_then(Status::from_code)
        .filter(|status| status.reason().as_bytes() == reason)
        .ok_or(ParseError::BadStatus)?;

    let mut cursor = reason_end + 2;
    let headers = parse_headers(arena, buffer, &mut cursor)?;
    let body = &buffer[cursor..];

    Ok(Response {
        version,
        status,
        headers,
        body,
    })
}

/// Parse `NAME ':' VALUE CRLF` lines until the empty line. Names run up to
/// the first `:`; values run to the CR with leading spaces skipped. No
/// folding. `cursor` is left just past the terminating empty line.
fn parse_headers<'a>(
    arena: &'a Arena,
    buffer: &'a [u8],
    cursor: &mut usize,
) -> Result<HeaderList<'a>, ParseError> {
    let mut headers: HeaderList<'a> = ArenaVec::new_in(arena);
    let mut index = *cursor;

    loop {
        if buffer.len() - index >= 2 && buffer[index] == b'\r' && buffer[index + 1] == b'\n' {
            *cursor = index + 2;
            return Ok(headers);
        }
        if index >= buffer.len() {
            return Err(ParseError::UnexpectedEof);
        }

        let colon = memchr(b':', &buffer[index..]).ok_or(ParseError::BadHeader)?;
        let name = &buffer[index..index + colon];

        let mut value_start = index + colon + 1;
        while value_start < buffer.len() && buffer[value_start] == b' ' {
            value_start += 1;
        }
        let value_end =
            value_start + memchr(b'\r', &buffer[value_start..]).ok_or(ParseError::UnexpectedEof)?;
        if buffer.len() <= value_end + 1 {
            return Err(ParseError::UnexpectedEof);
        }
        if buffer[value_end + 1] != b'\n' {
            return Err(ParseError::BadLineEnding);
        }

        headers.push(Header {
            name,
            value: &buffer[value_start..value_end],
        });
        index = value_end + 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{serialize_request, serialize_response};

    #[test]
    fn parses_a_basic_request() {
        let arena = Arena::with_capacity(64 * 1024);
        let request = parse_request(&arena, b"GET /ping HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path, b"/ping");
        assert_eq!(request.version, Version::Http11);
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.headers[0].name, b"Host");
        assert_eq!(request.headers[0].value, b"x");
        assert_eq!(request.body, b"");
    }

    #[test]
    fn body_is_everything_after_the_empty_line() {
        let arena = Arena::with_capacity(64 * 1024);
        let request = parse_request(
            &arena,
            b"POST /submit HTTP/1.1\r\nContent-Type: text/plain\r\n\r\nline one\r\nline two",
        )
        .unwrap();
        assert_eq!(request.body, b"line one\r\nline two");
    }

    #[test]
    fn duplicate_headers_are_kept_in_order() {
        let arena = Arena::with_capacity(64 * 1024);
        let request = parse_request(
            &arena,
            b"GET / HTTP/1.1\r\nAccept: a\r\nAccept: b\r\n\r\n",
        )
        .unwrap();
        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.headers[0].value, b"a");
        assert_eq!(request.headers[1].value, b"b");
    }

    #[test]
    fn rejects_a_request_missing_the_terminating_empty_line() {
        let arena = Arena::with_capacity(64 * 1024);
        assert_eq!(
            parse_request(&arena, b"GET /ping HTTP/1.1\r\nHost: x\r\n"),
            Err(ParseError::UnexpectedEof)
        );
    }

    #[test]
    fn rejects_unknown_method_and_version() {
        let arena = Arena::with_capacity(64 * 1024);
        assert_eq!(
            parse_request(&arena, b"PATCH /x HTTP/1.1\r\n\r\n"),
            Err(ParseError::BadMethod)
        );
        assert_eq!(
            parse_request(&arena, b"GET /x HTTP/1.0\r\n\r\n"),
            Err(ParseError::BadVersion)
        );
    }

    #[test]
    fn rejects_a_header_without_a_colon() {
        let arena = Arena::with_capacity(64 * 1024);
        assert_eq!(
            parse_request(&arena, b"GET /x HTTP/1.1\r\nbroken line\r\n\r\n"),
            Err(ParseError::BadHeader)
        );
    }

    #[test]
    fn requests_round_trip_through_the_serializer() {
        let arena = Arena::with_capacity(64 * 1024);
        let mut request = Request::new(&arena, Method::Put, b"/items/9");
        request.add_header(b"Host", b"example.test");
        request.add_header(b"X-Trace", b"abc 123");
        request.body = b"{\"name\":\"pedal\"}";

        let wire = serialize_request(&arena, &request);
        let parsed = parse_request(&arena, wire).unwrap();

        assert_eq!(parsed.method, request.method);
        assert_eq!(parsed.path, request.path);
        assert_eq!(parsed.version, request.version);
        assert_eq!(parsed.headers.as_slice(), request.headers.as_slice());
        assert_eq!(parsed.body, request.body);
    }

    #[test]
    fn parses_a_response_and_checks_the_status_table() {
        let arena = Arena::with_capacity(64 * 1024);
        let response = parse_response(
            &arena,
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{}",
        )
        .unwrap();
        assert_eq!(response.status, Status::Ok);
        assert_eq!(
            response.header(b"content-type"),
            Some(b"application/json".as_slice())
        );
        assert_eq!(response.body, b"{}");

        assert_eq!(
            parse_response(&arena, b"HTTP/1.1 200 Fine\r\n\r\n"),
            Err(ParseError::BadStatus)
        );
        assert_eq!(
            parse_response(&arena, b"HTTP/1.1 299 OK\r\n\r\n"),
            Err(ParseError::BadStatus)
        );
    }

    #[test]
    fn serialized_responses_parse_back() {
        let arena = Arena::with_capacity(64 * 1024);
        let headers = [Header {
            name: b"Content-Type",
            value: b"text/plain",
        }];
        let wire = serialize_response(&arena, Version::Http11, Status::Created, &headers, b"made");
        let response = parse_response(&arena, wire).unwrap();
        assert_eq!(response.status, Status::Created);
        assert_eq!(response.header(b"Access-Control-Allow-Origin"), Some(b"*".as_slice()));
        assert_eq!(response.header(b"Content-Type"), Some(b"text/plain".as_slice()));
        assert_eq!(response.body, b"made");
    }
}
