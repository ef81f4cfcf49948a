// src/http.rs
use std::fmt::Write as _;

use crate::arena::{Arena, ArenaVec};

/// Request methods from RFC 2616 section 5.1.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Options,
    Get,
    Post,
    Put,
    Delete,
    Trace,
    Connect,
}

impl Method {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"OPTIONS" => Some(Method::Options),
            b"GET" => Some(Method::Get),
            b"POST" => Some(Method::Post),
            b"PUT" => Some(Method::Put),
            b"DELETE" => Some(Method::Delete),
            b"TRACE" => Some(Method::Trace),
            b"CONNECT" => Some(Method::Connect),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Options => "OPTIONS",
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http11,
}

impl Version {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"HTTP/1.1" => Some(Version::Http11),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Version::Http11 => "HTTP/1.1",
        }
    }
}

macro_rules! status_table {
    ($($name:ident = $code:literal, $reason:literal;)+) => {
        /// Response statuses with their canonical reason phrases. Unknown
        /// codes are unrepresentable; the response parser rejects them.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u16)]
        pub enum Status {
            $($name = $code,)+
        }

        impl Status {
            #[inline]
            pub fn code(self) -> u16 {
                self as u16
            }

            pub fn reason(self) -> &'static str {
                match self {
                    $(Status::$name => $reason,)+
                }
            }

            pub fn from_code(code: u16) -> Option<Status> {
                match code {
                    $($code => Some(Status::$name),)+
                    _ => None,
                }
            }
        }
    };
}

status_table! {
    Ok = 200, "OK";
    Created = 201, "Created";
    Accepted = 202, "Accepted";
    NonAuthoritativeInformation = 203, "Non-Authoritative Information";
    NoContent = 204, "No Content";
    ResetContent = 205, "Reset Content";
    PartialContent = 206, "Partial Content";
    MultiStatus = 207, "Multi-Status";
    AlreadyReported = 208, "Already Reported";
    ImUsed = 226, "IM Used";
    MultipleChoices = 300, "Multiple Choices";
    MovedPermanently = 301, "Moved Permanently";
    Found = 302, "Found";
    SeeOther = 303, "See Other";
    NotModified = 304, "Not Modified";
    TemporaryRedirect = 307, "Temporary Redirect";
    PermanentRedirect = 308, "Permanent Redirect";
    BadRequest = 400, "Bad Request";
    Unauthorized = 401, "Unauthorized";
    PaymentRequired = 402, "Payment Required";
    Forbidden = 403, "Forbidden";
    NotFound = 404, "Not Found";
    MethodNotAllowed = 405, "Method Not Allowed";
    NotAcceptable = 406, "Not Acceptable";
    ProxyAuthenticationRequired = 407, "Proxy Authentication Required";
    RequestTimeout = 408, "Request Timeout";
    Conflict = 409, "Conflict";
    Gone = 410, "Gone";
    LengthRequired = 411, "Length Required";
    PreconditionFailed = 412, "Precondition Failed";
    PayloadTooLarge = 413, "Content Too Large";
    UriTooLong = 414, "URI Too Long";
    UnsupportedMediaType = 415, "Unsupported Media Type";
    RangeNotSatisfiable = 416, "Range Not Satisfiable";
    ExpectationFailed = 417, "Expectation Failed";
    ImATeapot = 418, "I'm a teapot";
    MisdirectedRequest = 421, "Misdirected Request";
    UnprocessableEntity = 422, "Unprocessable Entity";
    Locked = 423, "Locked";
    FailedDependency = 424, "Failed Dependency";
    TooEarly = 425, "Too Early";
    UpgradeRequired = 426, "Upgrade Required";
    PreconditionRequired = 428, "Precondition Required";
    TooManyRequests = 429, "Too Many Requests";
    RequestHeaderFieldsTooLarge = 431, "Request Header Fields Too Large";
    UnavailableForLegalReasons = 451, "Unavailable For Legal Reasons";
    InternalServerError = 500, "Internal Server Error";
    NotImplemented = 501, "Not Implemented";
    BadGateway = 502, "Bad Gateway";
    ServiceUnavailable = 503, "Service Unavailable";
    GatewayTimeout = 504, "Gateway Timeout";
    HttpVersionNotSupported = 505, "HTTP Version Not Supported";
    VariantAlsoNegotiates = 506, "Variant Also Negotiates";
    InsufficientStorage = 507, "Insufficient Storage";
    LoopDetected = 508, "Loop Detected";
    NotExtended = 510, "Not Extended";
    NetworkAuthenticationRequired = 511, "Network Authentication Required";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<'a> {
    pub name: &'a [u8],
    pub value: &'a [u8],
}

/// Ordered header list; duplicates are permitted and insertion order is
/// preserved.
pub type HeaderList<'a> = ArenaVec<'a, Header<'a>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request<'a> {
    pub method: Method,
    pub path: &'a [u8],
    pub version: Version,
    pub headers: HeaderList<'a>,
    pub body: &'a [u8],
}

impl<'a> Request<'a> {
    pub fn new(arena: &'a Arena, method: Method, path: &'a [u8]) -> Self {
        Self {
            method,
            path,
            version: Version::Http11,
            headers: ArenaVec::new_in(arena),
            body: b"",
        }
    }

    pub fn add_header(&mut self, name: &'a [u8], value: &'a [u8]) {
        self.headers.push(Header { name, value });
    }

    /// First header with the given name, compared case-insensitively.
    pub fn header(&self, name: &[u8]) -> Option<&'a [u8]> {
        self.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Response<'a> {
    pub version: Version,
    pub status: Status,
    pub headers: HeaderList<'a>,
    pub body: &'a [u8],
}

impl<'a> Response<'a> {
    /// First header with the given name, compared case-insensitively.
    pub fn header(&self, name: &[u8]) -> Option<&'a [u8]> {
        self.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value)
    }
}

fn format_headers(out: &mut ArenaVec<'_, u8>, headers: &[Header<'_>]) {
    for header in headers {
        out.extend_from_slice(header.name);
        out.extend_from_slice(b": ");
        out.extend_from_slice(header.value);
        out.extend_from_slice(b"\r\n");
    }
}

/// Serialize a response into the arena. The CORS header is emitted
/// unconditionally, before any caller-supplied headers.
pub fn serialize_response<'a>(
    arena: &'a Arena,
    version: Version,
    status: Status,
    headers: &[Header<'_>],
    body: &[u8],
) -> &'a [u8] {
    let mut out: ArenaVec<'a, u8> = ArenaVec::new_in(arena);
    let _ = write!(
        out,
        "{} {} {}\r\nAccess-Control-Allow-Origin: *\r\n",
        version.as_str(),
        status.code(),
        status.reason()
    );
    format_headers(&mut out, headers);
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out.into_slice()
}

/// Serialize a request into the arena.
pub fn serialize_request<'a>(arena: &'a Arena, request: &Request<'_>) -> &'a [u8] {
    let mut out: ArenaVec<'a, u8> = ArenaVec::new_in(arena);
    let _ = write!(out, "{} ", request.method.as_str());
    out.extend_from_slice(request.path);
    let _ = write!(out, " {}\r\n", request.version.as_str());
    format_headers(&mut out, request.headers.as_slice());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(request.body);
    out.into_slice()
}
