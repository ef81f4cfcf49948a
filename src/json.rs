// src/json.rs
use std::fmt;
use std::fmt::Write as _;

use arrayvec::ArrayString;
use memchr::memchr;
use thiserror::Error;

use crate::arena::{Arena, ArenaVec};
use crate::bytes::fnv1_hash;

pub const DEFAULT_OBJECT_CAPACITY: usize = 37;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JsonError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unclosed string literal")]
    UnclosedString,
    #[error("illegal token")]
    IllegalToken,
    #[error("unexpected token")]
    UnexpectedToken,
    #[error("expected a string key")]
    ExpectedKey,
    #[error("expected ':' after an object key")]
    ExpectedColon,
    #[error("expected ',' or a closing delimiter")]
    ExpectedSeparator,
}

/// A parsed JSON value. Strings are views into the parsed input; arrays
/// and objects live in the arena the parser ran against, so a value never
/// outlives its request.
#[derive(Debug, Clone, Copy)]
pub enum JsonValue<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a [u8]),
    Array(JsonArray<'a>),
    Object(JsonObject<'a>),
}

pub type JsonArray<'a> = ArenaVec<'a, JsonValue<'a>>;

impl<'a> JsonValue<'a> {
    pub fn as_number(&self) -> Option<f64> {
        match *self {
            JsonValue::Number(number) => Some(number),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a [u8]> {
        match *self {
            JsonValue::String(string) => Some(string),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            JsonValue::Bool(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<JsonArray<'a>> {
        match *self {
            JsonValue::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<JsonObject<'a>> {
        match *self {
            JsonValue::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl PartialEq for JsonValue<'_> {
    /// Structural equality; objects compare up to key order.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsonValue::Null, JsonValue::Null) => true,
            (JsonValue::Bool(lhs), JsonValue::Bool(rhs)) => lhs == rhs,
            (JsonValue::Number(lhs), JsonValue::Number(rhs)) => lhs == rhs,
            (JsonValue::String(lhs), JsonValue::String(rhs)) => lhs == rhs,
            (JsonValue::Array(lhs), JsonValue::Array(rhs)) => lhs.as_slice() == rhs.as_slice(),
            (JsonValue::Object(lhs), JsonValue::Object(rhs)) => {
                lhs.len() == rhs.len()
                    && lhs.iter().all(|(key, value)| rhs.get(key) == Some(value))
            }
            _ => false,
        }
    }
}

/// Open-addressed, linear-probed map from byte-view keys to values, hashed
/// with FNV-1. Grows at 65% load by tripling; never shrinks. Inserting a
/// duplicate key is a fatal error.
#[derive(Clone, Copy)]
pub struct JsonObject<'a> {
    arena: &'a Arena,
    keys: *mut Option<&'a [u8]>,
    values: *mut JsonValue<'a>,
    len: usize,
    cap: usize,
}

fn alloc_keys<'a>(arena: &'a Arena, cap: usize) -> *mut Option<&'a [u8]> {
    let keys = arena.alloc_array::<Option<&[u8]>>(cap);
    for index in 0..cap {
        unsafe { keys.add(index).write(None) };
    }
    keys
}

impl<'a> JsonObject<'a> {
    pub fn new_in(arena: &'a Arena) -> Self {
        let cap = DEFAULT_OBJECT_CAPACITY;
        Self {
            arena,
            keys: alloc_keys(arena, cap),
            values: arena.alloc_array::<JsonValue<'a>>(cap),
            len: 0,
            cap,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub(crate) fn insert(&mut self, key: &'a [u8], value: JsonValue<'a>) {
        if 100 * self.len / self.cap >= 65 {
            self.grow();
        }

        let mut index = (fnv1_hash(key) % self.cap as u64) as usize;
        loop {
            let slot = unsafe { &mut *self.keys.add(index) };
            match slot {
                None => {
                    *slot = Some(key);
                    unsafe { self.values.add(index).write(value) };
                    self.len += 1;
                    return;
                }
                Some(existing) if *existing == key => {
                    panic!(
                        "duplicate key '{}' inserted into a JSON object",
                        String::from_utf8_lossy(key)
                    );
                }
                Some(_) => {
                    index += 1;
                    if index >= self.cap {
                        index = 0;
                    }
                }
            }
        }
    }

    fn grow(&mut self) {
        let old_keys = self.keys;
        let old_values = self.values;
        let old_cap = self.cap;

        self.cap = (self.cap + 1) * 3;
        self.keys = alloc_keys(self.arena, self.cap);
        self.values = self.arena.alloc_array::<JsonValue<'a>>(self.cap);
        self.len = 0;

        for index in 0..old_cap {
            if let Some(key) = unsafe { *old_keys.add(index) } {
                let value = unsafe { *old_values.add(index) };
                self.insert(key, value);
            }
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<JsonValue<'a>> {
        let start = (fnv1_hash(key) % self.cap as u64) as usize;
        let mut index = start;
        loop {
            match unsafe { *self.keys.add(index) } {
                Some(existing) if existing == key => {
                    return Some(unsafe { *self.values.add(index) });
                }
                None => return None,
                Some(_) => {}
            }
            index += 1;
            if index >= self.cap {
                index = 0;
            }
            if index == start {
                return None;
            }
        }
    }

    pub fn get_str(&self, key: &[u8]) -> Option<&'a [u8]> {
        self.get(key)?.as_str()
    }

    pub fn get_number(&self, key: &[u8]) -> Option<f64> {
        self.get(key)?.as_number()
    }

    pub fn get_bool(&self, key: &[u8]) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    pub fn get_array(&self, key: &[u8]) -> Option<JsonArray<'a>> {
        self.get(key)?.as_array()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a [u8], JsonValue<'a>)> + '_ {
        (0..self.cap).filter_map(move |index| unsafe {
            (*self.keys.add(index)).map(|key| (key, *self.values.add(index)))
        })
    }
}

impl fmt::Debug for JsonObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(key, value)| (String::from_utf8_lossy(key), value)))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Str(&'a [u8]),
    Number(&'a [u8]),
    True,
    False,
    Null,
    Illegal,
    UnclosedString,
}

#[inline]
fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\n' | b'\r' | b'\t')
}

#[inline]
fn is_terminal_or_whitespace(byte: u8) -> bool {
    is_whitespace(byte) || matches!(byte, b'{' | b'}' | b'[' | b']' | b'"')
}

fn classify(value: &[u8]) -> Token<'_> {
    match value {
        b"true" => Token::True,
        b"false" => Token::False,
        b"null" => Token::Null,
        _ => {
            let digits = match value {
                [b'+' | b'-', rest @ ..] => rest,
                _ => value,
            };
            if !digits.is_empty() && digits.iter().all(u8::is_ascii_digit) {
                Token::Number(value)
            } else {
                Token::Illegal
            }
        }
    }
}

fn next_token<'a>(input: &'a [u8], position: &mut usize) -> Option<Token<'a>> {
    let mut current = *position;
    while current < input.len() && is_whitespace(input[current]) {
        current += 1;
    }
    if current >= input.len() {
        return None;
    }

    match input[current] {
        b'[' => {
            *position = current + 1;
            Some(Token::LBracket)
        }
        b']' => {
            *position = current + 1;
            Some(Token::RBracket)
        }
        b'{' => {
            *position = current + 1;
            Some(Token::LBrace)
        }
        b'}' => {
            *position = current + 1;
            Some(Token::RBrace)
        }
        b',' => {
            *position = current + 1;
            Some(Token::Comma)
        }
        b':' => {
            *position = current + 1;
            Some(Token::Colon)
        }
        b'"' => {
            let start = current + 1;
            match memchr(b'"', &input[start..]) {
                Some(length) => {
                    *position = start + length + 1;
                    Some(Token::Str(&input[start..start + length]))
                }
                None => {
                    *position = input.len();
                    Some(Token::UnclosedString)
                }
            }
        }
        _ => {
            let start = current;
            while current < input.len() && !is_terminal_or_whitespace(input[current]) {
                current += 1;
            }
            *position = current;
            Some(classify(&input[start..current]))
        }
    }
}

fn peek_token<'a>(input: &'a [u8], position: usize) -> Option<Token<'a>> {
    let mut saved = position;
    next_token(input, &mut saved)
}

/// Integer-only number parse; the tokenizer guarantees an optional sign
/// followed by digits.
fn parse_number(text: &[u8]) -> f64 {
    let (negative, digits) = match text {
        [b'-', rest @ ..] => (true, rest),
        [b'+', rest @ ..] => (false, rest),
        _ => (false, text),
    };
    let mut value: u64 = 0;
    for &byte in digits {
        value = value.wrapping_mul(10).wrapping_add(u64::from(byte - b'0'));
    }
    if negative { -(value as f64) } else { value as f64 }
}

/// Parse one JSON value out of `input`, allocating arrays and objects in
/// `arena`. On failure partial allocations are left behind; the caller
/// owns the arena and resets it.
pub fn parse<'a>(arena: &'a Arena, input: &'a [u8]) -> Result<JsonValue<'a>, JsonError> {
    let mut position = 0;
    parse_value(arena, input, &mut position)
}

fn parse_value<'a>(
    arena: &'a Arena,
    input: &'a [u8],
    position: &mut usize,
) -> Result<JsonValue<'a>, JsonError> {
    let token = next_token(input, position).ok_or(JsonError::UnexpectedEof)?;
    match token {
        Token::Number(text) => Ok(JsonValue::Number(parse_number(text))),
        Token::Str(text) => Ok(JsonValue::String(text)),
        Token::True => Ok(JsonValue::Bool(true)),
        Token::False => Ok(JsonValue::Bool(false)),
        Token::Null => Ok(JsonValue::Null),
        Token::LBracket => parse_array(arena, input, position),
        Token::LBrace => parse_object(arena, input, position),
        Token::UnclosedString => Err(JsonError::UnclosedString),
        Token::Illegal => Err(JsonError::IllegalToken),
        Token::RBracket | Token::RBrace | Token::Comma | Token::Colon => {
            Err(JsonError::UnexpectedToken)
        }
    }
}

fn parse_array<'a>(
    arena: &'a Arena,
    input: &'a [u8],
    position: &mut usize,
) -> Result<JsonValue<'a>, JsonError> {
    let mut elements: JsonArray<'a> = ArenaVec::new_in(arena);

    if let Some(Token::RBracket) = peek_token(input, *position) {
        next_token(input, position);
        return Ok(JsonValue::Array(elements));
    }

    loop {
        let element = parse_value(arena, input, position)?;
        elements.push(element);

        match next_token(input, position).ok_or(JsonError::UnexpectedEof)? {
            Token::RBracket => break,
            Token::Comma => continue,
            _ => return Err(JsonError::ExpectedSeparator),
        }
    }

    Ok(JsonValue::Array(elements))
}

fn parse_object<'a>(
    arena: &'a Arena,
    input: &'a [u8],
    position: &mut usize,
) -> Result<JsonValue<'a>, JsonError> {
    let mut object = JsonObject::new_in(arena);

    if let Some(Token::RBrace) = peek_token(input, *position) {
        next_token(input, position);
        return Ok(JsonValue::Object(object));
    }

    loop {
        let key = match next_token(input, position).ok_or(JsonError::UnexpectedEof)? {
            Token::Str(key) => key,
            Token::UnclosedString => return Err(JsonError::UnclosedString),
            _ => return Err(JsonError::ExpectedKey),
        };

        if next_token(input, position).ok_or(JsonError::UnexpectedEof)? != Token::Colon {
            return Err(JsonError::ExpectedColon);
        }

        let value = parse_value(arena, input, position)?;
        object.insert(key, value);

        match next_token(input, position).ok_or(JsonError::UnexpectedEof)? {
            Token::RBrace => break,
            Token::Comma => continue,
            _ => return Err(JsonError::ExpectedSeparator),
        }
    }

    Ok(JsonValue::Object(object))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Clean,
    Dirty,
}

/// Streaming JSON writer appending straight into an arena.
///
/// `begin` marks the current arena offset; every `put_*` bumps the cursor
/// bytewise; `end` hands back the written view and re-aligns the arena.
/// Nothing else may allocate from the same arena between `begin` and
/// `end`.
pub struct JsonWriter<'a> {
    arena: &'a Arena,
    start: usize,
    state: WriterState,
}

impl<'a> JsonWriter<'a> {
    pub fn begin(arena: &'a Arena) -> Self {
        Self {
            arena,
            start: arena.offset(),
            state: WriterState::Clean,
        }
    }

    pub fn end(self) -> &'a [u8] {
        let written = self.arena.slice_from(self.start);
        self.arena.align_up();
        written
    }

    pub fn begin_object(&mut self) {
        self.arena.append(b"{");
        self.state = WriterState::Clean;
    }

    pub fn end_object(&mut self) {
        self.arena.append(b"}");
        self.state = WriterState::Dirty;
    }

    pub fn begin_array(&mut self) {
        self.arena.append(b"[");
        self.state = WriterState::Clean;
    }

    pub fn end_array(&mut self) {
        self.arena.append(b"]");
        self.state = WriterState::Dirty;
    }

    /// Emit the key for the next object member, prefixed with a comma when
    /// a member already precedes it.
    pub fn put_key(&mut self, key: &[u8]) {
        if self.state == WriterState::Dirty {
            self.arena.append(b",");
        }
        self.arena.append(b"\"");
        self.arena.append(key);
        self.arena.append(b"\":");
        self.state = WriterState::Clean;
    }

    /// Emit the separator before the next array element when one already
    /// precedes it.
    pub fn prepare_array_element(&mut self) {
        if self.state == WriterState::Dirty {
            self.arena.append(b",");
        }
        self.state = WriterState::Clean;
    }

    /// The string is emitted raw between quotes; no escaping is performed,
    /// so an input containing `"` or control bytes produces invalid JSON.
    pub fn put_string(&mut self, string: &[u8]) {
        self.arena.append(b"\"");
        self.arena.append(string);
        self.arena.append(b"\"");
        self.state = WriterState::Dirty;
    }

    /// Numbers with a zero fractional part are formatted as integers.
    pub fn put_number(&mut self, number: f64) {
        // Longest decimal expansion of an f64 is well under this bound.
        let mut text = ArrayString::<344>::new();
        if number.fract() == 0.0 {
            let _ = write!(text, "{}", number as i64);
        } else {
            let _ = write!(text, "{number}");
        }
        self.arena.append(text.as_bytes());
        self.state = WriterState::Dirty;
    }

    pub fn put_true(&mut self) {
        self.put_special(b"true");
    }

    pub fn put_false(&mut self) {
        self.put_special(b"false");
    }

    pub fn put_null(&mut self) {
        self.put_special(b"null");
    }

    pub fn put_bool(&mut self, value: bool) {
        if value {
            self.put_true();
        } else {
            self.put_false();
        }
    }

    fn put_special(&mut self, text: &[u8]) {
        self.arena.append(text);
        self.state = WriterState::Dirty;
    }
}
