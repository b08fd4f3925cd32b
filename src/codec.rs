// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Reversible payload encoding.
//!
//! Payloads are stored as tagged byte strings:
//!
//! ```text
//! 'J' <json>                                  plain (uncompressed) payload
//! 'Z' <u32 LE header len> <header json> <body> substituted payload
//! ```
//!
//! The compressed body is the compact JSON text of the (possibly rewritten)
//! payload with every substitution pattern replaced by a single control
//! character (U+0001 + pattern index). `serde_json` always escapes control
//! characters inside strings, so those bytes never occur in its output and the
//! substitution is exactly reversible: decoding undoes the patterns in reverse
//! order.
//!
//! Levels stack:
//! - [`CompressionLevel::Fast`]: pattern substitution only
//! - [`CompressionLevel::Balanced`]: + object keys longer than 3 bytes are
//!   replaced by `~<base62 index>` into a key table carried in the header, and
//!   string values longer than 10 characters that occur at least 3 times are
//!   replaced the same way by references into a value table
//! - [`CompressionLevel::Maximum`]: + nested objects flattened into dotted
//!   paths, only when the payload can be rebuilt exactly
//!
//! Payloads below `min_compression_bytes`, or whose compressed form saves less
//! than `compression_threshold`, are stored plain unless the caller forces
//! compression. A failure inside the compressed path falls back to plain.
//!
//! ```
//! use l10n_cache::codec::PayloadCodec;
//! use l10n_cache::CacheConfig;
//! use serde_json::json;
//!
//! let mut codec = PayloadCodec::new(&CacheConfig::default());
//! let payload = json!({"menu.title": "Play", "menu.quit": "Quit"});
//!
//! let encoded = codec.encode(&payload, true).unwrap();
//! assert!(encoded.compressed);
//! assert_eq!(codec.decode(&encoded.bytes).unwrap(), payload);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::metrics;

const TAG_PLAIN: u8 = b'J';
const TAG_COMPRESSED: u8 = b'Z';

/// Control characters U+0001..=U+001F are available as tokens.
pub const MAX_PATTERNS: usize = 31;

/// Built-in substitutions, longest first so a shorter pattern never splits a
/// longer one.
pub const BUILTIN_PATTERNS: &[&str] = &[
    "accessibility.",
    "achievements.",
    "accessibility",
    "information",
    "settings.",
    "message",
    "setting",
    "common.",
    "button",
    "error.",
    "menu.",
    "game.",
    "help.",
    "error",
    "\":{\"",
    "\"},\"",
    "\":\"",
    "\",\"",
    "{\"",
    "\"}",
];

/// Minimum key length (bytes) that gets shortened
const SHORTEN_MIN_KEY_LEN: usize = 4;
/// Repeated string values must be longer than this many characters
const DUPLICATE_MIN_CHARS: usize = 10;
/// and occur at least this many times to be moved into the value table
const DUPLICATE_MIN_COUNT: usize = 3;
const KEY_MARKER: char = '~';
const BASE62: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// How hard the codec works on a payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Fast,
    #[default]
    Balanced,
    Maximum,
}

/// Codec error types
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Failed to serialize or parse JSON
    #[error("JSON failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored bytes are empty
    #[error("empty payload")]
    Empty,

    /// Unknown leading tag byte
    #[error("unknown payload tag 0x{0:02x}")]
    UnknownTag(u8),

    /// Compressed envelope is truncated or malformed
    #[error("corrupt envelope: {0}")]
    Corrupt(String),

    /// Payload was written with a different substitution table
    #[error("pattern table mismatch: payload uses {found}, codec has {expected}")]
    PatternMismatch { expected: usize, found: usize },

    /// Rejected substitution pattern
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Check custom substitution patterns before they reach a codec.
pub fn validate_patterns(custom: &[String]) -> CacheResult<()> {
    if BUILTIN_PATTERNS.len() + custom.len() > MAX_PATTERNS {
        return Err(CacheError::InvalidConfig(format!(
            "at most {} custom patterns are allowed",
            MAX_PATTERNS - BUILTIN_PATTERNS.len()
        )));
    }
    for pattern in custom {
        if pattern.is_empty() {
            return Err(CacheError::InvalidConfig(
                CodecError::InvalidPattern("empty pattern".into()).to_string(),
            ));
        }
        if pattern.chars().any(|c| c < '\u{20}') {
            return Err(CacheError::InvalidConfig(
                CodecError::InvalidPattern(format!("{pattern:?} contains a control character"))
                    .to_string(),
            ));
        }
    }
    Ok(())
}

/// Result of encoding one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedPayload {
    pub bytes: Vec<u8>,
    /// Size of the plain JSON text
    pub original_size: usize,
    pub compressed: bool,
}

impl EncodedPayload {
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        self.bytes.len()
    }
}

/// Compression statistics for a single operation.
#[derive(Debug, Clone, Copy)]
pub struct CompressionStats {
    /// Original size in bytes
    pub original_bytes: usize,
    /// Compressed size in bytes
    pub compressed_bytes: usize,
    /// Compression ratio (original / compressed)
    pub ratio: f64,
    /// Space saved as fraction (negative when the output grew)
    pub savings: f64,
}

impl CompressionStats {
    /// Calculate stats from original and compressed sizes.
    #[must_use]
    pub fn new(original_bytes: usize, compressed_bytes: usize) -> Self {
        let ratio = if compressed_bytes > 0 {
            original_bytes as f64 / compressed_bytes as f64
        } else {
            0.0
        };
        let savings = if original_bytes > 0 {
            1.0 - (compressed_bytes as f64 / original_bytes as f64)
        } else {
            0.0
        };
        Self {
            original_bytes,
            compressed_bytes,
            ratio,
            savings,
        }
    }
}

/// Running totals across the codec's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CodecStats {
    pub compressions: u64,
    pub decompressions: u64,
    /// Payloads stored plain (too small, not worth it, disabled, or fallback)
    pub skipped: u64,
    /// Plain JSON bytes of every compressed payload
    pub bytes_before: u64,
    /// Stored bytes of every compressed payload
    pub bytes_after: u64,
}

impl CodecStats {
    /// Overall savings across compressed payloads (0.0 when none)
    #[must_use]
    pub fn savings(&self) -> f64 {
        CompressionStats::new(self.bytes_before as usize, self.bytes_after as usize).savings
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EnvelopeHeader {
    /// Number of patterns in the table used for the body
    #[serde(rename = "p")]
    patterns: usize,
    /// Keys were shortened (escaping applies even with an empty table)
    #[serde(rename = "s")]
    shortened: bool,
    #[serde(rename = "k", default, skip_serializing_if = "Vec::is_empty")]
    keys: Vec<String>,
    /// String values were deduplicated (escaping applies even with an empty table)
    #[serde(rename = "d", default)]
    deduplicated: bool,
    #[serde(rename = "v", default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<String>,
    #[serde(rename = "f")]
    flattened: bool,
}

/// Reversible payload transform with gating and statistics.
#[derive(Debug, Clone)]
pub struct PayloadCodec {
    enabled: bool,
    level: CompressionLevel,
    min_bytes: usize,
    threshold: f64,
    patterns: Vec<String>,
    stats: CodecStats,
}

impl PayloadCodec {
    /// Build a codec from validated configuration.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let mut patterns: Vec<String> = BUILTIN_PATTERNS.iter().map(|p| (*p).to_string()).collect();
        patterns.extend(config.custom_patterns.iter().cloned());
        patterns.truncate(MAX_PATTERNS);
        Self {
            enabled: config.compression_enabled,
            level: config.compression_level,
            min_bytes: config.min_compression_bytes,
            threshold: config.compression_threshold,
            patterns,
            stats: CodecStats::default(),
        }
    }

    /// Pick up gating and level changes from a new configuration.
    ///
    /// The pattern table is fixed for the codec's lifetime: stored payloads
    /// only record its length.
    pub fn reconfigure(&mut self, config: &CacheConfig) {
        self.enabled = config.compression_enabled;
        self.level = config.compression_level;
        self.min_bytes = config.min_compression_bytes;
        self.threshold = config.compression_threshold;
    }

    #[must_use]
    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    #[must_use]
    pub fn stats(&self) -> CodecStats {
        self.stats
    }

    /// Encode a payload for storage.
    ///
    /// Only a failure to produce the plain form is an error; problems in the
    /// compressed path fall back to plain.
    pub fn encode(&mut self, value: &Value, force: bool) -> Result<EncodedPayload, CodecError> {
        let json = serde_json::to_vec(value)?;
        let original_size = json.len();

        let wanted = force || (self.enabled && original_size >= self.min_bytes);
        if wanted {
            match self.compress(value) {
                Ok(bytes) => {
                    let stats = CompressionStats::new(original_size, bytes.len());
                    if force || stats.savings >= self.threshold {
                        self.stats.compressions += 1;
                        self.stats.bytes_before += original_size as u64;
                        self.stats.bytes_after += bytes.len() as u64;
                        metrics::record_codec("compress", original_size, bytes.len());
                        return Ok(EncodedPayload {
                            bytes,
                            original_size,
                            compressed: true,
                        });
                    }
                    debug!(
                        original_size,
                        compressed_size = stats.compressed_bytes,
                        savings = stats.savings,
                        "Compression below threshold, storing plain"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Compression failed, storing plain");
                }
            }
        }

        self.stats.skipped += 1;
        metrics::record_codec("skip", original_size, original_size + 1);
        let mut bytes = Vec::with_capacity(original_size + 1);
        bytes.push(TAG_PLAIN);
        bytes.extend_from_slice(&json);
        Ok(EncodedPayload {
            bytes,
            original_size,
            compressed: false,
        })
    }

    /// Decode stored bytes back into the payload.
    pub fn decode(&mut self, data: &[u8]) -> Result<Value, CodecError> {
        let (&tag, rest) = data.split_first().ok_or(CodecError::Empty)?;
        match tag {
            TAG_PLAIN => Ok(serde_json::from_slice(rest)?),
            TAG_COMPRESSED => {
                let value = self.decompress(rest)?;
                self.stats.decompressions += 1;
                metrics::record_codec("decompress", 0, 0);
                Ok(value)
            }
            other => Err(CodecError::UnknownTag(other)),
        }
    }

    fn compress(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut working = value.clone();
        let mut header = EnvelopeHeader {
            patterns: self.patterns.len(),
            shortened: false,
            keys: Vec::new(),
            deduplicated: false,
            values: Vec::new(),
            flattened: false,
        };

        if self.level != CompressionLevel::Fast {
            let values = ValueTable::collect(&working);
            working = values.replace(working);
            header.deduplicated = true;
            header.values = values.values;

            let mut table = KeyTable::default();
            working = table.shorten(working);
            header.shortened = true;
            header.keys = table.keys;
        }
        if self.level == CompressionLevel::Maximum && can_flatten(&working) {
            if let Value::Object(map) = working {
                let mut flat = Map::new();
                flatten_into(&mut flat, None, map);
                working = Value::Object(flat);
                header.flattened = true;
            }
        }

        let mut body = serde_json::to_string(&working)?;
        for (index, pattern) in self.patterns.iter().enumerate() {
            if body.contains(pattern.as_str()) {
                body = body.replace(pattern.as_str(), token(index).encode_utf8(&mut [0; 4]));
            }
        }

        let header_json = serde_json::to_vec(&header)?;
        let header_len = u32::try_from(header_json.len())
            .map_err(|_| CodecError::Corrupt("header too large".into()))?;

        let mut out = Vec::with_capacity(1 + 4 + header_json.len() + body.len());
        out.push(TAG_COMPRESSED);
        out.extend_from_slice(&header_len.to_le_bytes());
        out.extend_from_slice(&header_json);
        out.extend_from_slice(body.as_bytes());
        Ok(out)
    }

    fn decompress(&self, data: &[u8]) -> Result<Value, CodecError> {
        if data.len() < 4 {
            return Err(CodecError::Corrupt("missing header length".into()));
        }
        let (len_bytes, rest) = data.split_at(4);
        let mut len_buf = [0u8; 4];
        len_buf.copy_from_slice(len_bytes);
        let header_len = u32::from_le_bytes(len_buf) as usize;
        if rest.len() < header_len {
            return Err(CodecError::Corrupt("truncated header".into()));
        }
        let (header_bytes, body_bytes) = rest.split_at(header_len);
        let header: EnvelopeHeader = serde_json::from_slice(header_bytes)?;
        if header.patterns != self.patterns.len() {
            return Err(CodecError::PatternMismatch {
                expected: self.patterns.len(),
                found: header.patterns,
            });
        }

        let mut body = std::str::from_utf8(body_bytes)
            .map_err(|e| CodecError::Corrupt(e.to_string()))?
            .to_string();
        for (index, pattern) in self.patterns.iter().enumerate().rev() {
            let tok = token(index);
            if body.contains(tok) {
                body = body.replace(tok, pattern);
            }
        }

        let mut value: Value = serde_json::from_str(&body)?;
        if header.flattened {
            value = unflatten(value)?;
        }
        if header.shortened {
            value = restore_keys(value, &header.keys)?;
        }
        if header.deduplicated {
            value = restore_values(value, &header.values)?;
        }
        Ok(value)
    }
}

fn token(index: usize) -> char {
    // index < MAX_PATTERNS, so this is always U+0001..=U+001F
    char::from(index as u8 + 1)
}

fn base62(mut n: usize) -> String {
    let mut digits = Vec::new();
    loop {
        digits.push(BASE62[n % 62]);
        n /= 62;
        if n == 0 {
            break;
        }
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

fn parse_base62(s: &str) -> Option<usize> {
    if s.is_empty() {
        return None;
    }
    s.bytes().try_fold(0usize, |acc, b| {
        let digit = BASE62.iter().position(|&d| d == b)?;
        acc.checked_mul(62)?.checked_add(digit)
    })
}

#[derive(Default)]
struct KeyTable {
    keys: Vec<String>,
    index: HashMap<String, usize>,
}

impl KeyTable {
    fn short_key(&mut self, key: String) -> String {
        if key.len() >= SHORTEN_MIN_KEY_LEN {
            let next = self.keys.len();
            let idx = *self.index.entry(key.clone()).or_insert_with(|| next);
            if idx == next {
                self.keys.push(key);
            }
            format!("{KEY_MARKER}{}", base62(idx))
        } else if key.starts_with(KEY_MARKER) {
            format!("{KEY_MARKER}{key}")
        } else {
            key
        }
    }

    fn shorten(&mut self, value: Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (self.short_key(k), self.shorten(v)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.into_iter().map(|v| self.shorten(v)).collect()),
            other => other,
        }
    }
}

/// Long string values that repeat often enough to be stored once.
struct ValueTable {
    values: Vec<String>,
    index: HashMap<String, usize>,
}

impl ValueTable {
    fn collect(value: &Value) -> Self {
        fn count<'a>(value: &'a Value, counts: &mut HashMap<&'a str, usize>) {
            match value {
                Value::String(s) => *counts.entry(s.as_str()).or_default() += 1,
                Value::Array(items) => items.iter().for_each(|v| count(v, counts)),
                Value::Object(map) => map.values().for_each(|v| count(v, counts)),
                _ => {}
            }
        }

        let mut counts = HashMap::new();
        count(value, &mut counts);
        let mut values: Vec<String> = counts
            .into_iter()
            .filter(|(s, n)| *n >= DUPLICATE_MIN_COUNT && s.chars().count() > DUPLICATE_MIN_CHARS)
            .map(|(s, _)| s.to_string())
            .collect();
        values.sort_unstable();
        let index = values.iter().enumerate().map(|(i, s)| (s.clone(), i)).collect();
        Self { values, index }
    }

    fn reference(&self, s: String) -> String {
        if let Some(idx) = self.index.get(&s) {
            format!("{KEY_MARKER}{}", base62(*idx))
        } else if s.starts_with(KEY_MARKER) {
            format!("{KEY_MARKER}{s}")
        } else {
            s
        }
    }

    fn replace(&self, value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.reference(s)),
            Value::Array(items) => Value::Array(items.into_iter().map(|v| self.replace(v)).collect()),
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, self.replace(v)))
                    .collect(),
            ),
            other => other,
        }
    }
}

fn restore_keys(value: Value, keys: &[String]) -> Result<Value, CodecError> {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(resolve(&k, keys)?, restore_keys(v, keys)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => Ok(Value::Array(
            items
                .into_iter()
                .map(|v| restore_keys(v, keys))
                .collect::<Result<_, _>>()?,
        )),
        other => Ok(other),
    }
}

fn restore_values(value: Value, values: &[String]) -> Result<Value, CodecError> {
    match value {
        Value::String(s) => Ok(Value::String(resolve(&s, values)?)),
        Value::Array(items) => Ok(Value::Array(
            items
                .into_iter()
                .map(|v| restore_values(v, values))
                .collect::<Result<_, _>>()?,
        )),
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k, restore_values(v, values)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other),
    }
}

/// Undo one `~`-escaped string: `~~x` is the literal `~x`, `~<base62>` a
/// table reference, anything else is left alone.
fn resolve(s: &str, table: &[String]) -> Result<String, CodecError> {
    let Some(rest) = s.strip_prefix(KEY_MARKER) else {
        return Ok(s.to_string());
    };
    if rest.starts_with(KEY_MARKER) {
        return Ok(rest.to_string());
    }
    parse_base62(rest)
        .and_then(|idx| table.get(idx))
        .cloned()
        .ok_or_else(|| CodecError::Corrupt(format!("unknown table reference {s:?}")))
}

/// Flattening is only applied when unflattening rebuilds the exact payload:
/// the root is an object, no key contains '.', and no nested object is empty.
fn can_flatten(value: &Value) -> bool {
    fn nested_ok(map: &Map<String, Value>) -> bool {
        map.iter().all(|(k, v)| {
            !k.contains('.')
                && match v {
                    Value::Object(inner) => !inner.is_empty() && nested_ok(inner),
                    _ => true,
                }
        })
    }
    match value {
        Value::Object(map) => nested_ok(map),
        _ => false,
    }
}

fn flatten_into(out: &mut Map<String, Value>, prefix: Option<&str>, map: Map<String, Value>) {
    for (k, v) in map {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{k}"),
            None => k,
        };
        match v {
            Value::Object(inner) => flatten_into(out, Some(&path), inner),
            leaf => {
                out.insert(path, leaf);
            }
        }
    }
}

fn unflatten(value: Value) -> Result<Value, CodecError> {
    let Value::Object(flat) = value else {
        return Err(CodecError::Corrupt("flattened payload is not an object".into()));
    };
    let mut root = Map::new();
    for (path, leaf) in flat {
        let mut segments: Vec<&str> = path.split('.').collect();
        let last = segments.pop().unwrap_or_default().to_string();
        let mut node = &mut root;
        for segment in segments {
            let entry = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            node = match entry {
                Value::Object(inner) => inner,
                _ => return Err(CodecError::Corrupt(format!("path conflict at {path:?}"))),
            };
        }
        node.insert(last, leaf);
    }
    Ok(Value::Object(root))
}

impl CodecError {
    pub(crate) fn into_encode(self, key: &str) -> CacheError {
        CacheError::EncodeFailure {
            key: key.to_string(),
            reason: self.to_string(),
        }
    }

    pub(crate) fn into_decode(self, key: &str) -> CacheError {
        CacheError::DecodeFailure {
            key: key.to_string(),
            reason: self.to_string(),
        }
    }
}
