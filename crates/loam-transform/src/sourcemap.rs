//! Source map model and deterministic chaining.
//!
//! When a transform runs over already-mapped input, the engine's output
//! map (generated → intermediate) composes with the supplied input map
//! (intermediate → original) into one map from generated positions back to
//! the true originals. Composition is a pure function of the two maps.

use serde::{Deserialize, Serialize};

/// A v3 source map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceMap {
    pub version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl Default for SourceMap {
    fn default() -> Self {
        Self {
            version: 3,
            file: None,
            sources: Vec::new(),
            sources_content: None,
            names: Vec::new(),
            mappings: String::new(),
        }
    }
}

/// One decoded mapping segment: a generated column, optionally mapped to a
/// source position.
#[derive(Debug, Clone, Copy)]
struct Segment {
    column: i64,
    source: Option<SourceRef>,
}

#[derive(Debug, Clone, Copy)]
struct SourceRef {
    source: i64,
    line: i64,
    column: i64,
    name: Option<i64>,
}

/// Compose `outer` (generated → intermediate) with `inner` (intermediate →
/// original).
///
/// Outer segments without a counterpart in the inner map are dropped; the
/// result's sources and embedded contents come from the inner map, and
/// only the names the composition still references are carried over.
pub fn chain_maps(outer: &SourceMap, inner: &SourceMap) -> SourceMap {
    let outer_lines = decode_mappings(&outer.mappings);
    let inner_lines = decode_mappings(&inner.mappings);

    let mut names: Vec<String> = Vec::new();
    let mut intern = |name: &str| -> i64 {
        match names.iter().position(|n| n == name) {
            Some(index) => index as i64,
            None => {
                names.push(name.to_string());
                (names.len() - 1) as i64
            }
        }
    };

    let mut result_lines = Vec::with_capacity(outer_lines.len());
    for line in &outer_lines {
        let mut out_line = Vec::new();
        for segment in line {
            let Some(src) = segment.source else {
                continue;
            };
            let Some(original) = lookup(&inner_lines, src.line, src.column) else {
                continue;
            };
            let name = src
                .name
                .and_then(|index| outer.names.get(index as usize))
                .map(|name| intern(name));
            out_line.push(Segment {
                column: segment.column,
                source: Some(SourceRef {
                    source: original.source,
                    line: original.line,
                    column: original.column,
                    name,
                }),
            });
        }
        result_lines.push(out_line);
    }

    SourceMap {
        version: 3,
        file: outer.file.clone(),
        sources: inner.sources.clone(),
        sources_content: inner.sources_content.clone(),
        names,
        mappings: encode_mappings(&result_lines),
    }
}

/// The inner-map segment covering `line:column`: the greatest segment on
/// that line starting at or before the column, if it maps a source.
fn lookup(lines: &[Vec<Segment>], line: i64, column: i64) -> Option<SourceRef> {
    let segments = lines.get(usize::try_from(line).ok()?)?;
    let end = segments.partition_point(|s| s.column <= column);
    segments[..end].iter().rev().find_map(|s| s.source)
}

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn base64_value(byte: u8) -> Option<i64> {
    BASE64.iter().position(|&b| b == byte).map(|v| v as i64)
}

/// Decode one VLQ value from the byte stream. `None` at end of input or on
/// a malformed tail.
fn decode_vlq(bytes: &mut std::slice::Iter<'_, u8>) -> Option<i64> {
    let mut result: i64 = 0;
    let mut shift = 0u32;

    loop {
        let digit = base64_value(*bytes.next()?)?;
        result |= (digit & 0b1_1111) << shift;
        if digit & 0b10_0000 == 0 {
            break;
        }
        shift += 5;
    }

    let negative = result & 1 == 1;
    let value = result >> 1;
    Some(if negative { -value } else { value })
}

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };

    loop {
        let mut digit = vlq & 0b1_1111;
        vlq >>= 5;
        if vlq != 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64[digit as usize] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Decode a `mappings` string into per-line segments. Malformed segments
/// are skipped; decoding is lenient the way downstream consumers are.
fn decode_mappings(mappings: &str) -> Vec<Vec<Segment>> {
    let mut lines = Vec::new();

    let mut source: i64 = 0;
    let mut source_line: i64 = 0;
    let mut source_column: i64 = 0;
    let mut name: i64 = 0;

    for group in mappings.split(';') {
        let mut line = Vec::new();
        let mut column: i64 = 0;

        for raw in group.split(',') {
            if raw.is_empty() {
                continue;
            }
            let bytes = raw.as_bytes();
            let mut iter = bytes.iter();
            let mut fields = Vec::with_capacity(5);
            while let Some(value) = decode_vlq(&mut iter) {
                fields.push(value);
            }

            match fields.len() {
                1 => {
                    column += fields[0];
                    line.push(Segment {
                        column,
                        source: None,
                    });
                }
                4 | 5 => {
                    column += fields[0];
                    source += fields[1];
                    source_line += fields[2];
                    source_column += fields[3];
                    let name_ref = if fields.len() == 5 {
                        name += fields[4];
                        Some(name)
                    } else {
                        None
                    };
                    line.push(Segment {
                        column,
                        source: Some(SourceRef {
                            source,
                            line: source_line,
                            column: source_column,
                            name: name_ref,
                        }),
                    });
                }
                _ => {}
            }
        }

        lines.push(line);
    }

    lines
}

fn encode_mappings(lines: &[Vec<Segment>]) -> String {
    let mut out = String::new();

    let mut source: i64 = 0;
    let mut source_line: i64 = 0;
    let mut source_column: i64 = 0;
    let mut name: i64 = 0;

    for (index, line) in lines.iter().enumerate() {
        if index > 0 {
            out.push(';');
        }
        let mut column: i64 = 0;
        let mut first = true;

        for segment in line {
            if !first {
                out.push(',');
            }
            first = false;

            encode_vlq(&mut out, segment.column - column);
            column = segment.column;

            if let Some(src) = segment.source {
                encode_vlq(&mut out, src.source - source);
                source = src.source;
                encode_vlq(&mut out, src.line - source_line);
                source_line = src.line;
                encode_vlq(&mut out, src.column - source_column);
                source_column = src.column;
                if let Some(name_ref) = src.name {
                    encode_vlq(&mut out, name_ref - name);
                    name = name_ref;
                }
            }
        }
    }

    out
}
