//! # Constant Resolution
//!
//! Converts the literal of a constant node into a typed [`Value`]. Built-in
//! producer kinds cover primitives, primitive arrays, and common value types;
//! any other kind is treated as a registered type name whose single-string
//! factory is invoked with the literal.
//!
//! | kind | value |
//! |---|---|
//! | `int`, `long`, `short`, `byte` (and boxed names) | `i32`, `i64`, `i16`, `i8` |
//! | `float`, `double` | `f32`, `f64` |
//! | `boolean`, `char`, `String` | `bool`, `char`, `String` |
//! | `int[]`, `boolean[]`, ... | `Vec<_>` of comma-separated items |
//! | `URL`, `URI` | [`url::Url`] |
//! | `Charset`, `Locale` | [`Charset`], [`Locale`] |
//! | `InetAddress` | [`std::net::IpAddr`] |
//! | `BigInteger`, `BigDecimal` | [`num_bigint::BigInt`], [`bigdecimal::BigDecimal`] |

use std::{fmt, net::IpAddr, str::FromStr};

use bigdecimal::BigDecimal;
use blockwire_types::NodeId;
use num_bigint::BigInt;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::{
    capability::CapabilityRegistry,
    error::EngineError,
    value::{Arg, Args, Value},
};

/// Resolves the literal of constant node `node`.
pub fn resolve_constant(node: NodeId, producer_kind: &str, literal: &str, registry: &CapabilityRegistry) -> Result<Value, EngineError> {
    let parse_error = |reason: String| EngineError::Parse {
        node,
        kind: producer_kind.to_string(),
        literal: literal.to_string(),
        reason,
    };

    if let Some(parsed) = parse_builtin(producer_kind, literal) {
        return parsed.map_err(parse_error);
    }

    let factory = registry.literal_factory(node, producer_kind)?;

    debug!(node = %node, producer_kind, factory = factory.name(), "constant falls back to literal factory");
    factory
        .invoke(&Args::new(vec![Arg::Single(Value::new(literal.to_string()))]))
        .map_err(|error| parse_error(format!("{error:#}")))
}

/// `None` when `kind` is not a built-in kind.
fn parse_builtin(kind: &str, literal: &str) -> Option<Result<Value, String>> {
    let value = match kind {
        "int" | "Integer" => parse_number::<i32>(literal).map(Value::new),
        "long" | "Long" => parse_number::<i64>(literal).map(Value::new),
        "short" | "Short" => parse_number::<i16>(literal).map(Value::new),
        "byte" | "Byte" => parse_number::<i8>(literal).map(Value::new),
        "float" | "Float" => parse_number::<f32>(literal).map(Value::new),
        "double" | "Double" => parse_number::<f64>(literal).map(Value::new),
        "boolean" | "Boolean" => parse_bool(literal).map(Value::new),
        "char" | "Character" => parse_char(literal).map(Value::new),
        "String" => Ok(Value::new(literal.to_string())),
        "URL" | "URI" => Url::parse(literal.trim()).map(Value::new).map_err(|error| error.to_string()),
        "Charset" => literal.parse::<Charset>().map(Value::new),
        "Locale" => literal.parse::<Locale>().map(Value::new),
        "InetAddress" => literal
            .trim()
            .parse::<IpAddr>()
            .map(Value::new)
            .map_err(|error| error.to_string()),
        "BigInteger" => parse_number::<BigInt>(literal).map(Value::new),
        "BigDecimal" => parse_number::<BigDecimal>(literal).map(Value::new),
        _ => return kind.strip_suffix("[]").and_then(|element| parse_array(element, literal)),
    };
    Some(value)
}

fn parse_array(element: &str, literal: &str) -> Option<Result<Value, String>> {
    let value = match element {
        "int" => parse_items(literal, parse_number::<i32>).map(Value::new),
        "long" => parse_items(literal, parse_number::<i64>).map(Value::new),
        "short" => parse_items(literal, parse_number::<i16>).map(Value::new),
        "byte" => parse_items(literal, parse_number::<i8>).map(Value::new),
        "float" => parse_items(literal, parse_number::<f32>).map(Value::new),
        "double" => parse_items(literal, parse_number::<f64>).map(Value::new),
        "boolean" => parse_items(literal, parse_bool).map(Value::new),
        "char" => parse_items(literal, parse_char).map(Value::new),
        "String" => parse_items(literal, |item| Ok(item.to_string())).map(Value::new),
        _ => return None,
    };
    Some(value)
}

fn parse_items<T>(literal: &str, parse: impl Fn(&str) -> Result<T, String>) -> Result<Vec<T>, String> {
    if literal.trim().is_empty() {
        return Ok(Vec::new());
    }
    literal
        .split(',')
        .enumerate()
        .map(|(position, item)| parse(item.trim()).map_err(|reason| format!("item {position}: {reason}")))
        .collect()
}

fn parse_number<T>(literal: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    literal.trim().parse::<T>().map_err(|error| error.to_string())
}

fn parse_bool(literal: &str) -> Result<bool, String> {
    match literal.trim() {
        text if text.eq_ignore_ascii_case("true") => Ok(true),
        text if text.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err("expected 'true' or 'false'".to_string()),
    }
}

fn parse_char(literal: &str) -> Result<char, String> {
    let mut chars = literal.chars();
    match (chars.next(), chars.next()) {
        (Some(character), None) => Ok(character),
        (None, _) => Err("expected one character, found none".to_string()),
        _ => Err(format!("expected one character, found {}", literal.chars().count())),
    }
}

/// A character set recognized by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    UsAscii,
    Iso8859_1,
    Utf8,
    Utf16,
    Utf16Be,
    Utf16Le,
}

impl Charset {
    /// Canonical name of the character set.
    pub fn name(self) -> &'static str {
        match self {
            Charset::UsAscii => "US-ASCII",
            Charset::Iso8859_1 => "ISO-8859-1",
            Charset::Utf8 => "UTF-8",
            Charset::Utf16 => "UTF-16",
            Charset::Utf16Be => "UTF-16BE",
            Charset::Utf16Le => "UTF-16LE",
        }
    }
}

impl FromStr for Charset {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let normalized = text.trim().to_ascii_uppercase().replace('_', "-");
        let charset = match normalized.as_str() {
            "US-ASCII" | "ASCII" | "US" => Charset::UsAscii,
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" | "LATIN-1" => Charset::Iso8859_1,
            "UTF-8" | "UTF8" => Charset::Utf8,
            "UTF-16" | "UTF16" => Charset::Utf16,
            "UTF-16BE" | "UTF16BE" => Charset::Utf16Be,
            "UTF-16LE" | "UTF16LE" => Charset::Utf16Le,
            _ => return Err(format!("unsupported charset '{}'", text.trim())),
        };
        Ok(charset)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static LOCALE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]{2,8})(?:[_-]([A-Za-z]{2}|[0-9]{3}))?(?:[_-]([0-9A-Za-z][0-9A-Za-z_-]*))?$")
        .expect("locale pattern compiles")
});

/// A `language[_COUNTRY[_variant]]` locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale {
    pub language: String,
    pub country: Option<String>,
    pub variant: Option<String>,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let captures = LOCALE_PATTERN
            .captures(text.trim())
            .ok_or_else(|| format!("'{}' is not a language[_COUNTRY[_variant]] locale", text.trim()))?;
        Ok(Locale {
            language: captures[1].to_ascii_lowercase(),
            country: captures.get(2).map(|country| country.as_str().to_ascii_uppercase()),
            variant: captures.get(3).map(|variant| variant.as_str().to_string()),
        })
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.language)?;
        if let Some(country) = &self.country {
            write!(f, "_{country}")?;
        }
        if let Some(variant) = &self.variant {
            write!(f, "_{variant}")?;
        }
        Ok(())
    }
}
