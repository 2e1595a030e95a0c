//! Caster table: raw request strings to typed scalars.
//!
//! Casting is best-effort. A value that does not parse becomes the zero value
//! of the target kind and nothing is reported; handlers see `0`, `false`, an
//! empty string or [`Timestamp::Zero`].

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Date-only layout, selected for 10-character input.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Date-time layout, selected for 19-character input.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Primitive type descriptor a caster is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    String,
    Timestamp,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 15] = [
        ScalarKind::Bool,
        ScalarKind::I8,
        ScalarKind::I16,
        ScalarKind::I32,
        ScalarKind::I64,
        ScalarKind::Isize,
        ScalarKind::U8,
        ScalarKind::U16,
        ScalarKind::U32,
        ScalarKind::U64,
        ScalarKind::Usize,
        ScalarKind::F32,
        ScalarKind::F64,
        ScalarKind::String,
        ScalarKind::Timestamp,
    ];

    /// Zero value of this kind.
    #[must_use]
    pub fn zero(self) -> Scalar {
        match self {
            ScalarKind::Bool => Scalar::Bool(false),
            ScalarKind::I8
            | ScalarKind::I16
            | ScalarKind::I32
            | ScalarKind::I64
            | ScalarKind::Isize => Scalar::Int(0),
            ScalarKind::U8
            | ScalarKind::U16
            | ScalarKind::U32
            | ScalarKind::U64
            | ScalarKind::Usize => Scalar::Uint(0),
            ScalarKind::F32 | ScalarKind::F64 => Scalar::Float(0.0),
            ScalarKind::String => Scalar::Str(String::new()),
            ScalarKind::Timestamp => Scalar::Time(Timestamp::Zero),
        }
    }
}

/// Calendar value with two precisions and an explicit zero.
///
/// Values are naive: no time zone is attached or assumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Timestamp {
    #[default]
    Zero,
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Timestamp {
    /// Parse by input length: 10 characters is a date, 19 a date-time,
    /// anything else (or a parse failure) is [`Timestamp::Zero`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.len() {
            10 => NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map(Timestamp::Date)
                .unwrap_or_default(),
            19 => NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT)
                .map(Timestamp::DateTime)
                .unwrap_or_default(),
            _ => Timestamp::Zero,
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        matches!(self, Timestamp::Zero)
    }

    /// Midnight for date-only values.
    #[must_use]
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Timestamp::Zero => None,
            Timestamp::Date(date) => date.and_hms_opt(0, 0, 0),
            Timestamp::DateTime(dt) => Some(*dt),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Zero => Ok(()),
            Timestamp::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            Timestamp::DateTime(dt) => write!(f, "{}", dt.format(DATE_TIME_FORMAT)),
        }
    }
}

/// Output of a caster. Integers are widened; the field setter narrows them again.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    Time(Timestamp),
}

/// Conversion from one raw string to a scalar. Must not fail.
pub type Caster = fn(&str) -> Scalar;

/// Caster per [`ScalarKind`].
///
/// Built once and handed to the schema builder at registration time; handlers
/// registered afterwards see overrides made through [`CasterTable::set`].
#[derive(Clone)]
pub struct CasterTable {
    casters: HashMap<ScalarKind, Caster>,
}

impl CasterTable {
    /// Table with the built-in casters for every kind.
    #[must_use]
    pub fn builtin() -> Self {
        let mut casters: HashMap<ScalarKind, Caster> = HashMap::with_capacity(ScalarKind::ALL.len());
        casters.insert(ScalarKind::Bool, cast_bool);
        casters.insert(ScalarKind::I8, cast_i8);
        casters.insert(ScalarKind::I16, cast_i16);
        casters.insert(ScalarKind::I32, cast_i32);
        casters.insert(ScalarKind::I64, cast_i64);
        casters.insert(ScalarKind::Isize, cast_isize);
        casters.insert(ScalarKind::U8, cast_u8);
        casters.insert(ScalarKind::U16, cast_u16);
        casters.insert(ScalarKind::U32, cast_u32);
        casters.insert(ScalarKind::U64, cast_u64);
        casters.insert(ScalarKind::Usize, cast_usize);
        casters.insert(ScalarKind::F32, cast_f32);
        casters.insert(ScalarKind::F64, cast_f64);
        casters.insert(ScalarKind::String, cast_string);
        casters.insert(ScalarKind::Timestamp, cast_timestamp);
        Self { casters }
    }

    /// Caster registered for `kind`, if any.
    #[must_use]
    pub fn get(&self, kind: ScalarKind) -> Option<Caster> {
        self.casters.get(&kind).copied()
    }

    /// Replace the caster for `kind`.
    pub fn set(&mut self, kind: ScalarKind, caster: Caster) {
        self.casters.insert(kind, caster);
    }

    /// Cast through the table; a kind without a caster yields its zero value.
    #[must_use]
    pub fn cast(&self, kind: ScalarKind, raw: &str) -> Scalar {
        match self.get(kind) {
            Some(caster) => caster(raw),
            None => kind.zero(),
        }
    }
}

impl Default for CasterTable {
    fn default() -> Self {
        DEFAULT_CASTERS.clone()
    }
}

impl fmt::Debug for CasterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.casters.keys().collect();
        kinds.sort_by_key(|k| ScalarKind::ALL.iter().position(|a| a == *k));
        f.debug_struct("CasterTable").field("kinds", &kinds).finish()
    }
}

/// Shared built-in table; new dispatchers start from a copy of it.
pub static DEFAULT_CASTERS: Lazy<CasterTable> = Lazy::new(CasterTable::builtin);

/// Boolean: `on` and `1` are true, then the usual spellings, anything else false.
#[must_use]
pub fn parse_bool(raw: &str) -> bool {
    matches!(raw, "on" | "1" | "t" | "T" | "true" | "TRUE" | "True")
}

fn cast_bool(raw: &str) -> Scalar {
    Scalar::Bool(parse_bool(raw))
}

macro_rules! int_casters {
    ($($name:ident => $ty:ty, $variant:ident, $wide:ty;)*) => {
        $(
            fn $name(raw: &str) -> Scalar {
                Scalar::$variant(raw.parse::<$ty>().map(<$wide>::from).unwrap_or_default())
            }
        )*
    };
}

int_casters! {
    cast_i8 => i8, Int, i64;
    cast_i16 => i16, Int, i64;
    cast_i32 => i32, Int, i64;
    cast_i64 => i64, Int, i64;
    cast_u8 => u8, Uint, u64;
    cast_u16 => u16, Uint, u64;
    cast_u32 => u32, Uint, u64;
    cast_u64 => u64, Uint, u64;
}

fn cast_isize(raw: &str) -> Scalar {
    Scalar::Int(
        raw.parse::<isize>()
            .ok()
            .and_then(|v| i64::try_from(v).ok())
            .unwrap_or_default(),
    )
}

fn cast_usize(raw: &str) -> Scalar {
    Scalar::Uint(
        raw.parse::<usize>()
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or_default(),
    )
}

fn cast_f32(raw: &str) -> Scalar {
    Scalar::Float(raw.parse::<f32>().map(f64::from).unwrap_or_default())
}

fn cast_f64(raw: &str) -> Scalar {
    Scalar::Float(raw.parse::<f64>().unwrap_or_default())
}

fn cast_string(raw: &str) -> Scalar {
    Scalar::Str(raw.to_string())
}

fn cast_timestamp(raw: &str) -> Scalar {
    Scalar::Time(Timestamp::parse(raw))
}

/// A Rust type a scalar field can have.
pub trait ScalarValue: Sized + Default + Send + 'static {
    /// Caster the field is bound with.
    const KIND: ScalarKind;

    /// Narrow a caster output into `Self`. Mismatched or out-of-range input
    /// yields the zero value.
    fn from_scalar(scalar: Scalar) -> Self;
}

macro_rules! integer_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl ScalarValue for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                fn from_scalar(scalar: Scalar) -> Self {
                    match scalar {
                        Scalar::Int(v) => <$ty>::try_from(v).unwrap_or_default(),
                        Scalar::Uint(v) => <$ty>::try_from(v).unwrap_or_default(),
                        _ => 0,
                    }
                }
            }
        )*
    };
}

integer_scalar! {
    i8 => I8, i16 => I16, i32 => I32, i64 => I64, isize => Isize,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64, usize => Usize,
}

impl ScalarValue for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn from_scalar(scalar: Scalar) -> Self {
        matches!(scalar, Scalar::Bool(true))
    }
}

impl ScalarValue for f64 {
    const KIND: ScalarKind = ScalarKind::F64;

    fn from_scalar(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Float(v) => v,
            _ => 0.0,
        }
    }
}

impl ScalarValue for f32 {
    const KIND: ScalarKind = ScalarKind::F32;

    #[allow(clippy::cast_possible_truncation)]
    fn from_scalar(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Float(v) => v as f32,
            _ => 0.0,
        }
    }
}

impl ScalarValue for String {
    const KIND: ScalarKind = ScalarKind::String;

    fn from_scalar(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Str(s) => s,
            _ => String::new(),
        }
    }
}

impl ScalarValue for Timestamp {
    const KIND: ScalarKind = ScalarKind::Timestamp;

    fn from_scalar(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Time(t) => t,
            _ => Timestamp::Zero,
        }
    }
}
