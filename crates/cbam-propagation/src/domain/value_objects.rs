//! Value objects for emission propagation
//!
//! Identifiers, the fixed-point `Emission` quantity and edge/step tags.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

define_id!(
    /// Production step identifier
    ProcessId
);
define_id!(
    /// Manufactured good identifier
    ProductId
);
define_id!(
    /// Process chain identifier
    ChainId
);
define_id!(
    /// Edge identifier
    EdgeId
);
define_id!(
    /// Material or fuel input identifier
    InputId
);

/// Micro-units per whole emission unit (6 fractional digits).
pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// Fixed-point emission quantity in micro-units (1e-6 t CO2e).
///
/// Addition is exact, so repeated propagation never drifts. Multiplication by
/// a factor rounds half away from zero to 6 fractional digits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Emission(i64);

impl Emission {
    pub const ZERO: Emission = Emission(0);

    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Whole units, e.g. `Emission::from_units(10)` is `10.000000`.
    pub const fn from_units(units: i64) -> Self {
        Self(units * MICROS_PER_UNIT)
    }

    pub const fn micros(self) -> i64 {
        self.0
    }

    /// Convert from a float, rounding to the nearest micro-unit.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * MICROS_PER_UNIT as f64).round();
        if scaled.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Self(scaled as i64))
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_UNIT as f64
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Emission) -> Option<Emission> {
        self.0.checked_add(other.0).map(Emission)
    }

    /// Absolute difference between two quantities.
    pub fn abs_diff(self, other: Emission) -> Emission {
        let diff = self.0.abs_diff(other.0);
        Emission(i64::try_from(diff).unwrap_or(i64::MAX))
    }

    /// Multiply by a factor expressed in the same fixed-point scale.
    ///
    /// Returns `None` on overflow.
    pub fn scale(self, factor: Emission) -> Option<Emission> {
        let product = i128::from(self.0) * i128::from(factor.0);
        let divisor = i128::from(MICROS_PER_UNIT);
        let quotient = product / divisor;
        let remainder = product % divisor;
        let rounded = if remainder.abs() * 2 >= divisor {
            quotient + product.signum()
        } else {
            quotient
        };
        i64::try_from(rounded).ok().map(Emission)
    }
}

impl fmt::Display for Emission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let units = magnitude / MICROS_PER_UNIT as u64;
        let fraction = magnitude % MICROS_PER_UNIT as u64;
        write!(f, "{sign}{units}.{fraction:06}")
    }
}

/// Failure to parse a decimal emission string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmissionParseError {
    #[error("empty emission value")]
    Empty,

    #[error("invalid digit in emission value '{0}'")]
    InvalidDigit(String),

    #[error("more than 6 fractional digits in '{0}'")]
    TooPrecise(String),

    #[error("emission value '{0}' out of range")]
    OutOfRange(String),
}

impl FromStr for Emission {
    type Err = EmissionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EmissionParseError::Empty);
        }

        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(EmissionParseError::InvalidDigit(s.to_string()));
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(EmissionParseError::InvalidDigit(s.to_string()));
        }
        if frac_part.len() > 6 {
            return Err(EmissionParseError::TooPrecise(s.to_string()));
        }

        let out_of_range = || EmissionParseError::OutOfRange(s.to_string());
        let units: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| out_of_range())?
        };
        let fraction: i64 = if frac_part.is_empty() {
            0
        } else {
            format!("{frac_part:0<6}").parse().map_err(|_| out_of_range())?
        };

        let micros = units
            .checked_mul(MICROS_PER_UNIT)
            .and_then(|m| m.checked_add(fraction))
            .ok_or_else(out_of_range)?;

        Ok(Emission(if negative { -micros } else { micros }))
    }
}

impl Serialize for Emission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct EmissionVisitor;

impl<'de> Visitor<'de> for EmissionVisitor {
    type Value = Emission;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal string or number with at most 6 fractional digits")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Emission, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Emission, E> {
        v.checked_mul(MICROS_PER_UNIT)
            .map(Emission)
            .ok_or_else(|| E::custom(format!("emission value {v} out of range")))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Emission, E> {
        i64::try_from(v)
            .map_err(|_| E::custom(format!("emission value {v} out of range")))
            .and_then(|v| self.visit_i64(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Emission, E> {
        Emission::from_f64(v).ok_or_else(|| E::custom(format!("emission value {v} out of range")))
    }
}

impl<'de> Deserialize<'de> for Emission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(EmissionVisitor)
    }
}

/// Graph node type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Process,
    Product,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Process => f.write_str("process"),
            NodeType::Product => f.write_str("product"),
        }
    }
}

/// Reference to a graph node (type + id)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub node_type: NodeType,
    pub id: i64,
}

impl NodeRef {
    pub fn process(id: ProcessId) -> Self {
        Self {
            node_type: NodeType::Process,
            id: id.0,
        }
    }

    pub fn product(id: ProductId) -> Self {
        Self {
            node_type: NodeType::Product,
            id: id.0,
        }
    }

    /// The process id, if this node is a process.
    pub fn as_process(&self) -> Option<ProcessId> {
        match self.node_type {
            NodeType::Process => Some(ProcessId(self.id)),
            NodeType::Product => None,
        }
    }
}

/// Edge kind. Only `Continue` propagates emissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// process → process, emissions flow forward
    Continue,
    /// process → product
    Produce,
    /// product → process
    Consume,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Continue => "continue",
            EdgeKind::Produce => "produce",
            EdgeKind::Consume => "consume",
        }
    }

    /// Endpoint node types this kind may connect.
    pub fn endpoints(&self) -> (NodeType, NodeType) {
        match self {
            EdgeKind::Continue => (NodeType::Process, NodeType::Process),
            EdgeKind::Produce => (NodeType::Process, NodeType::Product),
            EdgeKind::Consume => (NodeType::Product, NodeType::Process),
        }
    }

    pub fn propagates(&self) -> bool {
        matches!(self, EdgeKind::Continue)
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown edge kind string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown edge kind '{0}'")]
pub struct UnknownEdgeKind(pub String);

impl FromStr for EdgeKind {
    type Err = UnknownEdgeKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "continue" => Ok(EdgeKind::Continue),
            "produce" => Ok(EdgeKind::Produce),
            "consume" => Ok(EdgeKind::Consume),
            other => Err(UnknownEdgeKind(other.to_string())),
        }
    }
}

/// How a traversal step obtained its cumulative value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationType {
    /// First chain member: cumulative = own
    FirstProcess,
    /// Inherited from exactly one predecessor
    ContinueEdge,
    /// Chain break: cumulative = own
    NoContinueEdge,
    /// Graph node without predecessors: cumulative = own
    Root,
    /// Graph node inheriting from several predecessors
    FanIn,
}

impl PropagationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropagationType::FirstProcess => "first_process",
            PropagationType::ContinueEdge => "continue_edge",
            PropagationType::NoContinueEdge => "no_continue_edge",
            PropagationType::Root => "root",
            PropagationType::FanIn => "fan_in",
        }
    }
}

/// Which part of the edge graph a graph-mode propagation covers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "roots")]
pub enum GraphScope {
    /// Every `continue` edge in the edge graph
    All,
    /// Processes reachable from the given roots
    From(Vec<ProcessId>),
}
