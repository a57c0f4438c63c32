//! # devsim-types::value
//!
//! The tagged variant carried by every port payload, observation sample and
//! initial condition. Experiment files inject values through serde; the
//! observation sinks write them back out with the textual encoding of
//! [`fmt::Display`]: numeric and string variants are lossless, structured
//! variants use a bracketed S-expression form.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    #[default]
    Nil,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Xml(String),
    /// Heterogeneous ordered collection.
    Set(Vec<Value>),
    /// Named heterogeneous collection; insertion order is preserved.
    Map(IndexMap<String, Value>),
    /// Homogeneous vector of doubles.
    Tuple(Vec<f64>),
    /// Dense width x height grid of doubles, stored row-major.
    Table {
        width: usize,
        height: usize,
        data: Vec<f64>,
    },
    /// Dense width x height grid of values, stored row-major.
    Matrix {
        width: usize,
        height: usize,
        data: Vec<Value>,
    },
}

impl Value {
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric coercion: integers widen to doubles.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Xml(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

fn write_doubles(f: &mut fmt::Formatter<'_>, items: &[f64]) -> fmt::Result {
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", v)?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{}", s),
            Value::Xml(s) => write!(f, "{}", s),
            Value::Set(items) => {
                write!(f, "(")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            Value::Map(entries) => {
                write!(f, "(")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", k, v)?;
                }
                write!(f, ")")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_doubles(f, items)?;
                write!(f, ")")
            }
            Value::Table {
                width,
                height,
                data,
            } => {
                write!(f, "({},{},(", width, height)?;
                write_doubles(f, data)?;
                write!(f, "))")
            }
            Value::Matrix {
                width,
                height,
                data,
            } => {
                write!(f, "({},{},(", width, height)?;
                for (i, v) in data.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "))")
            }
        }
    }
}
