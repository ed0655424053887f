//! Scalar query results and their conversion to a single number.

use crate::error::{DbResult, ExecutionError, PREVIEW_CHARS, preview};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt;

/// Characters of a non-numeric value echoed in errors.
const VALUE_PREVIEW_CHARS: usize = 50;

/// Single cell value read from the first column of a result.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    DateTime(DateTime<Utc>),
    NaiveDateTime(NaiveDateTime),
    Date(NaiveDate),
    /// A type the driver cannot decode; holds the type name.
    Unsupported(String),
}

impl ScalarValue {
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "str",
            Self::DateTime(_) => "datetime",
            Self::NaiveDateTime(_) => "datetime",
            Self::Date(_) => "date",
            Self::Unsupported(name) => name,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Decimal(v) => write!(f, "{}", v),
            Self::String(v) => f.write_str(v),
            Self::DateTime(v) => write!(f, "{}", v),
            Self::NaiveDateTime(v) => write!(f, "{}", v),
            Self::Date(v) => write!(f, "{}", v),
            Self::Unsupported(name) => write!(f, "<{}>", name),
        }
    }
}

/// Shape of the raw result set before conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarResult {
    pub rows: usize,
    pub columns: usize,
    /// First column of the first row, if any.
    pub value: Option<ScalarValue>,
}

impl ScalarResult {
    pub fn empty(columns: usize) -> Self {
        Self {
            rows: 0,
            columns,
            value: None,
        }
    }

    #[cfg(test)]
    pub fn single(value: ScalarValue) -> Self {
        Self {
            rows: 1,
            columns: 1,
            value: Some(value),
        }
    }

    /// Convert to the answer value.
    ///
    /// Zero rows and NULL become 0. More than one row or column is an error,
    /// as is any boolean or non-numeric value. Fractions truncate toward zero.
    pub fn into_number(self, sql: &str) -> DbResult<i64> {
        if self.rows > 1 || self.columns > 1 {
            return Err(ExecutionError::NotScalar {
                rows: self.rows,
                columns: self.columns,
                preview: preview(sql, PREVIEW_CHARS),
            });
        }

        let value = match self.value {
            None | Some(ScalarValue::Null) => return Ok(0),
            Some(value) => value,
        };

        let number = match &value {
            ScalarValue::Bool(v) => {
                return Err(ExecutionError::BooleanResult {
                    value: *v,
                    preview: preview(sql, PREVIEW_CHARS),
                });
            }
            ScalarValue::Int(v) => Some(*v),
            ScalarValue::Float(v) => v.to_i64(),
            ScalarValue::Decimal(v) => v.trunc().to_i64(),
            _ => None,
        };

        number.ok_or_else(|| ExecutionError::NonNumeric {
            type_name: value.type_name().to_string(),
            value: preview(&value.to_string(), VALUE_PREVIEW_CHARS),
            preview: preview(sql, PREVIEW_CHARS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const SQL: &str = "SELECT COUNT(*) FROM videos";

    #[test]
    fn test_integer() {
        assert_eq!(
            ScalarResult::single(ScalarValue::Int(42)).into_number(SQL).unwrap(),
            42
        );
    }

    #[test]
    fn test_zero_rows_and_null_default_to_zero() {
        assert_eq!(ScalarResult::empty(1).into_number(SQL).unwrap(), 0);
        assert_eq!(
            ScalarResult::single(ScalarValue::Null).into_number(SQL).unwrap(),
            0
        );
    }

    #[test]
    fn test_decimal_and_float_truncate() {
        let avg = Decimal::from_str("1234.99").unwrap();
        assert_eq!(
            ScalarResult::single(ScalarValue::Decimal(avg)).into_number(SQL).unwrap(),
            1234
        );
        let negative = Decimal::from_str("-7.5").unwrap();
        assert_eq!(
            ScalarResult::single(ScalarValue::Decimal(negative))
                .into_number(SQL)
                .unwrap(),
            -7
        );
        assert_eq!(
            ScalarResult::single(ScalarValue::Float(9.9)).into_number(SQL).unwrap(),
            9
        );
    }

    #[test]
    fn test_float_outside_i64_range_rejected() {
        for v in [1e30, -1e30, f64::NAN, f64::INFINITY] {
            let err = ScalarResult::single(ScalarValue::Float(v))
                .into_number(SQL)
                .unwrap_err();
            assert!(
                matches!(err, ExecutionError::NonNumeric { ref type_name, .. } if type_name == "float"),
                "{} should not convert",
                v
            );
        }
        assert_eq!(
            ScalarResult::single(ScalarValue::Float(-2.7)).into_number(SQL).unwrap(),
            -2
        );
    }

    #[test]
    fn test_boolean_rejected() {
        let err = ScalarResult::single(ScalarValue::Bool(true))
            .into_number(SQL)
            .unwrap_err();
        assert!(matches!(err, ExecutionError::BooleanResult { value: true, .. }));
    }

    #[test]
    fn test_non_numeric_rejected() {
        let err = ScalarResult::single(ScalarValue::String("a".repeat(80)))
            .into_number(SQL)
            .unwrap_err();
        match err {
            ExecutionError::NonNumeric {
                type_name, value, ..
            } => {
                assert_eq!(type_name, "str");
                assert!(value.chars().count() <= VALUE_PREVIEW_CHARS + 3);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = ScalarResult::single(ScalarValue::Float(f64::NAN))
            .into_number(SQL)
            .unwrap_err();
        assert!(matches!(err, ExecutionError::NonNumeric { .. }));
    }

    #[test]
    fn test_timestamp_rejected() {
        let at = DateTime::from_timestamp(1_733_011_200, 0).unwrap();
        let err = ScalarResult::single(ScalarValue::DateTime(at))
            .into_number("SELECT MIN(created_at) FROM videos")
            .unwrap_err();
        assert!(err.to_string().contains("datetime"));
    }

    #[test]
    fn test_multiple_rows_rejected() {
        let result = ScalarResult {
            rows: 3,
            columns: 2,
            value: Some(ScalarValue::Int(1)),
        };
        let err = result
            .into_number("SELECT creator_id, COUNT(*) FROM videos GROUP BY creator_id")
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::NotScalar {
                rows: 3,
                columns: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_multiple_columns_rejected_even_without_rows() {
        let err = ScalarResult::empty(2).into_number(SQL).unwrap_err();
        assert!(matches!(err, ExecutionError::NotScalar { columns: 2, .. }));
    }
}
