//! Matrix operations
//!
//! The five transformations that can be applied to a validated [`Matrix`].
//! Rows are converted with the integer codec one at a time, top to bottom,
//! and the first invalid field aborts the whole operation.

use num_bigint::BigInt;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::codec::{join_all, parse_all};
use crate::error::{OperationError, OperationResult};
use crate::parser::Matrix;

/// All available matrix operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Return the matrix, one canonical row per line
    Echo,

    /// Return every value on a single line
    Flatten,

    /// Return the transposed matrix
    Invert,

    /// Return the sum of all values
    Sum,

    /// Return the product of all values
    Multiply,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Echo,
        Operation::Invert,
        Operation::Flatten,
        Operation::Sum,
        Operation::Multiply,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Echo => "echo",
            Operation::Flatten => "flatten",
            Operation::Invert => "invert",
            Operation::Sum => "sum",
            Operation::Multiply => "multiply",
        }
    }

    /// URL path the operation is served on.
    pub fn route(&self) -> &'static str {
        match self {
            Operation::Echo => "/echo",
            Operation::Flatten => "/flatten",
            Operation::Invert => "/invert",
            Operation::Sum => "/sum",
            Operation::Multiply => "/multiply",
        }
    }

    /// Apply this operation to a matrix.
    ///
    /// Every successful result ends with exactly one newline.
    pub fn apply(&self, matrix: &Matrix) -> OperationResult<String> {
        match self {
            Operation::Echo => apply_echo(matrix, false),
            Operation::Flatten => apply_echo(matrix, true),
            Operation::Invert => apply_invert(matrix),
            Operation::Sum => apply_reduce(matrix, false),
            Operation::Multiply => apply_reduce(matrix, true),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown operation '{}'", s))
    }
}

/// Parse every row, tagging failures with their 1-based row number.
fn parsed_rows(matrix: &Matrix) -> impl Iterator<Item = OperationResult<Vec<BigInt>>> + '_ {
    matrix
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| parse_all(row).map_err(|e| OperationError::at_row(i + 1, e)))
}

/// Echo-like operations: row per line, or everything on one line.
fn apply_echo(matrix: &Matrix, flatten: bool) -> OperationResult<String> {
    let mut lines = Vec::with_capacity(matrix.len());
    for ints in parsed_rows(matrix) {
        lines.push(join_all(&ints?));
    }

    let mut out = if flatten {
        lines.join(",")
    } else {
        lines.join("\n")
    };
    out.push('\n');
    Ok(out)
}

/// Reduce-like operations: sum or product of every value.
fn apply_reduce(matrix: &Matrix, multiply: bool) -> OperationResult<String> {
    // An empty matrix reports 0 for both, not the empty product.
    if matrix.is_empty() {
        return Ok("0\n".to_string());
    }

    let mut acc = if multiply { BigInt::one() } else { BigInt::zero() };
    for ints in parsed_rows(matrix) {
        for value in ints? {
            if multiply {
                acc *= value;
            } else {
                acc += value;
            }
        }
    }

    Ok(format!("{}\n", acc))
}

/// Transpose: input row i becomes output column i.
fn apply_invert(matrix: &Matrix) -> OperationResult<String> {
    let mut columns: Vec<Vec<BigInt>> = vec![Vec::with_capacity(matrix.len()); matrix.len()];

    for ints in parsed_rows(matrix) {
        for (column, value) in columns.iter_mut().zip(ints?) {
            column.push(value);
        }
    }

    if columns.is_empty() {
        return Ok("\n".to_string());
    }

    let mut out = String::new();
    for column in &columns {
        out.push_str(&join_all(column));
        out.push('\n');
    }
    Ok(out)
}

/// Get a description of all available operations
pub fn operations_description() -> String {
    r#"Available matrix operations:

| Operation | Route     | Result                                        | Empty matrix |
|-----------|-----------|-----------------------------------------------|--------------|
| echo      | /echo     | The matrix, one canonical row per line        | "\n"         |
| invert    | /invert   | The transposed matrix                         | "\n"         |
| flatten   | /flatten  | Every value comma-joined on a single line     | "\n"         |
| sum       | /sum      | Sum of all values (arbitrary precision)       | "0\n"        |
| multiply  | /multiply | Product of all values (arbitrary precision)   | "0\n"        |

Uploads are POSTed as multipart form data with a single "file" field
containing a square CSV matrix of integers, e.g.:

  curl -F 'file=@matrix.csv' localhost:8080/echo"#
        .to_string()
}
