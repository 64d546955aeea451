//! Payload row schema descriptors.
//!
//! A [`RowDef`] describes the fixed-width column layout of the payload rows
//! stored inside collections: an ordered list of named byte columns plus
//! the [`KeyOrder`] used to compare first-column values (the row's primary
//! key). The total column width is the *chunk size* of the index.
//!
//! Descriptors have a textual form, `name-width, name-width, ...`, which is
//! what the property file persists. Reopening an index checks that the
//! stored descriptor is **subsumed** by the requested one: callers may
//! extend a schema by appending columns, but may never rename, reorder, or
//! resize existing ones — prior on-disk rows must remain a byte-exact
//! prefix of the new row shape.

use std::fmt;

use thiserror::Error;

use crate::order::KeyOrder;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors raised while building or parsing a row definition.
#[derive(Debug, Error)]
pub enum RowDefError {
    /// A row definition must contain at least one column.
    #[error("row definition has no columns")]
    Empty,

    /// A column descriptor did not match the `name-width` shape.
    #[error("malformed column descriptor '{0}'")]
    BadColumn(String),

    /// A column was declared with width zero.
    #[error("column '{0}' has zero width")]
    ZeroWidth(String),
}

// ------------------------------------------------------------------------------------------------
// Column and row definitions
// ------------------------------------------------------------------------------------------------

/// A single named byte column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name; must not contain `-`, `,`, or whitespace.
    pub name: String,
    /// Column width in bytes.
    pub width: usize,
}

/// Fixed-width payload row layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDef {
    columns: Vec<ColumnDef>,
    order: KeyOrder,
    width: usize,
}

impl RowDef {
    /// Build a row definition from columns and a key order.
    pub fn new(columns: Vec<ColumnDef>, order: KeyOrder) -> Result<Self, RowDefError> {
        if columns.is_empty() {
            return Err(RowDefError::Empty);
        }
        for col in &columns {
            if col.width == 0 {
                return Err(RowDefError::ZeroWidth(col.name.clone()));
            }
            if col.name.is_empty()
                || col
                    .name
                    .contains(|c: char| c == '-' || c == ',' || c.is_whitespace())
            {
                return Err(RowDefError::BadColumn(col.name.clone()));
            }
        }
        let width: usize = columns.iter().map(|c| c.width).sum();
        Ok(Self {
            columns,
            order,
            width,
        })
    }

    /// Parse a descriptor of the form `name-width, name-width, ...`.
    pub fn parse(descriptor: &str, order: KeyOrder) -> Result<Self, RowDefError> {
        let mut columns = Vec::new();
        for part in descriptor.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(RowDefError::BadColumn(part.to_string()));
            }
            let Some((name, width)) = part.rsplit_once('-') else {
                return Err(RowDefError::BadColumn(part.to_string()));
            };
            let width: usize = width
                .parse()
                .map_err(|_| RowDefError::BadColumn(part.to_string()))?;
            columns.push(ColumnDef {
                name: name.to_string(),
                width,
            });
        }
        Self::new(columns, order)
    }

    /// The textual descriptor persisted in the property file.
    pub fn descriptor(&self) -> String {
        self.to_string()
    }

    /// Total row width in bytes (the chunk size).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Width of the first column — the row's primary key.
    pub fn primary_width(&self) -> usize {
        self.columns[0].width
    }

    /// The order used to compare primary-key values.
    pub fn order(&self) -> KeyOrder {
        self.order
    }

    /// The column layout.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Whether `stored` is a prefix of this definition.
    ///
    /// Holds when every stored column appears at the same position with
    /// the same name and width. A definition subsumes itself.
    pub fn subsumes(&self, stored: &RowDef) -> bool {
        stored.columns.len() <= self.columns.len()
            && stored
                .columns
                .iter()
                .zip(&self.columns)
                .all(|(s, n)| s == n)
    }
}

impl fmt::Display for RowDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}-{}", col.name, col.width)?;
        }
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------
