//! Notebook document model.
//!
//! The document is held as the parsed JSON tree rather than a typed struct so
//! that untouched cells, metadata and key order are written back as they were
//! read. `Cell` is a borrowed view that exposes the two fields the patcher
//! cares about.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::error::{NotebookError, NotebookResult};
use crate::utils::fs::{read_file_to_string, write_file_atomic};

const CELLS_KEY: &str = "cells";
const CELL_TYPE_KEY: &str = "cell_type";
const SOURCE_KEY: &str = "source";

/// Indentation used when writing notebooks back to disk
const INDENT: &[u8] = b" ";

/// Tag stored in a cell's `cell_type` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellType {
    Code,
    Markdown,
    Raw,
    Other(String),
}

impl CellType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "code" => CellType::Code,
            "markdown" => CellType::Markdown,
            "raw" => CellType::Raw,
            other => CellType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CellType::Code => "code",
            CellType::Markdown => "markdown",
            CellType::Raw => "raw",
            CellType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of one cell
#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    index: usize,
    fields: &'a Map<String, Value>,
}

impl<'a> Cell<'a> {
    /// Position of the cell in the notebook
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn cell_type(&self) -> CellType {
        CellType::from_tag(
            self.fields
                .get(CELL_TYPE_KEY)
                .and_then(Value::as_str)
                .unwrap_or_default(),
        )
    }

    pub fn is_code(&self) -> bool {
        self.cell_type() == CellType::Code
    }

    /// Concatenated source fragments. A bare string source counts as one
    /// fragment and a missing source reads as empty text.
    pub fn source_text(&self) -> String {
        match self.fields.get(SOURCE_KEY) {
            Some(Value::Array(fragments)) => fragments.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(text)) => text.clone(),
            _ => String::new(),
        }
    }

    /// Like [`Cell::source_text`], but fails when `source` is neither text nor
    /// a list of text fragments
    pub fn checked_source_text(&self) -> NotebookResult<String> {
        match self.fields.get(SOURCE_KEY) {
            None | Some(Value::String(_)) => Ok(self.source_text()),
            Some(Value::Array(fragments)) if fragments.iter().all(Value::is_string) => {
                Ok(self.source_text())
            }
            Some(_) => Err(NotebookError::invalid_structure(format!(
                "cell {} has a `source` that is neither text nor a list of text fragments",
                self.index
            ))),
        }
    }

    /// Raw JSON of the cell
    pub fn as_json(&self) -> &'a Map<String, Value> {
        self.fields
    }
}

/// A parsed notebook document
#[derive(Debug, Clone, PartialEq)]
pub struct Notebook {
    root: Map<String, Value>,
}

impl Notebook {
    /// Parse a notebook from JSON text
    pub fn parse(content: &str) -> NotebookResult<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| NotebookError::parse_error(e, None::<&Path>))?;
        Self::from_value(value)
    }

    /// Build a notebook from an already parsed JSON value. Only the top level
    /// is checked here; individual cells are checked when they are visited.
    pub fn from_value(value: Value) -> NotebookResult<Self> {
        let root = match value {
            Value::Object(root) => root,
            other => {
                return Err(NotebookError::invalid_structure(format!(
                    "expected a JSON object at the top level, found {}",
                    json_kind(&other)
                )))
            }
        };

        root.get(CELLS_KEY)
            .ok_or_else(|| NotebookError::invalid_structure("missing `cells` field"))?
            .as_array()
            .ok_or_else(|| NotebookError::invalid_structure("`cells` is not an array"))?;

        Ok(Self { root })
    }

    /// Load and parse a notebook file
    pub fn load(path: impl AsRef<Path>) -> NotebookResult<Self> {
        let path = path.as_ref();
        let content = read_file_to_string(path)?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| NotebookError::parse_error(e, Some(path)))?;
        let notebook = Self::from_value(value)?;

        debug!(
            "Loaded notebook {} ({} cells, nbformat {})",
            path.display(),
            notebook.cell_count(),
            notebook
                .nbformat()
                .map(|(major, minor)| format!("{}.{}", major, minor))
                .unwrap_or_else(|| "unknown".to_string())
        );

        Ok(notebook)
    }

    /// Serialize and atomically replace the file at `path`
    pub fn save(&self, path: impl AsRef<Path>) -> NotebookResult<()> {
        let path = path.as_ref();
        let content = self.to_pretty_string()?;
        write_file_atomic(path, &content)?;
        debug!("Saved notebook {} ({} bytes)", path.display(), content.len());
        Ok(())
    }

    /// JSON text with one-space indentation, original key order and a
    /// trailing newline
    pub fn to_pretty_string(&self) -> NotebookResult<String> {
        let mut buf = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
        self.root
            .serialize(&mut serializer)
            .map_err(|e| NotebookError::parse_error(e, None::<&Path>))?;
        buf.push(b'\n');

        String::from_utf8(buf).map_err(|e| {
            NotebookError::invalid_structure(format!("serialized notebook is not UTF-8: {}", e))
        })
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell<'_>> {
        self.cell_values()
            .iter()
            .enumerate()
            .filter_map(|(index, value)| value.as_object().map(|fields| Cell { index, fields }))
    }

    pub fn cell(&self, index: usize) -> Option<Cell<'_>> {
        self.cell_values()
            .get(index)
            .and_then(Value::as_object)
            .map(|fields| Cell { index, fields })
    }

    /// Cell view that fails unless the cell is an object with a string
    /// `cell_type`
    pub fn checked_cell(&self, index: usize) -> NotebookResult<Cell<'_>> {
        let value = self.cell_values().get(index).ok_or_else(|| {
            NotebookError::invalid_structure(format!(
                "cell index {} out of range ({} cells)",
                index,
                self.cell_count()
            ))
        })?;
        let fields = value.as_object().ok_or_else(|| {
            NotebookError::invalid_structure(format!("cell {} is not an object", index))
        })?;

        match fields.get(CELL_TYPE_KEY) {
            Some(Value::String(_)) => Ok(Cell { index, fields }),
            Some(_) => Err(NotebookError::invalid_structure(format!(
                "cell {} has a non-string `cell_type`",
                index
            ))),
            None => Err(NotebookError::invalid_structure(format!(
                "cell {} is missing `cell_type`",
                index
            ))),
        }
    }

    pub fn cell_count(&self) -> usize {
        self.cell_values().len()
    }

    /// Replace the `source` of the cell at `index` with a single fragment
    pub fn set_source(&mut self, index: usize, text: impl Into<String>) -> NotebookResult<()> {
        let count = self.cell_count();
        let fields = self
            .root
            .get_mut(CELLS_KEY)
            .and_then(Value::as_array_mut)
            .and_then(|cells| cells.get_mut(index))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                NotebookError::invalid_structure(format!(
                    "cell index {} out of range ({} cells)",
                    index, count
                ))
            })?;

        fields.insert(
            SOURCE_KEY.to_string(),
            Value::Array(vec![Value::String(text.into())]),
        );
        Ok(())
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.root.get("metadata")
    }

    /// `(nbformat, nbformat_minor)` when both are present
    pub fn nbformat(&self) -> Option<(u64, u64)> {
        let major = self.root.get("nbformat")?.as_u64()?;
        let minor = self.root.get("nbformat_minor")?.as_u64()?;
        Some((major, minor))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    fn cell_values(&self) -> &[Value] {
        self.root
            .get(CELLS_KEY)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl FromStr for Notebook {
    type Err = NotebookError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        Notebook::parse(content)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
