//! First-match code cell replacement.
//!
//! A [`CellPatch`] names a marker substring and a replacement block. Applying
//! it rewrites the `source` of the first code cell whose text contains the
//! marker and leaves every other cell alone, including later cells that also
//! match.

use similar::TextDiff;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{NotebookError, NotebookResult};
use crate::notebook::Notebook;

/// Import line that identifies the cell to rewrite
pub const DEFAULT_MARKER: &str = "import subprocess";

/// Replacement imports cell, without the unused subprocess/os/tempfile imports
pub const DEFAULT_REPLACEMENT: &str = r#"import json
import time
import numpy as np
import matplotlib.pyplot as plt
from collections import Counter
from pathlib import Path

# Fibonacci hashing constant
FIB_HASH_64_MAGIC = 11400714819323198485

print("✓ Imports successful")
print(f"✓ Fibonacci magic constant: {FIB_HASH_64_MAGIC}")"#;

/// A marker and the text that replaces the cell containing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellPatch {
    marker: String,
    replacement: String,
}

/// What applying a patch did to a notebook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The cell at `index` was rewritten; `previous_source` is its old text
    Replaced {
        index: usize,
        previous_source: String,
    },
    /// No code cell contained the marker; the notebook is unchanged
    NoMatch,
}

impl PatchOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, PatchOutcome::Replaced { .. })
    }

    pub fn replaced_index(&self) -> Option<usize> {
        match self {
            PatchOutcome::Replaced { index, .. } => Some(*index),
            PatchOutcome::NoMatch => None,
        }
    }
}

impl CellPatch {
    pub fn new(marker: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            replacement: replacement.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Index of the first code cell whose source contains the marker.
    ///
    /// Cells are checked as they are visited, so a malformed cell after the
    /// match never fails the scan.
    pub fn find_target(&self, notebook: &Notebook) -> NotebookResult<Option<usize>> {
        for index in 0..notebook.cell_count() {
            let cell = notebook.checked_cell(index)?;
            if cell.is_code() && cell.checked_source_text()?.contains(self.marker.as_str()) {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Rewrite the first matching cell in place
    pub fn apply(&self, notebook: &mut Notebook) -> NotebookResult<PatchOutcome> {
        let Some(index) = self.find_target(notebook)? else {
            debug!("No code cell contains marker {:?}", self.marker);
            return Ok(PatchOutcome::NoMatch);
        };

        let previous_source = notebook.checked_cell(index)?.source_text();
        notebook.set_source(index, self.replacement.as_str())?;

        debug!("Replaced source of cell {}", index);
        Ok(PatchOutcome::Replaced {
            index,
            previous_source,
        })
    }
}

impl Default for CellPatch {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER, DEFAULT_REPLACEMENT)
    }
}

/// Options for [`patch_file`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchOptions {
    /// Compute the change and its diff without writing the file
    pub dry_run: bool,
    /// Treat a notebook without a matching cell as an error
    pub strict: bool,
}

/// Result of a [`patch_file`] run
#[derive(Debug, Clone)]
pub struct PatchReport {
    pub path: PathBuf,
    pub outcome: PatchOutcome,
    /// Whether the notebook file was rewritten
    pub written: bool,
    /// Unified diff of the replaced cell, filled for dry runs
    pub diff: Option<String>,
}

/// Load the notebook at `path`, apply `patch` and write it back.
///
/// Nothing is written unless the whole read and modify step succeeded, and
/// nothing is written when no cell matched.
pub fn patch_file(
    path: impl AsRef<Path>,
    patch: &CellPatch,
    options: PatchOptions,
) -> NotebookResult<PatchReport> {
    let path = path.as_ref();
    let mut notebook = Notebook::load(path)?;
    let outcome = patch.apply(&mut notebook)?;

    let diff = match &outcome {
        PatchOutcome::Replaced {
            previous_source, ..
        } if options.dry_run => Some(render_source_diff(previous_source, patch.replacement())),
        _ => None,
    };

    let written = match &outcome {
        PatchOutcome::NoMatch if options.strict => {
            return Err(NotebookError::no_match(patch.marker()));
        }
        PatchOutcome::NoMatch => {
            warn!(
                "No code cell in {} contains {:?}; notebook left unchanged",
                path.display(),
                patch.marker()
            );
            false
        }
        PatchOutcome::Replaced { index, .. } if options.dry_run => {
            info!("Dry run: cell {} of {} would be replaced", index, path.display());
            false
        }
        PatchOutcome::Replaced { index, .. } => {
            notebook.save(path)?;
            info!("Replaced cell {} of {}", index, path.display());
            true
        }
    };

    Ok(PatchReport {
        path: path.to_path_buf(),
        outcome,
        written,
        diff,
    })
}

/// Unified line diff between the old and new text of a cell
pub fn render_source_diff(old: &str, new: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header("cell (before)", "cell (after)")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::tempdir;

    fn notebook(cells: Value) -> Notebook {
        Notebook::from_value(json!({
            "cells": cells,
            "metadata": {"language_info": {"name": "python"}},
            "nbformat": 4,
            "nbformat_minor": 5
        }))
        .unwrap()
    }

    fn source_of(nb: &Notebook, index: usize) -> Value {
        nb.cell(index).unwrap().as_json().get("source").cloned().unwrap()
    }

    #[test]
    fn test_replaces_imports_cell() {
        let mut nb = notebook(json!([
            {"cell_type": "markdown", "metadata": {}, "source": ["# Title"]},
            {"cell_type": "code", "metadata": {}, "outputs": [], "source": ["import subprocess\nimport os"]}
        ]));
        let before = nb.clone();

        let outcome = CellPatch::default().apply(&mut nb).unwrap();

        assert_eq!(
            outcome,
            PatchOutcome::Replaced {
                index: 1,
                previous_source: "import subprocess\nimport os".to_string()
            }
        );
        assert_eq!(source_of(&nb, 1), json!([DEFAULT_REPLACEMENT]));
        assert_eq!(source_of(&nb, 0), json!(["# Title"]));
        assert_eq!(nb.metadata(), before.metadata());
        assert_eq!(
            nb.cell(1).unwrap().as_json().get("outputs"),
            Some(&json!([]))
        );
    }

    #[test]
    fn test_marker_split_across_fragments() {
        let mut nb = notebook(json!([
            {"cell_type": "code", "source": ["import sub", "process\n", "x = 1"]}
        ]));
        assert_eq!(CellPatch::default().apply(&mut nb).unwrap().replaced_index(), Some(0));
    }

    #[test]
    fn test_no_match_leaves_notebook_unchanged() {
        let mut nb = notebook(json!([
            {"cell_type": "code", "source": ["import os\n"]},
            {"cell_type": "markdown", "source": ["import subprocess is not needed"]}
        ]));
        let before = nb.clone();

        let outcome = CellPatch::default().apply(&mut nb).unwrap();

        assert_eq!(outcome, PatchOutcome::NoMatch);
        assert!(!outcome.is_replaced());
        assert_eq!(nb, before);
        assert_eq!(nb.to_pretty_string().unwrap(), before.to_pretty_string().unwrap());
    }

    #[test]
    fn test_only_first_match_replaced() {
        let mut nb = notebook(json!([
            {"cell_type": "code", "source": ["x = 1"]},
            {"cell_type": "code", "source": ["import subprocess\n"]},
            {"cell_type": "code", "source": "import subprocess\nsubprocess.run(['ls'])"}
        ]));

        let outcome = CellPatch::new("import subprocess", "pass").apply(&mut nb).unwrap();

        assert_eq!(outcome.replaced_index(), Some(1));
        assert_eq!(source_of(&nb, 0), json!(["x = 1"]));
        assert_eq!(source_of(&nb, 1), json!(["pass"]));
        assert_eq!(
            source_of(&nb, 2),
            json!("import subprocess\nsubprocess.run(['ls'])")
        );
    }

    #[test]
    fn test_find_target_skips_non_code() {
        let nb = notebook(json!([
            {"cell_type": "raw", "source": ["import subprocess"]},
            {"cell_type": "markdown", "source": ["import subprocess"]},
            {"cell_type": "code", "source": ["import subprocess"]}
        ]));
        assert_eq!(CellPatch::default().find_target(&nb).unwrap(), Some(2));
    }

    #[test]
    fn test_cells_after_match_not_checked() {
        let mut nb = notebook(json!([
            {"cell_type": "markdown", "source": [{"not": "text"}]},
            {"cell_type": "code", "source": ["import subprocess"]},
            {"cell_type": "code", "source": [42]},
            "not a cell"
        ]));

        let outcome = CellPatch::default().apply(&mut nb).unwrap();

        assert_eq!(outcome.replaced_index(), Some(1));
        assert_eq!(source_of(&nb, 2), json!([42]));
    }

    #[test]
    fn test_malformed_code_cell_before_match_fails() {
        let mut nb = notebook(json!([
            {"cell_type": "code", "source": [1, 2]},
            {"cell_type": "code", "source": ["import subprocess"]}
        ]));
        let before = nb.clone();

        let err = CellPatch::default().apply(&mut nb).unwrap_err();

        assert!(matches!(err, NotebookError::InvalidStructure { .. }));
        assert_eq!(nb, before);
    }

    #[test]
    fn test_strict_reports_structure_error_not_no_match() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.ipynb");
        fs::write(&path, r#"{"cells": [{"source": ["import subprocess"]}]}"#).unwrap();

        let options = PatchOptions {
            strict: true,
            ..PatchOptions::default()
        };
        let err = patch_file(&path, &CellPatch::default(), options).unwrap_err();
        assert!(matches!(err, NotebookError::InvalidStructure { .. }));
    }

    #[test]
    fn test_patch_file_rewrites_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.ipynb");
        let nb = notebook(json!([
            {"cell_type": "markdown", "source": ["# Title"]},
            {"cell_type": "code", "source": ["import subprocess\n", "import os\n", "import tempfile"]}
        ]));
        fs::write(&path, nb.to_pretty_string().unwrap()).unwrap();

        let report = patch_file(&path, &CellPatch::default(), PatchOptions::default()).unwrap();

        assert!(report.written);
        assert!(report.diff.is_none());
        assert_eq!(report.outcome.replaced_index(), Some(1));

        let reloaded = Notebook::load(&path).unwrap();
        assert_eq!(reloaded.cell_count(), 2);
        assert_eq!(reloaded.cell(1).unwrap().source_text(), DEFAULT_REPLACEMENT);
        assert_eq!(reloaded.cell(0).unwrap().source_text(), "# Title");
        assert_eq!(reloaded.nbformat(), Some((4, 5)));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n \"cells\": [\n"));
        assert!(text.contains("✓ Imports successful"));
    }

    #[cfg(unix)]
    #[test]
    fn test_patch_file_through_symlink() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("real.ipynb");
        let link = dir.path().join("link.ipynb");
        fs::write(&real, r#"{"cells": [{"cell_type": "code", "source": ["import subprocess"]}]}"#)
            .unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let report = patch_file(&link, &CellPatch::default(), PatchOptions::default()).unwrap();

        assert!(report.written);
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        let reloaded = Notebook::load(&real).unwrap();
        assert_eq!(reloaded.cell(0).unwrap().source_text(), DEFAULT_REPLACEMENT);
    }

    #[test]
    fn test_patch_file_no_match_does_not_touch_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.ipynb");
        let original = r#"{"cells": [{"cell_type": "code", "source": ["import os"]}], "metadata": {}}"#;
        fs::write(&path, original).unwrap();

        let report = patch_file(&path, &CellPatch::default(), PatchOptions::default()).unwrap();

        assert_eq!(report.outcome, PatchOutcome::NoMatch);
        assert!(!report.written);
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_patch_file_strict_no_match() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.ipynb");
        fs::write(&path, r#"{"cells": []}"#).unwrap();

        let options = PatchOptions {
            strict: true,
            ..PatchOptions::default()
        };
        let err = patch_file(&path, &CellPatch::default(), options).unwrap_err();
        assert!(matches!(err, NotebookError::NoMatch { .. }));
    }

    #[test]
    fn test_patch_file_dry_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.ipynb");
        let original = r#"{"cells": [{"cell_type": "code", "source": ["import subprocess\n", "import os\n"]}]}"#;
        fs::write(&path, original).unwrap();

        let options = PatchOptions {
            dry_run: true,
            ..PatchOptions::default()
        };
        let report = patch_file(&path, &CellPatch::new("import subprocess", "import json\n"), options)
            .unwrap();

        assert!(!report.written);
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
        let diff = report.diff.unwrap();
        assert!(diff.contains("-import subprocess"));
        assert!(diff.contains("-import os"));
        assert!(diff.contains("+import json"));
    }

    #[test]
    fn test_patch_file_errors_leave_file_alone() {
        let dir = tempdir().unwrap();

        let missing = dir.path().join("missing.ipynb");
        let err = patch_file(&missing, &CellPatch::default(), PatchOptions::default()).unwrap_err();
        assert!(matches!(err, NotebookError::Io { .. }));
        assert!(!missing.exists());

        let broken = dir.path().join("broken.ipynb");
        fs::write(&broken, "not json").unwrap();
        let err = patch_file(&broken, &CellPatch::default(), PatchOptions::default()).unwrap_err();
        assert!(err.is_format_error());
        assert_eq!(err.path(), Some(&broken));
        assert_eq!(fs::read_to_string(&broken).unwrap(), "not json");
    }

    #[test]
    fn test_render_source_diff() {
        let diff = render_source_diff("a\nb\n", "a\nc\n");
        assert!(diff.starts_with("--- cell (before)\n+++ cell (after)\n"));
        assert!(diff.contains("-b\n"));
        assert!(diff.contains("+c\n"));
        assert!(render_source_diff("same\n", "same\n").is_empty());
    }
}
