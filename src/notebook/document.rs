use serde::Deserialize;

use crate::error::NotebookError;

/// Oldest notebook format the executor understands.
const MIN_NBFORMAT: u32 = 4;

#[derive(Debug, Deserialize)]
struct NotebookCell {
    cell_type: String,
    #[serde(default)]
    execution_count: Option<u64>,
}

/// The parts of a Jupyter notebook document the runner inspects.
#[derive(Debug, Deserialize)]
pub struct NotebookDocument {
    pub nbformat: u32,
    cells: Vec<NotebookCell>,
}

impl NotebookDocument {
    /// Parses and validates a notebook document.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::InvalidNotebook`] for malformed JSON, a missing
    /// `cells` array or an nbformat older than 4.
    pub fn parse(bytes: &[u8]) -> Result<Self, NotebookError> {
        let document: NotebookDocument = serde_json::from_slice(bytes)
            .map_err(|e| NotebookError::InvalidNotebook(e.to_string()))?;

        if document.nbformat < MIN_NBFORMAT {
            return Err(NotebookError::InvalidNotebook(format!(
                "nbformat {} is not supported (need {} or newer)",
                document.nbformat, MIN_NBFORMAT
            )));
        }
        Ok(document)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn code_cell_count(&self) -> usize {
        self.cells.iter().filter(|c| c.cell_type == "code").count()
    }

    /// Code cells carrying an execution count.
    pub fn executed_cell_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.cell_type == "code" && c.execution_count.is_some())
            .count()
    }
}
