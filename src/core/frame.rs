// src/core/frame.rs
use crate::core::{Dataset, ExplainError, Result};
use ndarray::Axis;

/// Tabular rows with named columns.
///
/// Used both for the rows to explain and for the background sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    values: Dataset,
}

impl Frame {
    pub fn new(columns: Vec<String>, values: Dataset) -> Result<Self> {
        if columns.len() != values.ncols() {
            return Err(ExplainError::IncompatibleDimensions(format!(
                "Frame has {} column names but {} value columns.",
                columns.len(),
                values.ncols()
            )));
        }
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(ExplainError::InvalidInput(format!("Duplicate column '{}'.", name)));
            }
        }
        Ok(Frame { columns, values })
    }

    /// Builds a frame from row-major values.
    pub fn from_rows(columns: &[&str], n_rows: usize, values: Vec<f64>) -> Result<Self> {
        let values = Dataset::from_shape_vec((n_rows, columns.len()), values)?;
        Frame::new(columns.iter().map(|c| c.to_string()).collect(), values)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Dataset {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Projects the frame onto `columns`, in that order.
    pub fn select(&self, columns: &[String]) -> Result<Frame> {
        let indices = columns
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| ExplainError::MissingColumn(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        Frame::new(columns.to_vec(), self.values.select(Axis(1), &indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn select_reorders_and_drops() -> Result<()> {
        let frame = Frame::from_rows(&["a", "b", "c"], 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
        let projected = frame.select(&["c".to_string(), "a".to_string()])?;
        assert_eq!(projected.columns(), &["c".to_string(), "a".to_string()]);
        assert_eq!(projected.values(), &array![[3.0, 1.0], [6.0, 4.0]]);
        Ok(())
    }

    #[test]
    fn select_reports_missing_column() -> Result<()> {
        let frame = Frame::from_rows(&["a"], 1, vec![1.0])?;
        let err = frame.select(&["z".to_string()]).unwrap_err();
        assert!(matches!(err, ExplainError::MissingColumn(ref c) if c == "z"));
        Ok(())
    }

    #[test]
    fn rejects_bad_shapes_and_duplicates() {
        assert!(Frame::new(vec!["a".to_string()], Dataset::zeros((1, 2))).is_err());
        assert!(Frame::new(vec!["a".to_string(), "a".to_string()], Dataset::zeros((1, 2))).is_err());
    }
}
