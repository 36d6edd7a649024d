//! Plain-text 4x4 pose matrices

use gtforge_core::{Error, Result, Transform3D};
use std::fs;
use std::path::Path;

/// Format a transform as four space-delimited rows with six decimals
pub fn format_matrix(transform: &Transform3D) -> String {
    transform
        .to_rows()
        .iter()
        .map(|row| {
            let cells: Vec<String> = row.iter().map(|v| format!("{v:.6}")).collect();
            cells.join(" ") + "\n"
        })
        .collect()
}

/// Write a transform as a text matrix
pub fn write_matrix<P: AsRef<Path>>(transform: &Transform3D, path: P) -> Result<()> {
    fs::write(path, format_matrix(transform))?;
    Ok(())
}

/// Read a text matrix written by [`write_matrix`]
pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<Transform3D> {
    let text = fs::read_to_string(path)?;
    let mut rows = [[0.0; 4]; 4];
    let mut count = 0;

    for (line_idx, line) in text.lines().filter(|l| !l.trim().is_empty()).enumerate() {
        if line_idx >= 4 {
            return Err(Error::parse(line_idx + 1, "matrix has more than 4 rows"));
        }
        let values: Vec<f64> = line
            .split_whitespace()
            .map(|v| v.parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::parse(line_idx + 1, e.to_string()))?;
        if values.len() != 4 {
            return Err(Error::parse(
                line_idx + 1,
                format!("expected 4 values, found {}", values.len()),
            ));
        }
        rows[line_idx].copy_from_slice(&values);
        count += 1;
    }

    if count != 4 {
        return Err(Error::InvalidData(format!("expected 4 matrix rows, found {count}")));
    }
    Ok(Transform3D::from_rows(&rows))
}
