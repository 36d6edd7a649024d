//! Whole-document JSON persistence

use gtforge_core::{Error, Result};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs;
use std::path::Path;

/// Indentation used for dataset JSON documents
const INDENT: &[u8] = b" ";

/// Serialize `value` as indented UTF-8 JSON
pub fn to_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(INDENT);
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Replace the JSON document at `path` with `value`
///
/// The document is written to a sibling temporary file and renamed over the
/// target, so readers only ever see a complete document.
pub fn write_json_document<T: Serialize + ?Sized, P: AsRef<Path>>(
    value: &T,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    let bytes = to_json_bytes(value)?;

    let mut tmp_name = path
        .file_name()
        .ok_or_else(|| Error::InvalidData(format!("{} is not a file path", path.display())))?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, &bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_indent_and_key_order() {
        let mut doc = BTreeMap::new();
        doc.insert(10u32, vec![1]);
        doc.insert(2u32, vec![3]);

        let text = String::from_utf8(to_json_bytes(&doc).unwrap()).unwrap();
        assert_eq!(text, "{\n \"2\": [\n  3\n ],\n \"10\": [\n  1\n ]\n}");
    }

    #[test]
    fn test_document_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene_gt.json");

        write_json_document(&vec![1, 2, 3], &path).unwrap();
        write_json_document(&vec![4], &path).unwrap();

        let back: Vec<i32> = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back, vec![4]);
        assert!(!dir.path().join("scene_gt.json.tmp").exists());
    }
}
