use std::path::{Path, PathBuf};

use super::DatasetError;

/// One row of the index table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePair {
    pub data_path: PathBuf,
    pub target_path: PathBuf,
}

/// Two-column table mapping row `i` to its (data, target) array paths.
///
/// The on-disk form is CSV with a header row; only the first two columns of
/// each following row are read. Paths are used as written.
#[derive(Debug, Clone, Default)]
pub struct IndexTable {
    rows: Vec<SamplePair>,
}

impl IndexTable {
    pub fn from_pairs(rows: Vec<SamplePair>) -> Self {
        Self { rows }
    }

    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let text = std::fs::read_to_string(path).map_err(|source| DatasetError::ReadIndex {
            path: path.to_path_buf(),
            source,
        })?;
        let mut rows = Vec::new();
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());
        // Header.
        lines.next();
        for (line_idx, line) in lines {
            let fields = split_fields(line);
            let (Some(data), Some(target)) = (fields.first(), fields.get(1)) else {
                return Err(DatasetError::IndexRow {
                    path: path.to_path_buf(),
                    line: line_idx + 1,
                });
            };
            if data.is_empty() || target.is_empty() {
                return Err(DatasetError::IndexRow {
                    path: path.to_path_buf(),
                    line: line_idx + 1,
                });
            }
            rows.push(SamplePair {
                data_path: PathBuf::from(data),
                target_path: PathBuf::from(target),
            });
        }
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SamplePair> {
        self.rows.get(index)
    }
}

/// Split one CSV row. Commas inside double quotes belong to the field and
/// `""` inside quotes is a literal quote. Unquoted fields are trimmed.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut was_quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' if field.trim().is_empty() => {
                field.clear();
                quoted = true;
                was_quoted = true;
            }
            ',' if !quoted => {
                fields.push(finish_field(&mut field, was_quoted));
                was_quoted = false;
            }
            _ => field.push(ch),
        }
    }
    fields.push(finish_field(&mut field, was_quoted));
    fields
}

fn finish_field(field: &mut String, was_quoted: bool) -> String {
    let done = std::mem::take(field);
    if was_quoted { done } else { done.trim().to_string() }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn header_is_skipped_and_rows_resolve() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("train.csv");
        std::fs::write(
            &path,
            "data,target\n/a/d0.npy,/a/t0.npy\n\"/a/d1.npy\", /a/t1.npy\n\n",
        )
        .unwrap();
        let table = IndexTable::load(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1).unwrap().data_path, PathBuf::from("/a/d1.npy"));
        assert_eq!(table.get(1).unwrap().target_path, PathBuf::from("/a/t1.npy"));
        assert!(table.get(2).is_none());
    }

    #[test]
    fn quoted_paths_keep_their_commas() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quoted.csv");
        std::fs::write(
            &path,
            "data,target\n\"/rooms/a,b/d0.npy\",\"/rooms/say \"\"hi\"\".npy\"\n",
        )
        .unwrap();
        let table = IndexTable::load(&path).unwrap();
        let row = table.get(0).unwrap();
        assert_eq!(row.data_path, PathBuf::from("/rooms/a,b/d0.npy"));
        assert_eq!(row.target_path, PathBuf::from("/rooms/say \"hi\".npy"));
    }

    #[test]
    fn single_column_row_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "data,target\n/a/d0.npy\n").unwrap();
        assert!(matches!(
            IndexTable::load(&path),
            Err(DatasetError::IndexRow { line: 2, .. })
        ));
    }
}
