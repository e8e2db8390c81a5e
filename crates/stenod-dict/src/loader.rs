use std::path::Path;

use serde_json::Value;

use crate::error::DictionaryError;
use crate::trie::Dictionary;

/// Outcome of loading one dictionary file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub loaded: usize,
    pub skipped: usize,
}

/// Load a JSON object of chord-path → value-string into the dictionary.
///
/// Structural mismatches (non-object root, non-string values) fail the
/// whole file with `InvalidJson`. Entries whose chord path or value fail
/// to parse are skipped with a warning so one bad entry cannot take the
/// whole dictionary down.
pub fn load_json_str(dict: &mut Dictionary, json: &str) -> Result<LoadStats, DictionaryError> {
    let root: Value =
        serde_json::from_str(json).map_err(|e| DictionaryError::InvalidJson(e.to_string()))?;

    let object = root
        .as_object()
        .ok_or_else(|| DictionaryError::InvalidJson("root is not an object".into()))?;

    let mut stats = LoadStats::default();
    for (path, value) in object {
        let raw = value.as_str().ok_or_else(|| {
            DictionaryError::InvalidJson(format!("value for {path:?} is not a string"))
        })?;

        match dict.insert(path, raw) {
            Ok(()) => stats.loaded += 1,
            Err(e) => {
                tracing::warn!(path = %path, value = raw, error = %e, "skipping dictionary entry");
                stats.skipped += 1;
            }
        }
    }
    Ok(stats)
}

pub fn load_json_file(
    dict: &mut Dictionary,
    path: impl AsRef<Path>,
) -> Result<LoadStats, DictionaryError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let stats = load_json_str(dict, &json)?;
    tracing::info!(
        path = %path.display(),
        loaded = stats.loaded,
        skipped = stats.skipped,
        "dictionary loaded"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_object_of_strings() {
        let mut dict = Dictionary::new();
        let stats = load_json_str(
            &mut dict,
            r#"{ "S": "Batata", "S/T/K": "Cebola", "*": "=undo" }"#,
        )
        .unwrap();
        assert_eq!(stats, LoadStats { loaded: 3, skipped: 0 });
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn non_string_value_is_invalid_json() {
        let mut dict = Dictionary::new();
        assert!(matches!(
            load_json_str(&mut dict, r#"{ "S": 3 }"#),
            Err(DictionaryError::InvalidJson(_))
        ));
        assert!(matches!(
            load_json_str(&mut dict, r#"[1, 2]"#),
            Err(DictionaryError::InvalidJson(_))
        ));
    }

    #[test]
    fn bad_entries_are_skipped_not_fatal() {
        let mut dict = Dictionary::new();
        let stats = load_json_str(
            &mut dict,
            r#"{ "S": "ok", "Q": "bad chord", "T": "{^unclosed" }"#,
        )
        .unwrap();
        assert_eq!(stats.loaded, 1);
        assert_eq!(stats.skipped, 2);
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "KAT": "cat" }}"#).unwrap();

        let mut dict = Dictionary::new();
        let stats = load_json_file(&mut dict, file.path()).unwrap();
        assert_eq!(stats.loaded, 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut dict = Dictionary::new();
        assert!(matches!(
            load_json_file(&mut dict, "/nonexistent/dict.json"),
            Err(DictionaryError::Io(_))
        ));
    }
}
