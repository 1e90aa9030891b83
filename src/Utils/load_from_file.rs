//! Reading and writing the laboratory JSON documents.
//!
//! Every document is read wholesale. Decoding follows a fixed cascade:
//! UTF-8, then UTF-16 (byte order taken from the BOM, little-endian without
//! one), then latin-1 (each byte is the code point of the same value), then a
//! lossy UTF-8 decode that substitutes U+FFFD for invalid bytes.
//! The first decoding whose text parses as JSON wins.
use crate::lab_error::LabError;
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    /// ISO-8859-1, one byte per character
    Latin1,
    /// UTF-8 with invalid sequences replaced
    Lossy,
}

fn decode_utf8(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    std::str::from_utf8(bytes).ok().map(str::to_owned)
}

fn decode_utf16(bytes: &[u8]) -> Option<(String, TextEncoding)> {
    let (body, encoding) = if let Some(rest) = bytes.strip_prefix(b"\xFF\xFE") {
        (rest, TextEncoding::Utf16Le)
    } else if let Some(rest) = bytes.strip_prefix(b"\xFE\xFF") {
        (rest, TextEncoding::Utf16Be)
    } else {
        (bytes, TextEncoding::Utf16Le)
    };
    if body.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| match encoding {
            TextEncoding::Utf16Be => u16::from_be_bytes([pair[0], pair[1]]),
            _ => u16::from_le_bytes([pair[0], pair[1]]),
        })
        .collect();
    String::from_utf16(&units).ok().map(|text| (text, encoding))
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// All candidate decodings of `bytes`, in cascade order.
pub fn decode_candidates(bytes: &[u8]) -> Vec<(String, TextEncoding)> {
    let mut candidates = Vec::with_capacity(4);
    if let Some(text) = decode_utf8(bytes) {
        candidates.push((text, TextEncoding::Utf8));
    }
    if let Some(decoded) = decode_utf16(bytes) {
        candidates.push(decoded);
    }
    candidates.push((decode_latin1(bytes), TextEncoding::Latin1));
    candidates.push((
        String::from_utf8_lossy(bytes).into_owned(),
        TextEncoding::Lossy,
    ));
    candidates
}

/// Logs the line a JSON syntax error points at, with a caret under the column.
fn report_parse_error(file_name: &str, text: &str, e: &serde_json::Error) {
    error!(
        "Error parsing {} at line {}, column {}: {}",
        file_name,
        e.line(),
        e.column(),
        e
    );
    if let Some(problem_line) = text.lines().nth(e.line().saturating_sub(1)) {
        error!("Problematic line: {}", problem_line);
        if e.column() >= 1 && e.column() <= problem_line.len() {
            error!("{}", " ".repeat(e.column() - 1) + "^");
        }
    }
}

/// Parses raw bytes through the encoding cascade.
///
/// If strict UTF-8 decoding succeeded but no candidate parsed, the document is
/// reported as malformed JSON. If UTF-8 decoding failed too, it is an
/// encoding failure.
pub fn parse_json_bytes(file_name: &str, bytes: &[u8]) -> Result<(Value, TextEncoding), LabError> {
    let mut utf8_error: Option<(String, serde_json::Error)> = None;
    for (text, encoding) in decode_candidates(bytes) {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => {
                if encoding != TextEncoding::Utf8 {
                    warn!("{} decoded as {:?}", file_name, encoding);
                }
                return Ok((value, encoding));
            }
            Err(e) => {
                if encoding == TextEncoding::Utf8 {
                    utf8_error = Some((text, e));
                }
            }
        }
    }
    match utf8_error {
        Some((text, e)) => {
            report_parse_error(file_name, &text, &e);
            Err(LabError::malformed(file_name, e.to_string()))
        }
        None => {
            error!("{} could not be decoded", file_name);
            Err(LabError::EncodingFailure {
                file: file_name.to_string(),
            })
        }
    }
}

/// Handle on one JSON document.
pub struct LoadData {
    pub file_name: String,
}

impl LoadData {
    pub fn new(file_name: impl Into<String>) -> Self {
        LoadData {
            file_name: file_name.into(),
        }
    }

    /// Reads the document. `Ok(None)` when the file does not exist.
    pub fn load_value(&self) -> Result<Option<Value>, LabError> {
        let bytes = match fs::read(&self.file_name) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("{} not found, starting empty", self.file_name);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let (value, _) = parse_json_bytes(&self.file_name, &bytes)?;
        Ok(Some(value))
    }

    /// Reads a top-level JSON array. A missing file reads as an empty array.
    pub fn load_array(&self) -> Result<Vec<Value>, LabError> {
        match self.load_value()? {
            None => Ok(Vec::new()),
            Some(Value::Array(entries)) => {
                info!("{} entries read from {}", entries.len(), self.file_name);
                Ok(entries)
            }
            Some(_) => Err(LabError::malformed(
                &self.file_name,
                "top-level value is not an array",
            )),
        }
    }

    /// Writes `value` as four-space indented JSON, replacing the whole file.
    ///
    /// With `atomic` the text goes to a temporary file in the same directory
    /// which is then renamed over the target.
    pub fn save<T: Serialize + ?Sized>(&self, value: &T, atomic: bool) -> Result<(), LabError> {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        value.serialize(&mut serializer)?;

        let path = Path::new(&self.file_name);
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                fs::create_dir_all(dir)?;
                dir
            }
            _ => Path::new("."),
        };
        if atomic {
            let mut temp = NamedTempFile::new_in(parent)?;
            temp.write_all(&buffer)?;
            temp.flush()?;
            temp.persist(path).map_err(|e| LabError::Io(e.error))?;
        } else {
            fs::write(path, &buffer)?;
        }
        info!("{} written", self.file_name);
        Ok(())
    }
}

/// Checks that `entry` is an object carrying every key in `keys`.
pub fn require_keys(file_name: &str, index: usize, entry: &Value, keys: &[&str]) -> Result<(), LabError> {
    let object = entry.as_object().ok_or_else(|| {
        LabError::malformed(file_name, format!("entry {} is not an object", index))
    })?;
    if let Some(missing) = keys.iter().find(|key| !object.contains_key(**key)) {
        return Err(LabError::malformed(
            file_name,
            format!("entry {} is missing key '{}'", index, missing),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loader = LoadData::new(dir.path().join("reactivos.json").to_str().unwrap());
        assert!(loader.load_value().unwrap().is_none());
        assert!(loader.load_array().unwrap().is_empty());
    }

    #[test]
    fn test_utf8_with_bom() {
        let bytes = b"\xEF\xBB\xBF[1, 2]";
        let (value, encoding) = parse_json_bytes("x.json", bytes).unwrap();
        assert_eq!(value, json!([1, 2]));
        assert_eq!(encoding, TextEncoding::Utf8);
    }

    #[test]
    fn test_utf16_fallback() {
        let bytes = utf16le_with_bom(r#"[{"nombre": "ácido"}]"#);
        let (value, encoding) = parse_json_bytes("x.json", &bytes).unwrap();
        assert_eq!(encoding, TextEncoding::Utf16Le);
        assert_eq!(value[0]["nombre"], "ácido");
    }

    #[test]
    fn test_utf16_big_endian() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "[true]".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        let (value, encoding) = parse_json_bytes("x.json", &bytes).unwrap();
        assert_eq!(encoding, TextEncoding::Utf16Be);
        assert_eq!(value, json!([true]));
    }

    #[test]
    fn test_latin1_fallback_keeps_accents() {
        let bytes = b"[{\"nombre\": \"\xc1cido sulf\xfarico\"}]";
        let (value, encoding) = parse_json_bytes("x.json", bytes).unwrap();
        assert_eq!(encoding, TextEncoding::Latin1);
        assert_eq!(value[0]["nombre"], "Ácido sulfúrico");
    }

    #[test]
    fn test_candidates_follow_cascade_order() {
        let bytes = b"[\"caf\xe9\"]";
        let encodings: Vec<TextEncoding> = decode_candidates(bytes).into_iter().map(|(_, e)| e).collect();
        assert_eq!(
            encodings,
            vec![TextEncoding::Utf16Le, TextEncoding::Latin1, TextEncoding::Lossy]
        );
        let (lossy, _) = decode_candidates(bytes).pop().unwrap();
        assert_eq!(lossy, "[\"caf\u{FFFD}\"]");
    }

    #[test]
    fn test_syntax_error_is_malformed() {
        let err = parse_json_bytes("x.json", b"[1, 2").unwrap_err();
        assert!(matches!(err, LabError::MalformedData { .. }));
    }

    #[test]
    fn test_undecodable_garbage_is_encoding_failure() {
        let err = parse_json_bytes("x.json", b"\xff\xff\xfe").unwrap_err();
        assert!(matches!(err, LabError::EncodingFailure { .. }));
    }

    #[test]
    fn test_non_array_is_malformed() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"{\"a\": 1}").unwrap();
        let loader = LoadData::new(temp_file.path().to_str().unwrap());
        assert!(matches!(
            loader.load_array(),
            Err(LabError::MalformedData { .. })
        ));
    }

    #[test]
    fn test_save_creates_directories_and_indents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("resultados.json");
        let loader = LoadData::new(path.to_str().unwrap());
        loader.save(&json!([{"experimento": "e1"}]), true).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n        \"experimento\": \"e1\""));
        assert_eq!(loader.load_array().unwrap().len(), 1);

        loader.save(&json!([]), false).unwrap();
        assert!(loader.load_array().unwrap().is_empty());
    }

    #[test]
    fn test_require_keys() {
        let entry = json!({"experimento": "e1", "resultado": "ok"});
        assert!(require_keys("r.json", 0, &entry, &["experimento", "resultado"]).is_ok());
        let err = require_keys("r.json", 3, &json!({"experimento": "e1"}), &["experimento", "resultado"])
            .unwrap_err();
        assert!(err.to_string().contains("entry 3 is missing key 'resultado'"));
        assert!(require_keys("r.json", 0, &json!(5), &["a"]).is_err());
    }
}
