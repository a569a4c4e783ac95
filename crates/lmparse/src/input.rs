//! Reading a captured log page.
//!
//! Hexdump and binary captures hold the raw page and still need decoding.
//! With the `serde` feature, a JSON capture of `nvme ocp latency-monitor-log
//! -o json` is read as an already decoded [Record].

use std::{fs, path::Path};

use hex::FromHex;
use snafu::ResultExt;
use tracing::debug;

use crate::{
    errors::{InputError, ReadLogSnafu},
    value::Record,
};

/// How a log capture is encoded on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogSource {
    /// Text hexdump, e.g. the output of `nvme get-log` or `xxd`.
    #[default]
    Hexdump,
    /// Raw binary log page.
    Binary,
    /// Structured log printed by `nvme ocp latency-monitor-log -o json`.
    #[cfg(feature = "serde")]
    Json,
}

/// Contents of a log capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    /// Raw log page bytes.
    Page(Vec<u8>),
    /// A log the capturing tool already decoded.
    Decoded(Record),
}

/// Extracts the bytes of a text hexdump.
///
/// Every whitespace-delimited token made of exactly two hex digits is one byte.
/// Offset columns, ASCII columns and anything else are ignored.
pub fn parse_hexdump(text: &str) -> Vec<u8> {
    text.split_whitespace()
        .filter(|token| token.len() == 2)
        .filter_map(|token| <[u8; 1]>::from_hex(token).ok())
        .map(|[byte]| byte)
        .collect()
}

/// Parses a JSON log capture into a [Record], keeping the document's key order.
///
/// Unsigned integers become [Value::Int](crate::value::Value::Int), objects
/// become nested records and arrays records keyed by index. Any other scalar
/// is kept as text.
#[cfg(feature = "serde")]
pub fn parse_json_log(text: &str) -> Result<Record, InputError> {
    use crate::errors::JsonLogSnafu;

    let document: serde_json::Value =
        serde_json::from_str(text).map_err(|e| InputError::JsonLog {
            message: e.to_string(),
        })?;

    match json::into_value(document) {
        crate::value::Value::Record(record) => Ok(record),
        _ => JsonLogSnafu {
            message: "top level is not an object",
        }
        .fail(),
    }
}

#[cfg(feature = "serde")]
mod json {
    use serde_json::Value as Json;

    use crate::value::{Record, Value};

    pub(super) fn into_value(json: Json) -> Value {
        match json {
            Json::Number(n) => match n.as_u64() {
                Some(v) => Value::Int(v.into()),
                None => Value::Text(n.to_string()),
            },
            Json::String(s) => Value::Text(s),
            Json::Bool(b) => Value::Text(b.to_string()),
            Json::Null => Value::Text("null".to_string()),
            Json::Array(items) => Value::Record(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (i.to_string(), into_value(item)))
                    .collect::<Record>(),
            ),
            Json::Object(map) => Value::Record(
                map.into_iter()
                    .map(|(key, item)| (key, into_value(item)))
                    .collect::<Record>(),
            ),
        }
    }
}

/// Reads the log capture at `path`.
pub fn read_log(path: impl AsRef<Path>, source: LogSource) -> Result<Capture, InputError> {
    let path = path.as_ref();

    let capture = match source {
        LogSource::Hexdump => {
            let text = fs::read_to_string(path).context(ReadLogSnafu { path })?;
            Capture::Page(parse_hexdump(&text))
        }
        LogSource::Binary => Capture::Page(fs::read(path).context(ReadLogSnafu { path })?),
        #[cfg(feature = "serde")]
        LogSource::Json => {
            let text = fs::read_to_string(path).context(ReadLogSnafu { path })?;
            Capture::Decoded(parse_json_log(&text)?)
        }
    };

    match &capture {
        Capture::Page(bytes) => {
            debug!(path = %path.display(), ?source, len = bytes.len(), "read log capture")
        }
        Capture::Decoded(record) => {
            debug!(path = %path.display(), ?source, keys = record.len(), "read decoded log capture")
        }
    }

    Ok(capture)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("lmparse-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parse_hexdump() {
        let dump = "0000: 01 00 0a 00 ff FF 7e 00  \"......~.\"\n\
                    0010: 3a\n";
        assert_eq!(
            parse_hexdump(dump),
            vec![0x01, 0x00, 0x0a, 0x00, 0xff, 0xff, 0x7e, 0x00, 0x3a]
        );
    }

    #[test]
    fn test_parse_hexdump_skips_non_byte_tokens() {
        assert_eq!(parse_hexdump("0g 123 ab a 0x1 cd"), vec![0xab, 0xcd]);
        assert!(parse_hexdump("").is_empty());
    }

    #[test]
    fn test_read_log_missing_file() {
        let err = read_log("/nonexistent/latency.log", LogSource::Binary).unwrap_err();
        assert!(matches!(err, InputError::ReadLog { .. }));
    }

    #[test]
    fn test_read_log() {
        let dir = scratch_dir("input");

        let text = dir.join("page.txt");
        fs::write(&text, "00: 12 34\n").unwrap();
        assert_eq!(
            read_log(&text, LogSource::Hexdump).unwrap(),
            Capture::Page(vec![0x12, 0x34])
        );

        let raw = dir.join("page.bin");
        fs::write(&raw, [0x12, 0x34, 0x0a]).unwrap();
        assert_eq!(
            read_log(&raw, LogSource::Binary).unwrap(),
            Capture::Page(vec![0x12, 0x34, 0x0a])
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[cfg(feature = "serde")]
    mod json_capture {
        use super::*;
        use crate::value::Value;

        const CAPTURE: &str = r#"{
            "Feature Status": 7,
            "Active Bucket Timer": 60,
            "Active Threshold A": "5ms",
            "Active Bucket Counter: Bucket 0": {"Read": 0, "Write": 3, "Trim": 0},
            "Static Measured Latency": [12, -1, 1.5, null, true]
        }"#;

        #[test]
        fn test_parse_json_log() {
            let record = parse_json_log(CAPTURE).unwrap();

            let keys: Vec<&str> = record.keys().map(String::as_str).collect();
            assert_eq!(
                keys,
                vec![
                    "Feature Status",
                    "Active Bucket Timer",
                    "Active Threshold A",
                    "Active Bucket Counter: Bucket 0",
                    "Static Measured Latency",
                ]
            );
            assert_eq!(record["Feature Status"], Value::Int(7));
            assert_eq!(record["Active Threshold A"], Value::Text("5ms".to_string()));

            let bucket = record["Active Bucket Counter: Bucket 0"].as_record().unwrap();
            assert_eq!(bucket["Write"], Value::Int(3));

            let latency = record["Static Measured Latency"].as_record().unwrap();
            assert_eq!(latency["0"], Value::Int(12));
            assert_eq!(latency["1"], Value::Text("-1".to_string()));
            assert_eq!(latency["2"], Value::Text("1.5".to_string()));
            assert_eq!(latency["3"], Value::Text("null".to_string()));
            assert_eq!(latency["4"], Value::Text("true".to_string()));
        }

        #[test]
        fn test_parse_json_log_rejects_non_objects() {
            assert!(matches!(
                parse_json_log("[1, 2]"),
                Err(InputError::JsonLog { .. })
            ));
            assert!(matches!(
                parse_json_log("01 02 03"),
                Err(InputError::JsonLog { .. })
            ));
        }

        #[test]
        fn test_read_json_log() {
            let dir = scratch_dir("json-input");
            let path = dir.join("lm.json");
            fs::write(&path, CAPTURE).unwrap();

            let Capture::Decoded(record) = read_log(&path, LogSource::Json).unwrap() else {
                panic!("JSON capture should be decoded");
            };
            assert_eq!(record["Active Bucket Timer"], Value::Int(60));

            fs::remove_dir_all(&dir).unwrap();
        }
    }
}
