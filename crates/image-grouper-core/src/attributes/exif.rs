use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::types::CaptureTime;

/// The EXIF fields the grouping conditions consult
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExifInfo {
    /// Camera model, empty when unknown
    pub camera_model: String,
    pub capture_time: CaptureTime,
}

impl Default for ExifInfo {
    fn default() -> Self {
        Self {
            camera_model: String::new(),
            capture_time: CaptureTime::Missing,
        }
    }
}

/// Read EXIF metadata from an image file.
///
/// Never fails: an unreadable file or one without EXIF yields empty strings
/// and a missing capture time.
pub fn read_exif(path: &Path) -> ExifInfo {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return ExifInfo::default(),
    };
    let mut buf_reader = BufReader::new(file);

    let exif = match Reader::new().read_from_container(&mut buf_reader) {
        Ok(exif) => exif,
        Err(_) => return ExifInfo::default(),
    };

    let text = |tag: Tag| -> String {
        exif.get_field(tag, In::PRIMARY)
            .and_then(|field| field_to_string(&field.value))
            .unwrap_or_default()
    };

    // The first date tag that is present wins, even if it does not parse
    let date = [Tag::DateTimeOriginal, Tag::DateTime, Tag::DateTimeDigitized]
        .into_iter()
        .map(|tag| text(tag))
        .find(|s| !s.is_empty())
        .unwrap_or_default();

    ExifInfo {
        camera_model: text(Tag::Model),
        capture_time: CaptureTime::from_exif(&date),
    }
}

/// Convert an ASCII EXIF field to a trimmed string
fn field_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(vec) => vec.first().map(|ascii_val| {
            String::from_utf8_lossy(ascii_val)
                .trim_end_matches('\0')
                .trim()
                .to_string()
        }),
        _ => None,
    }
}
