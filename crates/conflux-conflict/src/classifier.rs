//! Conflict name recognition
//!
//! The synchronization tool names a conflict copy by inserting a marker
//! before the original's last extension:
//!
//! ```text
//! report.docx  ->  report.sync-conflict-20240315-142501-ABCDEF7.docx
//! Makefile     ->  Makefile.sync-conflict-20240315-142501-ABCDEF7
//! ```
//!
//! A conflict of a conflict copy carries several markers. All of them are
//! stripped to find the original; the last one describes the copy itself.

use std::path::Path;

use conflux_core::domain::{ConflictName, ConflictTimestamp, DeviceId};
use tracing::trace;

/// Literal that introduces a conflict marker
pub const CONFLICT_MARKER: &str = ".sync-conflict-";

/// A marker found inside a file name, as byte offsets into the name
#[derive(Debug, Clone)]
struct Marker {
    start: usize,
    end: usize,
    timestamp: ConflictTimestamp,
    device: DeviceId,
}

/// Recognizes conflict copies by name alone
pub struct PathClassifier;

impl PathClassifier {
    /// Classifies a path
    ///
    /// Returns `None` for anything that is not a conflict copy, including
    /// names whose marker carries an impossible date. Never touches the
    /// filesystem.
    pub fn classify(path: &Path) -> Option<ConflictName> {
        let file_name = path.file_name()?.to_str()?;
        let markers = Self::markers(file_name);
        let top = markers.last()?.clone();

        let mut original = String::with_capacity(file_name.len());
        let mut cursor = 0;
        for marker in &markers {
            original.push_str(&file_name[cursor..marker.start]);
            cursor = marker.end;
        }
        original.push_str(&file_name[cursor..]);

        if original.is_empty() {
            return None;
        }

        let nesting = u8::try_from(markers.len()).unwrap_or(u8::MAX);
        let name = ConflictName::new(
            path.to_path_buf(),
            path.with_file_name(&original),
            top.timestamp,
            top.device,
            nesting,
        )
        .ok()?;

        trace!(
            path = %path.display(),
            original = %original,
            nesting,
            "Classified conflict copy"
        );
        Some(name)
    }

    /// Whether a path looks like a conflict copy
    pub fn is_conflict(path: &Path) -> bool {
        Self::classify(path).is_some()
    }

    /// Builds the name the synchronization tool would give a conflict copy
    ///
    /// Inverse of [`classify`](Self::classify) for single-marker names.
    pub fn conflict_file_name(
        original_name: &str,
        timestamp: &ConflictTimestamp,
        device: &DeviceId,
    ) -> String {
        let (stem, ext) = split_extension(original_name);
        format!("{stem}{CONFLICT_MARKER}{timestamp}-{device}{ext}")
    }

    /// Finds every well-formed marker in a file name, left to right
    ///
    /// Occurrences of the marker literal that are not followed by a valid
    /// timestamp and device id are treated as ordinary text.
    fn markers(name: &str) -> Vec<Marker> {
        let mut found = Vec::new();
        let mut search_from = 0;

        while let Some(offset) = name[search_from..].find(CONFLICT_MARKER) {
            let start = search_from + offset;
            match parse_marker_body(name, start + CONFLICT_MARKER.len()) {
                Some((end, timestamp, device)) => {
                    found.push(Marker {
                        start,
                        end,
                        timestamp,
                        device,
                    });
                    search_from = end;
                }
                None => search_from = start + 1,
            }
        }

        found
    }
}

/// Parses `YYYYMMDD[-HHMMSS]-DEVICE` starting at byte `pos`
///
/// The device id must be followed by `.` or the end of the name. Returns the
/// byte offset just past the device id.
fn parse_marker_body(name: &str, pos: usize) -> Option<(usize, ConflictTimestamp, DeviceId)> {
    let bytes = name.as_bytes();

    let date_end = pos + 8;
    let date = name.get(pos..date_end)?;
    if bytes.get(date_end) != Some(&b'-') {
        return None;
    }
    let mut cursor = date_end + 1;

    // HHMMSS is only a time when another '-' follows; otherwise it is the device id
    let time = match name.get(cursor..cursor + 6) {
        Some(t) if t.bytes().all(|b| b.is_ascii_digit()) && bytes.get(cursor + 6) == Some(&b'-') => {
            cursor += 7;
            Some(t)
        }
        _ => None,
    };

    let device_len = bytes[cursor..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    let device_end = cursor + device_len;
    match bytes.get(device_end) {
        None | Some(b'.') => {}
        Some(_) => return None,
    }

    let timestamp = ConflictTimestamp::parse(date, time).ok()?;
    let device = DeviceId::new(&name[cursor..device_end]).ok()?;
    Some((device_end, timestamp, device))
}

/// Splits a name at its last extension, the way the synchronization tool does
///
/// A leading-dot name such as `.bashrc` is all extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) => (&name[..dot], &name[dot..]),
        None => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use proptest::prelude::*;

    use super::*;

    fn classify(name: &str) -> Option<ConflictName> {
        PathClassifier::classify(&PathBuf::from("/sync/docs").join(name))
    }

    #[test]
    fn test_classify_standard_name() {
        let name = classify("report.sync-conflict-20240315-142501-ABCDEF7.docx").unwrap();
        assert_eq!(name.original_path(), Path::new("/sync/docs/report.docx"));
        assert_eq!(name.timestamp().token(), "20240315-142501");
        assert_eq!(name.device().as_str(), "ABCDEF7");
        assert_eq!(name.nesting(), 1);
    }

    #[test]
    fn test_classify_date_only_with_lowercase_device() {
        let name = classify("a.sync-conflict-20240101-device1.txt").unwrap();
        assert_eq!(name.original_path(), Path::new("/sync/docs/a.txt"));
        assert!(!name.timestamp().has_time());
        assert_eq!(name.device().as_str(), "device1");
    }

    #[test]
    fn test_classify_without_extension() {
        let name = classify("Makefile.sync-conflict-20240315-142501-ABCDEF7").unwrap();
        assert_eq!(name.original_path(), Path::new("/sync/docs/Makefile"));
    }

    #[test]
    fn test_classify_multi_dot_extension() {
        let name = classify("archive.tar.sync-conflict-20240315-142501-ABCDEF7.gz").unwrap();
        assert_eq!(name.original_path(), Path::new("/sync/docs/archive.tar.gz"));
    }

    #[test]
    fn test_classify_dotfile() {
        let name = classify(".sync-conflict-20240315-142501-ABCDEF7.bashrc").unwrap();
        assert_eq!(name.original_path(), Path::new("/sync/docs/.bashrc"));
    }

    #[test]
    fn test_classify_nested_uses_last_marker() {
        let name = classify(
            "notes.sync-conflict-20240101-101010-AAAAAAA.sync-conflict-20240202-202020-BBBBBBB.md",
        )
        .unwrap();
        assert_eq!(name.original_path(), Path::new("/sync/docs/notes.md"));
        assert_eq!(name.device().as_str(), "BBBBBBB");
        assert_eq!(name.timestamp().token(), "20240202-202020");
        assert_eq!(name.nesting(), 2);
        assert!(name.is_nested());
    }

    #[test]
    fn test_six_digit_device_is_not_a_time() {
        let name = classify("a.sync-conflict-20240101-123456.txt").unwrap();
        assert_eq!(name.device().as_str(), "123456");
        assert!(!name.timestamp().has_time());
    }

    #[test]
    fn test_non_conflicts() {
        for name in [
            "report.docx",
            "report.sync-conflict.docx",
            "report.sync-conflict-2024-ABC.docx",
            "report.sync-conflict-20241345-101010-ABC.docx",
            "report.sync-conflict-20240101-101010-.docx",
            "report.sync-conflict-20240101-101010-AB_CD.docx",
            "report.sync-conflict-20240101",
            ".sync-conflict-20240101-101010-ABC",
            "sync-conflict-20240101-101010-ABC.txt",
            "",
        ] {
            assert!(classify(name).is_none(), "{name:?} should not classify");
        }
    }

    #[test]
    fn test_invalid_marker_before_valid_one_is_kept_as_text() {
        let name = classify("x.sync-conflict-bad.sync-conflict-20240101-D1.txt").unwrap();
        assert_eq!(
            name.original_path(),
            Path::new("/sync/docs/x.sync-conflict-bad.txt")
        );
        assert_eq!(name.nesting(), 1);
    }

    #[test]
    fn test_non_utf8_name_is_not_a_conflict() {
        #[cfg(unix)]
        {
            use std::ffi::OsStr;
            use std::os::unix::ffi::OsStrExt;
            let path = Path::new("/sync").join(OsStr::from_bytes(b"a\xff.sync-conflict-20240101-D1.txt"));
            assert!(PathClassifier::classify(&path).is_none());
        }
    }

    #[test]
    fn test_conflict_file_name() {
        let ts = ConflictTimestamp::parse("20240315", Some("142501")).unwrap();
        let device = DeviceId::new("ABCDEF7").unwrap();
        assert_eq!(
            PathClassifier::conflict_file_name("report.docx", &ts, &device),
            "report.sync-conflict-20240315-142501-ABCDEF7.docx"
        );
        assert_eq!(
            PathClassifier::conflict_file_name("Makefile", &ts, &device),
            "Makefile.sync-conflict-20240315-142501-ABCDEF7"
        );
        assert_eq!(
            PathClassifier::conflict_file_name(".bashrc", &ts, &device),
            ".sync-conflict-20240315-142501-ABCDEF7.bashrc"
        );
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            stem in "[a-zA-Z0-9_ ]{1,12}",
            ext in proptest::option::of("[a-z]{1,4}"),
            year in 2000u32..2100,
            month in 1u32..=12,
            day in 1u32..=28,
            time in proptest::option::of((0u32..24, 0u32..60, 0u32..60)),
            device in "[A-Z0-9]{1,8}",
        ) {
            let original = match &ext {
                Some(ext) => format!("{stem}.{ext}"),
                None => stem.clone(),
            };
            let date = format!("{year:04}{month:02}{day:02}");
            let time = time.map(|(h, m, s)| format!("{h:02}{m:02}{s:02}"));
            let ts = ConflictTimestamp::parse(&date, time.as_deref()).unwrap();
            let device = DeviceId::new(device).unwrap();

            let conflict = PathClassifier::conflict_file_name(&original, &ts, &device);
            let name = classify(&conflict).expect("generated name must classify");

            prop_assert_eq!(name.original_path(), PathBuf::from("/sync/docs").join(&original));
            prop_assert_eq!(name.timestamp(), ts);
            prop_assert_eq!(name.device(), &device);
        }

        #[test]
        fn prop_never_panics(name in "\\PC{0,64}") {
            let _ = PathClassifier::classify(Path::new(&name));
        }

        #[test]
        fn prop_never_panics_near_marker(prefix in "[a-z]{0,4}", body in "[0-9A-Za-z.\\-]{0,24}") {
            let name = format!("{prefix}{CONFLICT_MARKER}{body}");
            if let Some(parsed) = PathClassifier::classify(Path::new(&name)) {
                prop_assert_ne!(parsed.conflict_path(), parsed.original_path());
            }
        }
    }
}
