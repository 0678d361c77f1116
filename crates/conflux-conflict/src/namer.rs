//! Sibling names for keep-both resolution
//!
//! A kept conflict copy is renamed to
//! `<stem> (conflicted copy YYYY-MM-DD <device>)<ext>`, built from the date
//! and device in its own conflict marker, so the same tree always yields the
//! same names.

use conflux_core::domain::{ConflictTimestamp, DeviceId};

/// Highest numbered suffix tried before giving up
const MAX_SUFFIX: u32 = 99;

/// Generates keep-both file names
pub struct ConflictNamer;

impl ConflictNamer {
    /// Generates a keep-both filename
    ///
    /// Given "report.docx", produces "report (conflicted copy 2024-03-15 ABCDEF7).docx".
    pub fn generate(original_name: &str, timestamp: &ConflictTimestamp, device: &DeviceId) -> String {
        let label = format!("conflicted copy {} {device}", timestamp.date_label());
        let (stem, ext) = split(original_name);
        format!("{stem} ({label}){ext}")
    }

    /// Generates a name for which `exists` returns false
    ///
    /// Collisions get " 2" through " 99" before the extension. Returns `None`
    /// when every candidate is taken.
    pub fn generate_unique<F>(
        original_name: &str,
        timestamp: &ConflictTimestamp,
        device: &DeviceId,
        mut exists: F,
    ) -> Option<String>
    where
        F: FnMut(&str) -> bool,
    {
        let candidate = Self::generate(original_name, timestamp, device);
        if !exists(&candidate) {
            return Some(candidate);
        }

        let (stem, ext) = split(&candidate);
        (2..=MAX_SUFFIX)
            .map(|i| format!("{stem} {i}{ext}"))
            .find(|numbered| !exists(numbered))
    }
}

/// Splits at the last dot; a leading dot is part of the stem
fn split(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> ConflictTimestamp {
        ConflictTimestamp::parse("20240315", Some("142501")).unwrap()
    }

    fn device() -> DeviceId {
        DeviceId::new("ABCDEF7").unwrap()
    }

    #[test]
    fn test_generate_with_extension() {
        assert_eq!(
            ConflictNamer::generate("report.docx", &ts(), &device()),
            "report (conflicted copy 2024-03-15 ABCDEF7).docx"
        );
    }

    #[test]
    fn test_generate_without_extension() {
        assert_eq!(
            ConflictNamer::generate("Makefile", &ts(), &device()),
            "Makefile (conflicted copy 2024-03-15 ABCDEF7)"
        );
    }

    #[test]
    fn test_generate_dotfile() {
        assert_eq!(
            ConflictNamer::generate(".bashrc", &ts(), &device()),
            ".bashrc (conflicted copy 2024-03-15 ABCDEF7)"
        );
    }

    #[test]
    fn test_generate_with_multiple_dots() {
        let name = ConflictNamer::generate("archive.tar.gz", &ts(), &device());
        assert_eq!(name, "archive.tar (conflicted copy 2024-03-15 ABCDEF7).gz");
    }

    #[test]
    fn test_generate_is_deterministic() {
        assert_eq!(
            ConflictNamer::generate("test.txt", &ts(), &device()),
            ConflictNamer::generate("test.txt", &ts(), &device())
        );
    }

    #[test]
    fn test_generate_unique_with_collision() {
        let taken = "test (conflicted copy 2024-03-15 ABCDEF7).txt";
        let name = ConflictNamer::generate_unique("test.txt", &ts(), &device(), |n| n == taken);
        assert_eq!(
            name.as_deref(),
            Some("test (conflicted copy 2024-03-15 ABCDEF7) 2.txt")
        );
    }

    #[test]
    fn test_generate_unique_exhausted() {
        assert!(ConflictNamer::generate_unique("test.txt", &ts(), &device(), |_| true).is_none());
    }
}
