// SPDX-License-Identifier: GPL-3.0-only

//! Output locations and capture file naming

use crate::config::FileNaming;
use crate::constants::output;
use crate::pipelines::persist::SequenceKey;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// `~/Pictures/Panorama`, or under the home directory when there is no
/// pictures directory
pub fn default_output_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(output::DEFAULT_SAVE_FOLDER)
}

/// File stem for one artifact of a capture
///
/// - `Sequence`: `Color-003-012`
/// - `Timestamp`: `Color-20240131_142501_337`
pub fn capture_stem(
    kind: &str,
    naming: FileNaming,
    key: SequenceKey,
    at: &DateTime<Local>,
) -> String {
    match naming {
        FileNaming::Sequence => format!(
            "{}-{:03}-{:03}",
            kind, key.panorama_index, key.image_index
        ),
        FileNaming::Timestamp => format!("{}-{}", kind, at.format("%Y%m%d_%H%M%S_%3f")),
    }
}

/// `dir/stem.extension`
pub fn capture_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}.{}", stem, extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sequence_stem_is_zero_padded() {
        let at = Local::now();
        let key = SequenceKey {
            panorama_index: 3,
            image_index: 12,
        };
        assert_eq!(capture_stem("Depth", FileNaming::Sequence, key, &at), "Depth-003-012");
    }

    #[test]
    fn test_timestamp_stem() {
        let at = Local
            .with_ymd_and_hms(2024, 1, 31, 14, 25, 1)
            .single()
            .unwrap();
        let stem = capture_stem("Color", FileNaming::Timestamp, SequenceKey::default(), &at);
        assert_eq!(stem, "Color-20240131_142501_000");
    }

    #[test]
    fn test_default_dir_ends_with_folder() {
        assert!(default_output_dir().ends_with(output::DEFAULT_SAVE_FOLDER));
    }
}
