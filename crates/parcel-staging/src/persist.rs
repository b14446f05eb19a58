//! 待提交变更的持久化
//!
//! 会话中断时把暂存区写成 JSON，下次启动时恢复。格式：
//!
//! ```json
//! { "format": "parcel-staging", "version": 1, "saved_at": "...", "entries": [...] }
//! ```

use crate::buffer::{StagedEntry, StagingBuffer};
use crate::error::StagingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// 格式标识
const FORMAT_TAG: &str = "parcel-staging";

/// 当前格式版本
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PendingFile {
    format: String,
    version: u32,
    saved_at: DateTime<Utc>,
    entries: Vec<StagedEntry>,
}

/// 保存暂存区
pub fn save(buffer: &StagingBuffer, path: &Path) -> Result<(), StagingError> {
    let content = PendingFile {
        format: FORMAT_TAG.to_string(),
        version: FORMAT_VERSION,
        saved_at: Utc::now(),
        entries: buffer.entries().to_vec(),
    };

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &content)?;
    writer.flush()?;

    tracing::info!(
        "Saved {} pending changes to {}",
        content.entries.len(),
        path.display()
    );

    Ok(())
}

/// 加载暂存区
pub fn load(path: &Path) -> Result<StagingBuffer, StagingError> {
    let file = File::open(path)?;
    let content: PendingFile = serde_json::from_reader(BufReader::new(file))?;

    if content.format != FORMAT_TAG {
        return Err(StagingError::InvalidFormat(format!(
            "Unexpected format tag '{}'",
            content.format
        )));
    }

    if content.version > FORMAT_VERSION {
        return Err(StagingError::UnsupportedVersion(format!(
            "File version {} is newer than supported version {}",
            content.version, FORMAT_VERSION
        )));
    }

    tracing::info!(
        "Loaded {} pending changes from {} (saved at {})",
        content.entries.len(),
        path.display(),
        content.saved_at
    );

    Ok(StagingBuffer::from_entries(content.entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{ChangeStaging, StagedChange};
    use crate::record::{FeatureData, TransportGeometry};
    use uuid::Uuid;

    fn record() -> FeatureData {
        FeatureData {
            id: None,
            uuid: Some(Uuid::new_v4()),
            layer_id: 3,
            geometry: TransportGeometry::Polygon(vec![vec![
                [0.0, 0.0],
                [10.0, 0.0],
                [10.0, 10.0],
                [0.0, 10.0],
                [0.0, 0.0],
            ]]),
            area: Some(100.0),
            length: None,
            gnd_id: Some("GND-042".to_string()),
            ref_id: None,
            parent_uuids: Vec::new(),
            user_id: Some(9),
        }
    }

    #[test]
    fn test_save_load() {
        let file_path = std::env::temp_dir().join(format!("pending-{}.json", Uuid::new_v4()));

        let mut buffer = StagingBuffer::new();
        let data = record();
        buffer.stage_addition(data.clone(), None);

        save(&buffer, &file_path).expect("Failed to save");
        let loaded = load(&file_path).expect("Failed to load");

        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.pending().next(),
            Some(&StagedChange::Add {
                new: data,
                original: None
            })
        );
        assert_eq!(loaded.entries()[0].staged_at, buffer.entries()[0].staged_at);

        std::fs::remove_file(&file_path).ok();
    }

    #[test]
    fn test_newer_version_rejected() {
        let file_path = std::env::temp_dir().join(format!("pending-{}.json", Uuid::new_v4()));
        std::fs::write(
            &file_path,
            r#"{"format":"parcel-staging","version":99,"saved_at":"2024-01-01T00:00:00Z","entries":[]}"#,
        )
        .expect("Failed to write");

        assert!(matches!(
            load(&file_path),
            Err(StagingError::UnsupportedVersion(_))
        ));

        std::fs::remove_file(&file_path).ok();
    }

    #[test]
    fn test_wrong_format_rejected() {
        let file_path = std::env::temp_dir().join(format!("pending-{}.json", Uuid::new_v4()));
        std::fs::write(
            &file_path,
            r#"{"format":"other","version":1,"saved_at":"2024-01-01T00:00:00Z","entries":[]}"#,
        )
        .expect("Failed to write");

        assert!(matches!(load(&file_path), Err(StagingError::InvalidFormat(_))));

        std::fs::remove_file(&file_path).ok();
    }
}
