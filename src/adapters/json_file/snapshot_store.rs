use std::fs;
use std::path::{Path, PathBuf};

use crate::application::catalog::CatalogSnapshot;
use crate::ports::snapshot_store::{Result, SnapshotStore as SnapshotStoreTrait};

/// SnapshotStoreのJSONファイル実装
///
/// 1ファイル = 1スナップショット。書き込みは同一ディレクトリの
/// 一時ファイルに全量を書いてからrenameで差し替える。途中で落ちても
/// 旧スナップショットが無傷で残る。
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStoreTrait for SnapshotStore {
    /// ファイルなし・読み込み失敗・壊れたJSONはすべて「保存なし」
    fn load(&self) -> Option<CatalogSnapshot> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No previous snapshot, starting fresh");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read snapshot, starting fresh");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Snapshot file is corrupt, starting fresh");
                None
            }
        }
    }

    fn save(&self, snapshot: &CatalogSnapshot) -> Result<()> {
        let json = serde_json::to_vec_pretty(snapshot)?;

        // renameが同一ファイルシステム内で完結するよう、一時ファイルは同じディレクトリに置く
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;

        tracing::info!(path = %self.path.display(), "Snapshot saved");
        Ok(())
    }
}
