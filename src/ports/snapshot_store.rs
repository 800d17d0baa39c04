use thiserror::Error;

use crate::application::catalog::CatalogSnapshot;

/// スナップショット保存のエラー
#[derive(Debug, Error)]
pub enum SnapshotStoreError {
    #[error("Failed to write snapshot")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize snapshot")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SnapshotStoreError>;

/// スナップショットストアポート
///
/// カタログ全状態の読み書き。起動時に1回load、終了時に1回saveされる。
///
/// 契約：
/// - `load`はいかなる失敗（ファイルなし・破損・非互換形式）も
///   伝播させず「保存なし」として`None`を返す。空のカタログで
///   始めるかどうかの判断は呼び出し側が行う。
/// - `save`の失敗はエラーとして返すが、呼び出し側はそれを報告する
///   だけで、プロセスを落としたりメモリ内の状態を壊したりしない。
pub trait SnapshotStore {
    /// 保存済みスナップショットの読み込み。なければ`None`。
    fn load(&self) -> Option<CatalogSnapshot>;

    /// スナップショットの保存。既存の保存は上書きされる。
    fn save(&self, snapshot: &CatalogSnapshot) -> Result<()>;
}
