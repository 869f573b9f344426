//! UseCase: ルーム状態へのパッチ適用
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - StateSynchronizer::apply() メソッド
//! - stateful-event に含まれるパッチを現在の RoomState に適用する処理
//!
//! ### なぜこのテストが必要か
//! - パッチは全て適用されるか全く適用されないかのどちらかであることを保証
//! - 状態が無い時のパッチで例外が発生しないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：パッチ適用
//! - 異常系：存在しないパスへのパッチ、解釈できないパッチ
//! - エッジケース：パッチ無しのイベント、状態が無い時のパッチ

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{PatchError, PatchOperation, RoomStateStore, StatePatchError};

/// パッチ適用の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// イベントにパッチが含まれていない
    NoPatch,
    /// パッチを操作の列として解釈できなかったため状態はそのまま
    Malformed(String),
    /// 適用先の状態が無いためスキップした
    MissingState,
    /// 全ての操作を適用した
    Applied { operations: usize },
    /// 検証に失敗したため状態はそのまま
    Rejected(PatchError),
}

/// ルーム状態のパッチ同期を行うユースケース
pub struct StateSynchronizer {
    room_state: Arc<RoomStateStore>,
}

impl StateSynchronizer {
    pub fn new(room_state: Arc<RoomStateStore>) -> Self {
        Self { room_state }
    }

    /// `event_name` で届いたパッチを適用する
    ///
    /// どの結果でもエラーは返さず、ログに記録するのみ
    pub fn apply(&self, event_name: &str, patch: Option<&Value>) -> SyncOutcome {
        let Some(patch) = patch else {
            tracing::debug!(event = event_name, "Received state event without patch");
            return SyncOutcome::NoPatch;
        };

        let operations = match Vec::<PatchOperation>::deserialize(patch) {
            Ok(operations) => operations,
            Err(e) => {
                tracing::error!(
                    event = event_name,
                    "Failed to decode state patch, keeping previous state: {}",
                    e
                );
                return SyncOutcome::Malformed(e.to_string());
            }
        };

        match self.room_state.apply_patch(&operations) {
            Ok(applied) => {
                tracing::info!(
                    event = event_name,
                    operations = applied,
                    "Applied state patch"
                );
                SyncOutcome::Applied {
                    operations: applied,
                }
            }
            Err(StatePatchError::MissingState) => {
                tracing::warn!(
                    event = event_name,
                    operations = operations.len(),
                    "Skipping state patch: no room state yet"
                );
                SyncOutcome::MissingState
            }
            Err(StatePatchError::Rejected(e)) => {
                tracing::error!(
                    event = event_name,
                    "Failed to apply state patch, keeping previous state: {}",
                    e
                );
                SyncOutcome::Rejected(e)
            }
        }
    }
}
