//! Local mirror of the shared room state.
//!
//! Snapshots are immutable `Arc<Value>`s. Patching builds a new tree and swaps
//! it in, so a reader holding an older snapshot keeps seeing it unchanged.
//! Every mutation happens inside one write-lock section and none of them
//! awaits, which keeps replace/patch/clear from interleaving.

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use thiserror::Error;

use super::patch::{PatchError, PatchOperation, apply_patch};

/// Why a patch batch was not applied to the room state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatePatchError {
    #[error("no room state to patch")]
    MissingState,

    #[error(transparent)]
    Rejected(#[from] PatchError),
}

#[derive(Debug, Default)]
struct Slot {
    snapshot: Option<Arc<Value>>,
    /// Bumped by `clear`, so late results of an earlier connection can be discarded
    epoch: u64,
}

/// Owner of the current `RoomState` snapshot
#[derive(Debug, Default)]
pub struct RoomStateStore {
    slot: RwLock<Slot>,
}

impl RoomStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, if any
    pub fn snapshot(&self) -> Option<Arc<Value>> {
        self.read(|slot| slot.snapshot.clone())
    }

    pub fn has_state(&self) -> bool {
        self.read(|slot| slot.snapshot.is_some())
    }

    pub fn epoch(&self) -> u64 {
        self.read(|slot| slot.epoch)
    }

    /// Replace the snapshot wholesale
    pub fn replace(&self, state: Value) {
        self.write(|slot| slot.snapshot = Some(Arc::new(state)));
    }

    /// Replace the snapshot only if no `clear` happened since `epoch` was read.
    ///
    /// Returns whether the state was installed.
    pub fn replace_if_current(&self, epoch: u64, state: Value) -> bool {
        self.write(|slot| {
            if slot.epoch != epoch {
                return false;
            }
            slot.snapshot = Some(Arc::new(state));
            true
        })
    }

    /// Drop the snapshot and start a new epoch
    pub fn clear(&self) {
        self.write(|slot| {
            slot.snapshot = None;
            slot.epoch = slot.epoch.wrapping_add(1);
        });
    }

    /// Apply a batch to the current snapshot, all or nothing.
    ///
    /// Returns the number of operations applied.
    pub fn apply_patch(&self, operations: &[PatchOperation]) -> Result<usize, StatePatchError> {
        self.write(|slot| {
            let current = slot
                .snapshot
                .as_ref()
                .ok_or(StatePatchError::MissingState)?;
            let patched = apply_patch(current, operations)?;
            slot.snapshot = Some(Arc::new(patched));
            Ok(operations.len())
        })
    }

    fn read<T>(&self, f: impl FnOnce(&Slot) -> T) -> T {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        f(&slot)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Slot) -> T) -> T {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn replace_x(value: i64) -> Vec<PatchOperation> {
        vec![PatchOperation::Replace {
            path: "/x".to_string(),
            value: json!(value),
        }]
    }

    #[test]
    fn test_patch_without_state_is_missing_state() {
        // テスト項目: 状態が無い時のパッチは MissingState になり、状態は無いまま
        // given (前提条件):
        let store = RoomStateStore::new();

        // when (操作):
        let result = store.apply_patch(&replace_x(5));

        // then (期待する結果):
        assert_eq!(result, Err(StatePatchError::MissingState));
        assert!(!store.has_state());
    }

    #[test]
    fn test_patch_keeps_previous_snapshot_pristine() {
        // テスト項目: パッチ適用後も以前のスナップショット参照は変更されない
        // given (前提条件):
        let store = RoomStateStore::new();
        store.replace(json!({"x": 1}));
        let before = store.snapshot().unwrap();

        // when (操作):
        let applied = store.apply_patch(&replace_x(5)).unwrap();

        // then (期待する結果):
        assert_eq!(applied, 1);
        assert_eq!(*before, json!({"x": 1}));
        assert_eq!(*store.snapshot().unwrap(), json!({"x": 5}));
    }

    #[test]
    fn test_rejected_patch_retains_state() {
        // テスト項目: 失敗したパッチでは現在の状態がそのまま保持される
        // given (前提条件):
        let store = RoomStateStore::new();
        store.replace(json!({"x": 1}));
        let batch = vec![
            PatchOperation::Replace {
                path: "/x".to_string(),
                value: json!(2),
            },
            PatchOperation::Remove {
                path: "/nope".to_string(),
            },
        ];

        // when (操作):
        let result = store.apply_patch(&batch);

        // then (期待する結果):
        assert!(matches!(result, Err(StatePatchError::Rejected(_))));
        assert_eq!(*store.snapshot().unwrap(), json!({"x": 1}));
    }

    #[test]
    fn test_replace_if_current_rejects_stale_epoch() {
        // テスト項目: clear 後は古いエポックでの置き換えが拒否される
        // given (前提条件):
        let store = RoomStateStore::new();
        store.replace(json!({"a": 0}));
        let epoch = store.epoch();
        store.clear();

        // when (操作):
        let installed = store.replace_if_current(epoch, json!({"a": 1}));

        // then (期待する結果):
        assert!(!installed);
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn test_replace_if_current_installs_whole_state() {
        // テスト項目: 同じエポックでは状態がマージではなく丸ごと置き換えられる
        // given (前提条件):
        let store = RoomStateStore::new();
        store.replace(json!({"old": true, "a": 0}));
        let epoch = store.epoch();

        // when (操作):
        let installed = store.replace_if_current(epoch, json!({"a": 1}));

        // then (期待する結果):
        assert!(installed);
        assert_eq!(*store.snapshot().unwrap(), json!({"a": 1}));
    }
}
