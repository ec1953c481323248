// Test doubles for the platform seams
// Used by the unit tests and by the integration tests under tests/

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDateTime;

use luna_track_data::store::{InMemoryKeyValueStore, KeyValueStore, StoreError};

use crate::notifications::dispatch::{
    BatchReport, ChannelSpec, DispatchError, FailedNotification, NotificationDispatcherTrait, NotificationRequest,
};

/// A call made against the `RecordingDispatcher`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchCall {
    /// Ids of the submitted batch, in submission order
    ScheduleBatch(Vec<i32>),
    Cancel(Vec<i32>),
    ListPending,
    CheckPermission,
    RequestPermission,
    CreateChannel(String),
}

#[derive(Debug, Default)]
struct DispatcherState {
    calls: Vec<DispatchCall>,
    pending: BTreeMap<i32, NotificationRequest>,
    channels: Vec<ChannelSpec>,
    rejected: HashSet<i32>,
    permission: bool,
    fail_schedule: bool,
    fail_cancel: bool,
    fail_list: bool,
}

/// In-memory notification service that records every call
#[derive(Debug)]
pub struct RecordingDispatcher {
    state: Mutex<DispatcherState>,
}

impl Default for RecordingDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDispatcher {
    /// Create a dispatcher with permission granted and nothing pending
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DispatcherState {
                permission: true,
                ..DispatcherState::default()
            }),
        }
    }

    /// Configure the permission answer
    pub fn with_permission(self, granted: bool) -> Self {
        self.set_permission(granted);
        self
    }

    fn state(&self) -> MutexGuard<'_, DispatcherState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_permission(&self, granted: bool) {
        self.state().permission = granted;
    }

    /// Make the platform refuse this id in future batches
    pub fn reject_id(&self, id: i32) {
        self.state().rejected.insert(id);
    }

    pub fn fail_schedule(&self, fail: bool) {
        self.state().fail_schedule = fail;
    }

    pub fn fail_cancel(&self, fail: bool) {
        self.state().fail_cancel = fail;
    }

    pub fn fail_list_pending(&self, fail: bool) {
        self.state().fail_list = fail;
    }

    /// Mark ids as pending without recording a call
    pub fn seed_pending(&self, ids: &[i32]) {
        let mut state = self.state();
        for &id in ids {
            state.pending.insert(
                id,
                NotificationRequest {
                    id,
                    title: String::new(),
                    body: String::new(),
                    deliver_at: NaiveDateTime::MIN,
                    channel: String::new(),
                    action_category: None,
                    payload: None,
                },
            );
        }
    }

    /// Every call so far, oldest first
    pub fn calls(&self) -> Vec<DispatchCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Pending notifications ordered by id
    pub fn pending(&self) -> Vec<NotificationRequest> {
        self.state().pending.values().cloned().collect()
    }

    /// Pending ids in ascending order
    pub fn pending_ids(&self) -> Vec<i32> {
        self.state().pending.keys().copied().collect()
    }

    pub fn pending_request(&self, id: i32) -> Option<NotificationRequest> {
        self.state().pending.get(&id).cloned()
    }

    /// Channels created so far
    pub fn channels(&self) -> Vec<ChannelSpec> {
        self.state().channels.clone()
    }
}

#[async_trait]
impl NotificationDispatcherTrait for RecordingDispatcher {
    async fn schedule_batch(&self, requests: Vec<NotificationRequest>) -> Result<BatchReport, DispatchError> {
        let mut state = self.state();
        state
            .calls
            .push(DispatchCall::ScheduleBatch(requests.iter().map(|r| r.id).collect()));

        if state.fail_schedule {
            return Err(DispatchError::Failed("schedule failed".to_string()));
        }

        let mut report = BatchReport::default();
        for request in requests {
            if state.rejected.contains(&request.id) {
                report.failed.push(FailedNotification {
                    id: request.id,
                    reason: "rejected by platform".to_string(),
                });
                continue;
            }
            state.pending.insert(request.id, request);
        }
        Ok(report)
    }

    async fn cancel(&self, ids: Vec<i32>) -> Result<(), DispatchError> {
        let mut state = self.state();
        state.calls.push(DispatchCall::Cancel(ids.clone()));

        if state.fail_cancel {
            return Err(DispatchError::Failed("cancel failed".to_string()));
        }
        for id in ids {
            state.pending.remove(&id);
        }
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<i32>, DispatchError> {
        let mut state = self.state();
        state.calls.push(DispatchCall::ListPending);

        if state.fail_list {
            return Err(DispatchError::Unavailable("pending list unavailable".to_string()));
        }
        Ok(state.pending.keys().copied().collect())
    }

    async fn check_permission(&self) -> Result<bool, DispatchError> {
        let mut state = self.state();
        state.calls.push(DispatchCall::CheckPermission);
        Ok(state.permission)
    }

    async fn request_permission(&self) -> Result<bool, DispatchError> {
        let mut state = self.state();
        state.calls.push(DispatchCall::RequestPermission);
        Ok(state.permission)
    }

    async fn create_channel(&self, channel: ChannelSpec) -> Result<(), DispatchError> {
        let mut state = self.state();
        state.calls.push(DispatchCall::CreateChannel(channel.id.clone()));
        state.channels.retain(|c| c.id != channel.id);
        state.channels.push(channel);
        Ok(())
    }
}

/// In-memory store whose reads and writes can be made to fail
#[derive(Debug, Clone, Default)]
pub struct UnreliableStore {
    inner: InMemoryKeyValueStore,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl UnreliableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing store, sharing its contents
    pub fn wrapping(inner: InMemoryKeyValueStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for UnreliableStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("read of {key} failed")));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("write of {key} failed")));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("remove of {key} failed")));
        }
        self.inner.remove(key).await
    }
}
