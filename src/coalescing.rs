//! `CoalescingCoordinator` — the request-coalescing leader/waiter state
//! machine of §4.6.
//!
//! A request fingerprint that already has an in-flight fetch is classified
//! one of three ways (mirroring the `ThreadStatus` split this is grounded
//! on): the same worker asking again for its own group is queued to be
//! served once that worker finishes; a worker that is itself leading a
//! *different* group is never parked — parking it would stall the group it
//! is leading, since nothing else drives that group's upstream fetch
//! forward — so its callback is stashed against whichever group it leads
//! and served once that worker is free; everyone else genuinely blocks on
//! a condition variable, bounded by the configured coalescing timeout.

use crate::callback::DownstreamCallback;
use crate::entry::StreamingEntry;
use crate::error::CacheError;
use crate::fingerprint::Fingerprint;
use crate::invariants::debug_assert_no_self_wait;
use crate::reader::EntryReader;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread::ThreadId;
use std::time::Duration;

type Callback = Box<dyn DownstreamCallback + Send>;

#[derive(Clone, Copy)]
enum PublishState {
    Pending,
    /// Headers have landed: the entry is readable and may still be growing.
    /// A waiter released at this point drives it exactly like a finished
    /// one — `EntryReader::drive` already busy-waits through blocks the
    /// writer hasn't produced yet.
    Streaming,
    Published,
    Failed(CacheError),
}

struct Group {
    fingerprint: Fingerprint,
    entry: Arc<StreamingEntry>,
    leader_worker: ThreadId,
    state: Mutex<PublishState>,
    condvar: Condvar,
    same_leader_waiters: Mutex<Vec<Callback>>,
    other_group_pending: Mutex<Vec<(Weak<Group>, Callback)>>,
}

impl Group {
    fn new(fingerprint: Fingerprint, entry: Arc<StreamingEntry>, leader_worker: ThreadId) -> Self {
        Self {
            fingerprint,
            entry,
            leader_worker,
            state: Mutex::new(PublishState::Pending),
            condvar: Condvar::new(),
            same_leader_waiters: Mutex::new(Vec::new()),
            other_group_pending: Mutex::new(Vec::new()),
        }
    }
}

/// Handle returned to the initial leader of a fingerprint group, redeemed
/// via [`CoalescingCoordinator::publish`] once the upstream fetch concludes.
pub struct LeaderToken {
    group: Arc<Group>,
}

/// Coordinates concurrent identical cache-miss requests so only one
/// upstream fetch happens per fingerprint.
pub struct CoalescingCoordinator {
    timeout: Duration,
    groups: Mutex<HashMap<Fingerprint, Arc<Group>>>,
    worker_led: Mutex<HashMap<ThreadId, Vec<Arc<Group>>>>,
}

impl CoalescingCoordinator {
    /// Creates a coordinator that parks waiters for at most `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            groups: Mutex::new(HashMap::new()),
            worker_led: Mutex::new(HashMap::new()),
        }
    }

    /// Registers interest in `fingerprint` on behalf of the calling worker.
    ///
    /// Returns `Some` only when this call is the first (or only currently
    /// active) request for `fingerprint`: the caller becomes the leader,
    /// owns the returned [`StreamingEntry`], and must redeem the
    /// [`LeaderToken`] via [`Self::publish`] once its upstream fetch
    /// concludes. Every other caller is fully serviced by this call (either
    /// immediately, once its data is ready, or not at all if the fetch
    /// fails) and this returns `None`.
    pub fn register(
        &self,
        fingerprint: Fingerprint,
        segment_capacity: usize,
        callback: Callback,
    ) -> Option<(Arc<StreamingEntry>, LeaderToken)> {
        let worker = std::thread::current().id();
        let existing = {
            let mut groups = self.groups.lock().unwrap();
            match groups.get(&fingerprint) {
                Some(g) => Some(Arc::clone(g)),
                None => {
                    let entry = Arc::new(StreamingEntry::new(segment_capacity));
                    let group = Arc::new(Group::new(fingerprint.clone(), Arc::clone(&entry), worker));
                    // The leader's own downstream callback is just this
                    // thread's first request for the fingerprint, so it is
                    // served the same way any later same-thread duplicate
                    // would be: queued here and driven once `publish` runs.
                    group.same_leader_waiters.lock().unwrap().push(callback);
                    groups.insert(fingerprint, Arc::clone(&group));
                    self.worker_led
                        .lock()
                        .unwrap()
                        .entry(worker)
                        .or_default()
                        .push(Arc::clone(&group));
                    log::debug!("worker {worker:?} becomes leader for a new fingerprint group");
                    return Some((entry, LeaderToken { group }));
                }
            }
        };
        let group = existing.expect("checked above");

        if group.leader_worker == worker {
            log::debug!("worker {worker:?} is already leading this group; queuing as same-leader waiter");
            group.same_leader_waiters.lock().unwrap().push(callback);
            return None;
        }

        let leads_another_group = self.worker_led.lock().unwrap().contains_key(&worker);
        if leads_another_group {
            debug_assert_no_self_wait!(group.leader_worker, worker);
            let owning = self
                .worker_led
                .lock()
                .unwrap()
                .get(&worker)
                .and_then(|v| v.first().cloned());
            if let Some(owning_group) = owning {
                log::debug!("worker {worker:?} already leads another group; deferring until it frees up");
                owning_group
                    .other_group_pending
                    .lock()
                    .unwrap()
                    .push((Arc::downgrade(&group), callback));
                return None;
            }
        }

        log::trace!("worker {worker:?} parking on the coalescing condvar");
        self.wait_and_serve(&group, callback);
        None
    }

    /// Wakes any waiters already parked on `group`'s condition variable as
    /// soon as the leader's entry has headers, rather than making them
    /// block until the whole response finishes (§4.6) — `EntryReader::drive`
    /// already knows how to busy-wait through a response that is still
    /// being written. A no-op once the group has moved past `Pending`.
    pub(crate) fn mark_streaming(&self, token: &LeaderToken) {
        {
            let mut state = token.group.state.lock().unwrap();
            if !matches!(*state, PublishState::Pending) {
                return;
            }
            *state = PublishState::Streaming;
        }
        token.group.condvar.notify_all();
    }

    /// Blocks the calling thread until `group` starts streaming or
    /// publishes (or the coalescing timeout elapses), then serves
    /// `callback` accordingly.
    fn wait_and_serve(&self, group: &Arc<Group>, mut callback: Callback) {
        let mut state = group.state.lock().unwrap();
        while matches!(*state, PublishState::Pending) {
            let (guard, result) = group.condvar.wait_timeout(state, self.timeout).unwrap();
            state = guard;
            if result.timed_out() && matches!(*state, PublishState::Pending) {
                log::debug!("coalescing wait timed out for fingerprint {:?}", group.fingerprint);
                callback.emit_failure(CacheError::CoalescingTimeout);
                return;
            }
        }
        let outcome = *state;
        drop(state);
        match outcome {
            PublishState::Streaming | PublishState::Published => {
                EntryReader::new(Arc::clone(&group.entry)).drive(callback.as_mut())
            }
            PublishState::Failed(err) => callback.emit_failure(err),
            PublishState::Pending => unreachable!("loop only exits once state is no longer Pending"),
        }
    }

    /// Redeems a [`LeaderToken`], publishing `outcome` to every waiter
    /// coalesced onto this group (same-worker duplicates immediately,
    /// condvar-parked waiters via wakeup, and any other-group-leader
    /// waiters this worker was carrying once it is free of leadership
    /// duties).
    pub fn publish(&self, token: LeaderToken, outcome: Result<(), CacheError>) {
        let group = token.group;
        log::debug!(
            "publishing fingerprint {:?}: {}",
            group.fingerprint,
            if outcome.is_ok() { "ok" } else { "failed" }
        );

        {
            let mut state = group.state.lock().unwrap();
            *state = match outcome {
                Ok(()) => PublishState::Published,
                Err(e) => PublishState::Failed(e),
            };
        }
        group.condvar.notify_all();

        let same_leader_waiters = std::mem::take(&mut *group.same_leader_waiters.lock().unwrap());
        for mut cb in same_leader_waiters {
            match outcome {
                Ok(()) => EntryReader::new(Arc::clone(&group.entry)).drive(cb.as_mut()),
                Err(e) => cb.emit_failure(e),
            }
        }

        self.groups.lock().unwrap().remove(&group.fingerprint);

        let (still_leading, fallback_group) = {
            let mut led = self.worker_led.lock().unwrap();
            let mut still_leading = false;
            let mut fallback = None;
            if let Some(list) = led.get_mut(&group.leader_worker) {
                list.retain(|g| !Arc::ptr_eq(g, &group));
                still_leading = !list.is_empty();
                fallback = list.first().cloned();
                if list.is_empty() {
                    led.remove(&group.leader_worker);
                }
            }
            (still_leading, fallback)
        };

        let pending = std::mem::take(&mut *group.other_group_pending.lock().unwrap());
        if still_leading {
            if let Some(target) = fallback_group {
                target.other_group_pending.lock().unwrap().extend(pending);
            }
        } else {
            for (weak_target, cb) in pending {
                let mut cb = cb;
                match weak_target.upgrade() {
                    Some(target) => self.wait_and_serve(&target, cb),
                    None => {
                        log::debug!("deferred waiter's target group vanished before it could be served");
                        cb.emit_failure(CacheError::CoalescingAbandoned);
                    }
                }
            }
        }
    }
}
