//! Priority propagation
//!
//! A change of a thread's effective priority moves its home node, re-sorts it
//! in the wait queue it is blocked on, and, when that queue belongs to a
//! priority-inheritance mutex, recomputes the owner's contribution. The walk
//! continues along the chain of owners until a priority stops changing.

use crate::scheduler::{Placement, Priority, ThreadId};
use crate::sync::{ObjectId, ObjectKind};
use crate::thread::ThreadState;

use super::Guard;

impl Guard<'_> {
    /// Set (`Some`) or drop (`None`) the contribution `source` makes to
    /// `thread`. Returns `true` if the effective priority changed.
    pub(super) fn set_contribution(
        &mut self,
        thread: ThreadId,
        source: ObjectId,
        priority: Option<Priority>,
    ) -> bool {
        let aggregation = &mut self.threads.control_mut(thread).priority;
        let before = aggregation.effective();
        match priority {
            Some(priority) => aggregation.set(source, priority),
            None => {
                aggregation.remove(source);
            }
        }
        aggregation.effective() != before
    }

    /// Apply the current effective priority of `thread` everywhere it is
    /// queued, and carry the change to the owners it waits for.
    pub(super) fn priority_changed(&mut self, thread: ThreadId, placement: Placement) {
        let mut current = thread;
        for _ in 0..self.threads.capacity() {
            let control = self.threads.control(current);
            let effective = control.effective_priority();
            let home = control.home;
            let waiting_on = match (control.state, control.wait.remote) {
                (ThreadState::BlockedOnObject, false) => control.wait.object,
                _ => None,
            };

            self.scheduler(home)
                .set_node_priority(current, effective, placement);

            let Some(id) = waiting_on else { return };
            let Ok(object) = self.objects.get_mut(id) else {
                return;
            };
            object.waiters.requeue(&mut *self.threads, current);

            let ObjectKind::InheritMutex(mutex) = &object.kind else {
                return;
            };
            let Some(owner) = mutex.owner else { return };
            let required = object.waiters.most_urgent(&*self.threads);

            if !self.set_contribution(owner, id, required) {
                return;
            }
            crate::ktrace!("{} inherits {:?} through {}", owner, required, id);
            current = owner;
        }
    }

    /// Recompute the contribution an inheritance mutex makes to its owner
    /// from the waiters still queued.
    pub(super) fn refresh_inheritance(&mut self, id: ObjectId, placement: Placement) {
        let Ok(object) = self.objects.get(id) else {
            return;
        };
        let ObjectKind::InheritMutex(mutex) = &object.kind else {
            return;
        };
        let Some(owner) = mutex.owner else { return };
        let required = object.waiters.most_urgent(&*self.threads);
        if self.set_contribution(owner, id, required) {
            self.priority_changed(owner, placement);
        }
    }

    /// Blocking `thread` on a mutex owned by `owner` would close a cycle of
    /// owners waiting on each other.
    pub(super) fn would_deadlock(&self, thread: ThreadId, owner: ThreadId) -> bool {
        let mut current = owner;
        for _ in 0..self.threads.capacity() {
            if current == thread {
                return true;
            }
            let control = self.threads.control(current);
            if control.state != ThreadState::BlockedOnObject || control.wait.remote {
                return false;
            }
            let Some(next) = control
                .wait
                .object
                .and_then(|id| self.objects.get(id).ok())
                .and_then(|object| object.owner())
            else {
                return false;
            };
            current = next;
        }
        false
    }
}
