//! Recursive Mutex Tests (no protocol)

#[cfg(test)]
mod tests {
    use nexa_rtcore::{
        AcquireOutcome, AttributeSet, KernelError, ThreadState, WaitPolicy, WaitResult,
    };

    use crate::mock::{Harness, CPU0, SCHED0};

    fn mutex(h: &Harness) -> nexa_rtcore::ObjectId {
        h.kernel
            .create_semaphore(CPU0, AttributeSet::BINARY, 1, 0)
            .unwrap()
    }

    // =========================================================================
    // Ownership and nesting
    // =========================================================================

    #[test]
    fn test_acquire_takes_ownership() {
        let h = Harness::uniprocessor();
        let t = h.spawn("T", 10, SCHED0);
        let m = mutex(&h);

        assert_eq!(
            h.kernel.acquire(CPU0, m, WaitPolicy::Forever),
            Ok(AcquireOutcome::Acquired)
        );
        assert_eq!(h.kernel.object_owner(m).unwrap(), Some(t));
        assert_eq!(h.priority(t), 10, "no protocol, no boost");
    }

    #[test]
    fn test_recursive_acquire_needs_matching_releases() {
        let h = Harness::uniprocessor();
        let t = h.spawn("T", 10, SCHED0);
        let m = mutex(&h);

        h.kernel.acquire(CPU0, m, WaitPolicy::Forever).unwrap();
        assert_eq!(
            h.kernel.acquire(CPU0, m, WaitPolicy::NoWait),
            Ok(AcquireOutcome::Acquired),
            "owner never blocks on itself"
        );

        h.kernel.release(CPU0, m).unwrap();
        assert_eq!(h.kernel.object_owner(m).unwrap(), Some(t), "one level left");
        h.kernel.release(CPU0, m).unwrap();
        assert_eq!(h.kernel.object_owner(m).unwrap(), None);

        assert_eq!(h.kernel.release(CPU0, m), Err(KernelError::NotOwner));
    }

    #[test]
    fn test_release_by_non_owner() {
        let h = Harness::uniprocessor();
        let a = h.spawn("A", 10, SCHED0);
        let m = mutex(&h);
        h.kernel.acquire(CPU0, m, WaitPolicy::Forever).unwrap();

        let b = h.spawn("B", 5, SCHED0);
        assert_eq!(h.executing(CPU0), Some(b));
        assert_eq!(h.kernel.release(CPU0, m), Err(KernelError::NotOwner));
        assert_eq!(h.kernel.object_owner(m).unwrap(), Some(a));
    }

    #[test]
    fn test_idle_thread_cannot_acquire() {
        let h = Harness::uniprocessor();
        let m = mutex(&h);
        assert_eq!(
            h.kernel.acquire(CPU0, m, WaitPolicy::Forever),
            Err(KernelError::IncorrectState)
        );
    }

    // =========================================================================
    // Contention
    // =========================================================================

    #[test]
    fn test_contended_no_wait_unsatisfied() {
        let h = Harness::uniprocessor();
        let _a = h.spawn("A", 10, SCHED0);
        let m = mutex(&h);
        h.kernel.acquire(CPU0, m, WaitPolicy::Forever).unwrap();

        let b = h.spawn("B", 5, SCHED0);
        assert_eq!(
            h.kernel.acquire(CPU0, m, WaitPolicy::NoWait),
            Err(KernelError::Unsatisfied)
        );
        assert_eq!(h.kernel.thread_state(b).unwrap(), ThreadState::Executing);
    }

    #[test]
    fn test_release_hands_ownership_to_waiter() {
        let h = Harness::uniprocessor();
        let a = h.spawn("A", 10, SCHED0);
        let m = mutex(&h);
        h.kernel.acquire(CPU0, m, WaitPolicy::Forever).unwrap();

        let b = h.spawn("B", 5, SCHED0);
        assert_eq!(
            h.kernel.acquire(CPU0, m, WaitPolicy::Forever),
            Ok(AcquireOutcome::Blocked)
        );
        assert_eq!(h.executing(CPU0), Some(a));
        assert_eq!(h.priority(a), 10, "no protocol, owner keeps its priority");

        h.kernel.release(CPU0, m).unwrap();
        assert_eq!(h.kernel.object_owner(m).unwrap(), Some(b));
        assert_eq!(h.kernel.wait_result(b).unwrap(), WaitResult::Ok);
        assert_eq!(h.executing(CPU0), Some(b), "B preempts A");
    }

    #[test]
    fn test_owned_mutex_cannot_be_deleted() {
        let h = Harness::uniprocessor();
        let _t = h.spawn("T", 10, SCHED0);
        let m = mutex(&h);
        h.kernel.acquire(CPU0, m, WaitPolicy::Forever).unwrap();

        assert_eq!(h.kernel.delete(m), Err(KernelError::ResourceInUse));
        h.kernel.release(CPU0, m).unwrap();
        assert_eq!(h.kernel.delete(m), Ok(()));
    }

    #[test]
    fn test_flush_keeps_owner() {
        let h = Harness::uniprocessor();
        let a = h.spawn("A", 10, SCHED0);
        let m = mutex(&h);
        h.kernel.acquire(CPU0, m, WaitPolicy::Forever).unwrap();
        let b = h.spawn("B", 5, SCHED0);
        h.kernel.acquire(CPU0, m, WaitPolicy::Forever).unwrap();

        h.kernel.flush(m).unwrap();
        assert_eq!(h.kernel.wait_result(b).unwrap(), WaitResult::Unsatisfied);
        assert_eq!(h.kernel.object_owner(m).unwrap(), Some(a));
        assert_eq!(h.executing(CPU0), Some(b));
    }

    #[test]
    fn test_exit_while_owning_refused() {
        let h = Harness::uniprocessor();
        let t = h.spawn("T", 10, SCHED0);
        let m = mutex(&h);
        h.kernel.acquire(CPU0, m, WaitPolicy::Forever).unwrap();

        assert_eq!(h.kernel.exit(CPU0), Err(KernelError::ResourceInUse));
        h.kernel.release(CPU0, m).unwrap();
        assert_eq!(h.kernel.exit(CPU0), Ok(()));
        assert_eq!(h.kernel.thread_state(t).unwrap(), ThreadState::Zombie);
    }
}
