//! Thread Lifecycle Tests

#[cfg(test)]
mod tests {
    use nexa_rtcore::{KernelConfig, KernelError, SchedulerId, ThreadState};

    use crate::mock::{Harness, CPU0, SCHED0};

    // =========================================================================
    // Creation
    // =========================================================================

    #[test]
    fn test_created_thread_is_dormant() {
        let h = Harness::uniprocessor();
        let t = h.kernel.create_thread("T", 10, SCHED0).unwrap();
        assert_eq!(h.kernel.thread_state(t).unwrap(), ThreadState::Dormant);
        assert_eq!(h.kernel.thread_scheduler(t).unwrap(), SCHED0);
        assert!(!h.kernel.ready_threads(SCHED0).unwrap().contains(&t));
    }

    #[test]
    fn test_create_rejects_reserved_priorities() {
        let h = Harness::uniprocessor();
        assert_eq!(
            h.kernel.create_thread("T", 0, SCHED0),
            Err(KernelError::InvalidPriority)
        );
        assert_eq!(
            h.kernel.create_thread("T", 255, SCHED0),
            Err(KernelError::InvalidPriority)
        );
    }

    #[test]
    fn test_create_rejects_unknown_scheduler() {
        let h = Harness::uniprocessor();
        assert_eq!(
            h.kernel.create_thread("T", 10, SchedulerId(3)),
            Err(KernelError::InvalidId)
        );
    }

    #[test]
    fn test_thread_table_full() {
        let mut config = KernelConfig::default();
        config.max_threads = 3;
        let h = Harness::new(config);
        // One slot already holds the idle thread
        h.kernel.create_thread("A", 10, SCHED0).unwrap();
        h.kernel.create_thread("B", 10, SCHED0).unwrap();
        assert_eq!(
            h.kernel.create_thread("C", 10, SCHED0),
            Err(KernelError::TooMany)
        );
    }

    #[test]
    fn test_start_twice_incorrect_state() {
        let h = Harness::uniprocessor();
        let t = h.spawn("T", 10, SCHED0);
        assert_eq!(h.kernel.start_thread(t), Err(KernelError::IncorrectState));
    }

    // =========================================================================
    // Suspend / resume
    // =========================================================================

    #[test]
    fn test_suspend_and_resume() {
        let h = Harness::uniprocessor();
        let a = h.spawn("A", 5, SCHED0);
        let b = h.spawn("B", 10, SCHED0);

        h.kernel.suspend(a).unwrap();
        assert_eq!(h.kernel.thread_state(a).unwrap(), ThreadState::Suspended);
        assert_eq!(h.executing(CPU0), Some(b));

        h.kernel.resume(a).unwrap();
        assert_eq!(h.executing(CPU0), Some(a));
        assert_eq!(h.kernel.thread_state(b).unwrap(), ThreadState::Ready);
    }

    #[test]
    fn test_suspend_errors() {
        let h = Harness::uniprocessor();
        let idle = h.kernel.idle_thread(CPU0).unwrap();
        assert_eq!(h.kernel.suspend(idle), Err(KernelError::IncorrectState));

        let dormant = h.kernel.create_thread("D", 10, SCHED0).unwrap();
        assert_eq!(h.kernel.suspend(dormant), Err(KernelError::IncorrectState));
        assert_eq!(h.kernel.resume(dormant), Err(KernelError::IncorrectState));
    }

    // =========================================================================
    // Priority changes
    // =========================================================================

    #[test]
    fn test_set_priority_returns_old() {
        let h = Harness::uniprocessor();
        let t = h.spawn("T", 10, SCHED0);
        assert_eq!(h.kernel.set_thread_priority(t, 7), Ok(10));
        assert_eq!(h.priority(t), 7);
        assert_eq!(h.kernel.base_priority(t).unwrap(), 7);
    }

    #[test]
    fn test_lowering_running_thread_preempts_it() {
        let h = Harness::uniprocessor();
        let a = h.spawn("A", 5, SCHED0);
        let b = h.spawn("B", 8, SCHED0);
        assert_eq!(h.executing(CPU0), Some(a));

        h.kernel.set_thread_priority(a, 12).unwrap();
        assert_eq!(h.executing(CPU0), Some(b));
    }

    #[test]
    fn test_raising_ready_thread_preempts() {
        let h = Harness::uniprocessor();
        let a = h.spawn("A", 5, SCHED0);
        let b = h.spawn("B", 8, SCHED0);

        h.kernel.set_thread_priority(b, 2).unwrap();
        assert_eq!(h.executing(CPU0), Some(b));
        assert_eq!(h.kernel.thread_state(a).unwrap(), ThreadState::Ready);
    }

    #[test]
    fn test_set_priority_errors() {
        let h = Harness::uniprocessor();
        let t = h.spawn("T", 10, SCHED0);
        let idle = h.kernel.idle_thread(CPU0).unwrap();
        assert_eq!(
            h.kernel.set_thread_priority(idle, 10),
            Err(KernelError::IncorrectState)
        );
        assert_eq!(
            h.kernel.set_thread_priority(t, 0),
            Err(KernelError::InvalidPriority)
        );
    }

    // =========================================================================
    // Exit / delete
    // =========================================================================

    #[test]
    fn test_exit_then_delete_frees_slot() {
        let h = Harness::uniprocessor();
        let t = h.spawn("T", 10, SCHED0);

        h.kernel.exit(CPU0).unwrap();
        assert_eq!(h.kernel.thread_state(t).unwrap(), ThreadState::Zombie);
        assert_eq!(h.executing(CPU0), h.kernel.idle_thread(CPU0));

        h.kernel.delete_thread(t).unwrap();
        assert_eq!(h.kernel.thread_state(t), Err(KernelError::InvalidId));

        // The freed slot is reusable
        let next = h.spawn("N", 10, SCHED0);
        assert_eq!(next, t);
        assert_eq!(h.executing(CPU0), Some(next));
    }

    #[test]
    fn test_delete_live_thread_refused() {
        let h = Harness::uniprocessor();
        let t = h.spawn("T", 10, SCHED0);
        assert_eq!(h.kernel.delete_thread(t), Err(KernelError::IncorrectState));

        let idle = h.kernel.idle_thread(CPU0).unwrap();
        assert_eq!(h.kernel.delete_thread(idle), Err(KernelError::IncorrectState));
    }

    #[test]
    fn test_delete_dormant_thread() {
        let h = Harness::uniprocessor();
        let t = h.kernel.create_thread("D", 10, SCHED0).unwrap();
        assert_eq!(h.kernel.delete_thread(t), Ok(()));
        assert!(h.kernel.ready_queues_consistent());
    }

    #[test]
    fn test_idle_thread_cannot_exit() {
        let h = Harness::uniprocessor();
        assert_eq!(h.kernel.exit(CPU0), Err(KernelError::IncorrectState));
    }
}
