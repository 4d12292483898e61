//! Wait Queue Tests
//!
//! Queues are exercised directly against a thread table, without a kernel.

#[cfg(test)]
mod tests {
    use nexa_rtcore::sync::{Discipline, ObjectId, WaitQueue};
    use nexa_rtcore::thread::{ThreadControl, ThreadTable};
    use nexa_rtcore::{ProcessorMask, SchedulerId, ThreadId};

    fn table(priorities: &[u8]) -> (ThreadTable, Vec<ThreadId>) {
        let mut threads = ThreadTable::new(priorities.len());
        let ids = priorities
            .iter()
            .map(|priority| {
                threads
                    .allocate(|id| {
                        ThreadControl::new(
                            id,
                            "T",
                            SchedulerId(0),
                            ProcessorMask::first(1),
                            *priority,
                            4,
                        )
                    })
                    .unwrap()
            })
            .collect();
        (threads, ids)
    }

    fn order(queue: &WaitQueue, threads: &ThreadTable) -> Vec<ThreadId> {
        queue.iter(threads).collect()
    }

    // =========================================================================
    // FIFO discipline
    // =========================================================================

    #[test]
    fn test_fifo_ignores_priority() {
        let (mut threads, ids) = table(&[10, 1, 5]);
        let mut queue = WaitQueue::new(Discipline::Fifo);
        for id in &ids {
            queue.enqueue(&mut threads, *id);
        }
        assert_eq!(order(&queue, &threads), ids);
        assert_eq!(queue.dequeue(&mut threads), Some(ids[0]));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_fifo_most_urgent_scans_all() {
        let (mut threads, ids) = table(&[10, 1, 5]);
        let mut queue = WaitQueue::new(Discipline::Fifo);
        for id in &ids {
            queue.enqueue(&mut threads, *id);
        }
        assert_eq!(queue.most_urgent(&threads), Some(1));
    }

    #[test]
    fn test_fifo_requeue_keeps_position() {
        let (mut threads, ids) = table(&[10, 10]);
        let mut queue = WaitQueue::new(Discipline::Fifo);
        queue.enqueue(&mut threads, ids[0]);
        queue.enqueue(&mut threads, ids[1]);

        threads.control_mut(ids[1]).priority.set_base(1);
        queue.requeue(&mut threads, ids[1]);
        assert_eq!(order(&queue, &threads), ids);
    }

    // =========================================================================
    // Priority discipline
    // =========================================================================

    #[test]
    fn test_priority_order_with_fifo_ties() {
        let (mut threads, ids) = table(&[10, 5, 10, 5, 1]);
        let mut queue = WaitQueue::new(Discipline::Priority);
        for id in &ids {
            queue.enqueue(&mut threads, *id);
        }
        assert_eq!(
            order(&queue, &threads),
            vec![ids[4], ids[1], ids[3], ids[0], ids[2]]
        );
        assert_eq!(queue.first(), Some(ids[4]));
        assert_eq!(queue.most_urgent(&threads), Some(1));
    }

    #[test]
    fn test_requeue_goes_behind_new_equals() {
        let (mut threads, ids) = table(&[5, 5, 20]);
        let mut queue = WaitQueue::new(Discipline::Priority);
        for id in &ids {
            queue.enqueue(&mut threads, *id);
        }

        threads.control_mut(ids[2]).priority.set_base(5);
        queue.requeue(&mut threads, ids[2]);
        assert_eq!(order(&queue, &threads), ids, "arrives last among the fives");

        threads.control_mut(ids[2]).priority.set_base(2);
        queue.requeue(&mut threads, ids[2]);
        assert_eq!(order(&queue, &threads), vec![ids[2], ids[0], ids[1]]);
    }

    #[test]
    fn test_requeue_follows_inherited_priority() {
        let (mut threads, ids) = table(&[8, 9]);
        let mut queue = WaitQueue::new(Discipline::Priority);
        queue.enqueue(&mut threads, ids[0]);
        queue.enqueue(&mut threads, ids[1]);

        let source = ObjectId::new(1, 1, 0);
        threads.control_mut(ids[1]).priority.set(source, 3);
        queue.requeue(&mut threads, ids[1]);
        assert_eq!(queue.first(), Some(ids[1]));
    }

    #[test]
    fn test_extract_from_middle() {
        let (mut threads, ids) = table(&[1, 2, 3]);
        let mut queue = WaitQueue::new(Discipline::Priority);
        for id in &ids {
            queue.enqueue(&mut threads, *id);
        }
        queue.extract(&mut threads, ids[1]);
        assert_eq!(order(&queue, &threads), vec![ids[0], ids[2]]);

        // An extracted thread can queue again
        queue.enqueue(&mut threads, ids[1]);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_empty_queue() {
        let (mut threads, _ids) = table(&[1]);
        let mut queue = WaitQueue::new(Discipline::Priority);
        assert!(queue.is_empty());
        assert_eq!(queue.dequeue(&mut threads), None);
        assert_eq!(queue.most_urgent(&threads), None);
    }
}
