//! Priority Aggregation Tests

#[cfg(test)]
mod tests {
    use nexa_rtcore::thread::PriorityAggregation;
    use nexa_rtcore::ObjectId;

    const M1: ObjectId = ObjectId::new(1, 1, 0);
    const M2: ObjectId = ObjectId::new(1, 1, 1);
    const M3: ObjectId = ObjectId::new(1, 1, 2);

    #[test]
    fn test_base_only() {
        let aggregation = PriorityAggregation::new(10, 4);
        assert_eq!(aggregation.effective(), 10);
        assert_eq!(aggregation.driving(), None);
        assert!(!aggregation.is_boosted());
        assert!(aggregation.is_empty());
    }

    #[test]
    fn test_most_urgent_contribution_wins() {
        let mut aggregation = PriorityAggregation::new(10, 4);
        aggregation.set(M1, 6);
        aggregation.set(M2, 3);
        aggregation.set(M3, 8);
        assert_eq!(aggregation.effective(), 3);
        assert_eq!(aggregation.driving(), Some(M2));

        aggregation.remove(M2);
        assert_eq!(aggregation.effective(), 6);
        assert_eq!(aggregation.driving(), Some(M1));
    }

    #[test]
    fn test_less_urgent_contribution_does_not_drive() {
        let mut aggregation = PriorityAggregation::new(5, 4);
        aggregation.set(M1, 9);
        assert_eq!(aggregation.effective(), 5);
        assert_eq!(aggregation.driving(), None);
        assert_eq!(aggregation.len(), 1);
    }

    #[test]
    fn test_set_moves_existing_contribution() {
        let mut aggregation = PriorityAggregation::new(20, 4);
        aggregation.set(M1, 4);
        aggregation.set(M2, 7);
        aggregation.set(M1, 9);
        assert_eq!(aggregation.len(), 2);
        assert_eq!(aggregation.get(M1), Some(9));
        assert_eq!(aggregation.driving(), Some(M2));
    }

    #[test]
    fn test_equal_contributions_keep_insertion_order() {
        let mut aggregation = PriorityAggregation::new(20, 4);
        aggregation.set(M1, 4);
        aggregation.set(M2, 4);
        assert_eq!(aggregation.driving(), Some(M1));
        let sources: Vec<ObjectId> = aggregation.iter().map(|entry| entry.source).collect();
        assert_eq!(sources, vec![M1, M2]);
    }

    #[test]
    fn test_base_change_keeps_boosts() {
        let mut aggregation = PriorityAggregation::new(20, 4);
        aggregation.set(M1, 4);
        assert_eq!(aggregation.set_base(15), 20);
        assert_eq!(aggregation.effective(), 4);

        aggregation.set_base(2);
        assert_eq!(aggregation.effective(), 2);
        assert_eq!(aggregation.driving(), None);
        assert_eq!(aggregation.remove(M1), Some(4));
        assert_eq!(aggregation.remove(M1), None);
    }
}
