//! Priority Bitmap Tests

#[cfg(test)]
mod tests {
    use nexa_rtcore::scheduler::PriorityBitmap;

    // =========================================================================
    // add / remove / highest
    // =========================================================================

    #[test]
    fn test_new_bitmap_is_empty() {
        let bitmap = PriorityBitmap::new();
        assert!(bitmap.is_empty());
        assert_eq!(bitmap.try_highest(), None);
    }

    #[test]
    fn test_highest_returns_most_urgent() {
        let mut bitmap = PriorityBitmap::new();
        bitmap.add(200);
        bitmap.add(17);
        bitmap.add(42);
        assert_eq!(bitmap.highest(), 17);
        // Idempotent without mutation
        assert_eq!(bitmap.highest(), 17);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut bitmap = PriorityBitmap::new();
        bitmap.add(5);
        bitmap.add(5);
        bitmap.remove(5);
        assert!(bitmap.is_empty(), "one remove clears a bit added twice");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut bitmap = PriorityBitmap::new();
        bitmap.add(3);
        bitmap.remove(9);
        bitmap.remove(9);
        assert_eq!(bitmap.highest(), 3);
    }

    #[test]
    fn test_remove_keeps_other_levels_in_same_group() {
        let mut bitmap = PriorityBitmap::new();
        bitmap.add(16);
        bitmap.add(31);
        bitmap.remove(16);
        assert!(!bitmap.is_empty());
        assert_eq!(bitmap.highest(), 31);
    }

    #[test]
    fn test_extreme_levels() {
        let mut bitmap = PriorityBitmap::new();
        bitmap.add(255);
        assert_eq!(bitmap.highest(), 255);
        bitmap.add(0);
        assert_eq!(bitmap.highest(), 0);
        assert!(bitmap.contains(0));
        assert!(bitmap.contains(255));
        assert!(!bitmap.contains(128));
    }

    #[test]
    #[should_panic(expected = "priority bitmap empty")]
    fn test_highest_on_empty_bitmap_is_fatal() {
        let bitmap = PriorityBitmap::new();
        let _ = bitmap.highest();
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    #[test]
    fn test_iter_from_most_to_least_urgent() {
        let mut bitmap = PriorityBitmap::new();
        for priority in [254, 1, 15, 16, 100, 17] {
            bitmap.add(priority);
        }
        let levels: Vec<u8> = bitmap.iter().collect();
        assert_eq!(levels, vec![1, 15, 16, 17, 100, 254]);
    }

    #[test]
    fn test_next_after_crosses_groups() {
        let mut bitmap = PriorityBitmap::new();
        bitmap.add(2);
        bitmap.add(70);
        assert_eq!(bitmap.next_after(2), Some(70));
        assert_eq!(bitmap.next_after(70), None);
        assert_eq!(bitmap.next_after(255), None);
    }

    #[test]
    fn test_matches_reference_model() {
        // Deterministic pseudo-random add/remove sequence against a bool array
        let mut bitmap = PriorityBitmap::new();
        let mut model = [false; 256];
        let mut seed: u32 = 0x1234_5678;
        for _ in 0..2000 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let priority = (seed >> 16) as u8;
            if (seed >> 8) & 1 == 0 {
                bitmap.add(priority);
                model[priority as usize] = true;
            } else {
                bitmap.remove(priority);
                model[priority as usize] = false;
            }

            let expected = model.iter().position(|set| *set).map(|p| p as u8);
            assert_eq!(bitmap.try_highest(), expected);
            assert_eq!(bitmap.is_empty(), expected.is_none());
        }
    }
}
