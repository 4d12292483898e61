//! Logger Tests
//!
//! The logger is process-global, so tests that install a writer or move the
//! level run serialized, and the ones that need a pristine logger run in a
//! forked process. Kernel tests on other threads may log at the same time,
//! so captured output is searched rather than compared.

#[cfg(test)]
mod tests {
    use std::fmt;

    use rusty_fork::rusty_fork_test;
    use serial_test::serial;
    use spin::Mutex;

    use nexa_rtcore::logger::{self, LogLevel};
    use nexa_rtcore::{kdebug, kinfo, kwarn};

    static CAPTURED: Mutex<Vec<String>> = Mutex::new(Vec::new());

    fn capture(args: fmt::Arguments<'_>) {
        CAPTURED.lock().push(args.to_string());
    }

    fn captured(needle: &str) -> bool {
        CAPTURED.lock().iter().any(|line| line.contains(needle))
    }

    // =========================================================================
    // Level parsing
    // =========================================================================

    #[test]
    fn test_level_names() {
        assert_eq!(LogLevel::from_str("trace"), Some(LogLevel::TRACE));
        assert_eq!(LogLevel::from_str("DEBUG"), Some(LogLevel::DEBUG));
        assert_eq!(LogLevel::from_str("Warning"), Some(LogLevel::WARN));
        assert_eq!(LogLevel::from_str("fatal"), Some(LogLevel::FATAL));
        assert_eq!(LogLevel::from_str("loud"), None);
        assert_eq!(LogLevel::WARN.as_str(), "WARN");
    }

    #[test]
    fn test_levels_ordered_by_severity() {
        assert!(LogLevel::PANIC < LogLevel::FATAL);
        assert!(LogLevel::ERROR < LogLevel::WARN);
        assert!(LogLevel::DEBUG < LogLevel::TRACE);
    }

    #[test]
    fn test_level_directive() {
        assert_eq!(
            logger::parse_level_directive("cpus=2 log=debug node=3"),
            Some(LogLevel::DEBUG)
        );
        assert_eq!(
            logger::parse_level_directive("loglevel=error"),
            Some(LogLevel::ERROR)
        );
        assert_eq!(logger::parse_level_directive("log=loud quiet"), None);
        assert_eq!(logger::parse_level_directive(""), None);
    }

    // =========================================================================
    // Output
    // =========================================================================

    #[test]
    #[serial]
    fn test_line_format() {
        logger::init(capture);
        logger::set_max_level(LogLevel::INFO);

        kinfo!("format probe {}", 42);
        assert!(captured("] [INFO ] format probe 42\n"));
    }

    #[test]
    #[serial]
    fn test_messages_above_max_level_dropped() {
        logger::init(capture);
        logger::set_max_level(LogLevel::WARN);

        kinfo!("filtered probe");
        kwarn!("passing probe");
        assert!(!captured("filtered probe"));
        assert!(captured("[WARN ] passing probe"));
        assert!(logger::enabled(LogLevel::ERROR));
        assert!(!logger::enabled(LogLevel::INFO));

        logger::set_max_level(LogLevel::INFO);
    }

    #[test]
    #[serial]
    fn test_max_level_round_trip() {
        logger::set_max_level(LogLevel::TRACE);
        assert_eq!(logger::max_level(), LogLevel::TRACE);
        assert!(logger::enabled(LogLevel::TRACE));

        logger::set_max_level(LogLevel::INFO);
        assert_eq!(logger::max_level(), LogLevel::INFO);
        assert!(!logger::enabled(LogLevel::DEBUG));
    }

    rusty_fork_test! {
        #[test]
        fn test_first_init_reports_fresh_logger() {
            assert!(!logger::is_initialized());
            assert!(logger::init(capture));
            assert!(!logger::init(capture), "second init replaces the writer");
            assert!(logger::is_initialized());
        }

        #[test]
        fn test_messages_dropped_without_writer() {
            logger::init(capture);
            logger::shutdown();
            assert!(!logger::is_initialized());

            logger::set_max_level(LogLevel::TRACE);
            kdebug!("after shutdown");
            assert!(!captured("after shutdown"));
        }

        #[test]
        fn test_timestamp_follows_uptime() {
            logger::init(capture);
            logger::set_uptime_ticks(1234);
            kinfo!("uptime probe");
            assert!(captured("[    1234] [INFO ] uptime probe"));
            assert_eq!(logger::uptime_ticks(), 1234);
        }
    }
}
