//! Kernel configuration
//!
//! Everything the core sizes at construction time: priority range, thread and
//! object slots, processors and their partition into scheduler instances.
//! Boot code may build it from the kernel command line with
//! [`KernelConfig::from_cmdline`].

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::ConfigError;
use crate::logger::LogLevel;
use crate::scheduler::{Priority, ProcessorId, ProcessorMask, MAX_PROCESSORS};

pub const DEFAULT_MAX_PRIORITY: Priority = 255;
pub const DEFAULT_MAX_THREADS: usize = 64;
pub const DEFAULT_MAX_OBJECTS: usize = 64;
pub const DEFAULT_MRSP_SPIN_LIMIT: u32 = 64;
pub const DEFAULT_NODE: u8 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub name: String,
    pub processors: ProcessorMask,
}

impl SchedulerConfig {
    pub fn new(name: &str, processors: ProcessorMask) -> Self {
        Self {
            name: String::from(name),
            processors,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelConfig {
    /// Least urgent priority, reserved for the idle threads.
    pub max_priority: Priority,
    /// Thread slots, idle threads included.
    pub max_threads: usize,
    pub max_objects: usize,
    pub processor_count: usize,
    pub schedulers: Vec<SchedulerConfig>,
    /// Contended MrsP acquires retry this often before parking.
    pub mrsp_spin_limit: u32,
    /// Node number of this kernel in a multi-node system (never 0).
    pub node: u8,
    pub log_level: LogLevel,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_priority: DEFAULT_MAX_PRIORITY,
            max_threads: DEFAULT_MAX_THREADS,
            max_objects: DEFAULT_MAX_OBJECTS,
            processor_count: 1,
            schedulers: vec![SchedulerConfig::new("sched0", ProcessorMask::first(1))],
            mrsp_spin_limit: DEFAULT_MRSP_SPIN_LIMIT,
            node: DEFAULT_NODE,
            log_level: LogLevel::INFO,
        }
    }
}

impl KernelConfig {
    /// `processor_count` processors split into one instance per mask.
    pub fn partitioned(processor_count: usize, masks: &[ProcessorMask]) -> Self {
        Self {
            processor_count,
            schedulers: masks
                .iter()
                .enumerate()
                .map(|(index, mask)| SchedulerConfig::new(&format!("sched{}", index), *mask))
                .collect(),
            ..Self::default()
        }
    }

    /// `processor_count` processors all owned by one instance.
    pub fn global(processor_count: usize) -> Self {
        Self::partitioned(processor_count, &[ProcessorMask::first(processor_count)])
    }

    /// Priority of the idle threads.
    #[inline]
    pub fn idle_priority(&self) -> Priority {
        self.max_priority
    }

    /// Valid for threads and ceilings: strictly between the two sentinels.
    #[inline]
    pub fn is_valid_priority(&self, priority: Priority) -> bool {
        priority > 0 && priority < self.max_priority
    }

    pub fn processors(&self) -> ProcessorMask {
        ProcessorMask::first(self.processor_count)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_priority < 2 {
            return Err(ConfigError::PriorityRange);
        }
        if self.processor_count == 0 || self.processor_count > MAX_PROCESSORS {
            return Err(ConfigError::ProcessorCount);
        }
        if !cfg!(feature = "smp") && (self.processor_count > 1 || self.schedulers.len() > 1) {
            return Err(ConfigError::SmpDisabled);
        }
        if self.schedulers.is_empty() || self.schedulers.len() > self.processor_count {
            return Err(ConfigError::EmptyScheduler);
        }

        let all = self.processors();
        let mut seen = ProcessorMask::EMPTY;
        for scheduler in &self.schedulers {
            if scheduler.processors.is_empty() {
                return Err(ConfigError::EmptyScheduler);
            }
            for cpu in scheduler.processors.iter() {
                if !all.contains(cpu) {
                    return Err(ConfigError::ProcessorMissing { processor: cpu.0 });
                }
                if seen.contains(cpu) {
                    return Err(ConfigError::ProcessorShared { processor: cpu.0 });
                }
                seen.insert(cpu);
            }
        }
        if let Some(cpu) = all.iter().find(|cpu| !seen.contains(*cpu)) {
            return Err(ConfigError::ProcessorUnassigned { processor: cpu.0 });
        }

        if self.max_threads <= self.processor_count || self.max_threads > u16::MAX as usize {
            return Err(ConfigError::ThreadCount);
        }
        if self.max_objects == 0 || self.max_objects > u16::MAX as usize {
            return Err(ConfigError::ObjectCount);
        }
        if self.node == 0 {
            return Err(ConfigError::InvalidNode);
        }
        Ok(())
    }

    /// Parse `key=value` tokens from the kernel command line on top of the
    /// defaults. Unknown tokens belong to other subsystems and are skipped.
    pub fn from_cmdline(cmdline: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut masks: Option<Vec<ProcessorMask>> = None;

        for arg in cmdline.split_whitespace() {
            if let Some(value) = arg.strip_prefix("maxprio=") {
                config.max_priority = parse_number(value)?;
            } else if let Some(value) = arg.strip_prefix("threads=") {
                config.max_threads = parse_number(value)?;
            } else if let Some(value) = arg.strip_prefix("objects=") {
                config.max_objects = parse_number(value)?;
            } else if let Some(value) = arg.strip_prefix("cpus=") {
                config.processor_count = parse_number(value)?;
            } else if let Some(value) = arg.strip_prefix("sched=") {
                let parsed = value
                    .split(',')
                    .map(|mask| parse_number::<u64>(mask).map(ProcessorMask))
                    .collect::<Result<Vec<_>, _>>()?;
                masks = Some(parsed);
            } else if let Some(value) = arg.strip_prefix("mrsp_spin=") {
                config.mrsp_spin_limit = parse_number(value)?;
            } else if let Some(value) = arg.strip_prefix("node=") {
                config.node = parse_number(value)?;
            } else if let Some(value) = arg
                .strip_prefix("log=")
                .or_else(|| arg.strip_prefix("loglevel="))
            {
                config.log_level = LogLevel::from_str(value).ok_or(ConfigError::Malformed)?;
            }
        }

        config.schedulers = match masks {
            Some(masks) => masks
                .iter()
                .enumerate()
                .map(|(index, mask)| SchedulerConfig::new(&format!("sched{}", index), *mask))
                .collect(),
            None => vec![SchedulerConfig::new(
                "sched0",
                ProcessorMask::first(config.processor_count),
            )],
        };

        config.validate()?;
        Ok(config)
    }

    /// Make `log_level` the logger's maximum level.
    pub fn apply_logging(&self) {
        crate::logger::set_max_level(self.log_level);
    }

    /// Instance index owning `cpu`.
    pub fn scheduler_of(&self, cpu: ProcessorId) -> Option<usize> {
        self.schedulers
            .iter()
            .position(|scheduler| scheduler.processors.contains(cpu))
    }
}

fn parse_number<T: TryFrom<u64>>(value: &str) -> Result<T, ConfigError> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    };
    let parsed = parsed.map_err(|_| ConfigError::Malformed)?;
    T::try_from(parsed).map_err(|_| ConfigError::Malformed)
}
