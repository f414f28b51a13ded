use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How much of the machine a batch may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResourceMode {
    /// One worker
    #[default]
    Sequential,
    /// Half of the available cores
    Half,
    /// Roughly 75% of the available cores
    Optimized,
    /// All cores but one
    Full,
}

impl fmt::Display for ResourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceMode::Sequential => "sequential",
            ResourceMode::Half => "half",
            ResourceMode::Optimized => "optimized",
            ResourceMode::Full => "full",
        };
        f.write_str(name)
    }
}

/// Worker count for a batch given the mode, an optional explicit thread
/// count and the number of available cores.
///
/// An explicit count wins over the mode and is clamped to `1..=cores - 1`.
/// The result is always at least 1.
pub fn determine_worker_count(mode: ResourceMode, user_threads: Option<i64>, cores: usize) -> usize {
    if cores <= 1 {
        return 1;
    }
    let all_but_one = cores - 1;

    let workers = match user_threads {
        Some(requested) if requested <= 0 => 1,
        Some(requested) if requested as u64 >= cores as u64 => all_but_one,
        Some(requested) => requested as usize,
        None => match mode {
            ResourceMode::Sequential => 1,
            ResourceMode::Half => cores / 2,
            ResourceMode::Optimized => cores * 3 / 4,
            ResourceMode::Full => all_but_one,
        },
    };

    workers.max(1)
}

/// Number of logical cores on this machine.
pub fn available_cores() -> usize {
    num_cpus::get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_core_always_one_worker() {
        assert_eq!(determine_worker_count(ResourceMode::Full, None, 1), 1);
        assert_eq!(determine_worker_count(ResourceMode::Half, Some(8), 1), 1);
    }

    #[test]
    fn test_modes_on_eight_cores() {
        assert_eq!(determine_worker_count(ResourceMode::Sequential, None, 8), 1);
        assert_eq!(determine_worker_count(ResourceMode::Half, None, 8), 4);
        assert_eq!(determine_worker_count(ResourceMode::Optimized, None, 8), 6);
        assert_eq!(determine_worker_count(ResourceMode::Full, None, 8), 7);
    }

    #[test]
    fn test_small_machines_never_return_zero() {
        assert_eq!(determine_worker_count(ResourceMode::Half, None, 2), 1);
        assert_eq!(determine_worker_count(ResourceMode::Optimized, None, 2), 1);
        assert_eq!(determine_worker_count(ResourceMode::Optimized, None, 3), 2);
    }

    #[test]
    fn test_user_threads_are_clamped() {
        assert_eq!(determine_worker_count(ResourceMode::Sequential, Some(3), 8), 3);
        assert_eq!(determine_worker_count(ResourceMode::Sequential, Some(8), 8), 7);
        assert_eq!(determine_worker_count(ResourceMode::Sequential, Some(100), 8), 7);
        assert_eq!(determine_worker_count(ResourceMode::Full, Some(0), 8), 1);
        assert_eq!(determine_worker_count(ResourceMode::Full, Some(-4), 8), 1);
    }

    #[test]
    fn test_mode_parses_lowercase() {
        #[derive(Deserialize)]
        struct Section {
            mode: ResourceMode,
        }

        let section: Section = toml::from_str("mode = \"optimized\"").unwrap();
        assert_eq!(section.mode, ResourceMode::Optimized);
        assert_eq!(ResourceMode::from_str("half", true).unwrap(), ResourceMode::Half);
    }
}
