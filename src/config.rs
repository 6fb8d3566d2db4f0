use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable naming the dataset file.
pub const DATASET_ENV: &str = "MATDASH_DATASET";

/// Dataset used when neither an argument nor the environment names one.
pub const DEFAULT_DATASET: &str = "uploaded_data.xlsx";

// ---------------------------------------------------------------------------
// Startup configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Table file the dashboard reads and appends to.
    pub dataset_path: PathBuf,
}

impl DashboardConfig {
    /// First CLI argument, then `MATDASH_DATASET`, then the default file.
    pub fn from_env() -> Self {
        Self::resolve(std::env::args_os().nth(1), std::env::var_os(DATASET_ENV))
    }

    fn resolve(arg: Option<OsString>, env: Option<OsString>) -> Self {
        let dataset_path = arg
            .into_iter()
            .chain(env)
            .find(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET));
        DashboardConfig { dataset_path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_wins_over_environment() {
        let cfg = DashboardConfig::resolve(Some("a.csv".into()), Some("b.csv".into()));
        assert_eq!(cfg.dataset_path, PathBuf::from("a.csv"));
    }

    #[test]
    fn environment_then_default() {
        let cfg = DashboardConfig::resolve(None, Some("b.parquet".into()));
        assert_eq!(cfg.dataset_path, PathBuf::from("b.parquet"));

        let cfg = DashboardConfig::resolve(None, Some("".into()));
        assert_eq!(cfg.dataset_path, PathBuf::from(DEFAULT_DATASET));
    }
}
