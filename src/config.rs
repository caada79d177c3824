//! Runtime configuration: comparison tolerances, logging and the rayon pool
//!
//! Tolerances are process-wide defaults consulted by every equality check that
//! does not override them through [`EqualsOptions`](crate::equals::EqualsOptions).

use crate::errors::{CfError, Result};
use parking_lot::RwLock;
use rayon::ThreadPoolBuilder;
use tracing_subscriber::EnvFilter;

/// Default tolerance on absolute differences
pub const DEFAULT_ATOL: f64 = 1e-8;

/// Default tolerance on relative differences
pub const DEFAULT_RTOL: f64 = 1e-5;

static ATOL: RwLock<f64> = RwLock::new(DEFAULT_ATOL);
static RTOL: RwLock<f64> = RwLock::new(DEFAULT_RTOL);

/// Current default absolute tolerance
pub fn atol() -> f64 {
    *ATOL.read()
}

/// Current default relative tolerance
pub fn rtol() -> f64 {
    *RTOL.read()
}

/// Set the default absolute tolerance, returning the previous value
pub fn set_atol(value: f64) -> Result<f64> {
    check_tolerance("atol", value)?;
    Ok(std::mem::replace(&mut *ATOL.write(), value))
}

/// Set the default relative tolerance, returning the previous value
pub fn set_rtol(value: f64) -> Result<f64> {
    check_tolerance("rtol", value)?;
    Ok(std::mem::replace(&mut *RTOL.write(), value))
}

fn check_tolerance(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CfError::Config(format!(
            "{name} must be a finite non-negative number, got {value}"
        )))
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub atol: f64,
    pub rtol: f64,
    /// A `tracing` filter directive such as `info` or `cfdm=debug`
    pub log_level: String,
    pub parallel: ParallelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            atol: DEFAULT_ATOL,
            rtol: DEFAULT_RTOL,
            log_level: "warn".to_string(),
            parallel: ParallelConfig::default(),
        }
    }
}

impl Config {
    /// Build a configuration from `CFDM_ATOL`, `CFDM_RTOL`, `CFDM_LOG` and
    /// `CFDM_NUM_THREADS`, falling back to the defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build a configuration from variables returned by `lookup`
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup("CFDM_ATOL") {
            config.atol = parse_env("CFDM_ATOL", &value)?;
            check_tolerance("CFDM_ATOL", config.atol)?;
        }
        if let Some(value) = lookup("CFDM_RTOL") {
            config.rtol = parse_env("CFDM_RTOL", &value)?;
            check_tolerance("CFDM_RTOL", config.rtol)?;
        }
        if let Some(value) = lookup("CFDM_LOG") {
            config.log_level = value;
        }
        if let Some(value) = lookup("CFDM_NUM_THREADS") {
            config.parallel = ParallelConfig::with_threads(parse_env("CFDM_NUM_THREADS", &value)?);
        }

        Ok(config)
    }

    /// Install the tolerances as process-wide defaults, the logging
    /// subscriber and the rayon pool
    pub fn apply(&self) -> Result<()> {
        check_tolerance("atol", self.atol)?;
        check_tolerance("rtol", self.rtol)?;
        init_logging(&self.log_level)?;
        self.parallel.setup_global_pool()?;
        set_atol(self.atol)?;
        set_rtol(self.rtol)?;
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CfError::Config(format!("Invalid value for {name}: '{value}'")))
}

/// Install a `tracing` fmt subscriber filtered by `RUST_LOG`, or by `level`
/// when `RUST_LOG` is unset.
///
/// Installing twice is not an error; the first subscriber stays in place.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| CfError::Config(format!("Invalid log filter '{level}': {e}")))?;

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already installed");
    }

    Ok(())
}

/// Configuration for parallel processing
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Set up the global Rayon thread pool with the specified configuration
    pub fn setup_global_pool(&self) -> Result<()> {
        if let Some(num_threads) = self.num_threads {
            ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .map_err(|e| {
                    CfError::Config(format!(
                        "Failed to initialize thread pool with {num_threads} threads: {e}"
                    ))
                })?;

            tracing::info!(num_threads, "Configured parallel comparison pool");
        } else {
            tracing::debug!("Using default thread pool configuration");
        }

        Ok(())
    }

    /// Get the current number of threads being used
    pub fn current_threads(&self) -> usize {
        rayon::current_num_threads()
    }

    /// Create a configuration that uses all available CPU cores
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    /// Create a configuration that uses a specific number of threads
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }
}
