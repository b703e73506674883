//! Diagnostic logging for the simulation engine. Not to be confused with
//! [`crate::report`], which writes the model output.
//!
//! The five `log` macros are re-exported from here. The engine logs run start
//! and end at `info`, population construction at `debug`, and every status
//! transition and discarded stale event at `trace`, each under the module
//! that emits it (`ixa_sir::context`, `ixa_sir::process`, ...).
//!
//! Logging starts switched off. `set_log_level` sets the level for every
//! module; `set_module_filter` overrides it for one module path and its
//! children, so a single module can be traced while the rest stay quiet:
//!
//! ```rust
//! use ixa_sir::log::{set_log_level, set_module_filter, LevelFilter};
//!
//! set_log_level(LevelFilter::Info);
//! // One line per status change
//! set_module_filter("ixa_sir::context", LevelFilter::Trace);
//! ```
//!
//! On the command line the same settings are `--log-level <level>` and the
//! repeatable `--log-filter <module>=<level>`.

#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

pub use log::{debug, error, info, trace, warn, LevelFilter};

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use crate::error::SirError;

static LOG_STATE: Mutex<LogState> = Mutex::new(LogState::new());

/// The levels in force and, with the `logging` feature, the installed logger
#[derive(Debug)]
struct LogState {
    level: LevelFilter,
    filters: BTreeMap<String, LevelFilter>,
    #[cfg(feature = "logging")]
    handle: Option<log4rs::Handle>,
}

impl LogState {
    const fn new() -> LogState {
        LogState {
            level: LevelFilter::Off,
            filters: BTreeMap::new(),
            #[cfg(feature = "logging")]
            handle: None,
        }
    }

    // Reinstalls the logger only when `change` reports that something moved.
    fn update(&mut self, change: impl FnOnce(&mut LogState) -> bool) {
        if change(self) {
            self.install();
        }
    }
}

fn log_state() -> MutexGuard<'static, LogState> {
    LOG_STATE.lock().expect("Mutex poisoned")
}

/// Turns on every message. Same as `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Turns off every message not covered by a module filter.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the level for modules without their own filter.
pub fn set_log_level(level: LevelFilter) {
    log_state().update(|state| std::mem::replace(&mut state.level, level) != level);
}

/// Sets the level for `module` and everything below it, regardless of the
/// global level.
///
/// # Panics
///
/// Panics if `module` is not a module path (empty, or with a leading,
/// trailing or doubled `::`).
pub fn set_module_filter(module: &str, level: LevelFilter) {
    assert!(is_module_path(module), "invalid module path {module:?}");
    log_state().update(|state| state.filters.insert(module.to_string(), level) != Some(level));
}

/// Drops the filter for `module`; it follows the global level again.
pub fn remove_module_filter(module: &str) {
    log_state().update(|state| state.filters.remove(module).is_some());
}

fn is_module_path(module: &str) -> bool {
    !module.is_empty() && module.split("::").all(|segment| !segment.is_empty())
}

/// A `<module>=<level>` pair as given to `--log-filter`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFilter {
    pub module: String,
    pub level: LevelFilter,
}

impl ModuleFilter {
    /// Installs this filter.
    pub fn apply(&self) {
        set_module_filter(&self.module, self.level);
    }
}

impl FromStr for ModuleFilter {
    type Err = SirError;

    fn from_str(s: &str) -> Result<ModuleFilter, SirError> {
        let Some((module, level)) = s.split_once('=') else {
            return Err(SirError::configuration(
                "log_filter",
                format!("expected <module>=<level>, got {s:?}"),
            ));
        };
        let module = module.trim();
        if !is_module_path(module) {
            return Err(SirError::configuration(
                "log_filter",
                format!("{module:?} is not a module path"),
            ));
        }
        let level = level
            .trim()
            .parse::<LevelFilter>()
            .map_err(|error| SirError::configuration("log_filter", error))?;
        Ok(ModuleFilter {
            module: module.to_string(),
            level,
        })
    }
}
