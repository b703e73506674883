//! `log4rs` backend: one stderr appender shared by the root logger and a
//! logger per module filter.

use std::collections::BTreeMap;

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

use crate::log::LogState;

const APPENDER: &str = "stderr";
// Timestamp, colored level, emitting module, message
const PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";

fn build_config(level: LevelFilter, filters: &BTreeMap<String, LevelFilter>) -> Config {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();
    let loggers = filters
        .iter()
        .map(|(module, &level)| Logger::builder().build(module.clone(), level));
    match Config::builder()
        .appender(Appender::builder().build(APPENDER, Box::new(stderr)))
        .loggers(loggers)
        .build(Root::builder().appender(APPENDER).build(level))
    {
        Ok(config) => config,
        // Module paths are checked before they reach the filter map
        Err(errors) => panic!("invalid logging configuration: {errors}"),
    }
}

impl LogState {
    /// Points the `log` facade at a logger built from the current state.
    pub(super) fn install(&mut self) {
        let config = build_config(self.level, &self.filters);
        if let Some(handle) = &self.handle {
            handle.set_config(config);
            return;
        }
        match log4rs::init_config(config) {
            Ok(handle) => self.handle = Some(handle),
            // Someone else installed a logger; only the facade level is ours
            Err(_) => log::set_max_level(self.level),
        }
    }
}
