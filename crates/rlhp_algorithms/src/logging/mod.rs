//! Logging setup and the agent-side summary logger.
//!
//! Diagnostics go through the `log` facade. Scalar training summaries are emitted on the
//! `rlhp::summary` target so they can be routed to their own appender from a log4rs file.

use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config, Root},
    filter::threshold::ThresholdFilter,
};
use std::path::Path;
use std::sync::Once;

use crate::templates::base_predictor::PredictorError;

pub use log::{debug, error, info, trace, warn};

pub mod agent_logger;

pub use agent_logger::AgentLogger;

/// Target used for every scalar summary record.
pub const SUMMARY_TARGET: &str = "rlhp::summary";

static INIT: Once = Once::new();

/// Installs a stdout logger at `Info`. Later calls, and calls after
/// `init_logging_from_file`, do nothing.
pub fn init_logging() {
    INIT.call_once(|| {
        let stdout = ConsoleAppender::builder().target(Target::Stdout).build();

        let config = Config::builder()
            .appender(
                Appender::builder()
                    .filter(Box::new(ThresholdFilter::new(LevelFilter::Info)))
                    .build("stdout", Box::new(stdout)),
            )
            .build(Root::builder().appender("stdout").build(LevelFilter::Info));

        match config.map_err(|e| e.to_string()).and_then(|config| {
            log4rs::init_config(config).map_err(|e| e.to_string())
        }) {
            Ok(_) => log::info!("RLHP logging initialized with default configuration"),
            Err(e) => eprintln!("Failed to initialize RLHP logging: {}", e),
        }
    });
}

/// Installs logging from a log4rs YAML or JSON file.
pub fn init_logging_from_file(config_path: impl AsRef<Path>) -> Result<(), PredictorError> {
    let config_path = config_path.as_ref();
    let mut result = Ok(());
    INIT.call_once(|| match log4rs::init_file(config_path, Default::default()) {
        Ok(_) => log::info!(
            "RLHP logging initialized from config file: {}",
            config_path.display()
        ),
        Err(e) => {
            result = Err(PredictorError::Configuration(format!(
                "Failed to initialize logging from {}: {}",
                config_path.display(),
                e
            )));
        }
    });
    result
}
