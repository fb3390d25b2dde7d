mod settings;

pub use settings::{config_path, Config, ConfigError, PollOptions, EXAMPLE_CONFIG};
