mod settings;

pub use settings::{Config, ConfigError, TransportConfig, EXAMPLE_CONFIG};
