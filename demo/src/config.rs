use serde::{Deserialize, Serialize};

fn default_log_level() -> String {
    "info".to_string()
}

fn default_scenario() -> String {
    "comment-thread".to_string()
}

/// Configuration for the demo host binary. Mirrors the engine's own
/// stance on configuration: nothing here reaches into `skein` itself,
/// since the library performs no I/O and has nothing to configure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_scenario")]
    pub scenario: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            scenario: default_scenario(),
        }
    }
}

/// Loads configuration from `path`, falling back to defaults for any
/// field the file omits. Returns an error only if the file exists but
/// fails to parse.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<DemoConfig> {
    if !path.exists() {
        return Ok(DemoConfig::default());
    }
    let contents = std::fs::read_to_string(path)?;
    let config: DemoConfig = toml::from_str(&contents)?;
    Ok(config)
}
