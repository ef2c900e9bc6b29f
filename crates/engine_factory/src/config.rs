//! Entity factory configuration.

use engine_blueprint::DEFAULT_BUFFER_CAPACITY;

/// Configuration for an [`EntityFactory`](crate::EntityFactory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryConfig {
    /// Extension appended to blueprint names that have none (e.g. `"bin"`).
    pub blueprint_extension: String,
    /// When exactly one converter is registered, use it for every buffer
    /// regardless of the buffer's file identifier.
    pub single_converter_fallback: bool,
    /// Initial byte capacity of blueprints handed out by the factory.
    pub record_buffer_capacity: usize,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            blueprint_extension: "bin".to_string(),
            single_converter_fallback: false,
            record_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl FactoryConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, overridden by `BLUEPRINT_EXTENSION` and
    /// `BLUEPRINT_SINGLE_CONVERTER_FALLBACK` when set.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(extension) = std::env::var("BLUEPRINT_EXTENSION") {
            config.blueprint_extension = extension.trim_start_matches('.').to_string();
        }
        if let Ok(flag) = std::env::var("BLUEPRINT_SINGLE_CONVERTER_FALLBACK") {
            config.single_converter_fallback = parse_flag(&flag);
        }
        config
    }

    /// Override the extension appended to bare blueprint names.
    #[must_use]
    pub fn with_blueprint_extension(mut self, extension: impl Into<String>) -> Self {
        self.blueprint_extension = extension.into();
        self
    }

    /// Enable or disable the single-converter fallback.
    #[must_use]
    pub fn with_single_converter_fallback(mut self, enabled: bool) -> Self {
        self.single_converter_fallback = enabled;
        self
    }

    /// Override the initial capacity of factory-created blueprints.
    #[must_use]
    pub fn with_record_buffer_capacity(mut self, capacity: usize) -> Self {
        self.record_buffer_capacity = capacity;
        self
    }

    /// Resolve a blueprint name to the filename handed to the asset loader.
    /// Names that already carry an extension are used as-is.
    #[must_use]
    pub fn resolve_filename(&self, name: &str) -> String {
        let has_extension = std::path::Path::new(name).extension().is_some();
        if has_extension || self.blueprint_extension.is_empty() {
            name.to_string()
        } else {
            format!("{name}.{}", self.blueprint_extension)
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
