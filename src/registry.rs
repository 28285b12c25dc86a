// THEORY:
// The `registry` module maps configured kinds to constructors. It is built
// once at startup by static registration: every source and processor kind
// the binary supports is inserted explicitly in `with_builtin_kinds`. There
// is no reflection and no runtime scanning; adding a new kind means adding
// an enum variant and one `register_*` call.
//
// Kinds that exist in the config schema but have no registered constructor
// (`stream`, `ndvi`) fail construction with a config error, which keeps
// "parses" and "runs" as two separate promises.

use std::collections::HashMap;

use tracing::info;

use crate::config::{ProcessorConfig, ProcessorKind, SourceConfig, SourceKind};
use crate::core_modules::folder_watch::FolderWatchSource;
use crate::core_modules::green_pixels::GreenPixelCounter;
use crate::core_modules::processor::ImageProcessor;
use crate::core_modules::source::ImageSource;
use crate::errors::ConfigError;

type SourceCtor = fn(&SourceConfig) -> Box<dyn ImageSource>;
type ProcessorCtor = fn(&ProcessorConfig) -> Box<dyn ImageProcessor>;

/// Explicit kind-to-constructor maps for sources and processors.
pub struct Registry {
    sources: HashMap<SourceKind, SourceCtor>,
    processors: HashMap<ProcessorKind, ProcessorCtor>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
            processors: HashMap::new(),
        }
    }

    /// The registry with every kind this binary ships.
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        registry.register_source(SourceKind::Folder, |cfg| {
            Box::new(FolderWatchSource::new(
                cfg.name.clone(),
                cfg.path.clone(),
                std::time::Duration::from_secs(cfg.update_interval),
            ))
        });
        registry.register_processor(ProcessorKind::GreenPixels, |cfg| {
            Box::new(GreenPixelCounter::new(
                cfg.name.clone(),
                cfg.quadrants,
                cfg.margin,
            ))
        });
        registry
    }

    pub fn register_source(&mut self, kind: SourceKind, ctor: SourceCtor) {
        self.sources.insert(kind, ctor);
    }

    pub fn register_processor(&mut self, kind: ProcessorKind, ctor: ProcessorCtor) {
        self.processors.insert(kind, ctor);
    }

    /// Constructs every configured source.
    pub fn build_sources(
        &self,
        configs: &[SourceConfig],
    ) -> Result<Vec<Box<dyn ImageSource>>, ConfigError> {
        let mut sources = Vec::with_capacity(configs.len());
        for cfg in configs {
            let ctor = self.sources.get(&cfg.kind).ok_or_else(|| {
                ConfigError::UnsupportedSourceKind {
                    name: cfg.name.clone(),
                    kind: cfg.kind.as_str().to_owned(),
                }
            })?;
            info!(source = %cfg.name, kind = cfg.kind.as_str(), "initialized source");
            sources.push(ctor(cfg));
        }
        Ok(sources)
    }

    /// Constructs every enabled configured processor. Disabled entries are
    /// skipped, not errors.
    pub fn build_processors(
        &self,
        configs: &[ProcessorConfig],
    ) -> Result<Vec<Box<dyn ImageProcessor>>, ConfigError> {
        let mut processors = Vec::new();
        for cfg in configs {
            if !cfg.enabled {
                info!(processor = %cfg.name, "processor disabled; skipping");
                continue;
            }
            let ctor = self.processors.get(&cfg.kind).ok_or_else(|| {
                ConfigError::UnsupportedProcessorKind {
                    name: cfg.name.clone(),
                    kind: cfg.kind.as_str().to_owned(),
                }
            })?;
            info!(processor = %cfg.name, kind = cfg.kind.as_str(),
                  quadrants = cfg.quadrants, "initialized processor");
            processors.push(ctor(cfg));
        }
        Ok(processors)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtin_kinds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn builtin_kinds_construct_the_default_config() {
        let config = Config::builtin_default();
        let registry = Registry::with_builtin_kinds();
        let sources = registry.build_sources(&config.sources).unwrap();
        let processors = registry.build_processors(&config.processors).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name(), "Camera Left");
        assert_eq!(processors.len(), 1);
        assert_eq!(processors[0].name(), "Green Pixels");
    }

    #[test]
    fn disabled_processors_are_skipped() {
        let mut config = Config::builtin_default();
        config.processors[0].enabled = false;
        let registry = Registry::with_builtin_kinds();
        let processors = registry.build_processors(&config.processors).unwrap();
        assert!(processors.is_empty());
    }

    #[test]
    fn unregistered_kinds_are_config_errors() {
        let mut config = Config::builtin_default();
        config.sources[0].kind = SourceKind::Stream;
        let registry = Registry::with_builtin_kinds();
        assert!(matches!(
            registry.build_sources(&config.sources),
            Err(ConfigError::UnsupportedSourceKind { .. })
        ));

        let mut config = Config::builtin_default();
        config.processors[0].kind = ProcessorKind::Ndvi;
        assert!(matches!(
            registry.build_processors(&config.processors),
            Err(ConfigError::UnsupportedProcessorKind { .. })
        ));
    }
}
