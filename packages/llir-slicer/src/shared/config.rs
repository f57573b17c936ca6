//! Layered configuration for every analysis stage.
//!
//! All options named in the design are plain `Default`-able structs,
//! `serde`-deserializable from TOML so a host can ship a config file and
//! override individual fields from the CLI, layering file → defaults →
//! explicit override the way a staged pipeline configuration usually does.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Recognized allocator kind, used to seed `ALLOC` semantics for calls to
/// functions the analyzer doesn't have a body for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocKind {
    /// `malloc`-like: may return NULL on failure.
    Malloc,
    /// `calloc`-like: zero-initialized, may return NULL.
    Calloc,
    /// `alloca`-like: stack allocation, never returns NULL.
    Alloca,
    /// `realloc`-like: may alias its first argument or allocate fresh.
    Realloc,
    /// A "never-null" variant of one of the above (the `*0` convention
    /// named in the design, e.g. an allocator wrapper that aborts on OOM
    /// instead of returning NULL).
    NeverNull(Box<AllocKind>),
}

impl AllocKind {
    pub fn may_return_null(&self) -> bool {
        match self {
            AllocKind::Malloc | AllocKind::Calloc | AllocKind::Realloc => true,
            AllocKind::Alloca => false,
            AllocKind::NeverNull(_) => false,
        }
    }
}

/// Points-to analysis mode, from flow-insensitive Andersen-style
/// inclusion to flow-sensitive with invalidation tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AnalysisType {
    #[default]
    FlowInsensitive,
    FlowSensitive,
    FlowSensitiveWithInvalidation,
}

/// Options controlling the points-to analyzer (design §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PtaOptions {
    /// Maximum byte offset tracked precisely; beyond this a GEP's offset
    /// collapses to `Offset::UNKNOWN`.
    pub field_sensitivity_bound: u64,
    /// Eagerly collapse GEP offsets known to overflow/saturate.
    pub preprocess_geps: bool,
    /// Track freed memory so dangling pointers point to `INVALIDATED`.
    pub invalidate_nodes: bool,
    /// Fixpoint iteration cap. Exceeding it is not an error: unprocessed
    /// nodes get `{UNKNOWN_MEMORY}` and the run is reported incomplete.
    pub max_iterations: usize,
    pub analysis_type: AnalysisType,
    /// Recognized allocator functions by name.
    pub allocation_functions: HashMap<String, AllocKind>,
    pub entry_function: String,
    /// Enable fork/join reasoning (design §4.7).
    pub threads: bool,
}

impl Default for PtaOptions {
    fn default() -> Self {
        let mut allocation_functions = HashMap::new();
        allocation_functions.insert("malloc".to_string(), AllocKind::Malloc);
        allocation_functions.insert("calloc".to_string(), AllocKind::Calloc);
        allocation_functions.insert("alloca".to_string(), AllocKind::Alloca);
        allocation_functions.insert("realloc".to_string(), AllocKind::Realloc);
        Self {
            field_sensitivity_bound: 256,
            preprocess_geps: true,
            invalidate_nodes: false,
            max_iterations: 1_000_000,
            analysis_type: AnalysisType::default(),
            allocation_functions,
            entry_function: "main".to_string(),
            threads: false,
        }
    }
}

/// Options controlling reaching-definitions / memory-SSA (design §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RdOptions {
    /// Unsound-but-useful: unioning with `UNKNOWN_MEMORY` strong-updates
    /// instead of accumulating. Default `false` (sound, accumulate).
    pub strong_update_unknown: bool,
    /// Treat calls to functions with no model / body as side-effect-free.
    pub undefined_are_pure: bool,
    /// Crop-to-unknown threshold for reaching-definitions sets.
    pub max_set_size: usize,
    /// Choose the sparse (memory-SSA) algorithm over the dense iterative
    /// reference algorithm.
    pub sparse: bool,
    /// Discard offsets, treating each object as a single byte-blob cell.
    pub field_insensitive: bool,
}

impl Default for RdOptions {
    fn default() -> Self {
        Self {
            strong_update_unknown: false,
            undefined_are_pure: false,
            max_set_size: 4096,
            sparse: true,
            field_insensitive: false,
        }
    }
}

/// Options controlling the slicer (design §6 "Configuration").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicerOptions {
    pub entry_function: String,
    /// Function-name pattern used to locate the slicing criterion when one
    /// isn't given as an explicit node list (e.g. `"assert"`).
    pub criterion_selector: Option<String>,
    pub cutoff_diverging: bool,
    pub undefined_are_pure: bool,
}

impl Default for SlicerOptions {
    fn default() -> Self {
        Self {
            entry_function: "main".to_string(),
            criterion_selector: None,
            cutoff_diverging: true,
            undefined_are_pure: false,
        }
    }
}

/// The full, layered configuration for one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub pta: PtaOptions,
    pub rd: RdOptions,
    pub slicer: SlicerOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("failed to parse config at {path}: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },
}

impl AnalysisConfig {
    /// Load a config from a TOML file, falling back to defaults for any
    /// field the file omits. Unknown keys are accepted (forward
    /// compatibility); that is a `serde` default, not special-cased here.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let text = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_ref.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_ref.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pta_defaults_include_standard_allocators() {
        let opts = PtaOptions::default();
        assert!(opts.allocation_functions.contains_key("malloc"));
        assert_eq!(opts.analysis_type, AnalysisType::FlowInsensitive);
    }

    #[test]
    fn never_null_wraps_base_kind() {
        let k = AllocKind::NeverNull(Box::new(AllocKind::Malloc));
        assert!(!k.may_return_null());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = AnalysisConfig::load("/nonexistent/path/config.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join("llir_slicer_cfg_test");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("partial.toml");
        std::fs::write(&file, "[pta]\nthreads = true\n").unwrap();
        let cfg = AnalysisConfig::load(&file).unwrap();
        assert!(cfg.pta.threads);
        assert_eq!(cfg.pta.entry_function, "main");
        let _ = std::fs::remove_file(&file);
    }
}
