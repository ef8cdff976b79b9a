use crate::error::{Result, UptimemonError};
use crate::supervisor::QualifiedName;
use crate::timespec::parse_duration;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Which configuration level a threshold came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdLevel {
    Program,
    Group,
    Global,
}

impl fmt::Display for ThresholdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdLevel::Program => write!(f, "program"),
            ThresholdLevel::Group => write!(f, "group"),
            ThresholdLevel::Global => write!(f, "global"),
        }
    }
}

/// An uptime limit that applies to a process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    pub level: ThresholdLevel,
    pub limit_secs: u64,
}

impl Threshold {
    /// A process exactly at the limit is not over it
    pub fn is_exceeded_by(&self, uptime_secs: u64) -> bool {
        uptime_secs > self.limit_secs
    }
}

/// Uptime limits by program name, by group name, and globally
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThresholdRegistry {
    programs: BTreeMap<String, u64>,
    groups: BTreeMap<String, u64>,
    global: Option<u64>,
}

impl ThresholdRegistry {
    pub fn new(
        programs: BTreeMap<String, u64>,
        groups: BTreeMap<String, u64>,
        global: Option<u64>,
    ) -> Self {
        Self {
            programs,
            groups,
            global,
        }
    }

    /// Limit registered for a bare program name
    pub fn program_limit(&self, bare_name: &str) -> Option<u64> {
        self.programs.get(bare_name).copied()
    }

    /// Whether a program key was registered in `group:name` form for this process
    ///
    /// Such keys are recognised but never supply a limit: per-process limits
    /// are always read through the bare name.
    pub fn has_qualified_program(&self, name: &QualifiedName) -> bool {
        self.programs.contains_key(&name.to_string())
    }

    pub fn group_limit(&self, group: &str) -> Option<u64> {
        self.groups.get(group).copied()
    }

    pub fn global_limit(&self) -> Option<u64> {
        self.global
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty() && self.groups.is_empty() && self.global.is_none()
    }

    /// Program keys given in qualified form
    pub fn qualified_program_keys(&self) -> impl Iterator<Item = &str> {
        self.programs
            .keys()
            .filter(|key| key.contains(':'))
            .map(String::as_str)
    }

    /// Every threshold applying to a process, in precedence order:
    /// program (bare name), then group, then global
    pub fn resolve(&self, name: &QualifiedName) -> Vec<Threshold> {
        let program = self.program_limit(&name.name).map(|limit_secs| Threshold {
            level: ThresholdLevel::Program,
            limit_secs,
        });
        let group = self.group_limit(&name.group).map(|limit_secs| Threshold {
            level: ThresholdLevel::Group,
            limit_secs,
        });
        let global = self.global.map(|limit_secs| Threshold {
            level: ThresholdLevel::Global,
            limit_secs,
        });

        [program, group, global].into_iter().flatten().collect()
    }

    /// First threshold in precedence order that the uptime exceeds
    pub fn first_exceeded(&self, name: &QualifiedName, uptime_secs: u64) -> Option<Threshold> {
        self.resolve(name)
            .into_iter()
            .find(|threshold| threshold.is_exceeded_by(uptime_secs))
    }

    /// Human-readable description of the active thresholds, one line per level
    pub fn summary(&self) -> Vec<String> {
        let mut status = Vec::new();
        if !self.programs.is_empty() {
            status.push(format!("Checking programs {}", join_limits(&self.programs)));
        }
        if !self.groups.is_empty() {
            status.push(format!("Checking groups {}", join_limits(&self.groups)));
        }
        if let Some(limit) = self.global {
            status.push(format!("Checking uptime_limit={}", limit));
        }
        status
    }
}

fn join_limits(limits: &BTreeMap<String, u64>) -> String {
    limits
        .iter()
        .map(|(name, secs)| format!("{}={}", name, secs))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Watchdog settings, fixed for the lifetime of the process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchdogConfig {
    pub registry: ThresholdRegistry,
    /// Our own program name, never restarted
    pub self_name: Option<String>,
}

impl WatchdogConfig {
    pub fn new(registry: ThresholdRegistry, self_name: Option<String>) -> Self {
        Self {
            registry,
            self_name,
        }
    }

    pub fn global_limit(&self) -> Option<u64> {
        self.registry.global_limit()
    }

    /// Whether the bare name belongs to the watchdog itself
    pub fn is_self(&self, bare_name: &str) -> bool {
        self.self_name.as_deref() == Some(bare_name)
    }
}

/// Duration written in a config file: seconds or a duration string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub fn to_secs(&self) -> Result<u64> {
        match self {
            DurationValue::Seconds(secs) => Ok(*secs),
            DurationValue::Text(text) => parse_duration(text),
        }
    }
}

/// Contents of an optional TOML or JSON configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub programs: BTreeMap<String, DurationValue>,

    #[serde(default)]
    pub groups: BTreeMap<String, DurationValue>,

    #[serde(default)]
    pub uptime: Option<DurationValue>,

    #[serde(default)]
    pub exclude: Option<String>,
}

impl FileConfig {
    /// Load a configuration file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            UptimemonError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        match extension {
            "toml" => Self::parse_toml(&contents),
            "json" => Self::parse_json(&contents),
            _ => Err(UptimemonError::InvalidConfig(format!(
                "Unsupported file format: {}. Use .toml or .json",
                extension
            ))),
        }
    }

    pub fn parse_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| UptimemonError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    pub fn parse_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| UptimemonError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }
}

/// Thresholds and exclusion given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub programs: Vec<(String, u64)>,
    pub groups: Vec<(String, u64)>,
    pub uptime: Option<u64>,
    pub exclude: Option<String>,
}

/// Merge file settings with command-line overrides; the command line wins per key
pub fn build_config(file: Option<FileConfig>, overrides: Overrides) -> Result<WatchdogConfig> {
    let file = file.unwrap_or_default();

    let mut programs = resolve_limits(&file.programs)?;
    let mut groups = resolve_limits(&file.groups)?;
    let mut global = file.uptime.as_ref().map(DurationValue::to_secs).transpose()?;

    programs.extend(overrides.programs);
    groups.extend(overrides.groups);
    if overrides.uptime.is_some() {
        global = overrides.uptime;
    }
    let self_name = overrides.exclude.or(file.exclude);

    let registry = ThresholdRegistry::new(programs, groups, global);
    if registry.is_empty() {
        tracing::warn!("no uptime limits configured; no process will ever be restarted");
    }
    for key in registry.qualified_program_keys() {
        tracing::warn!(
            key,
            "program limit uses the group:name form; per-process limits are matched by bare process name"
        );
    }

    Ok(WatchdogConfig::new(registry, self_name))
}

fn resolve_limits(limits: &BTreeMap<String, DurationValue>) -> Result<BTreeMap<String, u64>> {
    limits
        .iter()
        .map(|(name, value)| value.to_secs().map(|secs| (name.clone(), secs)))
        .collect()
}
