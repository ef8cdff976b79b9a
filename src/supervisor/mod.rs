// Supervisor module - RPC access to the process supervisor

pub mod client;
pub mod xmlrpc;

pub use client::{SupervisorUrl, XmlRpcClient};
pub use xmlrpc::Value;

use crate::error::{Result, UptimemonError};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Fault codes reported by supervisord
pub mod faults {
    pub const UNKNOWN_METHOD: i64 = 1;
    pub const INCORRECT_PARAMETERS: i64 = 2;
    pub const BAD_ARGUMENTS: i64 = 3;
    pub const SHUTDOWN_STATE: i64 = 6;
    pub const BAD_NAME: i64 = 10;
    pub const NO_FILE: i64 = 20;
    pub const NOT_EXECUTABLE: i64 = 21;
    pub const FAILED: i64 = 30;
    pub const ABNORMAL_TERMINATION: i64 = 40;
    pub const SPAWN_ERROR: i64 = 50;
    pub const ALREADY_STARTED: i64 = 60;
    pub const NOT_RUNNING: i64 = 70;
}

/// RPC-addressable identity of a supervised process, rendered as `group:name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub group: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// Snapshot of a supervised process as reported by the supervisor
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub name: String,
    pub group: String,
    /// Zero when the process is not running
    pub pid: u32,
    pub start: i64,
    pub now: i64,
    pub state: i64,
    pub statename: String,
    pub description: String,
}

impl ProcessInfo {
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.group, &self.name)
    }

    pub fn is_running(&self) -> bool {
        self.pid != 0
    }

    /// Seconds between the process start and the supervisor's clock
    pub fn uptime(&self) -> u64 {
        u64::try_from(self.now - self.start).unwrap_or(0)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.start, 0)
    }

    /// Decode the struct returned by `getProcessInfo` / `getAllProcessInfo`
    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = value.as_struct().ok_or_else(|| {
            UptimemonError::RpcDecodeError(format!("process info is not a struct: {:?}", value))
        })?;

        let pid = int_field(fields, "pid")?;
        Ok(Self {
            name: string_field(fields, "name")?,
            group: string_field(fields, "group")?,
            pid: u32::try_from(pid).map_err(|_| {
                UptimemonError::RpcDecodeError(format!("invalid pid {}", pid))
            })?,
            start: int_field(fields, "start")?,
            now: int_field(fields, "now")?,
            state: fields.get("state").and_then(Value::as_int).unwrap_or_default(),
            statename: fields
                .get("statename")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            description: fields
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

fn int_field(fields: &BTreeMap<String, Value>, key: &str) -> Result<i64> {
    fields
        .get(key)
        .and_then(Value::as_int)
        .ok_or_else(|| UptimemonError::RpcDecodeError(format!("missing integer field '{}'", key)))
}

fn string_field(fields: &BTreeMap<String, Value>, key: &str) -> Result<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| UptimemonError::RpcDecodeError(format!("missing string field '{}'", key)))
}

/// The supervisor operations the watchdog relies on
///
/// Each call may fail with `UptimemonError::RemoteFault` when the supervisor
/// rejects it, or with a transport error when it cannot be reached.
pub trait SupervisorRpc {
    fn get_all_process_info(&self) -> Result<Vec<ProcessInfo>>;

    fn get_process_info(&self, name: &QualifiedName) -> Result<ProcessInfo>;

    fn stop_process(&self, name: &QualifiedName) -> Result<()>;

    fn start_process(&self, name: &QualifiedName) -> Result<()>;
}
