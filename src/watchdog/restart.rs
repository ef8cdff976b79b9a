use crate::error::{Result, UptimemonError};
use crate::supervisor::{QualifiedName, SupervisorRpc};

/// What happened to a process selected for restart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    Restarted,
    /// The process is the watchdog itself
    SkippedSelf,
}

/// Stops then starts a single process through the supervisor
///
/// There is no retry here. A fault from either call is fatal: after a failed
/// stop the supervisor state is unknown, and after a failed start the process
/// stays down until the watchdog itself is restarted.
pub struct RestartExecutor<'a, R: ?Sized> {
    rpc: &'a R,
    self_name: Option<&'a str>,
}

impl<'a, R: SupervisorRpc + ?Sized> RestartExecutor<'a, R> {
    pub fn new(rpc: &'a R, self_name: Option<&'a str>) -> Self {
        Self { rpc, self_name }
    }

    pub fn restart(&self, name: &QualifiedName, uptime_secs: u64) -> Result<RestartOutcome> {
        if self.self_name == Some(name.name.as_str()) {
            tracing::debug!(process = %name, "not restarting the watchdog itself");
            return Ok(RestartOutcome::SkippedSelf);
        }

        tracing::info!(process = %name, uptime_secs, "Restarting {}", name);

        self.rpc.stop_process(name).map_err(|e| match e {
            UptimemonError::RemoteFault(fault) => UptimemonError::StopFailed {
                name: name.to_string(),
                uptime: uptime_secs,
                fault,
            },
            other => other,
        })?;

        self.rpc.start_process(name).map_err(|e| match e {
            UptimemonError::RemoteFault(fault) => UptimemonError::StartFailed {
                name: name.to_string(),
                fault,
            },
            other => other,
        })?;

        Ok(RestartOutcome::Restarted)
    }
}
