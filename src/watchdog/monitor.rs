use crate::config::WatchdogConfig;
use crate::error::{Result, UptimemonError};
use crate::events::EventListener;
use crate::supervisor::{faults, ProcessInfo, SupervisorRpc};
use crate::watchdog::restart::{RestartExecutor, RestartOutcome};
use std::io::{BufRead, Write};

/// What a single tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Running processes whose uptime was compared against their limits
    pub checked: usize,
    /// Entries skipped because they were not running or vanished mid-tick
    pub skipped: usize,
    /// Qualified names of restarted processes, in restart order
    pub restarted: Vec<String>,
}

/// Watchdog that restarts supervised processes running longer than their limit
///
/// Holds no state between ticks: every tick fetches a fresh process list
/// and discards it afterwards.
pub struct Uptimemon<R> {
    config: WatchdogConfig,
    rpc: R,
}

impl<R: SupervisorRpc> Uptimemon<R> {
    pub fn new(config: WatchdogConfig, rpc: R) -> Self {
        Self { config, rpc }
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Serve events until the supervisor closes the stream or a fatal error occurs
    pub fn run_forever<I: BufRead, O: Write>(
        &self,
        listener: &mut EventListener<I, O>,
    ) -> Result<()> {
        while self.run_once(listener)? {}
        tracing::info!("event stream closed, exiting");
        Ok(())
    }

    /// Wait for one event, handle it and acknowledge it
    ///
    /// Returns `false` once the event stream has closed. A fatal error leaves
    /// the event unacknowledged.
    pub fn run_once<I: BufRead, O: Write>(
        &self,
        listener: &mut EventListener<I, O>,
    ) -> Result<bool> {
        let Some(event) = listener.wait_for_event()? else {
            return Ok(false);
        };

        if !event.is_tick() {
            tracing::debug!(event = event.event_name(), "ignoring non-tick event");
            listener.ok()?;
            return Ok(true);
        }

        let payload = event.payload_tokens();
        tracing::debug!(
            event = event.event_name(),
            when = payload.get("when").map(String::as_str).unwrap_or_default(),
            "tick received"
        );

        let report = self.handle_tick()?;
        tracing::debug!(
            checked = report.checked,
            skipped = report.skipped,
            restarted = report.restarted.len(),
            "tick processed"
        );

        listener.ok()?;
        Ok(true)
    }

    /// Check every supervised process once and restart those over their limit
    pub fn handle_tick(&self) -> Result<TickReport> {
        for line in self.config.registry.summary() {
            tracing::info!("{}", line);
        }

        let mut report = TickReport::default();
        for info in self.rpc.get_all_process_info()? {
            if !info.is_running() {
                // Standby or not yet autostarted
                report.skipped += 1;
                continue;
            }

            let Some(uptime) = self.current_uptime(&info)? else {
                report.skipped += 1;
                continue;
            };

            report.checked += 1;
            if let Some(outcome) = self.check_process(&info, uptime)? {
                if outcome == RestartOutcome::Restarted {
                    report.restarted.push(info.qualified_name().to_string());
                }
            }
        }

        Ok(report)
    }

    /// Fresh uptime for a listed process, or `None` if it vanished since the listing
    fn current_uptime(&self, listed: &ProcessInfo) -> Result<Option<u64>> {
        let name = listed.qualified_name();
        match self.rpc.get_process_info(&name) {
            Ok(current) if current.is_running() => Ok(Some(current.uptime())),
            Ok(_) => {
                tracing::debug!(process = %name, "process stopped since the listing");
                Ok(None)
            }
            Err(UptimemonError::RemoteFault(fault)) => {
                if fault.code != faults::BAD_NAME {
                    tracing::debug!(process = %name, %fault, "process lookup failed");
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Compare the uptime with each applicable limit in precedence order and
    /// restart on the first one exceeded
    fn check_process(&self, info: &ProcessInfo, uptime: u64) -> Result<Option<RestartOutcome>> {
        let name = info.qualified_name();
        let registry = &self.config.registry;

        if registry.program_limit(&info.name).is_none() && registry.has_qualified_program(&name) {
            tracing::warn!(
                process = %name,
                "limit registered as '{}' is ignored; program limits are matched by bare name '{}'",
                name,
                info.name
            );
        }

        for threshold in registry.resolve(&name) {
            tracing::info!(
                source = %threshold.level,
                started_at = ?info.started_at(),
                "UPTIME of {} is {}sec / {}sec",
                name,
                uptime,
                threshold.limit_secs
            );

            if threshold.is_exceeded_by(uptime) {
                let executor = RestartExecutor::new(&self.rpc, self.config.self_name.as_deref());
                return executor.restart(&name, uptime).map(Some);
            }
        }

        Ok(None)
    }
}
