// Shared test double for the supervisor RPC interface

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use uptimemon::config::{ThresholdRegistry, WatchdogConfig};
use uptimemon::error::{RemoteFault, Result};
use uptimemon::supervisor::{faults, ProcessInfo, QualifiedName, SupervisorRpc};

pub fn process(name: &str, group: &str, pid: u32, start: i64, now: i64) -> ProcessInfo {
    ProcessInfo {
        name: name.to_string(),
        group: group.to_string(),
        pid,
        start,
        now,
        state: if pid == 0 { 0 } else { 20 },
        statename: if pid == 0 { "STOPPED" } else { "RUNNING" }.to_string(),
        description: String::new(),
    }
}

pub fn config(
    programs: &[(&str, u64)],
    groups: &[(&str, u64)],
    global: Option<u64>,
    self_name: Option<&str>,
) -> WatchdogConfig {
    let programs: BTreeMap<String, u64> = programs
        .iter()
        .map(|(name, secs)| (name.to_string(), *secs))
        .collect();
    let groups: BTreeMap<String, u64> = groups
        .iter()
        .map(|(name, secs)| (name.to_string(), *secs))
        .collect();
    WatchdogConfig::new(
        ThresholdRegistry::new(programs, groups, global),
        self_name.map(str::to_string),
    )
}

/// In-memory supervisor recording every call it receives
#[derive(Default)]
pub struct FakeSupervisor {
    processes: Vec<ProcessInfo>,
    vanished: HashSet<String>,
    lookups: Vec<ProcessInfo>,
    stop_fault: Option<RemoteFault>,
    start_fault: Option<RemoteFault>,
    calls: RefCell<Vec<String>>,
}

impl FakeSupervisor {
    pub fn new(processes: Vec<ProcessInfo>) -> Self {
        Self {
            processes,
            ..Self::default()
        }
    }

    /// Make `getProcessInfo` fail for a listed process, as if it exited mid-tick
    pub fn with_vanished(mut self, qualified: &str) -> Self {
        self.vanished.insert(qualified.to_string());
        self
    }

    /// Answer `getProcessInfo` with a different snapshot than the listing
    pub fn with_lookup(mut self, info: ProcessInfo) -> Self {
        self.lookups.push(info);
        self
    }

    pub fn with_stop_fault(mut self, fault: RemoteFault) -> Self {
        self.stop_fault = Some(fault);
        self
    }

    pub fn with_start_fault(mut self, fault: RemoteFault) -> Self {
        self.start_fault = Some(fault);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.starts_with(method))
            .cloned()
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl SupervisorRpc for FakeSupervisor {
    fn get_all_process_info(&self) -> Result<Vec<ProcessInfo>> {
        self.record("getAllProcessInfo".to_string());
        Ok(self.processes.clone())
    }

    fn get_process_info(&self, name: &QualifiedName) -> Result<ProcessInfo> {
        let qualified = name.to_string();
        self.record(format!("getProcessInfo {}", qualified));

        if self.vanished.contains(&qualified) {
            return Err(RemoteFault::new(faults::BAD_NAME, format!("BAD_NAME: {}", qualified)).into());
        }
        self.lookups
            .iter()
            .chain(&self.processes)
            .find(|info| info.qualified_name() == *name)
            .cloned()
            .ok_or_else(|| {
                RemoteFault::new(faults::BAD_NAME, format!("BAD_NAME: {}", qualified)).into()
            })
    }

    fn stop_process(&self, name: &QualifiedName) -> Result<()> {
        self.record(format!("stopProcess {}", name));
        match &self.stop_fault {
            Some(fault) => Err(fault.clone().into()),
            None => Ok(()),
        }
    }

    fn start_process(&self, name: &QualifiedName) -> Result<()> {
        self.record(format!("startProcess {}", name));
        match &self.start_fault {
            Some(fault) => Err(fault.clone().into()),
            None => Ok(()),
        }
    }
}
