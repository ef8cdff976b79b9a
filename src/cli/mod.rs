// CLI module - Command-line options for the event listener

pub mod output;

use crate::config::{build_config, FileConfig, Overrides, WatchdogConfig};
use crate::error::Result;
use crate::timespec::{parse_duration, parse_name_time};
use clap::Parser;
use std::path::PathBuf;

const AFTER_HELP: &str = "\
The -p and -g options may be specified more than once. Durations are plain
seconds or an integer with an s, m, h or d suffix.

Run under supervisord as an event listener subscribed to TICK events:

  [eventlistener:uptimemon]
  command=uptimemon -p program1=200s -g thegroup=1h -e uptimemon
  events=TICK_60";

/// uptimemon - restart supervisor processes that have been up too long
#[derive(Parser, Debug)]
#[command(name = "uptimemon")]
#[command(version, about, long_about = None, after_help = AFTER_HELP)]
pub struct Cli {
    /// Restart the program NAME once it has been up longer than DURATION
    #[arg(short = 'p', long = "program", value_name = "NAME=DURATION", value_parser = name_time_arg)]
    pub programs: Vec<(String, u64)>,

    /// Restart any process in group NAME once it has been up longer than DURATION
    #[arg(short = 'g', long = "group", value_name = "NAME=DURATION", value_parser = name_time_arg)]
    pub groups: Vec<(String, u64)>,

    /// Restart any supervised process once it has been up longer than DURATION
    #[arg(short = 'u', long = "uptime", value_name = "DURATION", value_parser = duration_arg)]
    pub uptime: Option<u64>,

    /// Program name of this listener, never restarted
    #[arg(short = 'e', long = "exclude", short_alias = 'n', value_name = "NAME")]
    pub exclude: Option<String>,

    /// Read limits from a TOML or JSON file; command-line limits take precedence
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Build the watchdog configuration from the file (if any) and the command line
    pub fn watchdog_config(&self) -> Result<WatchdogConfig> {
        let file = self
            .config
            .as_deref()
            .map(FileConfig::from_file)
            .transpose()?;

        let overrides = Overrides {
            programs: self.programs.clone(),
            groups: self.groups.clone(),
            uptime: self.uptime,
            exclude: self.exclude.clone(),
        };

        build_config(file, overrides)
    }
}

fn name_time_arg(value: &str) -> std::result::Result<(String, u64), String> {
    parse_name_time(value).map_err(|e| e.to_string())
}

fn duration_arg(value: &str) -> std::result::Result<u64, String> {
    parse_duration(value).map_err(|e| e.to_string())
}
