//! `nvme-cli` invocations that configure and collect the latency monitor.
//!
//! Commands are only built here. Running them on a host is up to the caller.

use std::fmt;

const NVME: &str = "nvme";

/// Thresholds for one workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MonitorSettings {
    /// Active bucket timer threshold, in 5 minute units.
    pub bucket_timer: u16,
    /// Active thresholds A through D.
    pub thresholds: [u8; 4],
}

/// An `nvme` command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<String>,
}

impl Command {
    fn new(args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Command {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn with(mut self, arg: String) -> Self {
        self.args.push(arg);
        self
    }

    fn flags(mut self, flags: &[(&str, String)]) -> Self {
        for (flag, value) in flags {
            self.args.push(format!("-{flag}"));
            self.args.push(value.clone());
        }
        self
    }

    /// Program followed by its arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn into_args(self) -> Vec<String> {
        self.args
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

fn device(name: &str) -> String {
    format!("/dev/{name}")
}

fn set_feature(name: &str) -> Command {
    Command::new([NVME, "ocp", "set-latency-monitor-feature"]).with(device(name))
}

/// Enables the monitor on `name` with `settings`.
pub fn enable_command(name: &str, settings: &MonitorSettings) -> Command {
    let [a, b, c, d] = settings.thresholds;
    set_feature(name).flags(&[
        ("t", settings.bucket_timer.to_string()),
        ("a", a.to_string()),
        ("b", b.to_string()),
        ("c", c.to_string()),
        ("d", d.to_string()),
        ("f", "0".to_string()),
        ("w", "0".to_string()),
        ("r", "0".to_string()),
        ("l", "0".to_string()),
        ("e", "1".to_string()),
    ])
}

/// Disables the monitor on `name`. Threshold C is left as configured.
pub fn disable_command(name: &str) -> Command {
    let zero = || "0".to_string();
    set_feature(name).flags(&[
        ("t", zero()),
        ("a", zero()),
        ("b", zero()),
        ("d", zero()),
        ("f", zero()),
        ("w", zero()),
        ("r", zero()),
        ("l", zero()),
        ("e", zero()),
    ])
}

/// Reads the latency monitor log page of `name` as JSON.
pub fn log_command(name: &str) -> Command {
    Command::new([NVME, "ocp", "latency-monitor-log"])
        .with(device(name))
        .flags(&[("o", "json".to_string())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_command() {
        let settings = MonitorSettings {
            bucket_timer: 12,
            thresholds: [1, 2, 19, 199],
        };
        assert_eq!(
            enable_command("nvme0n1", &settings).to_string(),
            "nvme ocp set-latency-monitor-feature /dev/nvme0n1 \
             -t 12 -a 1 -b 2 -c 19 -d 199 -f 0 -w 0 -r 0 -l 0 -e 1"
        );
    }

    #[test]
    fn test_disable_command() {
        let command = disable_command("nvme1n1");
        assert_eq!(
            command.to_string(),
            "nvme ocp set-latency-monitor-feature /dev/nvme1n1 \
             -t 0 -a 0 -b 0 -d 0 -f 0 -w 0 -r 0 -l 0 -e 0"
        );
        assert!(!command.args().contains(&"-c".to_string()));
    }

    #[test]
    fn test_log_command() {
        assert_eq!(
            log_command("nvme2n1").into_args(),
            vec!["nvme", "ocp", "latency-monitor-log", "/dev/nvme2n1", "-o", "json"]
        );
    }
}
