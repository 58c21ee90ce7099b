//! Application service control
//!
//! The dependent application runs as a systemd unit. `systemctl stop` on an
//! inactive unit exits 0, so stopping a stopped service is not an error.

use std::process::Command;

use crate::failover::{FailoverError, FailoverResult, ServiceController};

const SYSTEMCTL: &str = "systemctl";

/// A systemd unit controlled through `systemctl`.
#[derive(Debug, Clone)]
pub struct SystemdService {
    program: String,
    unit: String,
}

impl SystemdService {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            program: SYSTEMCTL.to_string(),
            unit: unit.into(),
        }
    }

    /// Use another binary in place of `systemctl`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    fn run(&self, action: &str) -> FailoverResult<()> {
        let output = Command::new(&self.program)
            .args([action, self.unit.as_str()])
            .output()
            .map_err(|e| {
                FailoverError::service_control(format!(
                    "failed to run {} {} {}: {}",
                    self.program, action, self.unit, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FailoverError::service_control(format!(
                "{} {} {} exited with {}: {}",
                self.program,
                action,
                self.unit,
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl ServiceController for SystemdService {
    fn is_running(&self) -> FailoverResult<bool> {
        let status = Command::new(&self.program)
            .args(["is-active", "--quiet", self.unit.as_str()])
            .status()
            .map_err(|e| {
                FailoverError::service_control(format!(
                    "failed to run {} is-active {}: {}",
                    self.program, self.unit, e
                ))
            })?;
        Ok(status.success())
    }

    fn stop(&self) -> FailoverResult<()> {
        self.run("stop")
    }

    fn start(&self) -> FailoverResult<()> {
        self.run("start")
    }
}
