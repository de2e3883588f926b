// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! External debug-probe tools: flashing via st-flash or SEGGER J-Link, and the RTT viewer.
//!
//! The probe is a black box. We build its command line, run it, and hand the
//! exit status and captured output back to the caller.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

/// SWD clock used for J-Link sessions, in kHz.
const SWD_SPEED_KHZ: u32 = 4000;

/// Telnet port the RTT viewer exposes.
const RTT_TELNET_PORT: u16 = 19021;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProbeKind {
    /// stlink tools (`st-flash write <file> <addr>`)
    StFlash,
    /// SEGGER J-Link Commander with a generated script
    Jlink,
}

impl ProbeKind {
    /// Executable looked up on `PATH` when no explicit path is given.
    pub fn default_program(self) -> &'static str {
        match self {
            Self::StFlash => "st-flash",
            Self::Jlink if cfg!(windows) => "JLink.exe",
            Self::Jlink => "JLinkExe",
        }
    }
}

/// A fully prepared probe run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Commander script to write before running, as `(path, contents)`.
    pub script: Option<(PathBuf, String)>,
}

/// What the probe reported. Opaque to us beyond the exit status.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// J-Link Commander script that halts, loads `image` at `address`, resets and runs.
pub fn jlink_script(device: &str, image: &Path, address: u32) -> String {
    format!(
        "device {device}\n\
         si SWD\n\
         speed {SWD_SPEED_KHZ}\n\
         connect\n\
         h\n\
         loadfile \"{}\" 0x{address:08X}\n\
         r\n\
         g\n\
         exit\n",
        image.display()
    )
}

impl ProbeInvocation {
    /// Prepare a flash of `image` at absolute `address`.
    pub fn flash(
        kind: ProbeKind,
        program: Option<&Path>,
        device: &str,
        image: &Path,
        address: u32,
    ) -> Self {
        let program = program
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(kind.default_program()));

        match kind {
            ProbeKind::StFlash => Self {
                program,
                args: vec![
                    "write".to_string(),
                    image.display().to_string(),
                    format!("0x{:08X}", address),
                ],
                script: None,
            },
            ProbeKind::Jlink => {
                let script_path = image.with_extension("jlink");
                Self {
                    program,
                    args: vec![
                        "-device".to_string(),
                        device.to_string(),
                        "-if".to_string(),
                        "SWD".to_string(),
                        "-speed".to_string(),
                        SWD_SPEED_KHZ.to_string(),
                        "-autoconnect".to_string(),
                        "1".to_string(),
                        "-CommanderScript".to_string(),
                        script_path.display().to_string(),
                    ],
                    script: Some((script_path, jlink_script(device, image, address))),
                }
            }
        }
    }

    /// Prepare the J-Link RTT viewer for `device`.
    pub fn rtt_viewer(program: Option<&Path>, device: &str) -> Self {
        Self {
            program: program
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("JLinkRTTViewer")),
            args: vec![
                "-device".to_string(),
                device.to_string(),
                "-if".to_string(),
                "SWD".to_string(),
                "-speed".to_string(),
                SWD_SPEED_KHZ.to_string(),
                "-rtttelnetport".to_string(),
                RTT_TELNET_PORT.to_string(),
            ],
            script: None,
        }
    }

    /// Command line as it would be typed in a shell.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(' ') {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }

    fn write_script(&self) -> Result<()> {
        if let Some((path, contents)) = &self.script {
            fs::write(path, contents)
                .with_context(|| format!("Failed to write probe script {}", path.display()))?;
            tracing::debug!("Wrote probe script {}", path.display());
        }
        Ok(())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Run the probe to completion, capturing its output.
    ///
    /// Fails when the program cannot be started or exits non-zero.
    pub fn run(&self) -> Result<ProbeOutcome> {
        self.write_script()?;
        tracing::info!("Running {}", self.command_line());

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        spinner.set_message(format!("Waiting for {}", self.program.display()));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let output = self.command().output();
        spinner.finish_and_clear();

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                bail!("{} not found (is it installed and on PATH?)", self.program.display())
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to run {}", self.program.display()))
            }
        };

        let outcome = ProbeOutcome {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !outcome.status.success() {
            bail!(
                "{} failed with {}\n{}",
                self.program.display(),
                outcome.status,
                outcome.stderr.trim_end()
            );
        }

        Ok(outcome)
    }

    /// Run an interactive tool attached to the terminal and wait for it to exit.
    pub fn run_interactive(&self) -> Result<ExitStatus> {
        self.write_script()?;
        tracing::info!("Running {}", self.command_line());

        match self.command().status() {
            Ok(status) => Ok(status),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                bail!("{} not found (is it installed and on PATH?)", self.program.display())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to run {}", self.program.display())),
        }
    }
}
