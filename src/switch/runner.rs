//! Running external commands.

use super::command::CommandSpec;
use crate::{Error, Result};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

/// Executes a [`CommandSpec`] to completion.
pub trait CommandRunner {
    /// Run the command. Any failure to spawn and any unsuccessful exit is
    /// an error.
    fn run(&mut self, spec: &CommandSpec) -> Result<()>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &mut R {
    fn run(&mut self, spec: &CommandSpec) -> Result<()> {
        (**self).run(spec)
    }
}

/// Spawns real processes, forwarding their stdout and stderr line by line to
/// our stdout and waiting for exit. No timeout is applied.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&mut self, spec: &CommandSpec) -> Result<()> {
        tracing::info!(command = %spec.command_line(), "running");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        spec.env.apply(&mut cmd);

        let mut child = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::CommandSpawn {
                program: spec.program.clone(),
                source,
            })?;

        let stderr = child.stderr.take();
        let stderr_thread = stderr.map(|err| thread::spawn(move || forward_lines(err)));

        let stdout_result = match child.stdout.take() {
            Some(out) => forward_lines(out),
            None => Ok(()),
        };
        let stderr_result = match stderr_thread {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("output forwarding thread panicked"))),
            None => Ok(()),
        };

        let status = child.wait()?;
        stdout_result?;
        stderr_result?;
        check_status(&spec.program, status)
    }
}

/// Copy a child stream to our stdout, one line at a time.
fn forward_lines<R: Read>(stream: R) -> io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }
        let mut out = io::stdout().lock();
        out.write_all(&line)?;
        if !line.ends_with(b"\n") {
            out.write_all(b"\n")?;
        }
        out.flush()?;
    }
}

fn check_status(program: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    let status = match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    };
    Err(Error::CommandFailed {
        program: program.to_string(),
        status,
    })
}

/// Records commands instead of running them.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    pub planned: Vec<CommandSpec>,
}

impl CommandRunner for DryRunRunner {
    fn run(&mut self, spec: &CommandSpec) -> Result<()> {
        tracing::debug!(command = %spec.command_line(), "dry run");
        self.planned.push(spec.clone());
        Ok(())
    }
}
