use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Stdout};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use log::debug;
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};
use std::process::{ExitStatus, Stdio};

/// A program found on disk, run as a child process.
pub struct ExternalCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let search_paths = env.get_var("PATH").unwrap_or_default();
        let program = resolve_program(OsStr::new(&search_paths), Path::new(name))?;
        debug!("resolved {name} to {}", program.display());
        Some(Box::new(ExternalCommand {
            program: program.into_owned(),
            args: args.iter().map(OsString::from).collect(),
        }))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        stdout: Box<dyn Stdout>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let status = std::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(stdout.stdio())
            .env_clear()
            .envs(&env.vars)
            .current_dir(&env.current_dir)
            .status()
            .with_context(|| format!("failed to run {}", self.program.display()))?;
        Ok(status.code().unwrap_or_else(|| terminated_by_signal(status)))
    }
}

#[cfg(unix)]
fn terminated_by_signal(status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => 128 + signal,
        None => -1,
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_status: ExitStatus) -> ExitCode {
    -1
}

/// Locate the program a command name refers to.
///
/// - Anything with more than one path component (`/bin/ls`, `./run.sh`, `bin/tool`)
///   is used as is, provided it exists.
/// - A bare name is looked up in each directory of `search_paths` (a `PATH` value),
///   first match wins.
/// - An empty name resolves to nothing.
pub fn resolve_program<'a>(search_paths: &OsStr, name: &'a Path) -> Option<Cow<'a, Path>> {
    let mut components = name.components();
    match (components.next(), components.next()) {
        (None, _) => None,
        (Some(Component::Normal(single)), None) => {
            std::env::split_paths(search_paths)
                .map(|dir| dir.join(single))
                .find(|candidate| candidate.is_file())
                .map(Cow::Owned)
        }
        _ => name.exists().then_some(Cow::Borrowed(name)),
    }
}
