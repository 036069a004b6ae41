use crate::alias::{AddOutcome, Alias, AliasError};
use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Stdout};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result, anyhow};
use argh::{EarlyExit, FromArgs};
use log::{debug, info};
use regex::Regex;
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "alias".
    fn name() -> &'static str;

    /// Executes the command.
    ///
    /// Errors are written to `stdout` as `<name>: <message>` and turn into exit status 1.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        mut stdout: Box<dyn Stdout>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match T::execute(*self, &mut stdout, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                debug!("{} failed: {:#}", T::name(), e);
                writeln!(stdout, "{}: {:#}", T::name(), e)?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        mut stdout: Box<dyn Stdout>,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.output.trim_end())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        Some(match T::from_args(&[name], args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

#[derive(FromArgs)]
/// Define or display aliases.
/// With no arguments, print every alias. `alias NAME` prints one alias,
/// `alias NAME=COMMAND` or `alias NAME COMMAND...` defines one.
pub struct AliasCmd {
    #[argh(option, short = 'm')]
    /// only list aliases whose name matches this regular expression.
    pub matching: Option<String>,

    #[argh(positional, greedy)]
    /// alias definition or name to look up.
    pub args: Vec<String>,
}

impl AliasCmd {
    fn print_all(
        stdout: &mut dyn Write,
        env: &Environment,
        pattern: Option<&Regex>,
    ) -> Result<ExitCode> {
        if env.aliases.is_empty() {
            writeln!(stdout, "No aliases set.")?;
            return Ok(0);
        }
        let selected = env
            .aliases
            .list()
            .filter(|a: &&Alias| pattern.is_none_or(|re| re.is_match(a.key())));
        for alias in selected {
            writeln!(stdout, "{}", alias)?;
        }
        Ok(0)
    }
}

impl BuiltinCommand for AliasCmd {
    fn name() -> &'static str {
        "alias"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let pattern = self
            .matching
            .as_deref()
            .map(|p| Regex::new(p).with_context(|| format!("invalid pattern: {}", p)))
            .transpose()?;

        let Some((first, rest)) = self.args.split_first() else {
            return Self::print_all(stdout, env, pattern.as_ref());
        };
        if pattern.is_some() {
            return Err(anyhow!("-m cannot be combined with a definition"));
        }

        let (key, command) = match first.split_once('=') {
            Some((key, value)) => {
                let mut command = value.to_string();
                for word in rest {
                    command.push(' ');
                    command.push_str(word);
                }
                (key.to_string(), command)
            }
            None if rest.is_empty() => {
                let alias = env
                    .aliases
                    .search(first)
                    .ok_or_else(|| AliasError::NotFound(first.clone()))?;
                writeln!(stdout, "{}", alias)?;
                return Ok(0);
            }
            None => (first.clone(), rest.join(" ")),
        };

        match env.aliases.add(key.as_str(), command)? {
            AddOutcome::Added => info!("alias {key} defined"),
            AddOutcome::Overwritten => info!("alias {key} overwritten"),
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Remove an alias.
pub struct Unalias {
    #[argh(positional)]
    /// name of the alias to remove.
    pub name: String,
}

impl BuiltinCommand for Unalias {
    fn name() -> &'static str {
        "unalias"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let removed = env.aliases.remove(&self.name)?;
        info!("alias {} removed", removed.key());
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => env
                .get_var("HOME")
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("no target and HOME not set"))?,
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("can't canonicalize {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("can't chdir to {}", canonical.display()))?;
        debug!("cd: now in {}", canonical.display());
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// write the arguments to standard output, separated by spaces.
/// by default, a trailing newline is printed.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the numbered list of recently executed lines.
pub struct HistoryCmd {}

impl BuiltinCommand for HistoryCmd {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        for (number, line) in env.history.iter() {
            writeln!(stdout, "{:>5}  {}", number, line)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit the shell.
pub struct Exit {
    #[argh(positional)]
    /// exit status reported to the parent process, 0 when omitted.
    pub code: Option<ExitCode>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(self.code.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::MAX_ALIASES;
    use crate::io_adapters::CapturedOutput;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::env as stdenv;
    use std::io;
    use std::sync::{Mutex, MutexGuard, OnceLock};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn lock_current_dir() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn test_env() -> Environment {
        Environment::with_vars(HashMap::new(), stdenv::current_dir().unwrap())
    }

    fn alias(args: &[&str]) -> AliasCmd {
        AliasCmd {
            matching: None,
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn run<T: BuiltinCommand>(cmd: T, env: &mut Environment) -> (Result<ExitCode>, String) {
        let mut out = Vec::new();
        let res = BuiltinCommand::execute(cmd, &mut out, env);
        (res, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_alias_list_empty() {
        let mut env = test_env();
        let (res, out) = run(alias(&[]), &mut env);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "No aliases set.\n");
    }

    #[test]
    fn test_alias_define_with_equals() {
        let mut env = test_env();
        let (res, out) = run(alias(&["ll=ls -la"]), &mut env);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "");
        assert_eq!(env.aliases.search("ll").unwrap().command(), "ls -la");
    }

    #[test]
    fn test_alias_define_with_separate_words() {
        let mut env = test_env();
        run(alias(&["gs", "git", "status", "-s"]), &mut env).0.unwrap();
        run(alias(&["ll=ls", "-la"]), &mut env).0.unwrap();

        assert_eq!(env.aliases.search("gs").unwrap().command(), "git status -s");
        assert_eq!(env.aliases.search("ll").unwrap().command(), "ls -la");
    }

    #[test]
    fn test_alias_list_shows_command_text() {
        let mut env = test_env();
        env.aliases.add("ll", "ls -la").unwrap();
        env.aliases.add("g", "git status").unwrap();

        let (_, out) = run(alias(&[]), &mut env);
        assert_eq!(out, "g='git status'\nll='ls -la'\n");
    }

    #[test]
    fn test_alias_list_matching() {
        let mut env = test_env();
        env.aliases.add("gs", "git status").unwrap();
        env.aliases.add("gd", "git diff").unwrap();
        env.aliases.add("ll", "ls -la").unwrap();

        let cmd = AliasCmd {
            matching: Some("^g".to_string()),
            args: Vec::new(),
        };
        let (res, out) = run(cmd, &mut env);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "gd='git diff'\ngs='git status'\n");
    }

    #[test]
    fn test_alias_invalid_pattern_is_an_error() {
        let mut env = test_env();
        let cmd = AliasCmd {
            matching: Some("(".to_string()),
            args: Vec::new(),
        };
        assert!(run(cmd, &mut env).0.is_err());
    }

    #[test]
    fn test_alias_show_single() {
        let mut env = test_env();
        env.aliases.add("ll", "ls -la").unwrap();

        let (res, out) = run(alias(&["ll"]), &mut env);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "ll='ls -la'\n");

        let (res, _) = run(alias(&["nope"]), &mut env);
        let err = res.unwrap_err();
        assert_eq!(
            err.downcast_ref::<AliasError>(),
            Some(&AliasError::NotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_alias_empty_key_is_invalid() {
        let mut env = test_env();
        let (res, _) = run(alias(&["=ls"]), &mut env);
        assert_eq!(
            res.unwrap_err().downcast_ref::<AliasError>(),
            Some(&AliasError::InvalidKey)
        );
    }

    #[test]
    fn test_alias_limit_reports_error_and_status() {
        let mut env = test_env();
        for i in 0..MAX_ALIASES {
            env.aliases.add(format!("a{i}"), "true").unwrap();
        }

        let captured = CapturedOutput::new();
        let code = ExecutableCommand::execute(
            Box::new(alias(&["b=false"])),
            Box::new(captured.clone()),
            &mut env,
        )
        .unwrap();

        assert_eq!(code, 1);
        assert_eq!(
            captured.contents(),
            "alias: maximum of 20 stored aliases exceeded; delete or overwrite an alias to continue\n"
        );
        assert_eq!(env.aliases.len(), MAX_ALIASES);
    }

    #[test]
    fn test_unalias() {
        let mut env = test_env();
        env.aliases.add("g", "git status").unwrap();

        let (res, _) = run(Unalias { name: "g".to_string() }, &mut env);
        assert_eq!(res.unwrap(), 0);
        assert!(env.aliases.search("g").is_none());

        let (res, _) = run(Unalias { name: "g".to_string() }, &mut env);
        assert_eq!(
            res.unwrap_err().downcast_ref::<AliasError>(),
            Some(&AliasError::NotFound("g".to_string()))
        );
    }

    #[test]
    fn test_history_lists_numbered_lines() {
        let mut env = test_env();
        env.history.push("ls");
        env.history.push("pwd");

        let (res, out) = run(HistoryCmd {}, &mut env);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "    1  ls\n    2  pwd\n");
    }

    #[test]
    fn test_exit_sets_flag() {
        let mut env = test_env();
        let (res, _) = run(Exit { code: Some(3) }, &mut env);
        assert_eq!(res.unwrap(), 3);
        assert!(env.should_exit);
    }

    #[test]
    fn test_pwd_prints_current_dir() {
        let _lock = lock_current_dir();
        let mut env = test_env();
        let cur = env.current_dir.clone();

        let (res, out) = run(Pwd {}, &mut env);
        assert!(res.is_ok());
        assert_eq!(out, format!("{}\n", cur.to_string_lossy()));
    }

    #[test]
    fn test_echo_with_and_without_newline() {
        let mut env = test_env();

        let echo = Echo {
            no_newline: false,
            args: vec!["hello".to_string(), "world".to_string()],
        };
        let (res, out) = run(echo, &mut env);
        assert!(res.is_ok());
        assert_eq!(out, "hello world\n");

        let echo = Echo {
            no_newline: true,
            args: vec!["foo".to_string(), "bar".to_string()],
        };
        let (res, out) = run(echo, &mut env);
        assert!(res.is_ok());
        assert_eq!(out, "foo bar");
    }

    fn make_unique_temp_dir() -> io::Result<PathBuf> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let p = stdenv::temp_dir().join(format!("shell_test_cd_{}_{}", std::process::id(), nanos));
        fs::create_dir_all(&p)?;
        Ok(p)
    }

    #[test]
    fn test_cd_to_home_when_none() {
        let _lock = lock_current_dir();
        let temp = make_unique_temp_dir().expect("failed to create temp dir");
        let canonical_temp = fs::canonicalize(&temp).expect("canonicalize failed");
        let orig = stdenv::current_dir().unwrap();

        let mut env = test_env();
        env.set_var("HOME", canonical_temp.to_string_lossy().to_string());

        let (res, _) = run(Cd { target: None }, &mut env);
        assert!(res.is_ok());
        assert_eq!(env.current_dir, canonical_temp);
        assert_eq!(fs::canonicalize(stdenv::current_dir().unwrap()).unwrap(), canonical_temp);

        stdenv::set_current_dir(orig).expect("failed to restore cwd");
        let _ = fs::remove_dir_all(&temp);
    }

    #[test]
    fn test_cd_nonexistent_path_errors() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut env = test_env();

        let target = Some(format!("nonexistent_dir_for_shell_test_{}", std::process::id()));
        let (res, _) = run(Cd { target }, &mut env);

        assert!(res.is_err());
        assert_eq!(stdenv::current_dir().unwrap(), orig);
        assert_eq!(env.current_dir, orig);
    }

    #[test]
    fn test_factory_parses_arguments() {
        let mut env = test_env();
        let factory = Factory::<AliasCmd>::default();
        assert!(factory.try_create(&env, "unalias", &["ll"]).is_none());

        let captured = CapturedOutput::new();
        let cmd = factory
            .try_create(&env, "alias", &["ll", "ls", "-la"])
            .expect("alias should be recognised");
        let code = cmd.execute(Box::new(captured.clone()), &mut env).unwrap();

        assert_eq!(code, 0);
        assert_eq!(captured.contents(), "");
        assert_eq!(env.aliases.search("ll").unwrap().command(), "ls -la");
    }

    #[test]
    fn test_alias_from_args_keeps_dash_words() {
        let cmd = AliasCmd::from_args(&["alias"], &["ll=ls", "-la", "--color"])
            .unwrap_or_else(|e| panic!("{}", e.output));
        assert_eq!(cmd.matching, None);
        assert_eq!(cmd.args, vec!["ll=ls", "-la", "--color"]);

        let mut env = test_env();
        let (res, _) = run(cmd, &mut env);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(env.aliases.search("ll").unwrap().command(), "ls -la --color");
    }

    #[test]
    fn test_alias_show_single_is_quoted_for_reuse() {
        let mut env = test_env();
        env.aliases.add("q", "echo 'a b'").unwrap();

        let (res, out) = run(alias(&["q"]), &mut env);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "q=\"echo 'a b'\"\n");
    }
}
