use crate::command::{CommandFactory, ExitCode, Stdout};
use crate::env::Environment;
use crate::lexer::{self, Word, WordPart};
use log::{debug, warn};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::borrow::Cow;
use std::io::Write;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only support commands defined in this crate: built-ins and `ExternalCommand`.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A minimal interactive shell with command aliases.
///
/// The interpreter owns the [`Environment`] (variables, working directory, alias
/// registry and history) and a list of [`CommandFactory`] objects that are queried to
/// create commands by name. See [`Default`] for the factories included out of the box.
///
/// Example
/// ```
/// use simple_shell::{CapturedOutput, Interpreter};
/// let mut sh = Interpreter::default();
/// let out = CapturedOutput::new();
/// sh.run_line_with_output("alias hi='echo hello'", Box::new(out.clone())).unwrap();
/// let code = sh.run_line_with_output("hi world", Box::new(out.clone())).unwrap();
/// assert_eq!(code, 0);
/// assert_eq!(out.contents(), "hello world\n");
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    last_status: ExitCode,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            commands,
            last_status: 0,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Exit status of the most recent line; 1 if it failed before a command ran.
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    /// Run a single command invocation by name with arguments, writing to stdout.
    ///
    /// Aliases are not expanded here; see [`Interpreter::run_line`].
    pub fn run(&mut self, name: &str, args: &[&str]) -> anyhow::Result<ExitCode> {
        self.run_with_output(name, args, Box::new(std::io::stdout()))
    }

    fn run_with_output(
        &mut self,
        name: &str,
        args: &[&str],
        stdout: Box<dyn Stdout>,
    ) -> anyhow::Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, name, args) {
                debug!("running {name} {args:?}");
                return cmd.execute(stdout, &mut self.env);
            }
        }
        Err(anyhow::anyhow!("command not found: {}", name))
    }

    /// Execute one line of input, writing command output to stdout.
    pub fn run_line(&mut self, line: &str) -> anyhow::Result<ExitCode> {
        self.run_line_with_output(line, Box::new(std::io::stdout()))
    }

    /// Execute one line of input.
    ///
    /// The line goes through history recall (`!!`, `!N`, `!-N`; the recalled line is
    /// echoed first), is recorded in the history, split into words, and has its first
    /// word replaced by the alias of the same name, if any. Alias expansion happens
    /// once, so an alias may refer to a command of the same name.
    pub fn run_line_with_output(
        &mut self,
        line: &str,
        stdout: Box<dyn Stdout>,
    ) -> anyhow::Result<ExitCode> {
        let result = self.dispatch(line, stdout);
        self.last_status = match &result {
            Ok(code) => *code,
            Err(_) => 1,
        };
        result
    }

    fn dispatch(&mut self, line: &str, mut stdout: Box<dyn Stdout>) -> anyhow::Result<ExitCode> {
        let line = match self.env.history.expand(line)? {
            Cow::Borrowed(line) => line.to_string(),
            Cow::Owned(recalled) => {
                writeln!(stdout, "{}", recalled)?;
                recalled
            }
        };
        self.env.history.push(line.as_str());

        let mut argv = self.expand_words(lexer::split_into_words(&line)?);
        if argv.is_empty() {
            return Ok(0);
        }

        if self.env.aliases.search(&argv[0]).is_some() {
            let command = self.env.aliases.invoke(&argv[0])?;
            debug!("alias {} expands to {:?}", argv[0], command);
            let mut expanded = self.expand_words(lexer::split_into_words(&command)?);
            expanded.extend(argv.drain(1..));
            argv = expanded;
            if argv.is_empty() {
                return Ok(0);
            }
        }

        let args: Vec<&str> = argv[1..].iter().map(String::as_str).collect();
        self.run_with_output(&argv[0], &args, stdout)
    }

    /// Read-eval-print loop on the terminal.
    ///
    /// Stops on end of input or once `exit` has run. Errors of individual lines are
    /// reported and the loop goes on.
    pub fn repl(&mut self, prompt: &str) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        while !self.env.should_exit {
            match rl.readline(prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line.as_str())?;
                    match self.run_line(&line) {
                        Ok(code) => debug!("exit status {code}"),
                        Err(e) => {
                            warn!("{line:?} failed: {e:#}");
                            eprintln!("{e:#}");
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    fn expand_words(&self, words: Vec<Word>) -> Vec<String> {
        words.iter().map(|word| self.word_to_string(word)).collect()
    }

    /// Concatenate the parts of a word, substituting variables. Unset variables expand
    /// to the empty string.
    fn word_to_string(&self, word: &Word) -> String {
        let mut result = String::new();
        for part in word {
            match part {
                WordPart::Literal(text) => result.push_str(text),
                WordPart::ParamSubst(name) => {
                    if let Some(value) = self.env.get_var(name) {
                        result.push_str(&value);
                    }
                }
            }
        }
        result
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `alias`, `unalias`, `pwd`, `cd`, `echo`, `history`, `exit`
    /// - external command launcher
    fn default() -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        Self::new(vec![
            Box::new(Factory::<AliasCmd>::default()),
            Box::new(Factory::<Unalias>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Echo>::default()),
            Box::new(Factory::<HistoryCmd>::default()),
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<ExternalCommand>::default()),
        ])
    }
}
