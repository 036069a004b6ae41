use argh::FromArgs;
use log::{debug, error};
use simple_shell::Interpreter;

#[derive(FromArgs)]
/// A minimal interactive shell with command aliases.
struct Args {
    #[argh(option, short = 'c')]
    /// run a single command line and exit with its status.
    command: Option<String>,

    #[argh(option, default = "String::from(\"$ \")")]
    /// prompt shown before each line.
    prompt: String,

    #[argh(switch, short = 'v')]
    /// log debug messages unless RUST_LOG says otherwise.
    verbose: bool,
}

fn main() {
    let args: Args = argh::from_env();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut shell = Interpreter::default();

    let status = match args.command {
        Some(line) => match shell.run_line(&line) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("{e:#}");
                1
            }
        },
        None => match shell.repl(&args.prompt) {
            Ok(()) => shell.last_status(),
            Err(e) => {
                error!("line editor failed: {}", e);
                1
            }
        },
    };

    debug!("shell exiting with status {status}");
    // release the alias registry and history before leaving
    drop(shell);
    std::process::exit(status);
}
