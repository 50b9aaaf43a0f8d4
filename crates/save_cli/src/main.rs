use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use save_cli::{parse_args, run, usage_text, CommonOptions, Invocation, SAVE_DIR_ENV_VAR};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

fn run_cli() -> Result<(), String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let mut defaults = CommonOptions::default();
    if let Some(dir) = env::var_os(SAVE_DIR_ENV_VAR) {
        defaults.dir = PathBuf::from(dir);
    }

    match parse_args(&args, defaults)? {
        Invocation::Help => {
            println!("{}", usage_text());
            Ok(())
        }
        Invocation::Run { kind, options } => {
            tracing::debug!(?kind, dir = %options.dir.display(), "save_cli_command");
            run(kind, options, &mut io::stdout())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}
