use clap::Parser;
use flexi_logger::Logger;

use deckedit::cli::Cli;

fn log_spec(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let _logger = Logger::try_with_env_or_str(log_spec(cli.verbose, cli.quiet))?
        .log_to_stderr()
        .start()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("deckedit-worker")
        .build()?;
    // Image loads and the collaboration transport are spawned from
    // synchronous code, so the runtime must be current on this thread.
    let _guard = runtime.enter();

    cli.run(&runtime)
}
