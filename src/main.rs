//! agentcp - interactive file shell for a remote agent
//!
//! One connection per process, opened at startup. Connect failures are fatal;
//! everything after that is reported per command until `exit`.

use agentcp::cli::ClientOpts;
use agentcp::config::ClientConfig;
use agentcp::dispatch::{Dispatcher, HELP};
use agentcp::env::Environment;
use agentcp::logger::{Logger, NoopLogger, TextLogger};
use agentcp::net::Session;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::sync::Arc;

fn main() -> Result<()> {
    // Set up Ctrl-C handler
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user. Exiting (Ctrl-C)...");
        // Exit immediately with 130 (128 + SIGINT)
        std::process::exit(130);
    })
    .context("Error setting Ctrl-C handler")?;

    let opts = ClientOpts::parse();
    let env = Environment::detect();
    let config = ClientConfig::from_opts(&opts, env)?;

    // Choose logger once; zero overhead with NoopLogger
    let logger: Arc<dyn Logger> = match &config.log_file {
        Some(p) => match TextLogger::new(p) {
            Ok(l) => Arc::new(l),
            Err(e) => {
                eprintln!("Warning: cannot open log file {}: {}", p.display(), e);
                Arc::new(NoopLogger)
            }
        },
        None => Arc::new(NoopLogger),
    };

    let addr = config.endpoint().addr();
    let mut session = match Session::connect(
        &config.host,
        config.port,
        config.connect_timeout,
        config.read_timeout,
    ) {
        Ok(s) => s,
        Err(e) => {
            logger.error("connect", &addr, &e.to_string());
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    logger.connected(&addr);

    let cwd = std::env::current_dir().context("Cannot determine working directory")?;
    let paths = config.local_paths(env, cwd);
    let transfer_opts = config.transfer_options();

    println!("Connected to agent at {}. {}", addr, HELP);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let result = Dispatcher::new(&mut session, &paths, &transfer_opts, logger.as_ref()).run(
        stdin.lock(),
        &mut stdout,
        "> ",
    );
    let _ = stdout.flush();
    session.close();

    if let Err(e) = result {
        if e.is_fatal() {
            std::process::exit(1);
        }
        return Err(e.into());
    }
    Ok(())
}
