use log::{LevelFilter, debug, warn};
use scopevm::{
    CodeManagement, Environment, RuntimeConfig,
    runtime::error::{self, ErrorKind},
};
use std::{
    env::{args, var},
    io::{BufReader, stdin, stdout},
    str::FromStr,
};

/// Read the log level from SCOPEVM_LOG, defaulting to warnings and worse.
fn log_level() -> LevelFilter {
    var("SCOPEVM_LOG")
        .ok()
        .and_then(|level| LevelFilter::from_str(level.trim()).ok())
        .unwrap_or(LevelFilter::Warn)
}

fn main() -> error::Result<()> {
    if let Err(error) = simple_logger::SimpleLogger::new()
        .with_level(log_level())
        .init()
    {
        eprintln!("Could not start logging: {}", error);
    }

    let config = RuntimeConfig::from_env();
    let exit_grace = config.exit_grace;

    let mut environment = Environment::with_config(BufReader::new(stdin()), stdout(), config);

    // With a script we run the file and then give its processes a chance to finish.  Without one
    // the read loop runs over standard input until it's closed or the root is stopped.
    let args: Vec<String> = args().collect();

    if args.len() >= 2 {
        debug!("Running script {}.", args[1]);

        let mut root = environment.root();
        let result = root.process_source_file(&args[1]);

        if !environment.join_processes(exit_grace) {
            warn!("Processes still running after {:?}, exiting anyway.", exit_grace);
        }

        match result {
            Err(error) if error.kind() != ErrorKind::Stopped => return Err(error),
            _ => {}
        }
    } else {
        environment.run()?;
    }

    Ok(())
}
