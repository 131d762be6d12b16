use std::{
    error::Error,
    io::{self, Write},
    path::PathBuf,
    process,
    time::Duration,
};

use clap::{ArgGroup, Parser};
use livestatus::{Command, Config, Separators, Session, prompt, render};
use log::info;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("peer").required(true).args(["socket", "server"])))]
struct Cli {
    /// Path to the livestatus UNIX socket
    #[arg(short, long)]
    socket: Option<PathBuf>,
    /// Livestatus TCP address, host:port
    #[arg(short = 'S', long)]
    server: Option<String>,
    /// Reuse one connection for all statements
    #[arg(short, long)]
    keepalive: bool,
    /// Line, column, list and host/service separator byte values
    #[arg(long, num_args = 4, value_names = ["LINE", "COLUMN", "LIST", "HOST_SERVICE"])]
    separators: Option<Vec<u8>>,
    /// Socket read/write timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,
    /// Log requests and response headers
    #[arg(short, long)]
    verbose: bool,
    /// Statement to run once; prompts for statements when omitted
    statement: Option<String>,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = match (&self.socket, &self.server) {
            (Some(path), _) => Config::unix(path),
            (None, Some(address)) => Config::tcp(address),
            (None, None) => unreachable!("clap requires one of --socket or --server"),
        };

        if let Some(&[line, column, list, host_service]) = self.separators.as_deref() {
            config = config.with_separators(Separators {
                line,
                column,
                list,
                host_service,
            });
        }
        if let Some(secs) = self.timeout {
            config = config.with_query_timeout(Duration::from_secs(secs));
        }

        config.with_keepalive(self.keepalive).with_verbose(self.verbose)
    }
}

fn run(session: &mut Session, statement: &str) -> Result<(), livestatus::Error> {
    if let Some(result) = session.query(statement)? {
        render(&result, io::stdout().lock())?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize env_logger; For logging to STDOUT/STDERR
    env_logger::init();

    let cli = Cli::parse();
    let mut session = Session::new(cli.config());

    ctrlc::set_handler(|| {
        info!("interrupted");
        process::exit(130);
    })?;

    if let Some(statement) = &cli.statement {
        run(&mut session, statement)?;
        return Ok(());
    }

    loop {
        let cmd = prompt(io::stdin().lock(), io::stdout().lock())?;

        match cmd {
            Command::Exit => break,
            Command::Statement(statement) => {
                if let Err(e) = run(&mut session, &statement) {
                    eprintln!("error: {e}");
                }
            }
        }
        io::stdout().flush()?;
    }

    session.disconnect();
    Ok(())
}
