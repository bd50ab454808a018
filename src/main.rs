use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tracing::{error, Level};

use rto_ping::core::{Error, PingConfig, Result};
use rto_ping::network::{resolve_target, RawIcmpSocket};
use rto_ping::probe::Pinger;
use rto_ping::session::Session;
use rto_ping::util::secs_to_duration;

/// rto-ping: ICMP latency probe with an RFC 6298 adaptive timeout
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Target host name or IPv4 address
    #[arg(short, long, default_value = rto_ping::core::DEFAULT_TARGET)]
    target: String,

    /// Number of probes to send
    #[arg(short, long, default_value_t = rto_ping::core::DEFAULT_COUNT)]
    count: u32,

    /// Seconds between probes
    #[arg(short, long, default_value_t = 1.0)]
    interval: f64,

    /// Echo identifier (defaults to the low 16 bits of the pid)
    #[arg(long)]
    identifier: Option<u16>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self) -> Result<PingConfig> {
        let interval = secs_to_duration(self.interval)
            .ok_or_else(|| Error::config(format!("Invalid interval: {}", self.interval)))?;

        let config = PingConfig {
            target: self.target,
            count: self.count,
            interval,
            identifier: self.identifier,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.into_config()?;

    let destination = resolve_target(&config.target).await?;
    let socket = RawIcmpSocket::open(destination)?;
    let pinger = Pinger::with_config(socket, &config);

    println!(
        "Pinging {} ({}) with RFC 6298 RTO logic.",
        config.target, destination
    );
    println!("---------------------------------------------------");

    let target = config.target.clone();
    let mut session = Session::new(pinger, config);
    let stats = session.run(|report| println!("{}", report)).await;

    println!("--- {} rto-ping statistics ---", target);
    println!("{}", stats);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal");
            eprintln!("rto-ping: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["rto-ping"]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.target, "8.8.8.8");
        assert_eq!(config.count, 10);
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.identifier, None);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "rto-ping", "-t", "example.com", "-c", "3", "-i", "0.25", "--identifier", "77", "-vv",
        ]);
        assert_eq!(cli.verbose, 2);

        let config = cli.into_config().unwrap();
        assert_eq!(config.target, "example.com");
        assert_eq!(config.count, 3);
        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.identifier, Some(77));
    }

    #[test]
    fn test_cli_rejects_negative_interval() {
        let cli = Cli::parse_from(["rto-ping", "--interval=-1"]);
        assert!(matches!(cli.into_config(), Err(Error::Config(_))));
    }
}
