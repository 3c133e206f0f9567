#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
mod resolve;

use std::{net::ToSocketAddrs, process::ExitCode, time::Duration};

use argh::FromArgs;
use jeping::{Java, JavaResponse, Palette};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::resolve::{parse_address, resolve, AddressError, Target};

#[macro_use]
extern crate tracing;

/// Log directives used when `LOG` is not set.
const DEFAULT_FILTER: &str = concat!(env!("CARGO_PKG_NAME"), "=warn,jeping=warn");

/// Fetch and display the MOTD of a Minecraft Java Edition server.
#[derive(FromArgs)]
struct Args {
    /// show the raw status JSON, the plain MOTD and the colored MOTD
    #[argh(switch)]
    debug: bool,
    /// show the colored MOTD (default)
    #[argh(switch, short = 'c')]
    color: bool,
    /// show the plain MOTD, for terminals without color support
    #[argh(switch, short = 't')]
    text: bool,
    /// seconds to wait for the server, 0 to wait for the OS timeout (default 5)
    #[argh(option, default = "5")]
    timeout: u64,
    /// how hex colors are shown: `truecolor` (default) or `16`
    #[argh(option, default = "Palette::TrueColor")]
    palette: Palette,
    /// do not look up a `_minecraft._tcp` SRV record
    #[argh(switch)]
    no_srv: bool,
    /// server address as `host[:port]`, the port defaults to 25565
    #[argh(positional)]
    address: String,
}

#[derive(thiserror::Error, Debug)]
pub enum Failure {
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),
    #[error("could not query the server: {0}")]
    QueryFailed(#[from] jeping::Error),
}

fn main() -> ExitCode {
    start_tracing();
    let args: Args = argh::from_env();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "Error querying server");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Failure> {
    let (host, port) = parse_address(&args.address)?;
    let target = resolve(host, port, !args.no_srv);
    println!(
        "Querying the MOTD of {} [{}]...",
        target.host,
        display_addr(&target)
    );

    let config = Java {
        host: target.host,
        port: target.port,
        timeout: Some(Duration::from_secs(args.timeout)),
        ..Java::default()
    };
    let (json, latency) = config.query()?;
    let response: JavaResponse = json.parse().map_err(jeping::Error::from)?;

    let description = &response.description;
    if args.debug {
        println!("\nRaw JSON:\n{json}");
        println!("\nPlain MOTD:\n{}", description.plain_text());
        println!("\nColored MOTD:\n{}", description.colored_text(args.palette));
    } else if args.text && !args.color {
        println!("\n{}", description.plain_text());
    } else {
        println!("\n{}", description.colored_text(args.palette));
    }

    println!(
        "\nVersion: {} (protocol {})",
        response.version.name, response.version.protocol
    );
    println!(
        "Players: {} / {}",
        response.players.online, response.players.max
    );
    if let Some(sample) = response.players.sample.filter(|sample| !sample.is_empty()) {
        let names: Vec<&str> = sample.iter().map(|player| player.name.as_str()).collect();
        println!("Online: {}", names.join(", "));
    }
    println!("Latency: {} ms", latency.as_millis());
    Ok(())
}

/// The first socket address the target resolves to, for display only.
fn display_addr(target: &Target) -> String {
    (target.host.as_str(), target.port)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map_or_else(
            || format!("unresolved:{}", target.port),
            |addr| addr.to_string(),
        )
}

fn log_filter(directives: Option<String>) -> EnvFilter {
    EnvFilter::builder().parse_lossy(directives.as_deref().unwrap_or(DEFAULT_FILTER))
}

fn start_tracing() {
    let env_filter = log_filter(std::env::var("LOG").ok());
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}
