//! Turning the address typed by the user into a host and port to connect to.

use std::{cmp::Reverse, net::IpAddr, time::Duration};

use hickory_resolver::{
    ResolveError, Resolver, TokioResolver,
    config::{ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
};
use jeping::DEFAULT_PORT;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("the address is empty")]
    Empty,
    #[error("invalid port `{0}`")]
    InvalidPort(String),
    #[error("missing `]` after an IPv6 address")]
    UnclosedBracket,
}

#[derive(Debug, thiserror::Error)]
enum SrvError {
    #[error("could not start the DNS runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Lookup(#[from] ResolveError),
}

/// Where a query goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

/// Splits `host`, `host:port`, `[v6]` or `[v6]:port` into its parts.
///
/// An address with several colons and no brackets is taken as a bare IPv6
/// address without a port.
pub fn parse_address(address: &str) -> Result<(String, Option<u16>), AddressError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(AddressError::Empty);
    }

    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        let (host, rest) = rest.split_once(']').ok_or(AddressError::UnclosedBracket)?;
        match rest.strip_prefix(':') {
            Some(port) => (host, Some(port)),
            None if rest.is_empty() => (host, None),
            None => return Err(AddressError::InvalidPort(rest.to_owned())),
        }
    } else {
        match address.split_once(':') {
            Some((host, port)) if !port.contains(':') => (host, Some(port)),
            _ => (address, None),
        }
    };

    if host.is_empty() {
        return Err(AddressError::Empty);
    }
    let port = port
        .map(|port| {
            port.parse()
                .map_err(|_| AddressError::InvalidPort(port.to_owned()))
        })
        .transpose()?;
    Ok((host.to_owned(), port))
}

/// Picks the host and port to connect to.
///
/// Like the game client, an SRV record is only consulted when no port was
/// given and the host is a name rather than an IP address. Lookup failures
/// fall back to the default port.
pub fn resolve(host: String, port: Option<u16>, use_srv: bool) -> Target {
    if let Some(port) = port {
        return Target { host, port };
    }
    if use_srv && host.parse::<IpAddr>().is_err() {
        match srv_record(&host) {
            Ok(Some(target)) => {
                info!(%host, target = %target.host, port = target.port, "using SRV record");
                return target;
            }
            Ok(None) => {}
            Err(e) => debug!(%host, error = %e, "no usable SRV record"),
        }
    }
    Target {
        host,
        port: DEFAULT_PORT,
    }
}

fn new_resolver() -> TokioResolver {
    let mut opts = ResolverOpts::default();
    opts.attempts = 2;
    opts.timeout = Duration::from_secs(2);
    Resolver::builder_with_config(
        ResolverConfig::cloudflare(),
        TokioConnectionProvider::default(),
    )
    .with_options(opts)
    .build()
}

fn srv_record(host: &str) -> Result<Option<Target>, SrvError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let name = format!("_minecraft._tcp.{host}");
    let lookup = runtime.block_on(new_resolver().srv_lookup(name))?;
    Ok(lookup
        .iter()
        .min_by_key(|srv| (srv.priority(), Reverse(srv.weight())))
        .map(|srv| Target {
            host: srv.target().to_utf8().trim_end_matches('.').to_owned(),
            port: srv.port(),
        }))
}
