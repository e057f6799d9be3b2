//! PCloud client entry point.
//!
//! Loads the config file, initialises logging, and dispatches one command.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config_from()        -- hosts, pairings, resolver and session defaults
//!  └─ tracing_subscriber init   -- RUST_LOG, else [client] log_level
//!  └─ command
//!       ├─ hosts …   -> AddressBook (+ refresh_online)
//!       ├─ resolve   -> Resolver (neighbor cache, hint, /24 sweep)
//!       ├─ wake      -> WakeSignaler over UDP broadcast
//!       ├─ suspend   -> HttpSignalingClient::suspend
//!       ├─ pair …    -> PairingStore, pairing file import, LanLocator
//!       ├─ connect   -> SessionController until Ctrl-C
//!       └─ watch     -> background re-resolver until Ctrl-C
//! ```
//!
//! Commands that change hosts or pairings write the config file back before
//! exiting.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pcloud_client::application::background_resolve::spawn_background_resolver;
use pcloud_client::application::host_liveness::{refresh_online, wait_for_host, WAIT_INTERVAL, WAIT_TIMEOUT};
use pcloud_client::application::manage_pairings::{profile_from_pairing, PairingStore};
use pcloud_client::application::manage_profiles::AddressBook;
use pcloud_client::application::negotiate_session::SessionNegotiator;
use pcloud_client::application::resolve_host::{Resolution, Resolver};
use pcloud_client::application::session_controller::{ConnectTarget, SessionController};
use pcloud_client::application::wake_host::WakeSignaler;
use pcloud_client::infrastructure::media::DrainSink;
use pcloud_client::infrastructure::network::{
    HttpHealthProbe, HttpSignalingClient, InterfacePrefixes, LanLocator, SystemNeighborTable, UdpWakeTransport,
};
use pcloud_client::infrastructure::rtc::WebRtcConnector;
use pcloud_client::infrastructure::storage::config::{config_file_path, load_config_from, save_config_to, AppConfig};
use pcloud_client::infrastructure::storage::pairing_file::import_pairing_file;
use pcloud_core::{HostProfile, MacAddress, DEFAULT_PORT};

#[derive(Debug, Parser)]
#[command(name = "pcloud", version, about = "Find, wake, and stream from PCloud hosts on the local network")]
struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, env = "PCLOUD_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Per-probe health check timeout in milliseconds.
    #[arg(long, env = "PCLOUD_PROBE_TIMEOUT_MS", global = true)]
    probe_timeout_ms: Option<u64>,

    /// Maximum concurrent probes during a subnet sweep.
    #[arg(long, env = "PCLOUD_CONCURRENCY", global = true)]
    concurrency: Option<usize>,

    /// Resolution attempts before giving up.
    #[arg(long, env = "PCLOUD_ATTEMPTS", global = true)]
    attempts: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage saved hosts.
    Hosts {
        #[command(subcommand)]
        action: HostsCommand,
    },
    /// Find the current IP of a MAC address.
    Resolve {
        mac: String,
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Address to try before sweeping.
        #[arg(long)]
        hint: Option<Ipv4Addr>,
    },
    /// Send a Wake-on-LAN packet.
    Wake {
        mac: String,
        /// Resolve the host afterwards and wait until it answers.
        #[arg(long)]
        wait: bool,
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Ask a host to suspend itself.
    Suspend {
        ip: Ipv4Addr,
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Manage pairing records.
    Pair {
        #[command(subcommand)]
        action: PairCommand,
    },
    /// Stream from a host until Ctrl-C.
    ///
    /// HOST is a saved host (id, MAC, or name), a paired device id, a MAC
    /// address, or a signaling URL.
    Connect {
        host: String,
        /// Do not wake the host if it cannot be found.
        #[arg(long)]
        no_wake: bool,
        #[arg(long)]
        codec: Option<String>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
    },
    /// Keep saved hosts' addresses current until Ctrl-C.
    Watch,
}

#[derive(Debug, Subcommand)]
enum HostsCommand {
    List,
    Add {
        name: String,
        mac: String,
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    Remove {
        host: String,
    },
    Rename {
        host: String,
        name: String,
    },
    SetMac {
        host: String,
        mac: String,
    },
    SetPort {
        host: String,
        port: u32,
    },
    /// Pin an IP; omit it to go back to automatic resolution.
    SetIp {
        host: String,
        ip: Option<Ipv4Addr>,
    },
    /// Probe every host with a known IP and update its online flag.
    Refresh,
}

#[derive(Debug, Subcommand)]
enum PairCommand {
    /// Import a pairing file exported by a host.
    Import { file: PathBuf },
    List,
    Remove { device_id: String },
    /// Find a paired host on the LAN by its device id.
    Locate {
        device_id: String,
        #[arg(long, default_value_t = 3)]
        timeout_secs: u64,
    },
}

/// Loaded config plus the in-memory stores built from it.
struct App {
    path: PathBuf,
    config: AppConfig,
    book: Arc<AddressBook>,
    pairings: PairingStore,
}

impl App {
    fn load(cli: &Cli) -> anyhow::Result<Self> {
        let path = match &cli.config {
            Some(path) => path.clone(),
            None => config_file_path()?,
        };
        let mut config = load_config_from(&path).with_context(|| format!("loading {}", path.display()))?;

        if let Some(ms) = cli.probe_timeout_ms {
            config.resolver.probe_timeout_ms = ms;
        }
        if let Some(n) = cli.concurrency {
            config.resolver.concurrency = n;
        }
        if let Some(n) = cli.attempts {
            config.resolver.attempts = n;
        }

        let book = Arc::new(AddressBook::from_profiles(config.hosts.clone()));
        let pairings = PairingStore::from_records(config.pairings.clone());
        Ok(Self {
            path,
            config,
            book,
            pairings,
        })
    }

    fn save(&mut self) -> anyhow::Result<()> {
        self.config.hosts = self.book.list();
        self.config.pairings = self.pairings.list();
        save_config_to(&self.path, &self.config).with_context(|| format!("saving {}", self.path.display()))?;
        Ok(())
    }

    fn health(&self) -> anyhow::Result<Arc<HttpHealthProbe>> {
        Ok(Arc::new(HttpHealthProbe::new(&self.config.resolver.health_path)?))
    }

    fn resolver(&self) -> anyhow::Result<Arc<Resolver>> {
        Ok(Arc::new(Resolver::new(
            Arc::new(SystemNeighborTable::new()),
            Arc::new(InterfacePrefixes::new()),
            self.health()?,
            self.config.resolver.resolver_config(),
        )))
    }

    fn host(&self, query: &str) -> anyhow::Result<HostProfile> {
        self.book
            .find(query)
            .with_context(|| format!("no saved host matches {query:?}"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut app = App::load(&cli)?;

    // Initialise structured logging.
    let level = app.config.client.log_level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    match cli.command {
        Command::Hosts { action } => hosts(&mut app, action).await,
        Command::Resolve { mac, port, hint } => {
            match app.resolver()?.resolve(&mac, port, hint).await? {
                Resolution::Found { ip, stage } => println!("{ip} ({stage:?})"),
                Resolution::NotFound => bail!("{mac} not found on the local network"),
            }
            Ok(())
        }
        Command::Wake { mac, wait, port } => wake(&app, &mac, wait, port).await,
        Command::Suspend { ip, port } => {
            HttpSignalingClient::new()?.suspend(ip, port).await?;
            println!("suspend requested");
            Ok(())
        }
        Command::Pair { action } => pair(&mut app, action).await,
        Command::Connect {
            host,
            no_wake,
            codec,
            width,
            height,
        } => {
            if let Some(codec) = codec {
                app.config.session.codec = codec;
            }
            if let Some(width) = width {
                app.config.session.width = width;
            }
            if let Some(height) = height {
                app.config.session.height = height;
            }
            connect(&app, &host, !no_wake).await
        }
        Command::Watch => watch(&mut app).await,
    }
}

async fn hosts(app: &mut App, action: HostsCommand) -> anyhow::Result<()> {
    match action {
        HostsCommand::List => {
            for host in app.book.list() {
                let ip = host.ip.map_or_else(|| "-".to_string(), |ip| ip.to_string());
                let online = if host.online { "online" } else { "" };
                println!("{}  {:<20} {}  {:<15} {:<5} {online}", host.id, host.name, host.mac, ip, host.port);
            }
            return Ok(());
        }
        HostsCommand::Add { name, mac, port } => {
            let host = app.book.add(&name, &mac, port)?;
            println!("added {} ({})", host.name, host.id);
        }
        HostsCommand::Remove { host } => {
            let removed = app.book.remove(app.host(&host)?.id)?;
            println!("removed {}", removed.name);
        }
        HostsCommand::Rename { host, name } => app.book.rename(app.host(&host)?.id, &name)?,
        HostsCommand::SetMac { host, mac } => app.book.change_mac(app.host(&host)?.id, &mac)?,
        HostsCommand::SetPort { host, port } => app.book.change_port(app.host(&host)?.id, port)?,
        HostsCommand::SetIp { host, ip } => app.book.set_ip(app.host(&host)?.id, ip)?,
        HostsCommand::Refresh => {
            let online = refresh_online(&app.book, app.health()?, app.config.resolver.probe_timeout()).await;
            println!("{online} of {} hosts online", app.book.list().len());
        }
    }
    app.save()
}

async fn wake(app: &App, mac: &str, wait: bool, port: u16) -> anyhow::Result<()> {
    WakeSignaler::new(Arc::new(UdpWakeTransport::new())).wake(mac).await?;
    println!("wake packet sent to {mac}");
    if !wait {
        return Ok(());
    }

    let resolver = app.resolver()?;
    let Resolution::Found { ip, .. } = resolver.resolve(mac, port, None).await? else {
        bail!("{mac} did not appear on the local network");
    };
    let up = wait_for_host(
        resolver.health().as_ref(),
        ip,
        port,
        app.config.resolver.probe_timeout(),
        WAIT_TIMEOUT,
        WAIT_INTERVAL,
    )
    .await;
    if !up {
        bail!("{ip} did not become ready within {WAIT_TIMEOUT:?}");
    }
    println!("{ip} is up");
    Ok(())
}

async fn pair(app: &mut App, action: PairCommand) -> anyhow::Result<()> {
    match action {
        PairCommand::Import { file } => {
            let record = import_pairing_file(&file)?;
            app.pairings.add(record.clone())?;
            if let Some(mac) = record.mac {
                if app.book.find(&mac.to_string()).is_none() {
                    let profile = profile_from_pairing(&record)?;
                    app.book.add(&profile.name, &mac.to_string(), profile.port)?;
                }
            }
            println!("paired with {}", record.display_name());
        }
        PairCommand::List => {
            for record in app.pairings.list() {
                let mac = record.mac.map_or_else(|| "-".to_string(), |m| m.to_string());
                println!("{:<24} {:<20} {mac}  {}", record.device_id, record.display_name(), record.broker);
            }
            return Ok(());
        }
        PairCommand::Remove { device_id } => {
            app.pairings.remove(&device_id)?;
        }
        PairCommand::Locate {
            device_id,
            timeout_secs,
        } => {
            let record = app.pairings.get(&device_id);
            let token = record.as_ref().and_then(|r| r.lan_token.as_deref());
            match LanLocator::new()
                .locate(&device_id, token, Duration::from_secs(timeout_secs))
                .await?
            {
                Some(found) => {
                    let port = found.port.or(record.as_ref().and_then(|r| r.port)).unwrap_or(DEFAULT_PORT);
                    println!("{}:{port}", found.ip);
                }
                None => bail!("{device_id} did not answer"),
            }
            return Ok(());
        }
    }
    app.save()
}

/// Turns the `connect` argument into a target.
async fn connect_target(app: &App, host: &str, wake: bool) -> anyhow::Result<ConnectTarget> {
    if host.starts_with("http://") || host.starts_with("https://") {
        return Ok(ConnectTarget::Direct {
            server: host.to_string(),
        });
    }
    if let Some(profile) = app.book.find(host) {
        return Ok(ConnectTarget::Host {
            mac: profile.mac.to_string(),
            port: profile.port,
            ip_hint: profile.ip,
            wake,
        });
    }
    if let Some(record) = app.pairings.get(host) {
        let located = LanLocator::new()
            .locate(&record.device_id, record.lan_token.as_deref(), Duration::from_secs(3))
            .await?;
        if let Some(found) = located {
            let port = found.port.or(record.port).unwrap_or(DEFAULT_PORT);
            return Ok(ConnectTarget::Direct {
                server: format!("http://{}:{port}", found.ip),
            });
        }
        if let Some(mac) = record.mac {
            return Ok(ConnectTarget::Host {
                mac: mac.to_string(),
                port: record.port.unwrap_or(DEFAULT_PORT),
                ip_hint: None,
                wake,
            });
        }
        bail!("{} did not answer and its pairing has no MAC", record.display_name());
    }
    if MacAddress::parse(host).is_ok() {
        return Ok(ConnectTarget::Host {
            mac: host.to_string(),
            port: DEFAULT_PORT,
            ip_hint: None,
            wake,
        });
    }
    bail!("{host:?} is not a saved host, a paired device, a MAC address, or a URL")
}

async fn connect(app: &App, host: &str, wake: bool) -> anyhow::Result<()> {
    let target = connect_target(app, host, wake).await?;

    let negotiator = SessionNegotiator::new(Arc::new(WebRtcConnector::new()?), Arc::new(HttpSignalingClient::new()?));
    let mut controller = SessionController::new(
        app.resolver()?,
        WakeSignaler::new(Arc::new(UdpWakeTransport::new())),
        negotiator,
        Arc::new(DrainSink),
    );
    controller.on_status_change(|status| info!("session: {status:?}"));
    controller.on_stats(|reading| println!("{reading}"));

    let session = &app.config.session;
    let config = session.session_config(String::new());
    let options = session.session_options(f64::from(session.width), f64::from(session.height));
    controller.connect(target, config, options).await?;

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    info!("shutdown signal received");
    controller.end().await;
    Ok(())
}

async fn watch(app: &mut App) -> anyhow::Result<()> {
    let period = app.config.resolver.background_interval();
    let task = spawn_background_resolver(Arc::clone(&app.book), app.resolver()?, period, |resolved| {
        if resolved > 0 {
            info!("re-resolved {resolved} hosts");
        }
    });
    info!("re-resolving unaddressed hosts every {period:?}; Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    task.stop().await;
    if let Err(e) = app.save() {
        warn!("could not save resolved addresses: {e:#}");
    }
    Ok(())
}
