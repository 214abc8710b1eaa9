pub mod commands;

use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand, ValueEnum};
use cmrs::{Ipv4Method, Ipv6Method, Ipv6Privacy, ProxyMethod, TechnologyKind};

#[derive(Parser, Debug)]
#[command(name = "cmrs")]
#[command(about = "Inspect and control ConnMan from the terminal")]
#[command(disable_version_flag = true)]
#[command(version)]
pub struct Args {
    #[arg(short = 'V', long = "version", action = ArgAction::SetTrue)]
    version: bool,

    /// Log debug output to stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Seconds to wait for ConnMan to appear on the bus.
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Global status, offline mode and technology switches (default).
    Status,
    /// Technology switches only.
    Technologies,
    /// List services in ConnMan's order.
    Services,
    /// Show the details of one service.
    Show { service: String },
    /// Power a technology on or off.
    Power { technology: Technology, state: Toggle },
    /// Turn offline (flight) mode on or off.
    Offline { state: Toggle },
    /// Share a technology's connection.
    Tether {
        technology: Technology,
        state: Toggle,
        /// Hotspot name, wifi only.
        #[arg(long, requires = "passphrase")]
        ssid: Option<String>,
        /// Hotspot passphrase, at least 8 characters.
        #[arg(long, requires = "ssid")]
        passphrase: Option<String>,
    },
    /// Ask wifi to scan for networks.
    Scan,
    /// Connect or disconnect a service, as clicking its row would.
    Activate { service: String },
    /// Change a service's configuration.
    Configure(ConfigureArgs),
    /// Forget a service's saved configuration.
    Forget { service: String },
    /// Print the status line every time it changes.
    Watch,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Technology {
    Ethernet,
    Wifi,
    Bluetooth,
    Cellular,
}

impl From<Technology> for TechnologyKind {
    fn from(value: Technology) -> Self {
        match value {
            Technology::Ethernet => TechnologyKind::Ethernet,
            Technology::Wifi => TechnologyKind::Wifi,
            Technology::Bluetooth => TechnologyKind::Bluetooth,
            Technology::Cellular => TechnologyKind::Cellular,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Ipv4Choice {
    Off,
    Dhcp,
    Manual,
}

impl From<Ipv4Choice> for Ipv4Method {
    fn from(value: Ipv4Choice) -> Self {
        match value {
            Ipv4Choice::Off => Ipv4Method::Off,
            Ipv4Choice::Dhcp => Ipv4Method::Dhcp,
            Ipv4Choice::Manual => Ipv4Method::Manual,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Ipv6Choice {
    Off,
    Auto,
    Manual,
}

impl From<Ipv6Choice> for Ipv6Method {
    fn from(value: Ipv6Choice) -> Self {
        match value {
            Ipv6Choice::Off => Ipv6Method::Off,
            Ipv6Choice::Auto => Ipv6Method::Auto,
            Ipv6Choice::Manual => Ipv6Method::Manual,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum PrivacyChoice {
    Disabled,
    Enabled,
    Preferred,
}

impl From<PrivacyChoice> for Ipv6Privacy {
    fn from(value: PrivacyChoice) -> Self {
        match value {
            PrivacyChoice::Disabled => Ipv6Privacy::Disabled,
            PrivacyChoice::Enabled => Ipv6Privacy::Enabled,
            PrivacyChoice::Preferred => Ipv6Privacy::Preferred,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ProxyChoice {
    Direct,
    Auto,
    Manual,
}

impl From<ProxyChoice> for ProxyMethod {
    fn from(value: ProxyChoice) -> Self {
        match value {
            ProxyChoice::Direct => ProxyMethod::Direct,
            ProxyChoice::Auto => ProxyMethod::Auto,
            ProxyChoice::Manual => ProxyMethod::Manual,
        }
    }
}

#[derive(ClapArgs, Debug, Default)]
pub struct ConfigureArgs {
    /// Service path or name.
    pub service: String,

    #[arg(long)]
    pub autoconnect: Option<Toggle>,

    #[arg(long, value_enum)]
    pub ipv4: Option<Ipv4Choice>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub netmask: Option<String>,
    #[arg(long)]
    pub gateway: Option<String>,

    #[arg(long, value_enum)]
    pub ipv6: Option<Ipv6Choice>,
    #[arg(long, value_enum)]
    pub privacy: Option<PrivacyChoice>,
    #[arg(long)]
    pub ipv6_address: Option<String>,
    #[arg(long)]
    pub prefix_length: Option<String>,
    #[arg(long)]
    pub ipv6_gateway: Option<String>,

    /// Space or comma separated DNS servers; empty to clear.
    #[arg(long)]
    pub nameservers: Option<String>,
    /// Comma separated search domains; empty to clear.
    #[arg(long)]
    pub domains: Option<String>,

    #[arg(long, value_enum)]
    pub proxy: Option<ProxyChoice>,
    /// Auto-configuration URL for `--proxy auto`.
    #[arg(long)]
    pub proxy_url: Option<String>,
    /// `host:port` of the HTTP proxy.
    #[arg(long)]
    pub http_proxy: Option<String>,
    /// `host:port` of the HTTPS proxy.
    #[arg(long)]
    pub https_proxy: Option<String>,
    /// `host:port` of the SOCKS proxy.
    #[arg(long)]
    pub socks_proxy: Option<String>,
    /// Use SOCKS 4 instead of SOCKS 5.
    #[arg(long)]
    pub socks4: bool,
    /// Comma separated hosts that bypass the proxy.
    #[arg(long)]
    pub proxy_excludes: Option<String>,
}

pub fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.version {
        println!("cmrs {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let timeout = Duration::from_secs(args.timeout);
    let command = args.command.unwrap_or(Command::Status);
    runtime.block_on(commands::execute(command, timeout))
}
