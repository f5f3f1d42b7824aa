use clap::{Parser, Subcommand};
use ferrous_netdiag_domain::{CliOverrides, StunResult};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod bootstrap;
mod di;
mod server;

#[derive(Parser)]
#[command(name = "ferrous-netdiag")]
#[command(version)]
#[command(about = "Ferrous NetDiag - DNS forwarding proxy and STUN NAT classifier")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the DNS forwarding proxy until Ctrl-C
    Proxy {
        /// Bind address
        #[arg(short = 'b', long)]
        bind: Option<String>,

        /// DNS listen port
        #[arg(short = 'p', long)]
        port: Option<u16>,

        /// Upstream resolver, tried in the order given (repeatable)
        #[arg(short = 'u', long = "upstream", value_name = "ENDPOINT")]
        upstreams: Vec<String>,
    },

    /// Classify the NAT in front of this host and print the public endpoint
    Nat {
        /// STUN server, tried in the order given (repeatable)
        #[arg(short = 's', long = "server", value_name = "ENDPOINT")]
        servers: Vec<String>,

        /// Per-request timeout in milliseconds
        #[arg(short = 't', long)]
        timeout_ms: Option<u64>,

        /// Local bind address (IP:PORT)
        #[arg(short = 'l', long)]
        local: Option<String>,
    },
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides {
            log_level: self.log_level.clone(),
            ..CliOverrides::default()
        };
        match &self.command {
            Command::Proxy {
                bind,
                port,
                upstreams,
            } => {
                overrides.bind_address = bind.clone();
                overrides.dns_port = *port;
                overrides.upstream_servers = Some(upstreams.clone());
            }
            Command::Nat {
                servers,
                timeout_ms,
                local,
            } => {
                overrides.stun_servers = Some(servers.clone());
                overrides.stun_timeout = *timeout_ms;
                overrides.stun_local_bind = local.clone();
            }
        }
        overrides
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = bootstrap::load_config(cli.config.as_deref(), cli.overrides())?;

    bootstrap::init_logging(&config);

    info!("Starting Ferrous NetDiag v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Proxy { .. } => run_proxy(&config).await,
        Command::Nat { .. } => run_nat(&config).await,
    }
}

async fn run_proxy(config: &ferrous_netdiag_domain::Config) -> anyhow::Result<()> {
    let dns_services = di::DnsServices::new(config).await?;

    let shutdown = CancellationToken::new();
    let server_shutdown = shutdown.clone();
    let dns_addr = config.server.listen_address();
    let mut server = tokio::spawn(server::start_dns_server(
        dns_addr,
        dns_services.handler_use_case,
        server_shutdown,
    ));

    tokio::select! {
        result = &mut server => {
            // The loop only returns early on a bind failure.
            result??;
        }
        _ = signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            shutdown.cancel();
            if let Err(e) = server.await? {
                error!(error = %e, "DNS proxy stopped with an error");
            }
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn run_nat(config: &ferrous_netdiag_domain::Config) -> anyhow::Result<()> {
    let stun_services = di::StunServices::new(config).await?;
    let result = stun_services.classify_nat.execute().await?;
    print_nat_result(&result);
    Ok(())
}

fn print_nat_result(result: &StunResult) {
    println!("NAT type:        {}", result.nat_type);
    match result.public_endpoint {
        Some(endpoint) => println!("Public endpoint: {}", endpoint),
        None => println!("Public endpoint: unknown"),
    }
    if let Some(server) = result.server {
        println!("STUN server:     {}", server);
    }
}
