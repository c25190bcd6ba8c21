use anyhow::Context;
use clap::{Parser, Subcommand};
use skia_policy::{
    BypassFilter, ConfigLoader, ConfigValidator, PolicyEngine, ProxyRouter, QueryServer,
    QueryServerConfig, SystemResolver,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "skia-policy")]
#[command(about = "Per-application proxy selection policy")]
struct Args {
    /// Config file path
    #[arg(long, short = 'c', env = "SKIA_POLICY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer routing queries on a Unix domain socket
    Serve {
        /// Socket path, overrides the config file
        #[arg(long, short = 's')]
        socket: Option<PathBuf>,
    },
    /// Evaluate a single connection and print the decision
    Query {
        /// Application identifier (bundle id or process name)
        #[arg(long, short = 'a')]
        app: String,
        /// Destination host name or address
        #[arg(long = "host")]
        host: String,
        /// Destination port
        #[arg(long, short = 'p')]
        port: u16,
    },
    /// Validate the configuration and print a summary
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::load_or_default(args.config.clone())
        .context("loading configuration")?;

    // Initialize logging
    let level = if args.verbose || config.common.verbose {
        tracing_subscriber::filter::LevelFilter::DEBUG
    } else {
        tracing_subscriber::filter::LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    ConfigValidator::validate(&config)?;
    let engine = Arc::new(PolicyEngine::from_config(&config.policy())?);

    match args.command {
        Command::Serve { socket } => {
            let bypass = BypassFilter::from_config(&config.bypass())?;
            let router = Arc::new(ProxyRouter::new(engine, bypass, SystemResolver::new()));
            let server = QueryServer::new(QueryServerConfig {
                socket_path: socket.unwrap_or(config.common.server.socket_path.clone()),
                router,
            });
            server.start().await?;
        }
        Command::Query { app, host, port } => {
            let resolver = SystemResolver::new();
            let evaluation = tokio::task::spawn_blocking(move || {
                engine.explain(&resolver, &app, &host, port)
            })
            .await?;
            println!("{}", evaluation.decision);
            eprintln!("matched rule: {}", evaluation.rule);
        }
        Command::Check => {
            let policy = config.policy();
            println!("config version: {}", config.common.config_version);
            println!("proxies: {}", policy.proxies.len());
            for (i, proxy) in policy.proxies.iter().enumerate() {
                println!("  #{} {} -> {}:{}", i, proxy.label(), proxy.host, proxy.port);
            }
            println!("internal networks: {}", policy.internal_networks.len());
            println!(
                "internal domains: {} ({:?} matching)",
                policy.internal_domains.len(),
                policy.domain_match
            );
            println!("forced apps: {}", policy.forced_apps.apps.len());
            println!("app overrides: {}", policy.app_overrides.len());
            println!("blocked domains: {}", policy.blocked_domains.domains.len());
        }
    }

    Ok(())
}
