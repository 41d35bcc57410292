//! # Starmesh Node
//!
//! Entry point for a mesh node. Subcommands:
//!
//! - `init` — create a local profile (identity, listen address, shard)
//! - `join` — add a seed peer to the profile
//! - `run`  — run the node's control loop
//!
//! The control loop is one task: non-blocking datagram receive interleaved
//! with a fixed-period tick, terminated by Ctrl-C. All mesh state lives in
//! that task; there are no other writers.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use node_runtime::config::{self, starmesh_home, NodeConfig, Profile};
use node_runtime::node::MeshNode;
use node_runtime::store::MemoryWorldStore;
use node_runtime::transport::{UdpEndpoint, RECV_BUFFER_BYTES};
use sm_03_peer_table::CandidateSource;
use sm_05_worldgen::{generate, WorldSeed};

/// Control-loop tick period.
const TICK_MS: u64 = 200;

#[derive(Parser)]
#[command(name = "starmesh", about = "serverless peer-mesh universe node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize the local profile.
    Init {
        #[arg(long)]
        nick: String,
        #[arg(long, default_value = "0.0.0.0:39000")]
        listen: String,
        #[arg(long, default_value = "alpha")]
        shard: String,
        /// Seed peer address, repeatable.
        #[arg(long)]
        seed: Vec<String>,
        /// Explicit shard auth key (hex).
        #[arg(long, default_value = "")]
        shard_key: String,
    },
    /// Add a seed peer to the profile.
    Join {
        #[arg(long)]
        seed: String,
        #[arg(long)]
        shard: Option<String>,
    },
    /// Run the node.
    Run,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    match Cli::parse().command {
        Command::Init {
            nick,
            listen,
            shard,
            seed,
            shard_key,
        } => cmd_init(nick, &listen, shard, seed, shard_key),
        Command::Join { seed, shard } => cmd_join(seed, shard),
        Command::Run => cmd_run(),
    }
}

fn cmd_init(
    nick: String,
    listen: &str,
    shard: String,
    seeds: Vec<String>,
    shard_key: String,
) -> Result<()> {
    let home = starmesh_home();
    let (host, port) = config::parse_listen(listen)?;
    let mut profile = Profile::create(nick, (host, port), shard);
    profile.seed_peers = seeds;
    profile.shard_key = shard_key;
    let path = profile.save(&home)?;
    println!("initialized profile at {}", path.display());
    Ok(())
}

fn cmd_join(seed: String, shard: Option<String>) -> Result<()> {
    let home = starmesh_home();
    let mut profile = Profile::load(&home)?;
    if !profile.seed_peers.contains(&seed) {
        profile.seed_peers.push(seed);
        profile.seed_peers.sort();
    }
    if let Some(shard) = shard {
        profile.shard = shard;
    }
    profile.save(&home)?;
    println!("updated profile with seed");
    Ok(())
}

fn cmd_run() -> Result<()> {
    let home = starmesh_home();
    let profile = Profile::load(&home).context("no profile; run `init` first")?;
    let policy = config::load_policy(Path::new(&profile.data_dir))?;
    let (node_cfg, shard_key) = NodeConfig::from_profile(&profile, policy)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run_node(profile, node_cfg, shard_key))
}

async fn run_node(
    profile: Profile,
    cfg: NodeConfig,
    shard_key: shared_crypto::ShardKey,
) -> Result<()> {
    let seed = WorldSeed::new(cfg.shard.name.clone(), cfg.shard.epoch, cfg.sector_count);
    let map = generate(&seed);
    let store = MemoryWorldStore::new(&map);
    info!(
        shard = %cfg.shard,
        sectors = cfg.sector_count,
        ports = map.ports.len(),
        peer_id = %cfg.peer_id,
        "world derived"
    );

    let listen_port = cfg.listen_port;
    let mut node = MeshNode::new(cfg, shard_key, Box::new(store), unix_millis());
    for addr in profile.seed_addrs() {
        node.add_candidate(addr, CandidateSource::SeedConfig);
    }

    let endpoint = UdpEndpoint::bind(&profile.listen_host, listen_port)
        .await
        .with_context(|| format!("failed to bind {}:{listen_port}", profile.listen_host))?;
    info!(addr = %endpoint.local_addr()?, nick = %profile.nick, "node up");

    node.announce(unix_millis());
    flush(&mut node, &endpoint).await;

    let mut buf = vec![0u8; RECV_BUFFER_BYTES];
    let mut tick = tokio::time::interval(Duration::from_millis(TICK_MS));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            received = endpoint.recv(&mut buf) => {
                match received {
                    Ok((len, from)) => node.handle_datagram(&buf[..len], from, unix_millis()),
                    Err(err) => tracing::warn!(%err, "udp recv failed"),
                }
            }
            _ = tick.tick() => {
                node.tick(unix_millis());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
        flush(&mut node, &endpoint).await;
    }

    // In-flight retransmit state is discarded on shutdown; the store's
    // persistence is its own concern.
    let metrics = node.metrics(unix_millis());
    info!(
        peers = metrics.peer_count,
        events_seen = metrics.events_seen,
        "node down"
    );
    Ok(())
}

async fn flush(node: &mut MeshNode, endpoint: &UdpEndpoint) {
    for outgoing in node.drain_outbound() {
        endpoint.send(&outgoing).await;
    }
    for event in node.drain_events() {
        info!(?event, "node event");
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
