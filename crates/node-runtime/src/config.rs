//! Profile, policy, and identity.
//!
//! The profile is per-node (who am I, where do I listen, which shard); the
//! policy document is per-deployment and must agree across a shard for
//! nodes to interoperate. Both are plain JSON files read once at startup.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use shared_crypto::{derive_peer_id, ShardKey};
use shared_types::{MeshPolicy, PeerId, ShardId};
use sm_02_reliability::ReliabilityConfig;
use sm_03_peer_table::PeerTableConfig;
use sm_04_gossip::{FanoutPolicy, GossipConfig};
use sm_06_snapshot::ReconcileConfig;

/// File name of the policy document, looked up in the data directory.
pub const POLICY_FILE: &str = "starmesh_policy.json";
/// File name of the node profile.
pub const PROFILE_FILE: &str = "profile.json";

/// Every node of a shard must generate the same number of sectors.
pub const DEFAULT_SECTOR_COUNT: u32 = 96;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid profile or policy: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("policy rejected: {0}")]
    Policy(#[from] shared_types::PolicyError),
    #[error("bad key material: {0}")]
    Crypto(#[from] shared_crypto::CryptoError),
    #[error("invalid listen address '{0}', expected host:port")]
    BadListen(String),
}

/// The per-node profile, stored under the home directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub nick: String,
    #[serde(default = "default_listen_host")]
    pub listen_host: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default = "default_shard")]
    pub shard: String,
    #[serde(default)]
    pub seed_peers: Vec<String>,
    /// Private node secret (hex). Generated on `init`.
    #[serde(default)]
    pub secret: String,
    /// Explicit shard auth key (hex). Empty means derive from shard+epoch.
    #[serde(default)]
    pub shard_key: String,
    #[serde(default)]
    pub bootstrap_url: String,
    #[serde(default = "default_sector_count")]
    pub sector_count: u32,
    #[serde(default)]
    pub data_dir: String,
}

fn default_listen_host() -> String {
    "0.0.0.0".to_owned()
}

fn default_listen_port() -> u16 {
    39_000
}

fn default_shard() -> String {
    "alpha".to_owned()
}

fn default_sector_count() -> u32 {
    DEFAULT_SECTOR_COUNT
}

impl Profile {
    /// A fresh profile with a random secret.
    pub fn create(nick: String, listen: (String, u16), shard: String) -> Self {
        Self {
            nick,
            listen_host: listen.0,
            listen_port: listen.1,
            shard,
            seed_peers: Vec::new(),
            secret: generate_secret_hex(),
            shard_key: String::new(),
            bootstrap_url: String::new(),
            sector_count: DEFAULT_SECTOR_COUNT,
            data_dir: String::new(),
        }
    }

    pub fn load(home: &Path) -> Result<Self, ConfigError> {
        let path = home.join(PROFILE_FILE);
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let mut profile: Profile = serde_json::from_str(&text)?;
        if profile.secret.is_empty() {
            profile.secret = generate_secret_hex();
        }
        if profile.data_dir.is_empty() {
            profile.data_dir = home.display().to_string();
        }
        Ok(profile)
    }

    pub fn save(&self, home: &Path) -> Result<PathBuf, ConfigError> {
        fs::create_dir_all(home).map_err(|source| ConfigError::Io {
            path: home.to_path_buf(),
            source,
        })?;
        let path = home.join(PROFILE_FILE);
        let text = serde_json::to_string_pretty(self)?;
        fs::write(&path, text).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Parsed seed peer addresses; unparseable entries are skipped.
    pub fn seed_addrs(&self) -> Vec<SocketAddr> {
        self.seed_peers
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect()
    }
}

/// The node home directory: `$STARMESH_HOME` or `~/.starmesh`.
pub fn starmesh_home() -> PathBuf {
    if let Ok(root) = std::env::var("STARMESH_HOME") {
        return PathBuf::from(root);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_owned());
    Path::new(&home).join(".starmesh")
}

/// Parse a `host:port` listen spec.
pub fn parse_listen(value: &str) -> Result<(String, u16), ConfigError> {
    let (host, port) = value
        .rsplit_once(':')
        .ok_or_else(|| ConfigError::BadListen(value.to_owned()))?;
    let port: u16 = port
        .parse()
        .map_err(|_| ConfigError::BadListen(value.to_owned()))?;
    Ok((host.to_owned(), port))
}

/// Load the policy document from the data dir, falling back to defaults.
pub fn load_policy(data_dir: &Path) -> Result<MeshPolicy, ConfigError> {
    let path = data_dir.join(POLICY_FILE);
    if path.exists() {
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let policy = MeshPolicy::from_json(&text)?;
        info!(policy_hash = %policy.policy_hash, path = %path.display(), "policy loaded");
        Ok(policy)
    } else {
        let policy = MeshPolicy::default();
        info!(policy_hash = %policy.policy_hash, "using default policy");
        Ok(policy)
    }
}

fn generate_secret_hex() -> String {
    let mut secret = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    hex::encode(secret)
}

/// Everything the mesh node needs, assembled from profile + policy.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub peer_id: PeerId,
    pub nick: String,
    pub listen_port: u16,
    pub shard: ShardId,
    pub policy: MeshPolicy,
    pub sector_count: u32,
    pub reliability: ReliabilityConfig,
    pub peer_table: PeerTableConfig,
    pub gossip: GossipConfig,
    pub reconcile: ReconcileConfig,
    pub announce_interval_ms: u64,
    pub ping_interval_ms: u64,
    pub snapshot_interval_ms: u64,
}

impl NodeConfig {
    pub fn from_profile(profile: &Profile, policy: MeshPolicy) -> Result<(Self, ShardKey), ConfigError> {
        let peer_id = PeerId::new(derive_peer_id(&profile.secret)?);
        let shard = ShardId::new(profile.shard.clone(), policy.protocol_epoch);

        let key = if profile.shard_key.is_empty() {
            ShardKey::derive(&shard.name, shard.epoch, "")
        } else {
            ShardKey::from_hex(&profile.shard_key)?
        };

        let gossip = GossipConfig {
            max_event_hops: policy.max_event_hops,
            fanout: FanoutPolicy::Sqrt { min: 3 },
            ..GossipConfig::default()
        };

        Ok((
            Self {
                peer_id,
                nick: profile.nick.clone(),
                listen_port: profile.listen_port,
                shard,
                sector_count: profile.sector_count,
                gossip,
                reliability: ReliabilityConfig::default(),
                peer_table: PeerTableConfig::default(),
                reconcile: ReconcileConfig::default(),
                announce_interval_ms: 8_000,
                ping_interval_ms: 15_000,
                snapshot_interval_ms: 11_000,
                policy,
            },
            key,
        ))
    }
}
