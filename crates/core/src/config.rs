//! Configuration of a ring node.
use std::fs;
use std::io;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::consts::DEFAULT_MAX_HOPS;
use crate::consts::DEFAULT_MAX_SUCCESSORS;
use crate::consts::DEFAULT_REQUEST_TIMEOUT_MS;
use crate::consts::DEFAULT_RING_BITS;
use crate::consts::DEFAULT_STABILIZE_INTERVAL_MS;
use crate::dht::IdSpace;
use crate::error::Error;
use crate::error::Result;

/// Settings shared by every node of a ring. Nodes of one ring must agree on `ring_bits`.
///
/// Fields missing from a YAML document take their default value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DhtConfig {
    /// Ring size exponent `M`, the ring holds `2^M` ids.
    pub ring_bits: u8,
    /// Capacity of the successor list.
    pub max_successors: usize,
    /// Pause between two stabilization rounds.
    pub stabilize_interval_ms: u64,
    /// Lifetime of an outstanding request.
    pub request_timeout_ms: u64,
    /// Bound on the hops of a lookup.
    pub max_hops: usize,
}

impl Default for DhtConfig {
    fn default() -> Self {
        Self {
            ring_bits: DEFAULT_RING_BITS,
            max_successors: DEFAULT_MAX_SUCCESSORS,
            stabilize_interval_ms: DEFAULT_STABILIZE_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }
}

impl DhtConfig {
    /// Config for a ring of `2^ring_bits` ids, other fields default.
    pub fn with_ring_bits(ring_bits: u8) -> Self {
        Self {
            ring_bits,
            ..Default::default()
        }
    }

    /// Check every field is usable.
    pub fn validate(&self) -> Result<()> {
        IdSpace::new(self.ring_bits)?;
        if self.max_successors == 0 {
            return Err(Error::InvalidConfig(
                "max_successors must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        if self.max_hops == 0 {
            return Err(Error::InvalidConfig(
                "max_hops must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The id space described by `ring_bits`.
    pub fn space(&self) -> Result<IdSpace> {
        IdSpace::new(self.ring_bits)
    }

    /// Pause between two stabilization rounds.
    pub fn stabilize_interval(&self) -> Duration {
        Duration::from_millis(self.stabilize_interval_ms)
    }

    /// Lifetime of an outstanding request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn read_fs<P>(path: P) -> Result<Self>
    where P: AsRef<std::path::Path> {
        tracing::debug!("Read config from: {:?}", path.as_ref());
        let f = fs::File::open(path)?;
        let config: Self = serde_yaml::from_reader(io::BufReader::new(f))?;
        config.validate()?;
        Ok(config)
    }

    /// Write as YAML.
    pub fn write_fs<P>(&self, path: P) -> Result<()>
    where P: AsRef<std::path::Path> {
        let f = fs::File::create(path)?;
        serde_yaml::to_writer(io::BufWriter::new(f), self)?;
        Ok(())
    }
}
