use std::net::SocketAddr;

/// Runtime configuration, read from the environment once at process start.
/// Pod identity in particular is captured here rather than looked up at
/// event-build time.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Instance identity stamped into every audit event, from `HOSTNAME`.
    pub pod_name: Option<String>,
    /// Whether a fault-injection regime is in effect for this instance.
    pub chaos_active: bool,
    pub bus_partitions: usize,
    pub bus_capacity: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is required"))?;

        let bind_addr = std::env::var("STOCKPILE_BIND_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

        let pod_name = std::env::var("HOSTNAME").ok().filter(|v| !v.is_empty());

        let chaos_active = std::env::var("STOCKPILE_CHAOS_ACTIVE")
            .is_ok_and(|v| truthy(&v));

        let bus_partitions = std::env::var("STOCKPILE_BUS_PARTITIONS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(stockpile_bus::DEFAULT_PARTITIONS)
            .clamp(1, 64);

        let bus_capacity = std::env::var("STOCKPILE_BUS_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(stockpile_bus::DEFAULT_CAPACITY)
            .clamp(1, 1_000_000);

        Ok(Self {
            database_url,
            bind_addr,
            pod_name,
            chaos_active,
            bus_partitions,
            bus_capacity,
        })
    }
}

fn truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_accepts_common_spellings() {
        for v in ["1", "true", "YES", " on "] {
            assert!(truthy(v), "{v:?} should be truthy");
        }
        for v in ["", "0", "false", "off", "maybe"] {
            assert!(!truthy(v), "{v:?} should not be truthy");
        }
    }
}
