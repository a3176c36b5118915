use clap::Parser;

use spot_core::ResourceQuery;

/// One-shot spot price ranking.
///
/// Queries Alibaba Cloud ECS spot price history for every instance type
/// matching the constraints and prints the cheapest offerings per core.
/// Credentials come from `ALIYUN_ACCESS_KEY_ID` / `ALIYUN_ACCESS_KEY_SECRET`.
#[derive(Parser, Debug)]
#[command(name = "spot-cli", about = "Rank Alibaba Cloud spot instance prices per core")]
pub struct CliArgs {
    /// Region to query, e.g. cn-hangzhou
    #[arg(long, env = "SPOT_REGION", default_value = "cn-hangzhou")]
    pub region: String,

    /// Minimum vCPU count
    #[arg(long, default_value = "4")]
    pub min_cpu: u32,

    /// Maximum vCPU count
    #[arg(long, default_value = "128")]
    pub max_cpu: u32,

    /// Minimum memory in GiB
    #[arg(long, default_value = "2")]
    pub min_memory: f64,

    /// Maximum memory in GiB
    #[arg(long, default_value = "64")]
    pub max_memory: f64,

    /// Comma-separated instance family prefixes (empty matches all)
    #[arg(long)]
    pub family: Option<String>,

    /// Discount at or below which a row is highlighted
    #[arg(long, default_value = "2")]
    pub cutoff: f64,

    /// Number of rows to print
    #[arg(long, default_value = "20")]
    pub limit: usize,

    /// Price history window in days
    #[arg(long, default_value = "7")]
    pub resolution: u32,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Config profile (overrides SPOT_PROFILE)
    #[arg(long)]
    pub profile: Option<String>,
}

impl CliArgs {
    pub fn to_query(&self) -> ResourceQuery {
        let defaults = ResourceQuery::default();
        ResourceQuery {
            region: self.region.clone(),
            cpu: self.min_cpu,
            memory: self.min_memory,
            max_cpu: self.max_cpu,
            max_memory: self.max_memory,
            family: self.family.clone().unwrap_or(defaults.family),
            cutoff: self.cutoff,
            limit: self.limit,
            resolution: self.resolution,
        }
    }
}
