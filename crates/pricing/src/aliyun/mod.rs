//! Alibaba Cloud ECS price source.
//!
//! One query costs two catalog calls (`DescribeInstanceTypes`,
//! `DescribeAvailableResource`) plus one `DescribeSpotPriceHistory` per
//! matching instance type, issued with bounded concurrency.

mod signing;
mod types;

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use spot_core::config::AliyunConfig;
use spot_core::{PriceGroup, PriceSample, ResourceQuery};

use crate::source::{PriceSource, SourceError};
use self::types::{
    ApiError, DescribeAvailableResourceResponse, DescribeInstanceTypesResponse,
    DescribeSpotPriceHistoryResponse, InstanceType, SpotPriceType,
};

const ECS_ENDPOINT_TEMPLATE: &str = "ecs.{region}.aliyuncs.com";
const ECS_API_VERSION: &str = "2014-05-26";
const TIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%SZ";
const DEFAULT_CONCURRENCY: usize = 8;

/// [`PriceSource`] backed by the ECS OpenAPI.
pub struct AliyunPriceSource {
    access_key_id: String,
    access_key_secret: String,
    /// Host or base URL override; regional endpoint when `None`.
    endpoint: Option<String>,
    concurrency: usize,
    client: reqwest::Client,
}

impl AliyunPriceSource {
    pub fn new(
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            endpoint: None,
            concurrency: DEFAULT_CONCURRENCY,
            client,
        })
    }

    /// Build from process config. Missing credentials are a config error.
    pub fn from_config(config: &AliyunConfig) -> Result<Self, SourceError> {
        let (Some(id), Some(secret)) = (&config.access_key_id, &config.access_key_secret) else {
            return Err(SourceError::Config(
                "ALIYUN_ACCESS_KEY_ID and ALIYUN_ACCESS_KEY_SECRET must be set".to_string(),
            ));
        };
        let mut source = Self::new(id.clone(), secret.clone())?;
        source.endpoint = config.endpoint.clone();
        Ok(source)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn base_url(&self, region: &str) -> String {
        match &self.endpoint {
            Some(e) if e.starts_with("http://") || e.starts_with("https://") => {
                e.trim_end_matches('/').to_string()
            }
            Some(e) => format!("https://{}", e),
            None => format!("https://{}", ECS_ENDPOINT_TEMPLATE.replace("{region}", region)),
        }
    }

    /// Signed GET against the regional ECS endpoint.
    async fn call<T: DeserializeOwned>(
        &self,
        region: &str,
        action: &str,
        extra_params: BTreeMap<String, String>,
    ) -> Result<T, SourceError> {
        let mut params = BTreeMap::new();
        params.insert("Format".to_string(), "JSON".to_string());
        params.insert("Version".to_string(), ECS_API_VERSION.to_string());
        params.insert("AccessKeyId".to_string(), self.access_key_id.clone());
        params.insert("SignatureMethod".to_string(), "HMAC-SHA1".to_string());
        params.insert("Timestamp".to_string(), Utc::now().format(TIME_LAYOUT).to_string());
        params.insert("SignatureVersion".to_string(), "1.0".to_string());
        params.insert("SignatureNonce".to_string(), uuid::Uuid::new_v4().to_string());
        params.insert("Action".to_string(), action.to_string());
        params.insert("RegionId".to_string(), region.to_string());
        params.extend(extra_params);

        let signature = signing::sign(&self.access_key_secret, &params)?;
        params.insert("Signature".to_string(), signature);

        let url = format!("{}/?{}", self.base_url(region), signing::canonical_query(&params));
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiError>(&body) {
                Ok(err) => SourceError::Api {
                    code: err.code,
                    message: err.message,
                },
                Err(_) => SourceError::Api {
                    code: status.as_u16().to_string(),
                    message: body,
                },
            });
        }

        debug!(action, region, bytes = body.len(), "ECS API call succeeded");
        serde_json::from_str(&body).map_err(|e| SourceError::Decode(format!("{action}: {e}")))
    }

    /// Instance types that can be bought as pay-as-you-go spot in `region`.
    async fn spot_capable_types(&self, region: &str) -> Result<Vec<InstanceType>, SourceError> {
        let types: DescribeInstanceTypesResponse = self
            .call(region, "DescribeInstanceTypes", BTreeMap::new())
            .await?;

        let mut params = BTreeMap::new();
        params.insert("DestinationResource".to_string(), "InstanceType".to_string());
        params.insert("InstanceChargeType".to_string(), "PostPaid".to_string());
        params.insert("SpotStrategy".to_string(), "SpotWithPriceLimit".to_string());
        let available: DescribeAvailableResourceResponse = self
            .call(region, "DescribeAvailableResource", params)
            .await?;

        let supported = supported_type_ids(&available);
        let all = types.instance_types.instance_type;
        info!(
            region,
            total = all.len(),
            spot_capable = supported.len(),
            "loaded instance type catalog"
        );
        Ok(all
            .into_iter()
            .filter(|t| supported.contains(&t.instance_type_id))
            .collect())
    }

    async fn price_history(
        &self,
        region: &str,
        instance_type_id: &str,
        start: DateTime<Utc>,
    ) -> Result<Vec<SpotPriceType>, SourceError> {
        let mut params = BTreeMap::new();
        params.insert("NetworkType".to_string(), "vpc".to_string());
        params.insert("InstanceType".to_string(), instance_type_id.to_string());
        params.insert("IoOptimized".to_string(), "optimized".to_string());
        params.insert("StartTime".to_string(), start.format(TIME_LAYOUT).to_string());
        let resp: DescribeSpotPriceHistoryResponse = self
            .call(region, "DescribeSpotPriceHistory", params)
            .await?;
        Ok(resp.spot_prices.spot_price_type)
    }
}

#[async_trait::async_trait]
impl PriceSource for AliyunPriceSource {
    async fn query(&self, query: &ResourceQuery) -> Result<Vec<PriceGroup>, SourceError> {
        let region = query.region.as_str();
        let candidates = select_instance_types(self.spot_capable_types(region).await?, query);
        info!(region, candidates = candidates.len(), "filtered instance types");
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let start = Utc::now() - chrono::Duration::days(i64::from(query.resolution));
        let total = candidates.len();
        let results: Vec<(InstanceType, Result<Vec<SpotPriceType>, SourceError>)> =
            stream::iter(candidates)
                .map(|it| async move {
                    let history = self.price_history(region, &it.instance_type_id, start).await;
                    (it, history)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut groups = Vec::new();
        let mut failures = 0usize;
        let mut last_error = None;
        for (it, history) in results {
            match history {
                Ok(history) => groups.extend(group_history(&it, history)),
                Err(e) => {
                    warn!(instance_type = %it.instance_type_id, error = %e, "price history fetch failed");
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        if failures == total {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        info!(region, groups = groups.len(), failures, "fetched spot price history");
        Ok(groups)
    }

    fn name(&self) -> &str {
        "aliyun"
    }
}

fn supported_type_ids(resp: &DescribeAvailableResourceResponse) -> HashSet<String> {
    resp.available_zones
        .available_zone
        .iter()
        .flat_map(|z| z.available_resources.available_resource.iter())
        .flat_map(|r| r.supported_resources.supported_resource.iter())
        .map(|s| s.value.clone())
        .collect()
}

/// Apply shape and family constraints; sorted by id for a stable fetch order.
fn select_instance_types(types: Vec<InstanceType>, query: &ResourceQuery) -> Vec<InstanceType> {
    let mut selected: Vec<InstanceType> = types
        .into_iter()
        .filter(|t| query.matches_shape(t.cpu_core_count, t.memory_size))
        .filter(|t| query.matches_family(&t.instance_type_id))
        .collect();
    selected.sort_by(|a, b| a.instance_type_id.cmp(&b.instance_type_id));
    selected
}

/// Split one type's history by zone, keeping API order within each zone.
fn group_history(it: &InstanceType, history: Vec<SpotPriceType>) -> Vec<PriceGroup> {
    let mut by_zone: BTreeMap<String, Vec<PriceSample>> = BTreeMap::new();
    for entry in history {
        let timestamp = match DateTime::parse_from_rfc3339(&entry.timestamp) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                warn!(
                    instance_type = %it.instance_type_id,
                    zone = %entry.zone_id,
                    timestamp = %entry.timestamp,
                    error = %e,
                    "skipping sample with unparsable timestamp"
                );
                continue;
            }
        };
        by_zone.entry(entry.zone_id).or_default().push(PriceSample {
            timestamp,
            spot_price: entry.spot_price,
            origin_price: entry.origin_price,
        });
    }

    by_zone
        .into_iter()
        .map(|(zone_id, samples)| PriceGroup {
            instance_type_id: it.instance_type_id.clone(),
            zone_id,
            core_count: it.cpu_core_count,
            memory_gib: it.memory_size,
            samples,
        })
        .collect()
}
