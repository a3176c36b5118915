//! ECS OpenAPI response shapes (only the fields we read).

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}

// ── DescribeInstanceTypes ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DescribeInstanceTypesResponse {
    pub instance_types: InstanceTypes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct InstanceTypes {
    #[serde(default)]
    pub instance_type: Vec<InstanceType>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct InstanceType {
    pub instance_type_id: String,
    #[serde(default)]
    pub cpu_core_count: u32,
    #[serde(default)]
    pub memory_size: f64,
}

// ── DescribeAvailableResource ───────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DescribeAvailableResourceResponse {
    #[serde(default)]
    pub available_zones: AvailableZones,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AvailableZones {
    #[serde(default)]
    pub available_zone: Vec<AvailableZone>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AvailableZone {
    #[serde(default)]
    pub zone_id: String,
    #[serde(default)]
    pub available_resources: AvailableResources,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AvailableResources {
    #[serde(default)]
    pub available_resource: Vec<AvailableResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AvailableResource {
    #[serde(default)]
    pub supported_resources: SupportedResources,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SupportedResources {
    #[serde(default)]
    pub supported_resource: Vec<SupportedResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SupportedResource {
    pub value: String,
}

// ── DescribeSpotPriceHistory ────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DescribeSpotPriceHistoryResponse {
    #[serde(default)]
    pub spot_prices: SpotPrices,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SpotPrices {
    #[serde(default)]
    pub spot_price_type: Vec<SpotPriceType>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SpotPriceType {
    pub zone_id: String,
    pub timestamp: String,
    pub spot_price: f64,
    pub origin_price: f64,
}
