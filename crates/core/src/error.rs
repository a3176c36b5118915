use thiserror::Error;

/// A single price group could not be turned into an [`InstancePrice`](crate::InstancePrice).
///
/// Always item-local: the offending group is skipped and the rest of the
/// batch continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputeError {
    #[error("{key}: core count is zero")]
    ZeroCoreCount { key: String },

    #[error("{key}: origin price is zero")]
    ZeroOriginPrice { key: String },

    #[error("{key}: invalid {field} value {value}")]
    InvalidPrice {
        key: String,
        field: &'static str,
        value: f64,
    },
}
