//! Spot price sources.
//!
//! This crate provides:
//! - `PriceSource` trait consumed by the alarm pipeline
//! - Alibaba Cloud ECS implementation with ACS v1 request signing

pub mod aliyun;
pub mod source;

pub use aliyun::AliyunPriceSource;
pub use source::{PriceSource, SourceError};
