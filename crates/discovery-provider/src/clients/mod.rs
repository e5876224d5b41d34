//! Typed adapters, one module per AWS service the engine talks to. Each
//! wraps a single SDK client behind a small set of methods returning
//! [`crate::ProviderError`], so `discovery-engine` never touches the SDK
//! crates directly.

pub mod apigateway;
pub mod appregistry;
pub mod appsync;
pub mod config_service;
pub mod dynamodb;
pub mod ec2;
pub mod ecs;
pub mod eks;
pub mod elbv2;
pub mod iam;
pub mod lambda;
pub mod mediaconnect;
pub mod opensearch;
pub mod organizations;
pub mod sns;
pub mod sts;

/// Per-operation `(limit, interval_ms)` throttle ceilings, reproduced from
/// the operation-class table: entries not named there fall back to a
/// conservative default rather than going unthrottled.
pub mod tps {
    pub const STS_ASSUME_ROLE: (u32, u64) = (20, 1000);
    pub const STS_GET_CALLER_IDENTITY: (u32, u64) = (20, 1000);
    pub const ORGANIZATIONS_LIST: (u32, u64) = (1, 1000);
    pub const CONFIG_SELECT_RESOURCE_CONFIG: (u32, u64) = (8, 1000);
    pub const CONFIG_BATCH_GET_AGGREGATE: (u32, u64) = (15, 1000);
    pub const CONFIG_DESCRIBE_AGGREGATOR: (u32, u64) = (10, 1000);
    pub const EC2_DESCRIBE: (u32, u64) = (20, 1000);
    pub const IAM_LIST: (u32, u64) = (10, 1000);
    pub const IAM_GET: (u32, u64) = (20, 1000);
    pub const ECS_LIST: (u32, u64) = (20, 1000);
    pub const ECS_DESCRIBE: (u32, u64) = (20, 1000);
    pub const EKS_LIST: (u32, u64) = (10, 1000);
    pub const EKS_DESCRIBE_NODEGROUP: (u32, u64) = (5, 1000);
    pub const LAMBDA_LIST: (u32, u64) = (10, 1000);
    pub const LAMBDA_GET: (u32, u64) = (15, 1000);
    pub const ELBV2_DESCRIBE: (u32, u64) = (10, 1000);
    pub const GATEWAY_PAGINATOR: (u32, u64) = (5, 2000);
    pub const GATEWAY_TOTAL_OPS: (u32, u64) = (10, 1000);
    pub const APPSYNC_LIST: (u32, u64) = (5, 1000);
    pub const MEDIACONNECT_LIST: (u32, u64) = (5, 1000);
    pub const OPENSEARCH_LIST: (u32, u64) = (10, 1000);
    pub const OPENSEARCH_DESCRIBE_DOMAINS: (u32, u64) = (5, 1000);
    pub const APPREGISTRY_LIST: (u32, u64) = (5, 1000);
    pub const SNS_LIST: (u32, u64) = (15, 1000);
    pub const DYNAMODB_DESCRIBE: (u32, u64) = (10, 1000);
    pub const DYNAMODB_STREAMS_DESCRIBE: (u32, u64) = (8, 1000);
}
