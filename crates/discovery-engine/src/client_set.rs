//! Builds the per-account, per-region bundle of provider adapters a crawl
//! needs, from one assumed-role credential set.
//!
//! Grounded on `claria-provisioner::account_setup::validate_new_credentials`,
//! which builds a temporary `aws_config::SdkConfig` from freshly minted
//! access keys the same way — `aws_config::defaults(..).credentials_provider(
//! aws_sdk_sts::config::Credentials::new(..))`. Here the keys come from an
//! `AssumeRole` call rather than a freshly created IAM user, and one config
//! backs every per-service adapter in `discovery_provider::clients` instead
//! of a single validation probe.

use discovery_provider::clients::apigateway::ApiGatewayClient;
use discovery_provider::clients::appregistry::AppRegistryClient;
use discovery_provider::clients::appsync::AppSyncClient;
use discovery_provider::clients::config_service::ConfigServiceClient;
use discovery_provider::clients::dynamodb::DynamoDbClient;
use discovery_provider::clients::ec2::Ec2Client;
use discovery_provider::clients::ecs::EcsClient;
use discovery_provider::clients::eks::EksClient;
use discovery_provider::clients::elbv2::Elbv2Client;
use discovery_provider::clients::iam::IamClient;
use discovery_provider::clients::lambda::LambdaClient;
use discovery_provider::clients::mediaconnect::MediaConnectClient;
use discovery_provider::clients::opensearch::OpenSearchClient;
use discovery_provider::clients::sns::SnsClient;
use discovery_provider::clients::sts::AssumedCredentials;
use discovery_provider::Throttler;

/// Every per-service adapter the enrichment pipeline and relationship
/// inferencer need for one `(account, region)` pair, sharing one
/// `Throttler` so the spec's per-principal bucket memoization (§4.1)
/// actually takes effect across adapters.
pub struct ClientSet {
    pub apigateway: ApiGatewayClient,
    pub appregistry: AppRegistryClient,
    pub appsync: AppSyncClient,
    pub config_service: ConfigServiceClient,
    pub dynamodb: DynamoDbClient,
    pub ec2: Ec2Client,
    pub ecs: EcsClient,
    pub eks: EksClient,
    pub elbv2: Elbv2Client,
    pub iam: IamClient,
    pub lambda: LambdaClient,
    pub mediaconnect: MediaConnectClient,
    pub opensearch: OpenSearchClient,
    pub sns: SnsClient,
    pub identity: String,
    pub region: String,
}

/// Builds an `aws_config::SdkConfig` scoped to `region` from a set of
/// assumed-role credentials and a custom user agent (§6's
/// `customUserAgent`, attached to every provider call).
pub async fn sdk_config_for(
    region: &str,
    credentials: &AssumedCredentials,
    custom_user_agent: &str,
) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .credentials_provider(aws_sdk_sts::config::Credentials::new(
            &credentials.access_key_id,
            &credentials.secret_access_key,
            Some(credentials.session_token.clone()),
            None,
            "discovery-crawl",
        ))
        .app_name(
            aws_config::AppName::new(custom_user_agent.to_string())
                .unwrap_or_else(|_| aws_config::AppName::new("discovery-process").unwrap()),
        )
        .load()
        .await
}

impl ClientSet {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler, identity: &str, region: &str) -> Self {
        Self {
            apigateway: ApiGatewayClient::new(config, throttler.clone()),
            appregistry: AppRegistryClient::new(config, throttler.clone()),
            appsync: AppSyncClient::new(config, throttler.clone()),
            config_service: ConfigServiceClient::new(config, throttler.clone()),
            dynamodb: DynamoDbClient::new(config, throttler.clone()),
            ec2: Ec2Client::new(config, throttler.clone()),
            ecs: EcsClient::new(config, throttler.clone()),
            eks: EksClient::new(config, throttler.clone()),
            elbv2: Elbv2Client::new(config, throttler.clone()),
            iam: IamClient::new(config, throttler.clone()),
            lambda: LambdaClient::new(config, throttler.clone()),
            mediaconnect: MediaConnectClient::new(config, throttler.clone()),
            opensearch: OpenSearchClient::new(config, throttler.clone()),
            sns: SnsClient::new(config, throttler),
            identity: identity.to_string(),
            region: region.to_string(),
        }
    }
}
