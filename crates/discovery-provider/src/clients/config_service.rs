//! AWS Config: the cross-account aggregator query `AggregatorReader` issues,
//! plus the recorder/delivery-channel probe `AccountResolver` uses to set
//! `isConfigEnabled`.

use crate::clients::tps;
use crate::error::ProviderError;
use crate::throttle::Throttler;

/// One row of the aggregator's advanced query result, still JSON-shaped —
/// `discovery-engine::aggregator_reader` is responsible for parsing this
/// into a `discovery_core::Resource`.
#[derive(Debug, Clone)]
pub struct AggregateResultItem {
    pub json: serde_json::Value,
}

pub struct ConfigServiceClient {
    inner: aws_sdk_config::Client,
    throttler: Throttler,
}

impl ConfigServiceClient {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_config::Client::new(config),
            throttler,
        }
    }

    /// Confirms `aggregator_name` exists and carries an
    /// `OrganizationAggregationSource`. Used once by the `Initializer` in
    /// organization mode.
    pub async fn validate_organization_aggregator(
        &self,
        aggregator_name: &str,
        identity: &str,
    ) -> Result<(), ProviderError> {
        self.throttler
            .acquire(
                "DescribeConfigurationAggregators",
                identity,
                "global",
                tps::CONFIG_DESCRIBE_AGGREGATOR,
            )
            .await;
        let resp = self
            .inner
            .describe_configuration_aggregators()
            .configuration_aggregator_names(aggregator_name)
            .send()
            .await
            .map_err(|e| ProviderError::sdk("DescribeConfigurationAggregators", e))?;

        let aggregator = resp
            .configuration_aggregators()
            .iter()
            .find(|a| a.configuration_aggregator_name() == Some(aggregator_name))
            .ok_or_else(|| ProviderError::AggregatorNotFound(aggregator_name.to_string()))?;

        if aggregator.organization_aggregation_source().is_none() {
            return Err(ProviderError::sdk(
                "DescribeConfigurationAggregators",
                format!("aggregator {aggregator_name} has no OrganizationAggregationSource"),
            ));
        }
        Ok(())
    }

    /// Issues the advanced aggregate query and accumulates every page.
    /// Retried on the aggregator-read schedule by the caller (see
    /// `crate::retry::aggregator_read_schedule`), since a failure here
    /// should not abandon the whole query after a single page.
    pub async fn select_aggregate_resource_config(
        &self,
        aggregator_name: &str,
        query: &str,
        identity: &str,
    ) -> Result<Vec<AggregateResultItem>, ProviderError> {
        let mut items = Vec::new();
        let mut token: Option<String> = None;
        loop {
            self.throttler
                .acquire(
                    "SelectAggregateResourceConfig",
                    identity,
                    "global",
                    tps::CONFIG_SELECT_RESOURCE_CONFIG,
                )
                .await;
            let resp = self
                .inner
                .select_aggregate_resource_config()
                .configuration_aggregator_name(aggregator_name)
                .expression(query)
                .set_next_token(token.clone())
                .send()
                .await
                .map_err(|e| ProviderError::sdk("SelectAggregateResourceConfig", e))?;

            for row in resp.results() {
                let parsed: serde_json::Value = serde_json::from_str(row)?;
                items.push(AggregateResultItem { json: parsed });
            }

            token = resp.next_token().map(str::to_string);
            if token.is_none() {
                break;
            }
        }
        Ok(items)
    }

    /// Per-region recorder/delivery-channel presence probe used to derive
    /// `isConfigEnabled`.
    pub async fn is_config_enabled(&self, identity: &str, region: &str) -> Result<bool, ProviderError> {
        self.throttler
            .acquire(
                "DescribeConfigurationRecorders",
                identity,
                region,
                tps::CONFIG_SELECT_RESOURCE_CONFIG,
            )
            .await;
        let recorders = self
            .inner
            .describe_configuration_recorders()
            .send()
            .await
            .map_err(|e| ProviderError::sdk("DescribeConfigurationRecorders", e))?;
        if recorders.configuration_recorders().is_empty() {
            return Ok(false);
        }

        self.throttler
            .acquire(
                "DescribeDeliveryChannels",
                identity,
                region,
                tps::CONFIG_SELECT_RESOURCE_CONFIG,
            )
            .await;
        let channels = self
            .inner
            .describe_delivery_channels()
            .send()
            .await
            .map_err(|e| ProviderError::sdk("DescribeDeliveryChannels", e))?;
        Ok(!channels.delivery_channels().is_empty())
    }
}
