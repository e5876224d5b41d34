//! EC2: network topology reads used by the relationship inferencer
//! (route tables, transit-gateway attachment ownership) and the Tier-A
//! spot-request batch handlers.

use crate::clients::tps;
use crate::error::ProviderError;
use crate::paginate::{Page, Paginator};
use crate::throttle::Throttler;

#[derive(Debug, Clone)]
pub struct SpotInstanceRequestRecord {
    pub spot_instance_request_id: String,
    pub instance_id: Option<String>,
    pub json: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct SpotFleetRequestRecord {
    pub spot_fleet_request_id: String,
    pub json: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct TransitGatewayAttachmentOwner {
    pub attachment_id: String,
    pub resource_owner_id: String,
}

pub struct Ec2Client {
    inner: aws_sdk_ec2::Client,
    throttler: Throttler,
}

impl Ec2Client {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_ec2::Client::new(config),
            throttler,
        }
    }

    pub async fn describe_spot_instance_requests(
        &self,
        identity: &str,
        region: &str,
    ) -> Result<Vec<SpotInstanceRequestRecord>, ProviderError> {
        let inner = &self.inner;
        let paginator = Paginator::new(
            |token| async move {
                let resp = inner
                    .describe_spot_instance_requests()
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("DescribeSpotInstanceRequests", e))?;
                let items = resp
                    .spot_instance_requests()
                    .iter()
                    .map(|r| SpotInstanceRequestRecord {
                        spot_instance_request_id: r.spot_instance_request_id().unwrap_or_default().to_string(),
                        instance_id: r.instance_id().map(str::to_string),
                        json: serde_json::Value::Null,
                    })
                    .collect();
                Ok(Page {
                    items,
                    next_token: resp.next_token().map(str::to_string),
                })
            },
            &self.throttler,
            "DescribeSpotInstanceRequests",
            identity,
            region,
            tps::EC2_DESCRIBE,
        );
        paginator.collect_all().await
    }

    pub async fn describe_spot_fleet_requests(
        &self,
        identity: &str,
        region: &str,
    ) -> Result<Vec<SpotFleetRequestRecord>, ProviderError> {
        let inner = &self.inner;
        let paginator = Paginator::new(
            |token| async move {
                let resp = inner
                    .describe_spot_fleet_requests()
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("DescribeSpotFleetRequests", e))?;
                let items = resp
                    .spot_fleet_request_configs()
                    .iter()
                    .map(|r| SpotFleetRequestRecord {
                        spot_fleet_request_id: r.spot_fleet_request_id().unwrap_or_default().to_string(),
                        json: serde_json::Value::Null,
                    })
                    .collect();
                Ok(Page {
                    items,
                    next_token: resp.next_token().map(str::to_string),
                })
            },
            &self.throttler,
            "DescribeSpotFleetRequests",
            identity,
            region,
            tps::EC2_DESCRIBE,
        );
        paginator.collect_all().await
    }

    /// Describes the instances launched by a spot-fleet request, identified
    /// by the `aws:ec2spot:fleet-request-id` tag — the aggregator surfaces
    /// spot fleets but not their membership.
    pub async fn describe_instances_by_fleet_tag(
        &self,
        fleet_request_id: &str,
        identity: &str,
        region: &str,
    ) -> Result<Vec<String>, ProviderError> {
        self.throttler
            .acquire("DescribeInstances", identity, region, tps::EC2_DESCRIBE)
            .await;
        let resp = self
            .inner
            .describe_instances()
            .filters(
                aws_sdk_ec2::types::Filter::builder()
                    .name("tag:aws:ec2spot:fleet-request-id")
                    .values(fleet_request_id)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| ProviderError::sdk("DescribeInstances", e))?;
        Ok(resp
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .filter_map(|i| i.instance_id())
            .map(str::to_string)
            .collect())
    }

    /// Looks up the owning account of each transit-gateway VPC attachment —
    /// the config aggregator's attachment record omits the owner, so Stage 1
    /// inference queries this directly.
    pub async fn describe_transit_gateway_vpc_attachment_owners(
        &self,
        attachment_ids: &[String],
        identity: &str,
        region: &str,
    ) -> Result<Vec<TransitGatewayAttachmentOwner>, ProviderError> {
        if attachment_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.throttler
            .acquire(
                "DescribeTransitGatewayVpcAttachments",
                identity,
                region,
                tps::EC2_DESCRIBE,
            )
            .await;
        let resp = self
            .inner
            .describe_transit_gateway_vpc_attachments()
            .set_transit_gateway_attachment_ids(Some(attachment_ids.to_vec()))
            .send()
            .await
            .map_err(|e| ProviderError::sdk("DescribeTransitGatewayVpcAttachments", e))?;
        Ok(resp
            .transit_gateway_vpc_attachments()
            .iter()
            .map(|a| TransitGatewayAttachmentOwner {
                attachment_id: a.transit_gateway_attachment_id().unwrap_or_default().to_string(),
                resource_owner_id: a.vpc_owner_id().unwrap_or_default().to_string(),
            })
            .collect())
    }
}
