//! MediaConnect: flow listing for the Tier-A media-flow batch handler.

use crate::clients::tps;
use crate::error::ProviderError;
use crate::paginate::{Page, Paginator};
use crate::throttle::Throttler;

#[derive(Debug, Clone)]
pub struct FlowSummary {
    pub flow_arn: String,
    pub name: String,
}

pub struct MediaConnectClient {
    inner: aws_sdk_mediaconnect::Client,
    throttler: Throttler,
}

impl MediaConnectClient {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_mediaconnect::Client::new(config),
            throttler,
        }
    }

    pub async fn list_flows(&self, identity: &str, region: &str) -> Result<Vec<FlowSummary>, ProviderError> {
        let inner = &self.inner;
        let paginator = Paginator::new(
            |token| async move {
                let resp = inner
                    .list_flows()
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("ListFlows", e))?;
                let items = resp
                    .flows()
                    .iter()
                    .map(|f| FlowSummary {
                        flow_arn: f.flow_arn().unwrap_or_default().to_string(),
                        name: f.name().unwrap_or_default().to_string(),
                    })
                    .collect();
                Ok(Page {
                    items,
                    next_token: resp.next_token().map(str::to_string),
                })
            },
            &self.throttler,
            "ListFlows",
            identity,
            region,
            tps::MEDIACONNECT_LIST,
        );
        paginator.collect_all().await
    }
}
