//! SNS: subscription listing for the `snsSubscriptions` Stage-1 batch
//! inference handler.

use crate::clients::tps;
use crate::error::ProviderError;
use crate::paginate::{Page, Paginator};
use crate::throttle::Throttler;

#[derive(Debug, Clone)]
pub struct Subscription {
    pub subscription_arn: String,
    pub topic_arn: String,
    pub protocol: String,
    pub endpoint: Option<String>,
}

pub struct SnsClient {
    inner: aws_sdk_sns::Client,
    throttler: Throttler,
}

impl SnsClient {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_sns::Client::new(config),
            throttler,
        }
    }

    pub async fn list_subscriptions(
        &self,
        identity: &str,
        region: &str,
    ) -> Result<Vec<Subscription>, ProviderError> {
        let inner = &self.inner;
        let paginator = Paginator::new(
            |token| async move {
                let resp = inner
                    .list_subscriptions()
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("ListSubscriptions", e))?;
                let items = resp
                    .subscriptions()
                    .iter()
                    .map(|s| Subscription {
                        subscription_arn: s.subscription_arn().unwrap_or_default().to_string(),
                        topic_arn: s.topic_arn().unwrap_or_default().to_string(),
                        protocol: s.protocol().unwrap_or_default().to_string(),
                        endpoint: s.endpoint().map(str::to_string),
                    })
                    .collect();
                Ok(Page {
                    items,
                    next_token: resp.next_token().map(str::to_string),
                })
            },
            &self.throttler,
            "ListSubscriptions",
            identity,
            region,
            tps::SNS_LIST,
        );
        paginator.collect_all().await
    }
}
