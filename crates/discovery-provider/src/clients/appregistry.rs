//! Service Catalog AppRegistry: application listing for the Tier-A
//! application batch handler and the AppRegistry `contains` hard-coded
//! inference handler.

use crate::clients::tps;
use crate::error::ProviderError;
use crate::paginate::{Page, Paginator};
use crate::throttle::Throttler;

#[derive(Debug, Clone)]
pub struct ApplicationSummary {
    pub id: String,
    pub arn: String,
    pub name: String,
}

pub struct AppRegistryClient {
    inner: aws_sdk_servicecatalogappregistry::Client,
    throttler: Throttler,
}

impl AppRegistryClient {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_servicecatalogappregistry::Client::new(config),
            throttler,
        }
    }

    pub async fn list_applications(
        &self,
        identity: &str,
        region: &str,
    ) -> Result<Vec<ApplicationSummary>, ProviderError> {
        let inner = &self.inner;
        let paginator = Paginator::new(
            |token| async move {
                let resp = inner
                    .list_applications()
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("ListApplications", e))?;
                let items = resp
                    .applications()
                    .iter()
                    .map(|a| ApplicationSummary {
                        id: a.id().unwrap_or_default().to_string(),
                        arn: a.arn().unwrap_or_default().to_string(),
                        name: a.name().unwrap_or_default().to_string(),
                    })
                    .collect();
                Ok(Page {
                    items,
                    next_token: resp.next_token().map(str::to_string),
                })
            },
            &self.throttler,
            "ListApplications",
            identity,
            region,
            tps::APPREGISTRY_LIST,
        );
        paginator.collect_all().await
    }
}
