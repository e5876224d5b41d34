//! AppSync: GraphQL data sources and resolvers for the GraphQL-API
//! first-order enricher.

use crate::clients::tps;
use crate::error::ProviderError;
use crate::paginate::{Page, Paginator};
use crate::throttle::Throttler;

#[derive(Debug, Clone)]
pub struct DataSource {
    pub name: String,
    pub data_source_arn: String,
}

#[derive(Debug, Clone)]
pub struct Resolver {
    pub type_name: String,
    pub field_name: String,
    pub data_source_name: Option<String>,
}

pub struct AppSyncClient {
    inner: aws_sdk_appsync::Client,
    throttler: Throttler,
}

impl AppSyncClient {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_appsync::Client::new(config),
            throttler,
        }
    }

    pub async fn list_data_sources(
        &self,
        api_id: &str,
        identity: &str,
        region: &str,
    ) -> Result<Vec<DataSource>, ProviderError> {
        let inner = &self.inner;
        let paginator = Paginator::new(
            |token| async move {
                let resp = inner
                    .list_data_sources()
                    .api_id(api_id)
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("ListDataSources", e))?;
                let items = resp
                    .data_sources()
                    .iter()
                    .map(|d| DataSource {
                        name: d.name().unwrap_or_default().to_string(),
                        data_source_arn: d.data_source_arn().unwrap_or_default().to_string(),
                    })
                    .collect();
                Ok(Page {
                    items,
                    next_token: resp.next_token().map(str::to_string),
                })
            },
            &self.throttler,
            "ListDataSources",
            identity,
            region,
            tps::APPSYNC_LIST,
        );
        paginator.collect_all().await
    }

    /// Resolvers for `type_name` (queried separately for `Query` and
    /// `Mutation` per the spec's enricher).
    pub async fn list_resolvers(
        &self,
        api_id: &str,
        type_name: &str,
        identity: &str,
        region: &str,
    ) -> Result<Vec<Resolver>, ProviderError> {
        let inner = &self.inner;
        let paginator = Paginator::new(
            |token| async move {
                let resp = inner
                    .list_resolvers()
                    .api_id(api_id)
                    .type_name(type_name)
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("ListResolvers", e))?;
                let items = resp
                    .resolvers()
                    .iter()
                    .map(|r| Resolver {
                        type_name: r.type_name().unwrap_or_default().to_string(),
                        field_name: r.field_name().unwrap_or_default().to_string(),
                        data_source_name: r.data_source_name().map(str::to_string),
                    })
                    .collect();
                Ok(Page {
                    items,
                    next_token: resp.next_token().map(str::to_string),
                })
            },
            &self.throttler,
            "ListResolvers",
            identity,
            region,
            tps::APPSYNC_LIST,
        );
        paginator.collect_all().await
    }
}
