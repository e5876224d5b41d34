//! API Gateway (REST APIs): path items, authorizers, and per-method
//! integration lookups used by the Gateway enrichers (Tier B, Tier C) and
//! the gateway-method hard-coded inference handler.
//!
//! This is the one adapter the spec calls out a two-level throttle for: a
//! per-account paginator ceiling and a tighter per-account total-ops
//! ceiling shared across every call this adapter makes.

use crate::clients::tps;
use crate::error::ProviderError;
use crate::throttle::Throttler;

#[derive(Debug, Clone)]
pub struct ResourceItem {
    pub id: String,
    pub path: String,
    pub resource_methods: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Authorizer {
    pub id: String,
    pub name: String,
    pub authorizer_uri: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MethodIntegration {
    pub http_method: String,
    pub integration_uri: Option<String>,
}

pub struct ApiGatewayClient {
    inner: aws_sdk_apigateway::Client,
    throttler: Throttler,
}

impl ApiGatewayClient {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_apigateway::Client::new(config),
            throttler,
        }
    }

    async fn acquire_paginator_slot(&self, identity: &str, region: &str) {
        self.throttler
            .acquire("GatewayPaginator", identity, region, tps::GATEWAY_PAGINATOR)
            .await;
    }

    async fn acquire_op_slot(&self, identity: &str, region: &str) {
        self.throttler
            .acquire("GatewayTotalOps", identity, region, tps::GATEWAY_TOTAL_OPS)
            .await;
    }

    pub async fn get_resources(
        &self,
        rest_api_id: &str,
        identity: &str,
        region: &str,
    ) -> Result<Vec<ResourceItem>, ProviderError> {
        let mut items = Vec::new();
        let mut position: Option<String> = None;
        loop {
            self.acquire_paginator_slot(identity, region).await;
            self.acquire_op_slot(identity, region).await;
            let resp = self
                .inner
                .get_resources()
                .rest_api_id(rest_api_id)
                .set_position(position.clone())
                .send()
                .await
                .map_err(|e| ProviderError::sdk("GetResources", e))?;
            items.extend(resp.items().iter().map(|r| ResourceItem {
                id: r.id().unwrap_or_default().to_string(),
                path: r.path().unwrap_or_default().to_string(),
                resource_methods: r
                    .resource_methods()
                    .map(|m| m.keys().cloned().collect())
                    .unwrap_or_default(),
            }));
            position = resp.position().map(str::to_string);
            if position.is_none() {
                break;
            }
        }
        Ok(items)
    }

    pub async fn get_authorizers(
        &self,
        rest_api_id: &str,
        identity: &str,
        region: &str,
    ) -> Result<Vec<Authorizer>, ProviderError> {
        self.acquire_op_slot(identity, region).await;
        let resp = self
            .inner
            .get_authorizers()
            .rest_api_id(rest_api_id)
            .send()
            .await
            .map_err(|e| ProviderError::sdk("GetAuthorizers", e))?;
        Ok(resp
            .items()
            .iter()
            .map(|a| Authorizer {
                id: a.id().unwrap_or_default().to_string(),
                name: a.name().unwrap_or_default().to_string(),
                authorizer_uri: a.authorizer_uri().map(str::to_string),
            })
            .collect())
    }

    /// Fetches a single method's integration, ignoring `NotFound` — Tier C
    /// attempts GET/POST/PUT/DELETE for every path item and treats a missing
    /// method as expected, not an error.
    pub async fn try_get_method_integration(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        identity: &str,
        region: &str,
    ) -> Result<Option<MethodIntegration>, ProviderError> {
        self.acquire_op_slot(identity, region).await;
        let resp = self
            .inner
            .get_method()
            .rest_api_id(rest_api_id)
            .resource_id(resource_id)
            .http_method(http_method)
            .send()
            .await;
        let resp = match resp {
            Ok(resp) => resp,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(ProviderError::sdk("GetMethod", e)),
        };
        Ok(Some(MethodIntegration {
            http_method: http_method.to_string(),
            integration_uri: resp.method_integration().and_then(|i| i.uri()).map(str::to_string),
        }))
    }
}

fn is_not_found<E: std::fmt::Display>(err: &E) -> bool {
    err.to_string().contains("NotFoundException")
}
