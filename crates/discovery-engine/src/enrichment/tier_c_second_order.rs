//! Tier C — SecondOrderEnrichers: handlers that only run over Tier-B's own
//! output (concurrency 10), since they enrich resources no earlier tier
//! produced.

use futures::stream::{self, StreamExt};

use discovery_core::relationship::Relationship;
use discovery_core::resource::Resource;

use crate::client_set::ClientSet;
use crate::enrichment::HandlerFailure;

const CONCURRENCY: usize = 10;
const HANDLER_GATEWAY_METHODS: &str = "gateway_path_item_methods";
const ATTEMPTED_METHODS: [&str; 4] = ["GET", "POST", "PUT", "DELETE"];

#[derive(Default)]
pub struct TierCOutput {
    pub resources: Vec<Resource>,
    pub failures: Vec<HandlerFailure>,
}

/// Runs the gateway-method handler over every `AWS::ApiGateway::Resource`
/// Tier B produced for this `(account, region)`.
pub async fn run(clients: &ClientSet, account_id: &str, tier_b_resources: &[Resource]) -> TierCOutput {
    let path_items: Vec<&Resource> = tier_b_resources
        .iter()
        .filter(|r| r.resource_type == "AWS::ApiGateway::Resource" && r.account_id == account_id && r.region == clients.region)
        .collect();

    let results: Vec<(Vec<Resource>, Vec<HandlerFailure>)> = stream::iter(path_items)
        .map(|item| gateway_path_item_methods(clients, account_id, item))
        .buffer_unordered(CONCURRENCY)
        .collect()
        .await;

    let mut out = TierCOutput::default();
    for (resources, failures) in results {
        out.resources.extend(resources);
        out.failures.extend(failures);
    }
    out
}

/// Attempts GET/POST/PUT/DELETE for every path item; a per-method
/// `NotFound` is expected, not an error. Each method found is
/// `CONTAINED_IN` its parent path item.
async fn gateway_path_item_methods(
    clients: &ClientSet,
    account_id: &str,
    path_item: &Resource,
) -> (Vec<Resource>, Vec<HandlerFailure>) {
    let Some(rest_api_id) = path_item.id.as_str().split("/resources/").next() else {
        return (Vec::new(), Vec::new());
    };

    let mut resources = Vec::new();
    let mut failures = Vec::new();
    for http_method in ATTEMPTED_METHODS {
        match clients
            .apigateway
            .try_get_method_integration(rest_api_id, &path_item.resource_id, http_method, &clients.identity, &clients.region)
            .await
        {
            Ok(Some(method)) => {
                let id = format!("{}/methods/{}", path_item.id, method.http_method);
                let mut resource = Resource::new(
                    id.clone(),
                    account_id,
                    clients.region.clone(),
                    "AWS::ApiGateway::Method",
                    method.http_method.clone(),
                );
                resource.configuration = serde_json::json!({ "integrationUri": method.integration_uri });
                resource
                    .relationships
                    .push(Relationship::new(id, "CONTAINED_IN", path_item.id.clone()));
                resources.push(resource);
            }
            Ok(None) => {}
            Err(err) => failures.push(HandlerFailure::new(HANDLER_GATEWAY_METHODS, account_id, &clients.region, err)),
        }
    }
    (resources, failures)
}
