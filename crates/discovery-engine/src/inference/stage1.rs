//! Stage 1 — batched inference, run once per `(account, region)` before
//! the per-resource stage 2 pass. Every handler runs independently; a
//! failure in one never stops the others (`Promise.allSettled` semantics
//! in the source), mirrored here by collecting each handler's own
//! `HandlerFailure`s rather than propagating an error out of `run`.

use std::collections::HashMap;

use futures::stream::{self, StreamExt};

use serde_json::Value;

use discovery_core::relationship::Relationship;
use discovery_core::resource::Resource;

use crate::client_set::ClientSet;
use crate::enrichment::HandlerFailure;

use super::lookup_maps::LookupMaps;

const FETCH_CONCURRENCY: usize = 10;

const HANDLER_EVENT_SOURCES: &str = "event_sources";
const HANDLER_FUNCTIONS: &str = "functions";
const HANDLER_SNS_SUBSCRIPTIONS: &str = "sns_subscriptions";
const HANDLER_TGW_ATTACHMENTS: &str = "transit_gateway_vpc_attachments";

const TRANSIT_GATEWAY_ATTACHMENT_TYPE: &str = "AWS::EC2::TransitGatewayAttachment";

/// Groups working-set indices by the `(accountId, region)` pair Stage 1
/// handlers iterate over.
pub fn group_indices_by_account_region(working_set: &[Resource]) -> HashMap<(String, String), Vec<usize>> {
    let mut groups: HashMap<(String, String), Vec<usize>> = HashMap::new();
    for (i, resource) in working_set.iter().enumerate() {
        groups
            .entry((resource.account_id.clone(), resource.region.clone()))
            .or_default()
            .push(i);
    }
    groups
}

/// Runs every Stage-1 handler for every `(account, region)` group that has
/// a live `ClientSet`, applying each handler's patches directly onto
/// `working_set` before moving to the next handler.
pub async fn run(
    working_set: &mut [Resource],
    clients_by_key: &HashMap<(String, String), ClientSet>,
    maps: &LookupMaps,
) -> Vec<HandlerFailure> {
    let mut failures = Vec::new();
    let groups = group_indices_by_account_region(working_set);

    for (key, indices) in &groups {
        let Some(clients) = clients_by_key.get(key) else { continue };

        let patches = event_sources(working_set, indices, clients, &mut failures).await;
        apply(working_set, patches);

        let patches = functions(working_set, indices, clients, maps, &mut failures).await;
        apply(working_set, patches);

        let patches = sns_subscriptions(working_set, indices, clients, &mut failures).await;
        apply(working_set, patches);

        let patches = transit_gateway_vpc_attachments(working_set, indices, clients, &mut failures).await;
        apply_tgw(working_set, patches);
    }

    failures
}

fn apply(working_set: &mut [Resource], patches: Vec<(usize, Vec<Relationship>)>) {
    for (index, relationships) in patches {
        working_set[index].relationships.extend(relationships);
    }
}

fn apply_tgw(working_set: &mut [Resource], patches: Vec<(usize, Vec<Relationship>, Option<String>)>) {
    for (index, relationships, owner_account_id) in patches {
        working_set[index].relationships.extend(relationships);
        if let Some(owner_account_id) = owner_account_id {
            merge_owner_account_id(&mut working_set[index].supplementary_configuration, owner_account_id);
        }
    }
}

/// Merges the owner account id the compute API's attachment-owner query
/// returned into the attachment's `supplementaryConfiguration`, since the
/// aggregator's own attachment record never carries it (§4.7).
fn merge_owner_account_id(supplementary: &mut Value, owner_account_id: String) {
    if !supplementary.is_object() {
        *supplementary = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(map) = supplementary {
        map.insert("OwnerAccountId".to_string(), Value::String(owner_account_id));
    }
}

/// For each function's event-source mappings, `lambda ASSOCIATED_WITH
/// source`.
async fn event_sources(
    working_set: &[Resource],
    indices: &[usize],
    clients: &ClientSet,
    failures: &mut Vec<HandlerFailure>,
) -> Vec<(usize, Vec<Relationship>)> {
    let functions: Vec<(usize, String, String)> = indices
        .iter()
        .filter(|&&i| working_set[i].resource_type == "AWS::Lambda::Function")
        .map(|&i| (i, working_set[i].id.as_str().to_string(), working_set[i].resource_id.clone()))
        .collect();

    let results = stream::iter(functions)
        .map(|(index, arn, name)| async move {
            let result = clients.lambda.list_event_source_mappings(&name, &clients.identity, &clients.region).await;
            (index, arn, result)
        })
        .buffer_unordered(FETCH_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    let mut patches = Vec::new();
    for (index, arn, result) in results {
        match result {
            Ok(sources) => {
                let relationships = sources
                    .into_iter()
                    .map(|source_arn| Relationship::new(arn.clone(), "ASSOCIATED_WITH", source_arn))
                    .collect();
                patches.push((index, relationships));
            }
            Err(err) => failures.push(HandlerFailure::new(
                HANDLER_EVENT_SOURCES,
                &working_set[index].account_id,
                &clients.region,
                err,
            )),
        }
    }
    patches
}

/// Resolves every function's environment-variable values via the
/// environment-variable inference rule and pushes the inferred edges onto
/// the function's own relationship list.
async fn functions(
    working_set: &[Resource],
    indices: &[usize],
    clients: &ClientSet,
    maps: &LookupMaps,
    failures: &mut Vec<HandlerFailure>,
) -> Vec<(usize, Vec<Relationship>)> {
    let known_ids: std::collections::HashSet<discovery_core::ids::ResourceId> =
        working_set.iter().map(|r| r.id.clone()).collect();

    let functions: Vec<(usize, String, String, String)> = indices
        .iter()
        .filter(|&&i| working_set[i].resource_type == "AWS::Lambda::Function")
        .map(|&i| {
            (
                i,
                working_set[i].id.as_str().to_string(),
                working_set[i].resource_id.clone(),
                working_set[i].account_id.clone(),
            )
        })
        .collect();

    let results = stream::iter(functions)
        .map(|(index, arn, name, account_id)| async move {
            let result = clients.lambda.get_function_configuration(&name, &clients.identity, &clients.region).await;
            (index, arn, account_id, result)
        })
        .buffer_unordered(FETCH_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    let mut patches = Vec::new();
    for (index, arn, account_id, result) in results {
        match result {
            Ok(config) => {
                let mut relationships = Vec::new();
                for value in config.environment.values() {
                    if let Some(target) = super::env_vars::resolve(value, &account_id, &clients.region, &known_ids, maps) {
                        relationships.push(Relationship::new(arn.clone(), "ASSOCIATED_WITH", target));
                    }
                }
                patches.push((index, relationships));
            }
            Err(err) => failures.push(HandlerFailure::new(HANDLER_FUNCTIONS, &account_id, &clients.region, err)),
        }
    }
    patches
}

/// For each subscription whose topic and endpoint are both known
/// resources, `topic ASSOCIATED_WITH endpoint`.
async fn sns_subscriptions(
    working_set: &[Resource],
    indices: &[usize],
    clients: &ClientSet,
    failures: &mut Vec<HandlerFailure>,
) -> Vec<(usize, Vec<Relationship>)> {
    let known_ids: std::collections::HashSet<discovery_core::ids::ResourceId> =
        working_set.iter().map(|r| r.id.clone()).collect();

    let topic_index: HashMap<String, usize> = indices
        .iter()
        .filter(|&&i| working_set[i].resource_type == "AWS::SNS::Topic")
        .map(|&i| (working_set[i].id.as_str().to_string(), i))
        .collect();

    if topic_index.is_empty() {
        return Vec::new();
    }

    let subscriptions = match clients.sns.list_subscriptions(&clients.identity, &clients.region).await {
        Ok(subs) => subs,
        Err(err) => {
            let account_id = indices.first().map(|&i| working_set[i].account_id.clone()).unwrap_or_default();
            failures.push(HandlerFailure::new(HANDLER_SNS_SUBSCRIPTIONS, &account_id, &clients.region, err));
            return Vec::new();
        }
    };

    let mut by_index: HashMap<usize, Vec<Relationship>> = HashMap::new();
    for subscription in subscriptions {
        let Some(&topic_idx) = topic_index.get(&subscription.topic_arn) else { continue };
        let Some(endpoint) = subscription.endpoint else { continue };
        if !known_ids.contains(&discovery_core::ids::ResourceId::new(endpoint.as_str())) {
            continue;
        }
        by_index
            .entry(topic_idx)
            .or_default()
            .push(Relationship::new(subscription.topic_arn, "ASSOCIATED_WITH", endpoint));
    }
    by_index.into_iter().collect()
}

/// Augments each region's transit-gateway VPC attachments with owner
/// information, then emits `attached-to` (gateway) and `associated-with`
/// (VPC, each attached subnet) edges.
async fn transit_gateway_vpc_attachments(
    working_set: &[Resource],
    indices: &[usize],
    clients: &ClientSet,
    failures: &mut Vec<HandlerFailure>,
) -> Vec<(usize, Vec<Relationship>, Option<String>)> {
    let attachments: Vec<(usize, String)> = indices
        .iter()
        .filter(|&&i| working_set[i].resource_type == TRANSIT_GATEWAY_ATTACHMENT_TYPE)
        .map(|&i| (i, working_set[i].resource_id.clone()))
        .collect();
    if attachments.is_empty() {
        return Vec::new();
    }

    let ids: Vec<String> = attachments.iter().map(|(_, id)| id.clone()).collect();
    let owners = match clients
        .ec2
        .describe_transit_gateway_vpc_attachment_owners(&ids, &clients.identity, &clients.region)
        .await
    {
        Ok(owners) => owners,
        Err(err) => {
            let account_id = indices.first().map(|&i| working_set[i].account_id.clone()).unwrap_or_default();
            failures.push(HandlerFailure::new(HANDLER_TGW_ATTACHMENTS, &account_id, &clients.region, err));
            return Vec::new();
        }
    };
    let owner_by_attachment: HashMap<String, String> =
        owners.into_iter().map(|o| (o.attachment_id, o.resource_owner_id)).collect();

    let mut patches = Vec::new();
    for (index, attachment_id) in attachments {
        let resource = &working_set[index];
        let mut relationships = Vec::new();
        if let Some(gateway_id) = resource.configuration.get("TransitGatewayId").and_then(|v| v.as_str()) {
            relationships.push(Relationship::new(resource.id.clone(), "ATTACHED_TO", gateway_id.to_string()));
        }
        if let Some(vpc_id) = resource.configuration.get("VpcId").and_then(|v| v.as_str()) {
            relationships.push(Relationship::new(resource.id.clone(), "ASSOCIATED_WITH", vpc_id.to_string()));
        }
        if let Some(subnets) = resource.configuration.get("SubnetIds").and_then(|v| v.as_array()) {
            for subnet in subnets.iter().filter_map(|v| v.as_str()) {
                relationships.push(Relationship::new(resource.id.clone(), "ASSOCIATED_WITH", subnet.to_string()));
            }
        }
        let owner_account_id = owner_by_attachment.get(&attachment_id).cloned();
        patches.push((index, relationships, owner_account_id));
    }
    patches
}
