//! Tier B — FirstOrderEnrichers: for every baseline resource whose type
//! has a registered handler, invoke it (concurrency 15). Dispatch is a
//! `match` over `resource_type`, the same shape
//! `claria-provisioner::build_syncers` uses to pick a syncer per resource
//! type, generalized here to one handler per enrichment rule instead of
//! one syncer per managed resource.

use futures::stream::{self, StreamExt};

use discovery_core::relationship::Relationship;
use discovery_core::resource::Resource;

use crate::client_set::ClientSet;
use crate::enrichment::HandlerFailure;

const CONCURRENCY: usize = 15;

const HANDLER_GATEWAY: &str = "gateway_rest_api";
const HANDLER_APPSYNC: &str = "appsync_graphql_api";
const HANDLER_TABLE: &str = "dynamodb_table";
const HANDLER_CONTAINER_SERVICE: &str = "ecs_service";
const HANDLER_CLUSTER: &str = "eks_cluster";
const HANDLER_IDENTITY: &str = "identity_inline_policies";

#[derive(Default)]
pub struct TierBOutput {
    pub resources: Vec<Resource>,
    pub failures: Vec<HandlerFailure>,
}

fn has_handler(resource_type: &str) -> bool {
    matches!(
        resource_type,
        "AWS::ApiGateway::RestApi"
            | "AWS::AppSync::GraphQLApi"
            | "AWS::DynamoDB::Table"
            | "AWS::ECS::Service"
            | "AWS::EKS::Cluster"
            | "AWS::IAM::Role"
            | "AWS::IAM::User"
    )
}

/// Runs every registered first-order handler over `baseline`, for
/// resources belonging to `account_id`/`clients.region`, at bounded
/// concurrency.
pub async fn run(clients: &ClientSet, account_id: &str, baseline: &[Resource]) -> TierBOutput {
    let candidates: Vec<&Resource> = baseline
        .iter()
        .filter(|r| r.account_id == account_id && r.region == clients.region && has_handler(&r.resource_type))
        .collect();

    let results: Vec<(Vec<Resource>, Vec<HandlerFailure>)> = stream::iter(candidates)
        .map(|resource| dispatch(clients, account_id, resource))
        .buffer_unordered(CONCURRENCY)
        .collect()
        .await;

    let mut out = TierBOutput::default();
    for (resources, failures) in results {
        out.resources.extend(resources);
        out.failures.extend(failures);
    }
    out
}

async fn dispatch(clients: &ClientSet, account_id: &str, resource: &Resource) -> (Vec<Resource>, Vec<HandlerFailure>) {
    match resource.resource_type.as_str() {
        "AWS::ApiGateway::RestApi" => gateway_rest_api(clients, account_id, resource).await,
        "AWS::AppSync::GraphQLApi" => appsync_graphql_api(clients, account_id, resource).await,
        "AWS::DynamoDB::Table" => dynamodb_table(clients, account_id, resource).await,
        "AWS::ECS::Service" => ecs_service(clients, account_id, resource).await,
        "AWS::EKS::Cluster" => eks_cluster(clients, account_id, resource).await,
        "AWS::IAM::Role" | "AWS::IAM::User" => identity_inline_policies(clients, account_id, resource).await,
        _ => (Vec::new(), Vec::new()),
    }
}

/// Emits path items (`AWS::ApiGateway::Resource`) and authorizers
/// (`AWS::ApiGateway::Authorizer`), each `CONTAINED_IN` the REST API;
/// authorizers also get `ASSOCIATED_WITH` their provider ARN (the Lambda
/// or Cognito user pool backing the authorizer).
async fn gateway_rest_api(clients: &ClientSet, account_id: &str, api: &Resource) -> (Vec<Resource>, Vec<HandlerFailure>) {
    let mut out = Vec::new();
    let mut failures = Vec::new();

    match clients.apigateway.get_resources(&api.resource_id, &clients.identity, &clients.region).await {
        Ok(items) => {
            for item in items {
                let id = format!("{}/resources/{}", api.id, item.id);
                let mut resource = Resource::new(
                    id.clone(),
                    account_id,
                    clients.region.clone(),
                    "AWS::ApiGateway::Resource",
                    item.id,
                )
                .with_name(item.path);
                resource.relationships.push(Relationship::new(id, "CONTAINED_IN", api.id.clone()));
                out.push(resource);
            }
        }
        Err(err) => failures.push(HandlerFailure::new(HANDLER_GATEWAY, account_id, &clients.region, err)),
    }

    match clients.apigateway.get_authorizers(&api.resource_id, &clients.identity, &clients.region).await {
        Ok(authorizers) => {
            for authorizer in authorizers {
                let id = format!("{}/authorizers/{}", api.id, authorizer.id);
                let mut resource = Resource::new(
                    id.clone(),
                    account_id,
                    clients.region.clone(),
                    "AWS::ApiGateway::Authorizer",
                    authorizer.id,
                )
                .with_name(authorizer.name);
                resource.relationships.push(Relationship::new(id.clone(), "CONTAINED_IN", api.id.clone()));
                if let Some(uri) = &authorizer.authorizer_uri {
                    if let Some(arn) = extract_arn_from_uri(uri) {
                        resource.relationships.push(Relationship::new(id, "ASSOCIATED_WITH", arn));
                    }
                }
                out.push(resource);
            }
        }
        Err(err) => failures.push(HandlerFailure::new(HANDLER_GATEWAY, account_id, &clients.region, err)),
    }

    (out, failures)
}

/// Emits data sources and resolvers for the `Query` and `Mutation` root
/// types. Each resolver is `CONTAINED_IN` the API and `ASSOCIATED_WITH`
/// its data source.
async fn appsync_graphql_api(clients: &ClientSet, account_id: &str, api: &Resource) -> (Vec<Resource>, Vec<HandlerFailure>) {
    let mut out = Vec::new();
    let mut failures = Vec::new();

    let data_sources = match clients.appsync.list_data_sources(&api.resource_id, &clients.identity, &clients.region).await {
        Ok(sources) => sources,
        Err(err) => {
            failures.push(HandlerFailure::new(HANDLER_APPSYNC, account_id, &clients.region, err));
            Vec::new()
        }
    };
    for source in &data_sources {
        let id = format!("{}/datasources/{}", api.id, source.name);
        out.push(
            Resource::new(id, account_id, clients.region.clone(), "AWS::AppSync::DataSource", source.name.clone())
                .with_name(source.name.clone()),
        );
    }

    for root_type in ["Query", "Mutation"] {
        match clients.appsync.list_resolvers(&api.resource_id, root_type, &clients.identity, &clients.region).await {
            Ok(resolvers) => {
                for resolver in resolvers {
                    let id = format!("{}/types/{}/resolvers/{}", api.id, resolver.type_name, resolver.field_name);
                    let mut resource = Resource::new(
                        id.clone(),
                        account_id,
                        clients.region.clone(),
                        "AWS::AppSync::Resolver",
                        resolver.field_name.clone(),
                    );
                    resource.relationships.push(Relationship::new(id.clone(), "CONTAINED_IN", api.id.clone()));
                    if let Some(source_name) = &resolver.data_source_name {
                        let source_id = format!("{}/datasources/{source_name}", api.id);
                        resource.relationships.push(Relationship::new(id, "ASSOCIATED_WITH", source_id));
                    }
                    out.push(resource);
                }
            }
            Err(err) => failures.push(HandlerFailure::new(HANDLER_APPSYNC, account_id, &clients.region, err)),
        }
    }

    (out, failures)
}

/// Emits the table's live stream as a resource, if one exists.
async fn dynamodb_table(clients: &ClientSet, account_id: &str, table: &Resource) -> (Vec<Resource>, Vec<HandlerFailure>) {
    match clients.dynamodb.describe_table_stream_arn(&table.resource_id, &clients.identity, &clients.region).await {
        Ok(Some(stream_arn)) => {
            let resource = Resource::new(
                stream_arn.clone(),
                account_id,
                clients.region.clone(),
                "AWS::DynamoDB::Stream",
                stream_arn,
            );
            (vec![resource], Vec::new())
        }
        Ok(None) => (Vec::new(), Vec::new()),
        Err(err) => (Vec::new(), vec![HandlerFailure::new(HANDLER_TABLE, account_id, &clients.region, err)]),
    }
}

/// Emits a task resource per running task, `ASSOCIATED_WITH` the service.
async fn ecs_service(clients: &ClientSet, account_id: &str, service: &Resource) -> (Vec<Resource>, Vec<HandlerFailure>) {
    let cluster_arn = service
        .configuration
        .get("clusterArn")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    match clients
        .ecs
        .list_tasks_for_service(cluster_arn, &service.resource_id, &clients.identity, &clients.region)
        .await
    {
        Ok(tasks) => {
            let resources = tasks
                .into_iter()
                .map(|t| {
                    let mut resource = Resource::new(
                        t.task_arn.clone(),
                        account_id,
                        clients.region.clone(),
                        "AWS::ECS::Task",
                        t.task_arn.clone(),
                    );
                    resource
                        .relationships
                        .push(Relationship::new(t.task_arn, "ASSOCIATED_WITH", service.id.clone()));
                    resource
                })
                .collect();
            (resources, Vec::new())
        }
        Err(err) => (
            Vec::new(),
            vec![HandlerFailure::new(HANDLER_CONTAINER_SERVICE, account_id, &clients.region, err)],
        ),
    }
}

/// Emits node groups, `CONTAINED_IN` the cluster.
async fn eks_cluster(clients: &ClientSet, account_id: &str, cluster: &Resource) -> (Vec<Resource>, Vec<HandlerFailure>) {
    match clients.eks.list_nodegroups(&cluster.resource_id, &clients.identity, &clients.region).await {
        Ok(names) => {
            let resources = names
                .into_iter()
                .map(|name| {
                    let id = format!("{}/node-group/{name}", cluster.id);
                    let mut resource =
                        Resource::new(id.clone(), account_id, clients.region.clone(), "AWS::EKS::NodeGroup", name.clone())
                            .with_name(name);
                    resource.relationships.push(Relationship::new(id, "CONTAINED_IN", cluster.id.clone()));
                    resource
                })
                .collect();
            (resources, Vec::new())
        }
        Err(err) => (Vec::new(), vec![HandlerFailure::new(HANDLER_CLUSTER, account_id, &clients.region, err)]),
    }
}

/// Emits one inline-policy resource per inline policy on the role/user,
/// `ASSOCIATED_WITH` the parent principal. Inline policies are global —
/// IAM has no region.
async fn identity_inline_policies(
    clients: &ClientSet,
    account_id: &str,
    principal: &Resource,
) -> (Vec<Resource>, Vec<HandlerFailure>) {
    let policies = if principal.resource_type == "AWS::IAM::Role" {
        clients.iam.list_role_inline_policies(&principal.resource_id, &clients.identity).await
    } else {
        clients.iam.list_user_inline_policies(&principal.resource_id, &clients.identity).await
    };
    match policies {
        Ok(policies) => {
            let resources = policies
                .into_iter()
                .map(|policy| {
                    let id = format!("{}/policy/{}", principal.id, policy.policy_name);
                    let mut resource = Resource::new(
                        id.clone(),
                        account_id,
                        discovery_core::constants::GLOBAL_REGION,
                        "AWS::IAM::InlinePolicy",
                        policy.policy_name.clone(),
                    )
                    .with_name(policy.policy_name);
                    resource.configuration = policy.document;
                    resource
                        .relationships
                        .push(Relationship::new(id, "ASSOCIATED_WITH", principal.id.clone()));
                    resource
                })
                .collect();
            (resources, Vec::new())
        }
        Err(err) => (Vec::new(), vec![HandlerFailure::new(HANDLER_IDENTITY, account_id, "global", err)]),
    }
}

/// Extracts the ARN embedded in an authorizer URI
/// (`arn:aws:apigateway:...:lambda:path/2015-03-31/functions/<arn>/invocations`)
/// or a bare Cognito user pool ARN.
fn extract_arn_from_uri(uri: &str) -> Option<String> {
    if let Some(start) = uri.find("functions/") {
        let rest = &uri[start + "functions/".len()..];
        return rest.split('/').next().map(str::to_string);
    }
    if uri.starts_with("arn:aws:cognito-idp:") {
        return Some(uri.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_lambda_arn_from_authorizer_uri() {
        let uri = "arn:aws:apigateway:us-east-1:lambda:path/2015-03-31/functions/arn:aws:lambda:us-east-1:111111111111:function:auth/invocations";
        assert_eq!(
            extract_arn_from_uri(uri),
            Some("arn:aws:lambda:us-east-1:111111111111:function:auth".to_string())
        );
    }

    #[test]
    fn unrecognized_uri_yields_no_arn() {
        assert_eq!(extract_arn_from_uri("https://example.com"), None);
    }
}
