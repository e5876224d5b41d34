//! Reconciles the authoritative account list and assumes the discovery
//! trust role in every reachable account (§4.4).

use std::collections::HashMap;

use futures::stream::{self, StreamExt};

use discovery_core::account::{Account, AccountRegion, AccountsMap};
use discovery_provider::clients::config_service::ConfigServiceClient;
use discovery_provider::clients::organizations::OrganizationsClient;
use discovery_provider::clients::sts::{AssumedCredentials, StsClient};

use crate::config::{DiscoveryConfig, DiscoveryMode};
use crate::error::EngineError;

const ASSUME_ROLE_CONCURRENCY: usize = 30;
const CONFIG_PROBE_CONCURRENCY: usize = 5;

/// An account plus the live credentials assumed for its crawl. Never
/// serialized — the whole point of keeping this separate from
/// `discovery_core::Account` is that credentials never touch persisted
/// storage.
pub struct ResolvedAccount {
    pub account: Account,
    pub credentials: AssumedCredentials,
}

/// Walks the organization tree rooted at `ou_id`, recursively: OUs for
/// parent, then accounts for parent, at a 1 op/sec limit (enforced by the
/// `OrganizationsClient`'s own throttler).
async fn walk_organization_tree(
    organizations: &OrganizationsClient,
    ou_id: &str,
    identity: &str,
) -> Result<Vec<(String, String)>, EngineError> {
    let mut out = Vec::new();
    let accounts = organizations.list_accounts_for_parent(ou_id, identity).await?;
    out.extend(accounts.into_iter().map(|a| (a.id, a.name)));

    let child_ous = organizations.list_organizational_units_for_parent(ou_id, identity).await?;
    for ou in child_ous {
        let nested = Box::pin(walk_organization_tree(organizations, &ou.id, identity)).await?;
        out.extend(nested);
    }
    Ok(out)
}

/// Builds the authoritative account list. In organization mode this is the
/// organization tree; in direct mode it is whatever accounts are already
/// present in `stored_accounts`.
pub async fn resolve_authoritative_accounts(
    config: &DiscoveryConfig,
    organizations: &OrganizationsClient,
    stored_accounts: &AccountsMap,
    identity: &str,
) -> Result<AccountsMap, EngineError> {
    let mut accounts: AccountsMap = HashMap::new();

    match config.cross_account_discovery {
        DiscoveryMode::Organizations => {
            let ou_id = config
                .organization_unit_id
                .as_deref()
                .ok_or_else(|| EngineError::Config("organization mode requires organization_unit_id".into()))?;
            let tree = walk_organization_tree(organizations, ou_id, identity).await?;
            for (account_id, name) in tree {
                let is_management_account = organizations.is_management_account(&account_id, identity).await?;
                let mut account = stored_accounts
                    .get(&account_id)
                    .cloned()
                    .unwrap_or_else(|| Account::new(&account_id, &name));
                account.name = name;
                account.is_management_account = Some(is_management_account);
                account.to_delete = false;
                accounts.insert(account_id, account);
            }
            // Accounts present in the store but absent from the organization
            // view are marked for deletion rather than dropped outright.
            for (account_id, stored) in stored_accounts {
                accounts.entry(account_id.clone()).or_insert_with(|| {
                    let mut account = stored.clone();
                    account.to_delete = true;
                    account
                });
            }
        }
        DiscoveryMode::SelfManaged => {
            accounts = stored_accounts.clone();
        }
    }

    Ok(accounts)
}

/// Outcome of one account's assume-role attempt: success, an
/// access-denied (role not deployed yet, but the account stays in scope),
/// or any other failure (logged by the caller, account dropped entirely).
enum AssumeOutcome {
    Assumed(AssumedCredentials),
    AccessDenied,
    Dropped,
}

/// Assumes the discovery trust role in every non-`toDelete` account at
/// bounded concurrency, then probes per-region config enablement for every
/// account that succeeded. Per §4.4: an access-denied assume failure keeps
/// the account (marked `isIamRoleDeployed = false`); any other failure
/// drops the account from this crawl's output entirely.
pub async fn assume_trust_and_probe_regions(
    config: &DiscoveryConfig,
    accounts: AccountsMap,
    sts: &StsClient,
    region_names: &[String],
    config_service_for: impl Fn(&AssumedCredentials) -> ConfigServiceClient,
    identity: &str,
) -> AccountsMap {
    let assumed: Vec<(String, Account, AssumeOutcome)> = stream::iter(accounts.into_iter())
        .map(|(account_id, mut account)| {
            let role_arn = config.discovery_role_arn(&account_id);
            async move {
                let outcome = match sts.assume_role(&role_arn, "discovery-crawl", identity).await {
                    Ok(creds) => {
                        account.is_iam_role_deployed = true;
                        AssumeOutcome::Assumed(creds)
                    }
                    Err(err) if err.is_access_denied() => {
                        account.is_iam_role_deployed = false;
                        AssumeOutcome::AccessDenied
                    }
                    Err(_) => AssumeOutcome::Dropped,
                };
                (account_id, account, outcome)
            }
        })
        .buffer_unordered(ASSUME_ROLE_CONCURRENCY)
        .collect()
        .await;

    let mut out = AccountsMap::new();
    for (account_id, mut account, outcome) in assumed {
        let creds = match outcome {
            AssumeOutcome::Assumed(creds) => Some(creds),
            AssumeOutcome::AccessDenied => None,
            AssumeOutcome::Dropped => continue,
        };

        if let Some(creds) = creds {
            let config_service = config_service_for(&creds);
            let probed = stream::iter(region_names.iter().cloned())
                .map(|region| {
                    let config_service = &config_service;
                    let assumed_identity = creds.account_id.clone();
                    async move {
                        let is_config_enabled = config_service.is_config_enabled(&assumed_identity, &region).await;
                        (region, is_config_enabled)
                    }
                })
                .buffer_unordered(CONFIG_PROBE_CONCURRENCY)
                .collect::<Vec<_>>()
                .await;

            account.regions = probed
                .into_iter()
                .map(|(name, probe)| {
                    let is_config_enabled = match probe {
                        Ok(enabled) => Some(enabled),
                        Err(err) if err.is_access_denied() => {
                            account.is_iam_role_deployed = false;
                            None
                        }
                        Err(_) => None,
                    };
                    AccountRegion {
                        name,
                        last_crawled: None,
                        is_config_enabled,
                    }
                })
                .collect();
        }
        out.insert(account_id, account);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_account_credentials_are_not_part_of_the_persisted_account() {
        let account = Account::new("111111111111", "example");
        let resolved = ResolvedAccount {
            account,
            credentials: AssumedCredentials {
                access_key_id: "AKIA".into(),
                secret_access_key: "secret".into(),
                session_token: "token".into(),
                expiration: None,
                account_id: "111111111111".into(),
            },
        };
        // `discovery_core::Account` has no credentials field to serialize,
        // so round-tripping it can never leak `resolved.credentials`.
        let serialized = serde_json::to_string(&resolved.account).unwrap();
        assert!(!serialized.contains("secret"));
    }
}
