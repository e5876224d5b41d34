//! AWS Organizations: recursive OU walk used by `AccountResolver` in
//! organization mode.

use crate::clients::tps;
use crate::error::ProviderError;
use crate::paginate::{Page, Paginator};
use crate::throttle::Throttler;

#[derive(Debug, Clone)]
pub struct OrganizationalUnit {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct OrgAccount {
    pub id: String,
    pub name: String,
}

pub struct OrganizationsClient {
    inner: aws_sdk_organizations::Client,
    throttler: Throttler,
}

impl OrganizationsClient {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_organizations::Client::new(config),
            throttler,
        }
    }

    pub async fn list_organizational_units_for_parent(
        &self,
        parent_id: &str,
        identity: &str,
    ) -> Result<Vec<OrganizationalUnit>, ProviderError> {
        let inner = &self.inner;
        let paginator = Paginator::new(
            |token| async move {
                let resp = inner
                    .list_organizational_units_for_parent()
                    .parent_id(parent_id)
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("ListOrganizationalUnitsForParent", e))?;
                let items = resp
                    .organizational_units()
                    .iter()
                    .map(|ou| OrganizationalUnit {
                        id: ou.id().unwrap_or_default().to_string(),
                        name: ou.name().unwrap_or_default().to_string(),
                    })
                    .collect();
                Ok(Page {
                    items,
                    next_token: resp.next_token().map(str::to_string),
                })
            },
            &self.throttler,
            "ListOrganizationalUnitsForParent",
            identity,
            "global",
            tps::ORGANIZATIONS_LIST,
        );
        paginator.collect_all().await
    }

    pub async fn list_accounts_for_parent(
        &self,
        parent_id: &str,
        identity: &str,
    ) -> Result<Vec<OrgAccount>, ProviderError> {
        let inner = &self.inner;
        let paginator = Paginator::new(
            |token| async move {
                let resp = inner
                    .list_accounts_for_parent()
                    .parent_id(parent_id)
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("ListAccountsForParent", e))?;
                let items = resp
                    .accounts()
                    .iter()
                    .map(|a| OrgAccount {
                        id: a.id().unwrap_or_default().to_string(),
                        name: a.name().unwrap_or_default().to_string(),
                    })
                    .collect();
                Ok(Page {
                    items,
                    next_token: resp.next_token().map(str::to_string),
                })
            },
            &self.throttler,
            "ListAccountsForParent",
            identity,
            "global",
            tps::ORGANIZATIONS_LIST,
        );
        paginator.collect_all().await
    }

    /// `true` if `account_id` is the organization's management account.
    pub async fn is_management_account(
        &self,
        account_id: &str,
        identity: &str,
    ) -> Result<bool, ProviderError> {
        self.throttler
            .acquire("DescribeOrganization", identity, "global", tps::ORGANIZATIONS_LIST)
            .await;
        let resp = self
            .inner
            .describe_organization()
            .send()
            .await
            .map_err(|e| ProviderError::sdk("DescribeOrganization", e))?;
        Ok(resp
            .organization()
            .and_then(|o| o.master_account_id())
            .map(|id| id == account_id)
            .unwrap_or(false))
    }
}
