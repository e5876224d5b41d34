//! IAM: provider-owned managed policies (Tier A) and attached/inline policy
//! reads used by the identity role/user enrichers and hard-coded inference
//! handlers.

use crate::clients::tps;
use crate::error::ProviderError;
use crate::paginate::{Page, Paginator};
use crate::throttle::Throttler;

#[derive(Debug, Clone)]
pub struct ManagedPolicy {
    pub arn: String,
    pub policy_name: String,
}

#[derive(Debug, Clone)]
pub struct AttachedPolicy {
    pub policy_arn: String,
    pub policy_name: String,
}

#[derive(Debug, Clone)]
pub struct InlinePolicy {
    pub policy_name: String,
    pub document: serde_json::Value,
}

pub struct IamClient {
    inner: aws_sdk_iam::Client,
    throttler: Throttler,
}

impl IamClient {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_iam::Client::new(config),
            throttler,
        }
    }

    /// `AWS`-owned managed policies, for the Tier-A global handler.
    pub async fn list_aws_managed_policies(&self, identity: &str) -> Result<Vec<ManagedPolicy>, ProviderError> {
        let inner = &self.inner;
        let paginator = Paginator::new(
            |marker| async move {
                let resp = inner
                    .list_policies()
                    .scope(aws_sdk_iam::types::PolicyScopeType::Aws)
                    .set_marker(marker)
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("ListPolicies", e))?;
                let items = resp
                    .policies()
                    .iter()
                    .map(|p| ManagedPolicy {
                        arn: p.arn().unwrap_or_default().to_string(),
                        policy_name: p.policy_name().unwrap_or_default().to_string(),
                    })
                    .collect();
                let next_token = resp.is_truncated().then(|| resp.marker().unwrap_or_default().to_string());
                Ok(Page { items, next_token })
            },
            &self.throttler,
            "ListPolicies",
            identity,
            "global",
            tps::IAM_LIST,
        );
        paginator.collect_all().await
    }

    pub async fn list_attached_role_policies(
        &self,
        role_name: &str,
        identity: &str,
    ) -> Result<Vec<AttachedPolicy>, ProviderError> {
        self.throttler
            .acquire("ListAttachedRolePolicies", identity, "global", tps::IAM_LIST)
            .await;
        let resp = self
            .inner
            .list_attached_role_policies()
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| ProviderError::sdk("ListAttachedRolePolicies", e))?;
        Ok(resp
            .attached_policies()
            .iter()
            .map(|p| AttachedPolicy {
                policy_arn: p.policy_arn().unwrap_or_default().to_string(),
                policy_name: p.policy_name().unwrap_or_default().to_string(),
            })
            .collect())
    }

    pub async fn list_attached_user_policies(
        &self,
        user_name: &str,
        identity: &str,
    ) -> Result<Vec<AttachedPolicy>, ProviderError> {
        self.throttler
            .acquire("ListAttachedUserPolicies", identity, "global", tps::IAM_LIST)
            .await;
        let resp = self
            .inner
            .list_attached_user_policies()
            .user_name(user_name)
            .send()
            .await
            .map_err(|e| ProviderError::sdk("ListAttachedUserPolicies", e))?;
        Ok(resp
            .attached_policies()
            .iter()
            .map(|p| AttachedPolicy {
                policy_arn: p.policy_arn().unwrap_or_default().to_string(),
                policy_name: p.policy_name().unwrap_or_default().to_string(),
            })
            .collect())
    }

    pub async fn list_role_inline_policies(
        &self,
        role_name: &str,
        identity: &str,
    ) -> Result<Vec<InlinePolicy>, ProviderError> {
        self.throttler
            .acquire("ListRolePolicies", identity, "global", tps::IAM_LIST)
            .await;
        let names = self
            .inner
            .list_role_policies()
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| ProviderError::sdk("ListRolePolicies", e))?;

        let mut out = Vec::new();
        for name in names.policy_names() {
            self.throttler
                .acquire("GetRolePolicy", identity, "global", tps::IAM_GET)
                .await;
            let resp = self
                .inner
                .get_role_policy()
                .role_name(role_name)
                .policy_name(name)
                .send()
                .await
                .map_err(|e| ProviderError::sdk("GetRolePolicy", e))?;
            let decoded = percent_decode(resp.policy_document());
            let document: serde_json::Value = serde_json::from_str(&decoded)?;
            out.push(InlinePolicy {
                policy_name: name.to_string(),
                document,
            });
        }
        Ok(out)
    }

    pub async fn list_user_inline_policies(
        &self,
        user_name: &str,
        identity: &str,
    ) -> Result<Vec<InlinePolicy>, ProviderError> {
        self.throttler
            .acquire("ListUserPolicies", identity, "global", tps::IAM_LIST)
            .await;
        let names = self
            .inner
            .list_user_policies()
            .user_name(user_name)
            .send()
            .await
            .map_err(|e| ProviderError::sdk("ListUserPolicies", e))?;

        let mut out = Vec::new();
        for name in names.policy_names() {
            self.throttler
                .acquire("GetUserPolicy", identity, "global", tps::IAM_GET)
                .await;
            let resp = self
                .inner
                .get_user_policy()
                .user_name(user_name)
                .policy_name(name)
                .send()
                .await
                .map_err(|e| ProviderError::sdk("GetUserPolicy", e))?;
            let decoded = percent_decode(resp.policy_document());
            let document: serde_json::Value = serde_json::from_str(&decoded)?;
            out.push(InlinePolicy {
                policy_name: name.to_string(),
                document,
            });
        }
        Ok(out)
    }
}

fn percent_decode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                out.push(byte as char);
                continue;
            }
            out.push('%');
            out.push_str(&hex);
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_decode_handles_json_policy_documents() {
        let encoded = "%7B%22Version%22%3A%222012-10-17%22%7D";
        assert_eq!(percent_decode(encoded), r#"{"Version":"2012-10-17"}"#);
    }
}
