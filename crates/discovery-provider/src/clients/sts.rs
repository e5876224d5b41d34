//! STS: cross-account role assumption and identity probing.

use crate::clients::tps;
use crate::error::ProviderError;
use crate::throttle::Throttler;

/// Temporary credentials obtained by assuming the discovery role in a member
/// account. Never logged, never persisted — callers attach these to a
/// per-account SDK config for the duration of that account's crawl and drop
/// them once the crawl finishes.
#[derive(Clone)]
pub struct AssumedCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: Option<String>,
    pub account_id: String,
}

pub struct StsClient {
    inner: aws_sdk_sts::Client,
    throttler: Throttler,
}

impl StsClient {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_sts::Client::new(config),
            throttler,
        }
    }

    /// Assumes `role_arn` using whatever credentials built `config`. Used
    /// both for the root-account's own discovery role and, in org mode, for
    /// every member account's role.
    pub async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
        identity: &str,
    ) -> Result<AssumedCredentials, ProviderError> {
        self.throttler
            .acquire("AssumeRole", identity, "global", tps::STS_ASSUME_ROLE)
            .await;

        let resp = self
            .inner
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .send()
            .await
            .map_err(|e| ProviderError::AssumeRole {
                role_arn: role_arn.to_string(),
                message: e.to_string(),
            })?;

        let creds = resp.credentials().ok_or_else(|| ProviderError::AssumeRole {
            role_arn: role_arn.to_string(),
            message: "AssumeRole returned no credentials".to_string(),
        })?;

        let assumed_role_arn = resp
            .assumed_role_user()
            .map(|u| u.arn().to_string())
            .unwrap_or_default();
        let account_id = assumed_role_arn
            .split(':')
            .nth(4)
            .unwrap_or_default()
            .to_string();

        Ok(AssumedCredentials {
            access_key_id: creds.access_key_id().to_string(),
            secret_access_key: creds.secret_access_key().to_string(),
            session_token: creds.session_token().to_string(),
            expiration: Some(creds.expiration().to_string()),
            account_id,
        })
    }

    pub async fn get_caller_identity(&self, identity: &str) -> Result<String, ProviderError> {
        self.throttler
            .acquire("GetCallerIdentity", identity, "global", tps::STS_GET_CALLER_IDENTITY)
            .await;
        let resp = self
            .inner
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| ProviderError::sdk("GetCallerIdentity", e))?;
        Ok(resp.account().unwrap_or_default().to_string())
    }
}

/// Builds the standard role ARN the discovery role is assumed under.
pub fn build_role_arn(account_id: &str, role_name: &str) -> String {
    format!("arn:aws:iam::{account_id}:role/{role_name}")
}
