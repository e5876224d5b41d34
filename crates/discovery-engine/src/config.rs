//! Crawl configuration, read entirely from the environment (§6 — there is
//! no CLI).

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    Organizations,
    SelfManaged,
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub cluster_name: String,
    pub config_aggregator_name: String,
    pub cross_account_discovery: DiscoveryMode,
    pub custom_user_agent: String,
    pub graph_store_url: String,
    pub search_index_url: String,
    pub organization_unit_id: Option<String>,
    pub region: String,
    pub root_account_id: String,
    pub discovery_role_name: String,
    pub vpc_id: Option<String>,
    pub log_level: String,
}

impl DiscoveryConfig {
    pub fn from_env() -> Result<Self, EngineError> {
        let cross_account_discovery = match env_required("CROSS_ACCOUNT_DISCOVERY")?.as_str() {
            "organizations" => DiscoveryMode::Organizations,
            "self-managed" => DiscoveryMode::SelfManaged,
            other => {
                return Err(EngineError::Config(format!(
                    "CROSS_ACCOUNT_DISCOVERY must be 'organizations' or 'self-managed', got '{other}'"
                )))
            }
        };

        let organization_unit_id = env_optional("ORGANIZATION_UNIT_ID");
        if cross_account_discovery == DiscoveryMode::Organizations && organization_unit_id.is_none() {
            return Err(EngineError::Config(
                "ORGANIZATION_UNIT_ID is required when CROSS_ACCOUNT_DISCOVERY=organizations".to_string(),
            ));
        }

        Ok(Self {
            cluster_name: env_required("CLUSTER_NAME")?,
            config_aggregator_name: env_required("CONFIG_AGGREGATOR_NAME")?,
            cross_account_discovery,
            custom_user_agent: env_or_default("CUSTOM_USER_AGENT", "discovery-process"),
            graph_store_url: env_required("GRAPH_STORE_URL")?,
            search_index_url: env_required("SEARCH_INDEX_URL")?,
            organization_unit_id,
            region: env_required("AWS_REGION")?,
            root_account_id: env_required("ROOT_ACCOUNT_ID")?,
            discovery_role_name: env_or_default("DISCOVERY_ROLE_NAME", "DiscoveryRole"),
            vpc_id: env_optional("VPC_ID"),
            log_level: env_or_default("LOG_LEVEL", "info"),
        })
    }

    /// `true` if run against a fresh environment — skips writes and logs
    /// the delta that would have been applied instead. Not part of the
    /// spec's own configuration surface; a supplemental operational switch
    /// modeled on `claria-provisioner`'s scan/plan separation.
    pub fn dry_run() -> bool {
        std::env::var("DISCOVERY_DRY_RUN").map(|v| v == "1").unwrap_or(false)
    }

    /// Builds the ARN of the discovery trust role in a member account. The
    /// role name is suffixed with the root account id, matching §6's
    /// description of how the target ARN is minted.
    pub fn discovery_role_arn(&self, member_account_id: &str) -> String {
        format!(
            "arn:aws:iam::{member_account_id}:role/{}-{}",
            self.discovery_role_name, self.root_account_id
        )
    }
}

fn env_required(key: &str) -> Result<String, EngineError> {
    std::env::var(key).map_err(|_| EngineError::Config(format!("missing required environment variable {key}")))
}

fn env_optional(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        std::env::set_var("CLUSTER_NAME", "discovery-cluster");
        std::env::set_var("CONFIG_AGGREGATOR_NAME", "org-aggregator");
        std::env::set_var("CROSS_ACCOUNT_DISCOVERY", "self-managed");
        std::env::set_var("GRAPH_STORE_URL", "https://graph.example.internal");
        std::env::set_var("SEARCH_INDEX_URL", "https://search.example.internal");
        std::env::set_var("AWS_REGION", "us-east-1");
        std::env::set_var("ROOT_ACCOUNT_ID", "111111111111");
        std::env::remove_var("ORGANIZATION_UNIT_ID");
    }

    #[test]
    fn self_managed_mode_does_not_require_an_ou() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_minimal_env();
        let config = DiscoveryConfig::from_env().unwrap();
        assert_eq!(config.cross_account_discovery, DiscoveryMode::SelfManaged);
        assert!(config.organization_unit_id.is_none());
    }

    #[test]
    fn organizations_mode_requires_an_ou() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_minimal_env();
        std::env::set_var("CROSS_ACCOUNT_DISCOVERY", "organizations");
        let result = DiscoveryConfig::from_env();
        assert!(result.is_err());
        std::env::set_var("CROSS_ACCOUNT_DISCOVERY", "self-managed");
    }

    #[test]
    fn discovery_role_arn_suffixes_with_root_account_id() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_minimal_env();
        let config = DiscoveryConfig::from_env().unwrap();
        assert_eq!(
            config.discovery_role_arn("222222222222"),
            "arn:aws:iam::222222222222:role/DiscoveryRole-111111111111"
        );
    }
}
