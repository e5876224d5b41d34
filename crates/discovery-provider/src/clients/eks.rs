//! EKS: node-group enumeration for the cluster first-order enricher.

use crate::clients::tps;
use crate::error::ProviderError;
use crate::paginate::{Page, Paginator};
use crate::throttle::Throttler;

#[derive(Debug, Clone)]
pub struct NodegroupDetail {
    pub nodegroup_name: String,
    pub autoscaling_group_names: Vec<String>,
    pub json: serde_json::Value,
}

pub struct EksClient {
    inner: aws_sdk_eks::Client,
    throttler: Throttler,
}

impl EksClient {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_eks::Client::new(config),
            throttler,
        }
    }

    pub async fn list_nodegroups(
        &self,
        cluster_name: &str,
        identity: &str,
        region: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let inner = &self.inner;
        let paginator = Paginator::new(
            |token| async move {
                let resp = inner
                    .list_nodegroups()
                    .cluster_name(cluster_name)
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("ListNodegroups", e))?;
                Ok(Page {
                    items: resp.nodegroups().to_vec(),
                    next_token: resp.next_token().map(str::to_string),
                })
            },
            &self.throttler,
            "ListNodegroups",
            identity,
            region,
            tps::EKS_LIST,
        );
        paginator.collect_all().await
    }

    pub async fn describe_nodegroup(
        &self,
        cluster_name: &str,
        nodegroup_name: &str,
        identity: &str,
        region: &str,
    ) -> Result<NodegroupDetail, ProviderError> {
        self.throttler
            .acquire("DescribeNodegroup", identity, region, tps::EKS_DESCRIBE_NODEGROUP)
            .await;
        let resp = self
            .inner
            .describe_nodegroup()
            .cluster_name(cluster_name)
            .nodegroup_name(nodegroup_name)
            .send()
            .await
            .map_err(|e| ProviderError::sdk("DescribeNodegroup", e))?;
        let nodegroup = resp
            .nodegroup()
            .ok_or_else(|| ProviderError::sdk("DescribeNodegroup", "response carried no nodegroup"))?;
        Ok(NodegroupDetail {
            nodegroup_name: nodegroup.nodegroup_name().unwrap_or_default().to_string(),
            autoscaling_group_names: nodegroup
                .resources()
                .and_then(|r| {
                    Some(
                        r.auto_scaling_groups()
                            .iter()
                            .filter_map(|a| a.name())
                            .map(str::to_string)
                            .collect(),
                    )
                })
                .unwrap_or_default(),
            json: serde_json::Value::Null,
        })
    }
}
