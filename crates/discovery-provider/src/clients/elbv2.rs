//! ELB/ELBv2: target-group membership (Tier A) and target health (Stage-2
//! inference for the target-group handler).

use crate::clients::tps;
use crate::error::ProviderError;
use crate::paginate::{Page, Paginator};
use crate::throttle::Throttler;

#[derive(Debug, Clone)]
pub struct TargetGroupSummary {
    pub target_group_arn: String,
    pub target_group_name: String,
}

#[derive(Debug, Clone)]
pub struct TargetHealthDescription {
    pub target_id: String,
    pub target_type: String,
    pub state: String,
}

pub struct Elbv2Client {
    inner: aws_sdk_elasticloadbalancingv2::Client,
    throttler: Throttler,
}

impl Elbv2Client {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_elasticloadbalancingv2::Client::new(config),
            throttler,
        }
    }

    pub async fn describe_target_groups(
        &self,
        identity: &str,
        region: &str,
    ) -> Result<Vec<TargetGroupSummary>, ProviderError> {
        let inner = &self.inner;
        let paginator = Paginator::new(
            |marker| async move {
                let resp = inner
                    .describe_target_groups()
                    .set_marker(marker)
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("DescribeTargetGroups", e))?;
                let items = resp
                    .target_groups()
                    .iter()
                    .map(|tg| TargetGroupSummary {
                        target_group_arn: tg.target_group_arn().unwrap_or_default().to_string(),
                        target_group_name: tg.target_group_name().unwrap_or_default().to_string(),
                    })
                    .collect();
                Ok(Page {
                    items,
                    next_token: resp.next_marker().map(str::to_string),
                })
            },
            &self.throttler,
            "DescribeTargetGroups",
            identity,
            region,
            tps::ELBV2_DESCRIBE,
        );
        paginator.collect_all().await
    }

    pub async fn describe_target_health(
        &self,
        target_group_arn: &str,
        identity: &str,
        region: &str,
    ) -> Result<Vec<TargetHealthDescription>, ProviderError> {
        self.throttler
            .acquire("DescribeTargetHealth", identity, region, tps::ELBV2_DESCRIBE)
            .await;
        let resp = self
            .inner
            .describe_target_health()
            .target_group_arn(target_group_arn)
            .send()
            .await
            .map_err(|e| ProviderError::sdk("DescribeTargetHealth", e))?;
        Ok(resp
            .target_health_descriptions()
            .iter()
            .filter_map(|d| {
                let target = d.target()?;
                let health = d.target_health()?;
                Some(TargetHealthDescription {
                    target_id: target.id().unwrap_or_default().to_string(),
                    target_type: if target.id().unwrap_or_default().starts_with("i-") {
                        "instance".to_string()
                    } else {
                        "ip".to_string()
                    },
                    state: health.state().map(|s| s.as_str().to_string()).unwrap_or_default(),
                })
            })
            .collect())
    }
}
