//! ECS: running-task enumeration for the container-service first-order
//! enricher.

use crate::clients::tps;
use crate::error::ProviderError;
use crate::paginate::{Page, Paginator};
use crate::throttle::Throttler;

#[derive(Debug, Clone)]
pub struct TaskSummary {
    pub task_arn: String,
}

#[derive(Debug, Clone)]
pub struct TaskDetail {
    pub task_arn: String,
    pub task_definition_arn: String,
}

pub struct EcsClient {
    inner: aws_sdk_ecs::Client,
    throttler: Throttler,
}

impl EcsClient {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_ecs::Client::new(config),
            throttler,
        }
    }

    /// ARNs of the tasks currently running under `service_name` in
    /// `cluster_arn`.
    pub async fn list_tasks_for_service(
        &self,
        cluster_arn: &str,
        service_name: &str,
        identity: &str,
        region: &str,
    ) -> Result<Vec<TaskSummary>, ProviderError> {
        let inner = &self.inner;
        let paginator = Paginator::new(
            |token| async move {
                let resp = inner
                    .list_tasks()
                    .cluster(cluster_arn)
                    .service_name(service_name)
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("ListTasks", e))?;
                let items = resp
                    .task_arns()
                    .iter()
                    .map(|arn| TaskSummary { task_arn: arn.clone() })
                    .collect();
                Ok(Page {
                    items,
                    next_token: resp.next_token().map(str::to_string),
                })
            },
            &self.throttler,
            "ListTasks",
            identity,
            region,
            tps::ECS_LIST,
        );
        paginator.collect_all().await
    }

    /// ARNs of every task currently running anywhere in `cluster_arn`, with
    /// no service filter — used by the mutex probe, which cares about the
    /// whole cluster's inventory rather than one service's.
    pub async fn list_tasks_for_cluster(
        &self,
        cluster_arn: &str,
        identity: &str,
        region: &str,
    ) -> Result<Vec<TaskSummary>, ProviderError> {
        let inner = &self.inner;
        let paginator = Paginator::new(
            |token| async move {
                let resp = inner
                    .list_tasks()
                    .cluster(cluster_arn)
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("ListTasks", e))?;
                let items = resp
                    .task_arns()
                    .iter()
                    .map(|arn| TaskSummary { task_arn: arn.clone() })
                    .collect();
                Ok(Page {
                    items,
                    next_token: resp.next_token().map(str::to_string),
                })
            },
            &self.throttler,
            "ListTasks",
            identity,
            region,
            tps::ECS_LIST,
        );
        paginator.collect_all().await
    }

    /// Resolves each task's task-definition ARN. The API accepts at most
    /// 100 task ARNs per call, so callers with a larger inventory must
    /// chunk before calling this.
    pub async fn describe_tasks(
        &self,
        cluster_arn: &str,
        task_arns: &[String],
        identity: &str,
        region: &str,
    ) -> Result<Vec<TaskDetail>, ProviderError> {
        if task_arns.is_empty() {
            return Ok(Vec::new());
        }
        self.throttler.acquire("DescribeTasks", identity, region, tps::ECS_DESCRIBE).await;
        let resp = self
            .inner
            .describe_tasks()
            .cluster(cluster_arn)
            .set_tasks(Some(task_arns.to_vec()))
            .send()
            .await
            .map_err(|e| ProviderError::sdk("DescribeTasks", e))?;
        Ok(resp
            .tasks()
            .iter()
            .filter_map(|t| {
                let task_arn = t.task_arn()?.to_string();
                let task_definition_arn = t.task_definition_arn()?.to_string();
                Some(TaskDetail { task_arn, task_definition_arn })
            })
            .collect())
    }
}
