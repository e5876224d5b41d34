//! Lambda: function configuration reads, used both to resolve environment
//! variables during Stage-1 batched inference and to back the function
//! first-order enricher.

use std::collections::HashMap;

use crate::clients::tps;
use crate::error::ProviderError;
use crate::throttle::Throttler;

#[derive(Debug, Clone)]
pub struct FunctionConfiguration {
    pub function_arn: String,
    pub function_name: String,
    pub environment: HashMap<String, String>,
}

pub struct LambdaClient {
    inner: aws_sdk_lambda::Client,
    throttler: Throttler,
}

impl LambdaClient {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_lambda::Client::new(config),
            throttler,
        }
    }

    pub async fn get_function_configuration(
        &self,
        function_name: &str,
        identity: &str,
        region: &str,
    ) -> Result<FunctionConfiguration, ProviderError> {
        self.throttler
            .acquire("GetFunctionConfiguration", identity, region, tps::LAMBDA_GET)
            .await;
        let resp = self
            .inner
            .get_function_configuration()
            .function_name(function_name)
            .send()
            .await
            .map_err(|e| ProviderError::sdk("GetFunctionConfiguration", e))?;

        let environment = resp
            .environment()
            .and_then(|e| e.variables())
            .map(|vars| vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        Ok(FunctionConfiguration {
            function_arn: resp.function_arn().unwrap_or_default().to_string(),
            function_name: resp.function_name().unwrap_or_default().to_string(),
            environment,
        })
    }

    /// Event-source mappings for `function_name`, used by the `eventSources`
    /// Stage-1 batch handler to link a function to its stream source.
    pub async fn list_event_source_mappings(
        &self,
        function_name: &str,
        identity: &str,
        region: &str,
    ) -> Result<Vec<String>, ProviderError> {
        self.throttler
            .acquire("ListEventSourceMappings", identity, region, tps::LAMBDA_LIST)
            .await;
        let resp = self
            .inner
            .list_event_source_mappings()
            .function_name(function_name)
            .send()
            .await
            .map_err(|e| ProviderError::sdk("ListEventSourceMappings", e))?;
        Ok(resp
            .event_source_mappings()
            .iter()
            .filter_map(|m| m.event_source_arn())
            .map(str::to_string)
            .collect())
    }
}
