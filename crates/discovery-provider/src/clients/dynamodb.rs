//! DynamoDB + DynamoDB Streams: stream-ARN lookup for the table first-order
//! enricher.

use crate::clients::tps;
use crate::error::ProviderError;
use crate::throttle::Throttler;

pub struct DynamoDbClient {
    inner: aws_sdk_dynamodb::Client,
    streams: aws_sdk_dynamodbstreams::Client,
    throttler: Throttler,
}

impl DynamoDbClient {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_dynamodb::Client::new(config),
            streams: aws_sdk_dynamodbstreams::Client::new(config),
            throttler,
        }
    }

    /// The table's live stream ARN, if streaming is enabled. The table
    /// enricher only emits a stream resource when this returns `Some`.
    pub async fn describe_table_stream_arn(
        &self,
        table_name: &str,
        identity: &str,
        region: &str,
    ) -> Result<Option<String>, ProviderError> {
        self.throttler
            .acquire("DescribeTable", identity, region, tps::DYNAMODB_DESCRIBE)
            .await;
        let resp = self
            .inner
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(|e| ProviderError::sdk("DescribeTable", e))?;
        Ok(resp.table().and_then(|t| t.latest_stream_arn()).map(str::to_string))
    }

    pub async fn describe_stream(
        &self,
        stream_arn: &str,
        identity: &str,
        region: &str,
    ) -> Result<serde_json::Value, ProviderError> {
        self.throttler
            .acquire("DescribeStream", identity, region, tps::DYNAMODB_STREAMS_DESCRIBE)
            .await;
        let resp = self
            .streams
            .describe_stream()
            .stream_arn(stream_arn)
            .send()
            .await
            .map_err(|e| ProviderError::sdk("DescribeStream", e))?;
        Ok(serde_json::json!({
            "streamArn": resp.stream_description().and_then(|d| d.stream_arn()),
            "streamStatus": resp.stream_description().and_then(|d| d.stream_status()).map(|s| s.as_str()),
        }))
    }
}
