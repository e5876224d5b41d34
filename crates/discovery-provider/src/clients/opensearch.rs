//! OpenSearch: domain listing for the Tier-A search-domain batch handler.
//! The describe call is batched 5 domains at a time — not a page-size
//! choice, a hard API limit on `DescribeDomains`.

use crate::clients::tps;
use crate::error::ProviderError;
use crate::throttle::Throttler;

const DESCRIBE_BATCH_SIZE: usize = 5;

#[derive(Debug, Clone)]
pub struct DomainStatus {
    pub domain_name: String,
    pub arn: String,
    pub endpoint: Option<String>,
}

pub struct OpenSearchClient {
    inner: aws_sdk_opensearch::Client,
    throttler: Throttler,
}

impl OpenSearchClient {
    pub fn new(config: &aws_config::SdkConfig, throttler: Throttler) -> Self {
        Self {
            inner: aws_sdk_opensearch::Client::new(config),
            throttler,
        }
    }

    pub async fn list_and_describe_domains(
        &self,
        identity: &str,
        region: &str,
    ) -> Result<Vec<DomainStatus>, ProviderError> {
        self.throttler
            .acquire("ListDomainNames", identity, region, tps::OPENSEARCH_LIST)
            .await;
        let names = self
            .inner
            .list_domain_names()
            .send()
            .await
            .map_err(|e| ProviderError::sdk("ListDomainNames", e))?;
        let domain_names: Vec<String> = names
            .domain_names()
            .iter()
            .filter_map(|d| d.domain_name())
            .map(str::to_string)
            .collect();

        let mut out = Vec::new();
        for batch in domain_names.chunks(DESCRIBE_BATCH_SIZE) {
            self.throttler
                .acquire("DescribeDomains", identity, region, tps::OPENSEARCH_DESCRIBE_DOMAINS)
                .await;
            let resp = self
                .inner
                .describe_domains()
                .set_domain_names(Some(batch.to_vec()))
                .send()
                .await
                .map_err(|e| ProviderError::sdk("DescribeDomains", e))?;
            out.extend(resp.domain_status_list().iter().map(|d| DomainStatus {
                domain_name: d.domain_name().to_string(),
                arn: d.arn().to_string(),
                endpoint: d.endpoint().map(str::to_string),
            }));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn batches_respect_the_five_domain_describe_limit() {
        let names: Vec<String> = (0..12).map(|i| format!("domain-{i}")).collect();
        let batches: Vec<&[String]> = names.chunks(super::DESCRIBE_BATCH_SIZE).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 5);
        assert_eq!(batches[2].len(), 2);
    }
}
