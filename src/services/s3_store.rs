//! [`ObjectStore`] backed by `aws-sdk-s3`.

use crate::{
    errors::StoreError,
    models::object_ref::ObjectRef,
    services::store::{ListingPage, ObjectStore},
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, meta::region::RegionProviderChain, retry::RetryConfig};
use aws_sdk_s3::{
    Client,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
};
use tracing::{debug, instrument};

const FALLBACK_REGION: &str = "us-east-1";

/// Connection settings for [`S3Store::connect`].
#[derive(Clone, Debug, Default)]
pub struct S3Settings {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub max_attempts: u32,
}

#[derive(Clone, Debug)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential/region provider chain.
    ///
    /// Throttling and transient failures are retried by the SDK's standard
    /// retry strategy (exponential backoff with jitter) up to
    /// `max_attempts` total attempts per request. A custom endpoint switches
    /// to path-style addressing, which S3-compatible stores expect.
    pub async fn connect(settings: &S3Settings) -> Self {
        let region_provider = RegionProviderChain::first_try(
            settings
                .region
                .clone()
                .map(aws_sdk_s3::config::Region::new),
        )
        .or_default_provider()
        .or_else(FALLBACK_REGION);

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(RetryConfig::standard().with_max_attempts(settings.max_attempts.max(1)));
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.endpoint_url.is_some())
            .build();

        debug!(region = ?sdk_config.region(), "built S3 client");
        Self::new(Client::from_conf(s3_config))
    }
}

/// Split an SDK error into the service error code, when the service sent
/// one, and a full human-readable description.
fn sdk_error_details<E, R>(err: &SdkError<E, R>) -> (Option<String>, String)
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err
        .as_service_error()
        .and_then(|service_err| service_err.code())
        .map(str::to_owned);
    (code, DisplayErrorContext(err).to_string())
}

#[async_trait]
impl ObjectStore for S3Store {
    #[instrument(skip(self))]
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
        max_keys: Option<i32>,
    ) -> Result<ListingPage, StoreError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .set_max_keys(max_keys)
            .send()
            .await
            .map_err(|err| {
                let (code, message) = sdk_error_details(&err);
                StoreError::List {
                    bucket: bucket.to_string(),
                    prefix: prefix.to_string(),
                    code,
                    message,
                }
            })?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|obj| obj.key())
            .map(|key| ObjectRef::new(bucket, key))
            .collect();

        let next_token = match (output.is_truncated(), output.next_continuation_token()) {
            (Some(true), Some(token)) => Some(token.to_owned()),
            (Some(true), None) => {
                return Err(StoreError::List {
                    bucket: bucket.to_string(),
                    prefix: prefix.to_string(),
                    code: None,
                    message: "truncated listing without continuation token".into(),
                });
            }
            _ => None,
        };

        Ok(ListingPage {
            objects,
            next_token,
        })
    }

    #[instrument(skip(self, from, to), fields(from = %from, to = %to))]
    async fn copy_object(&self, from: &ObjectRef, to: &ObjectRef) -> Result<(), StoreError> {
        self.client
            .copy_object()
            .bucket(&to.bucket)
            .key(&to.key)
            .copy_source(from.copy_source())
            .send()
            .await
            .map_err(|err| {
                let (code, message) = sdk_error_details(&err);
                StoreError::Copy {
                    from: from.clone(),
                    to: to.clone(),
                    code,
                    message,
                }
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::listing::list_objects;
    use aws_sdk_s3::config::{Credentials, Region};
    use aws_smithy_runtime::client::http::test_util::{ReplayEvent, StaticReplayClient};
    use aws_smithy_runtime_api::http::{Request, Response, StatusCode};
    use aws_smithy_types::body::SdkBody;
    use futures::TryStreamExt;

    fn make_s3_test_credentials() -> Credentials {
        Credentials::new(
            "ATESTCLIENT",
            "astestsecretkey",
            Some("atestsessiontoken".to_string()),
            None,
            "",
        )
    }

    fn replay_store(responses: Vec<(u16, &str)>) -> (S3Store, StaticReplayClient) {
        let events = responses
            .into_iter()
            .map(|(status, body)| {
                let req = Request::new(SdkBody::empty());
                let mut resp = Response::new(
                    StatusCode::try_from(status).unwrap(),
                    SdkBody::from(body.to_string()),
                );
                resp.headers_mut().insert("content-type", "application/xml");
                ReplayEvent::new(req, resp)
            })
            .collect();
        let replay_client = StaticReplayClient::new(events);

        let client = Client::from_conf(
            aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .credentials_provider(make_s3_test_credentials())
                .region(Region::new("us-east-1"))
                .http_client(replay_client.clone())
                .build(),
        );
        (S3Store::new(client), replay_client)
    }

    fn list_body(keys: &[&str], next_token: Option<&str>) -> String {
        let contents: String = keys
            .iter()
            .map(|key| format!("<Contents><Key>{key}</Key><Size>1</Size></Contents>"))
            .collect();
        let truncation = match next_token {
            Some(token) => format!(
                "<IsTruncated>true</IsTruncated><NextContinuationToken>{token}</NextContinuationToken>"
            ),
            None => "<IsTruncated>false</IsTruncated>".to_string(),
        };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>src</Name><Prefix>p/</Prefix><KeyCount>{}</KeyCount><MaxKeys>2</MaxKeys>{truncation}{contents}</ListBucketResult>"#,
            keys.len()
        )
    }

    #[tokio::test]
    async fn listing_follows_continuation_token_across_pages() {
        let page1 = list_body(&["p/a", "p/b"], Some("token-1"));
        let page2 = list_body(&["p/c"], None);
        let (store, replay) = replay_store(vec![(200, &page1), (200, &page2)]);

        let keys: Vec<String> = list_objects(&store, "src", "p/", Some(2))
            .map_ok(|obj| obj.key)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(keys, vec!["p/a", "p/b", "p/c"]);

        let uris: Vec<String> = replay
            .actual_requests()
            .map(|req| req.uri().to_string())
            .collect();
        assert_eq!(uris.len(), 2);
        assert!(uris[0].contains("max-keys=2"), "{}", uris[0]);
        assert!(uris[0].contains("prefix=p%2F"), "{}", uris[0]);
        assert!(!uris[0].contains("continuation-token"), "{}", uris[0]);
        assert!(uris[1].contains("continuation-token=token-1"), "{}", uris[1]);
    }

    #[tokio::test]
    async fn truncated_page_without_token_is_a_list_error() {
        let body = list_body(&["p/a"], None).replace(
            "<IsTruncated>false</IsTruncated>",
            "<IsTruncated>true</IsTruncated>",
        );
        let (store, _replay) = replay_store(vec![(200, &body)]);

        let err = store.list_page("src", "p/", None, None).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::List { code: None, ref message, .. }
                if message == "truncated listing without continuation token"
        ));
    }

    #[tokio::test]
    async fn copy_sends_encoded_copy_source() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<CopyObjectResult><ETag>"9b2cf535f27731c974343645a3985328"</ETag><LastModified>2024-01-01T00:00:00.000Z</LastModified></CopyObjectResult>"#;
        let (store, replay) = replay_store(vec![(200, body)]);

        let from = ObjectRef::new("src", "base/Existing CUR/year=2024/f.parquet");
        let to = ObjectRef::new("dst", "base/New CUR/year=2024/f.parquet");
        store.copy_object(&from, &to).await.unwrap();

        let requests: Vec<_> = replay.actual_requests().collect();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].headers().get("x-amz-copy-source"),
            Some("src/base%2FExisting%20CUR%2Fyear%3D2024%2Ff.parquet")
        );
    }

    #[tokio::test]
    async fn access_denied_copy_carries_service_code() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>AccessDenied</Code><Message>Access Denied</Message><RequestId>REQ1</RequestId><HostId>HOST1</HostId></Error>"#;
        let (store, _replay) = replay_store(vec![(403, body)]);

        let from = ObjectRef::new("src", "p/a");
        let to = ObjectRef::new("dst", "q/a");
        let err = store.copy_object(&from, &to).await.unwrap_err();

        match err {
            StoreError::Copy {
                from: err_from,
                to: err_to,
                code,
                ..
            } => {
                assert_eq!(err_from, from);
                assert_eq!(err_to, to);
                assert_eq!(code.as_deref(), Some("AccessDenied"));
            }
            other => panic!("expected copy error, got {other:?}"),
        }
    }
}
