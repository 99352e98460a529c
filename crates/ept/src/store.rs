//! Remote object store capability and an unauthenticated S3 client.

use crate::{EptError, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Read-only object store operations consumed by the locator.
pub trait ObjectStore {
    /// Every key starting with `prefix`, in store order.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Whole object body, for small objects such as `ept.json`.
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Stream the object into `dest`, returning the byte count.
    fn download(&self, key: &str, dest: &Path) -> Result<u64>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).list(prefix)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        (**self).get(key)
    }

    fn download(&self, key: &str, dest: &Path) -> Result<u64> {
        (**self).download(key, dest)
    }
}

pub const DEFAULT_ENDPOINT: &str = "https://s3.amazonaws.com";
pub const DEFAULT_BUCKET: &str = "usgs-lidar-public";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the S3-compatible endpoint, without a trailing slash.
    pub endpoint: String,
    pub bucket: String,
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Anonymous, path-style S3 access over HTTPS (ListObjectsV2 + GET).
///
/// No request signing: only public buckets are reachable. No retries.
#[derive(Debug)]
pub struct HttpBucket {
    client: reqwest::blocking::Client,
    base: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    contents: Vec<ListedObject>,
    #[serde(default)]
    is_truncated: bool,
    #[serde(default)]
    next_continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedObject {
    key: String,
}

impl HttpBucket {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EptError::remote("connect", config.endpoint.clone(), e))?;

        Ok(Self {
            client,
            base: format!(
                "{}/{}",
                config.endpoint.trim_end_matches('/'),
                config.bucket
            ),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base, key.trim_start_matches('/'))
    }

    fn fetch(&self, operation: &'static str, key: &str) -> Result<reqwest::blocking::Response> {
        self.client
            .get(self.object_url(key))
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| EptError::remote(operation, key, e))
    }
}

impl ObjectStore for HttpBucket {
    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut query = vec![("list-type", "2"), ("prefix", prefix)];
            if let Some(t) = token.as_deref() {
                query.push(("continuation-token", t));
            }

            let body = self
                .client
                .get(&self.base)
                .query(&query)
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.text())
                .map_err(|e| EptError::remote("list", prefix, e))?;

            let page: ListBucketResult = quick_xml::de::from_str(&body)
                .map_err(|e| EptError::remote("list", prefix, format!("bad listing: {e}")))?;

            keys.extend(page.contents.into_iter().map(|o| o.key));

            match page.next_continuation_token {
                Some(next) if page.is_truncated => token = Some(next),
                _ => break,
            }
        }

        tracing::debug!(prefix, count = keys.len(), "listed objects");
        Ok(keys)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let bytes = self
            .fetch("get", key)?
            .bytes()
            .map_err(|e| EptError::remote("get", key, e))?;
        Ok(bytes.to_vec())
    }

    fn download(&self, key: &str, dest: &Path) -> Result<u64> {
        let mut response = self.fetch("download", key)?;

        let file = File::create(dest).map_err(|e| EptError::io(dest, e))?;
        let mut writer = BufWriter::new(file);

        let written = response
            .copy_to(&mut writer)
            .map_err(|e| EptError::remote("download", key, e))?;
        writer.flush().map_err(|e| EptError::io(dest, e))?;

        tracing::debug!(key, bytes = written, "downloaded object");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_objects_v2_pages() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>usgs-lidar-public</Name>
  <Prefix>NY_NewYorkCity/ept-data/1-1-1-</Prefix>
  <KeyCount>2</KeyCount>
  <MaxKeys>1000</MaxKeys>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>abc==</NextContinuationToken>
  <Contents>
    <Key>NY_NewYorkCity/ept-data/1-1-1-0.laz</Key>
    <LastModified>2020-01-01T00:00:00.000Z</LastModified>
    <Size>1234</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
  <Contents>
    <Key>NY_NewYorkCity/ept-data/1-1-1-1.laz</Key>
    <Size>99</Size>
  </Contents>
</ListBucketResult>"#;

        let page: ListBucketResult = quick_xml::de::from_str(xml).unwrap();
        let keys: Vec<_> = page.contents.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(
            keys,
            [
                "NY_NewYorkCity/ept-data/1-1-1-0.laz",
                "NY_NewYorkCity/ept-data/1-1-1-1.laz"
            ]
        );
        assert!(page.is_truncated);
        assert_eq!(page.next_continuation_token.as_deref(), Some("abc=="));
    }

    #[test]
    fn parses_empty_listing() {
        let xml = r#"<ListBucketResult><Name>b</Name><KeyCount>0</KeyCount><IsTruncated>false</IsTruncated></ListBucketResult>"#;
        let page: ListBucketResult = quick_xml::de::from_str(xml).unwrap();
        assert!(page.contents.is_empty());
        assert!(!page.is_truncated);
    }

    #[test]
    fn builds_path_style_urls() {
        let bucket = HttpBucket::new(&StoreConfig {
            endpoint: "https://s3.example.com/".into(),
            bucket: "lidar".into(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(
            bucket.object_url("NY/ept-data/0-0-0-0.laz"),
            "https://s3.example.com/lidar/NY/ept-data/0-0-0-0.laz"
        );
    }
}
