//! Blob table sinks - local object directory and HTTP object store
//!
//! Both backends store the zstd-compressed delimited text under
//! `{key_prefix}{name}` and can fetch it back decompressed.

use super::{sanitize_name, PublishReceipt, SinkError, TableSink};
use crate::config::{BlobConfig, ExportConfig};
use crate::export::{decompress, encode_table};
use crate::types::SampleTable;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Suffix added to objects written by the filesystem backend
const FS_SUFFIX: &str = ".zst";

// ============================================================================
// Filesystem backend
// ============================================================================

/// Writes compressed tables below a root directory.
#[derive(Debug, Clone)]
pub struct FsTableSink {
    root: PathBuf,
    key_prefix: String,
    delimiter: char,
    level: i32,
}

impl FsTableSink {
    pub fn new(root: impl Into<PathBuf>, key_prefix: &str, delimiter: char, level: i32) -> Self {
        Self {
            root: root.into(),
            key_prefix: key_prefix.to_string(),
            delimiter,
            level,
        }
    }

    pub fn from_config(blob: &BlobConfig, export: &ExportConfig) -> Result<Self, SinkError> {
        let delimiter = export.delimiter_char().map_err(SinkError::Config)?;
        Ok(Self::new(
            blob.root.clone(),
            &blob.key_prefix,
            delimiter,
            export.compression_level,
        ))
    }

    fn object_key(&self, name: &str) -> String {
        format!("{}{}", self.key_prefix, sanitize_name(name))
    }

    /// On-disk path of an object. Directory parts of the key prefix become
    /// subdirectories; `.` and `..` segments are dropped.
    pub fn object_path(&self, name: &str) -> PathBuf {
        let (dirs, file_prefix) = self
            .key_prefix
            .rsplit_once('/')
            .unwrap_or(("", self.key_prefix.as_str()));

        let mut path = self.root.clone();
        for part in dirs.split('/').filter(|p| !matches!(*p, "" | "." | "..")) {
            path.push(part);
        }
        path.push(format!(
            "{}{}{FS_SUFFIX}",
            sanitize_name(file_prefix),
            sanitize_name(name)
        ));
        path
    }
}

#[async_trait]
impl TableSink for FsTableSink {
    async fn publish(&self, name: &str, table: &SampleTable) -> Result<PublishReceipt, SinkError> {
        let encoded = encode_table(table, self.delimiter, self.level)?;
        let path = self.object_path(name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write then rename so readers never see a partial object
        let tmp = path.with_extension("zst.partial");
        tokio::fs::write(&tmp, &encoded.body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        let receipt = PublishReceipt {
            key: self.object_key(name),
            raw_bytes: encoded.raw_bytes,
            compressed_bytes: encoded.body.len(),
        };
        info!(
            path = %path.display(),
            raw_bytes = receipt.raw_bytes,
            compressed_bytes = receipt.compressed_bytes,
            "Table written"
        );
        Ok(receipt)
    }

    async fn fetch(&self, name: &str) -> Result<String, SinkError> {
        let path = self.object_path(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SinkError::NotFound(self.object_key(name)));
            }
            Err(e) => return Err(e.into()),
        };
        if bytes.is_empty() {
            return Err(SinkError::EmptyObject(self.object_key(name)));
        }
        debug!(path = %path.display(), size_bytes = bytes.len(), "Table read");
        Ok(decompress(&bytes)?)
    }

    fn sink_name(&self) -> &str {
        "fs"
    }
}

// ============================================================================
// HTTP backend
// ============================================================================

/// PUT/GET client for an HTTP object store (`{endpoint}/{bucket}/{key}`).
#[derive(Clone)]
pub struct HttpTableSink {
    http: reqwest::Client,
    endpoint: String,
    bucket: String,
    key_prefix: String,
    token: Option<String>,
    delimiter: char,
    level: i32,
}

impl HttpTableSink {
    pub fn new(
        endpoint: &str,
        bucket: &str,
        key_prefix: &str,
        token: Option<String>,
        timeout: Duration,
        delimiter: char,
        level: i32,
    ) -> Result<Self, SinkError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.trim_matches('/').to_string(),
            key_prefix: key_prefix.to_string(),
            token,
            delimiter,
            level,
        })
    }

    pub fn from_config(blob: &BlobConfig, export: &ExportConfig) -> Result<Self, SinkError> {
        if blob.endpoint.is_empty() {
            return Err(SinkError::Config("blob.endpoint is empty".to_string()));
        }
        let delimiter = export.delimiter_char().map_err(SinkError::Config)?;
        Self::new(
            &blob.endpoint,
            &blob.bucket,
            &blob.key_prefix,
            blob.token(),
            Duration::from_secs(blob.request_timeout_secs),
            delimiter,
            export.compression_level,
        )
    }

    fn object_key(&self, name: &str) -> String {
        format!("{}{}", self.key_prefix, sanitize_name(name))
    }

    /// Full URL of an object
    pub fn object_url(&self, name: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, self.object_key(name))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.header("Authorization", format!("Bearer {token}")),
            None => req,
        }
    }
}

#[async_trait]
impl TableSink for HttpTableSink {
    async fn publish(&self, name: &str, table: &SampleTable) -> Result<PublishReceipt, SinkError> {
        let encoded = encode_table(table, self.delimiter, self.level)?;
        let compressed_bytes = encoded.body.len();

        let resp = self
            .authorize(self.http.put(self.object_url(name)))
            .header("Content-Type", "text/csv")
            .header("Content-Encoding", "zstd")
            .body(encoded.body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SinkError::ServerStatus(status));
        }

        let receipt = PublishReceipt {
            key: self.object_key(name),
            raw_bytes: encoded.raw_bytes,
            compressed_bytes,
        };
        info!(
            key = %receipt.key,
            bucket = %self.bucket,
            compressed_bytes,
            "Table uploaded"
        );
        Ok(receipt)
    }

    async fn fetch(&self, name: &str) -> Result<String, SinkError> {
        let resp = self
            .authorize(self.http.get(self.object_url(name)))
            .send()
            .await?;

        match resp.status() {
            reqwest::StatusCode::NOT_FOUND => Err(SinkError::NotFound(self.object_key(name))),
            status if status.is_success() => {
                let body = resp.bytes().await?;
                if body.is_empty() {
                    return Err(SinkError::EmptyObject(self.object_key(name)));
                }
                Ok(decompress(&body)?)
            }
            status => Err(SinkError::ServerStatus(status)),
        }
    }

    fn sink_name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SampleRow;

    fn table() -> SampleTable {
        let mut table = SampleTable::default();
        table.columns.push("A".to_string());
        let mut row = SampleRow::new(5000, 1.0, 2.0);
        row.values.insert("A".to_string(), 10.0);
        table.rows.push(row);
        table
    }

    #[test]
    fn test_fs_publish_then_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FsTableSink::new(tmp.path(), "sensors/", ',', 3);

        let receipt = tokio_test::block_on(sink.publish("sensors_b_1.csv", &table())).unwrap();
        assert_eq!(receipt.key, "sensors/sensors_b_1.csv");
        assert!(tmp.path().join("sensors").join("sensors_b_1.csv.zst").exists());

        let text = tokio_test::block_on(sink.fetch("sensors_b_1.csv")).unwrap();
        assert_eq!(text, "timestamp,lat,lon,A\r\n5000,1,2,10\r\n");
        assert_eq!(receipt.raw_bytes, text.len());
    }

    #[test]
    fn test_fs_fetch_missing_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FsTableSink::new(tmp.path(), "", ',', 3);
        let err = tokio_test::block_on(sink.fetch("nope.csv")).unwrap_err();
        assert!(matches!(err, SinkError::NotFound(key) if key == "nope.csv"));
    }

    #[test]
    fn test_fs_object_path_stays_under_root() {
        let sink = FsTableSink::new("/srv/objects", "sensors/", ',', 3);
        assert_eq!(
            sink.object_path("../../etc/passwd"),
            PathBuf::from("/srv/objects/sensors/.._.._etc_passwd.zst")
        );

        let flat = FsTableSink::new("/srv/objects", "../tables_", ',', 3);
        assert_eq!(
            flat.object_path("t.csv"),
            PathBuf::from("/srv/objects/tables_t.csv.zst")
        );
    }

    #[test]
    fn test_http_object_url() {
        let sink = HttpTableSink::new(
            "http://objects.local:9000/",
            "/telemetry-csv/",
            "sensors/",
            None,
            Duration::from_secs(5),
            ',',
            3,
        )
        .unwrap();
        assert_eq!(
            sink.object_url("sensors_b_1.csv"),
            "http://objects.local:9000/telemetry-csv/sensors/sensors_b_1.csv"
        );
    }

    #[test]
    fn test_http_requires_endpoint() {
        let result = HttpTableSink::from_config(&BlobConfig::default(), &ExportConfig::default());
        assert!(matches!(result, Err(SinkError::Config(_))));
    }
}
