//! Download of individual dataset files from the remote archive.
//!
//! The engine itself only consumes files by path; this module exists so a
//! deployment can fetch a missing year's file on demand. The aggregator
//! never downloads implicitly.

use crate::bucket::UtcBucket;
use crate::dataset::DatasetNaming;
use futures_util::TryStreamExt;
use log::{info, warn};
use reqwest::Client;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("No dataset file exists for year {year} at this calendar position")]
    NoSuchDate { year: i32 },

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to write downloaded file '{0}'")]
    Write(PathBuf, #[source] std::io::Error),
}

/// Client for the upstream archive laid out as
/// `<root>/<year>/<dayOfYear>/<identifier>`.
pub struct RemoteArchive {
    root: String,
    naming: DatasetNaming,
    client: Client,
}

impl RemoteArchive {
    pub fn new(root: impl Into<String>, naming: DatasetNaming) -> Self {
        RemoteArchive {
            root: root.into(),
            naming,
            client: Client::new(),
        }
    }

    /// Downloads the file for `bucket` in `year` into `dest_dir`, returning
    /// the local path. The file lands under its canonical identifier so the
    /// existence index and the extractor agree on its name.
    pub async fn download(
        &self,
        year: i32,
        bucket: &UtcBucket,
        dest_dir: &Path,
    ) -> Result<PathBuf, ArchiveError> {
        let (_, identifier) = self
            .naming
            .identifier_for_year(year, bucket)
            .ok_or(ArchiveError::NoSuchDate { year })?;
        let url = self
            .naming
            .archive_url(&self.root, year, bucket)
            .ok_or(ArchiveError::NoSuchDate { year })?;

        info!("Downloading {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ArchiveError::NetworkRequest(url.clone(), e))?;
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {url}: {e:?}");
                return Err(if let Some(status) = e.status() {
                    ArchiveError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    ArchiveError::NetworkRequest(url, e)
                });
            }
        };

        crate::utils::ensure_dir_exists(dest_dir)
            .await
            .map_err(|e| ArchiveError::Write(dest_dir.to_path_buf(), e))?;
        let dest = dest_dir.join(&identifier);

        // Dataset files run to tens of megabytes; stream straight to disk
        // instead of buffering the whole body.
        let stream = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);
        let mut file = fs::File::create(&dest)
            .await
            .map_err(|e| ArchiveError::Write(dest.clone(), e))?;
        let bytes = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|e| ArchiveError::Write(dest.clone(), e))?;
        file.flush()
            .await
            .map_err(|e| ArchiveError::Write(dest.clone(), e))?;
        info!("Stored {bytes} bytes at {}", dest.display());
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serves one HTTP response with `body` and returns the root URL.
    async fn serve_one(body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(header.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn download_streams_the_body_to_disk() {
        let body: &'static [u8] = b"half-hourly precipitation grid bytes";
        let root = serve_one(body).await;
        let bucket = UtcBucket::resolve(
            NaiveDate::from_ymd_opt(2020, 6, 15).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            -7,
        );
        let dir = tempfile::tempdir().unwrap();
        let archive = RemoteArchive::new(root, DatasetNaming::default());

        let dest = archive.download(1999, &bucket, dir.path()).await.unwrap();
        assert_eq!(
            dest.file_name().unwrap().to_str().unwrap(),
            "3B-HHR.MS.MRG.3IMERG.19990615-S190000-E192959.1140.V07B.HDF5"
        );
        assert_eq!(fs::read(&dest).await.unwrap(), body);
    }

    #[tokio::test]
    async fn leap_day_download_in_non_leap_year_is_rejected() {
        let bucket = UtcBucket::resolve(
            NaiveDate::from_ymd_opt(2020, 2, 29).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            0,
        );
        let archive = RemoteArchive::new("https://archive.invalid", DatasetNaming::default());
        let result = archive
            .download(2019, &bucket, Path::new("/tmp/raincheck-test"))
            .await;
        assert!(matches!(result, Err(ArchiveError::NoSuchDate { year: 2019 })));
    }
}
