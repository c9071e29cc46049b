//! Mirror the daily archive listings and files from the public bucket.
//!
//! For each ingest day the bucket's XML listing is saved next to the day's
//! directory and every listed key is downloaded once. Files already on disk
//! are kept; downloads land in a `.part` file and are renamed when complete.

use super::day_directory;
use crate::config::ArchiveConfig;
use crate::constants::ARCHIVE_PREFIX;
use crate::error::{OpenAqError, Result};
use chrono::NaiveDate;
use regex::Regex;
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Counts for one or more fetched days
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FetchStats {
    pub listings_downloaded: usize,
    pub listings_cached: usize,
    pub files_downloaded: usize,
    pub files_cached: usize,
    pub bytes_downloaded: u64,
}

impl FetchStats {
    fn merge(&mut self, other: &FetchStats) {
        self.listings_downloaded += other.listings_downloaded;
        self.listings_cached += other.listings_cached;
        self.files_downloaded += other.files_downloaded;
        self.files_cached += other.files_cached;
        self.bytes_downloaded += other.bytes_downloaded;
    }
}

/// Downloads archive listings and files over HTTPS
#[derive(Debug)]
pub struct ArchiveFetcher {
    client: Client,
    bucket: String,
    archive_root: PathBuf,
}

impl ArchiveFetcher {
    pub fn new(config: &ArchiveConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|source| OpenAqError::Download {
                url: format!("https://{}/", config.bucket),
                source,
            })?;

        Ok(Self {
            client,
            bucket: config.bucket.trim_end_matches('/').to_string(),
            archive_root: config.archive_root.clone(),
        })
    }

    /// URL of the bucket listing for one ingest day
    pub fn listing_url(&self, date: NaiveDate) -> String {
        format!(
            "https://{}/?delimiter=%2F&prefix={}%2F{}%2F",
            self.bucket,
            ARCHIVE_PREFIX,
            date.format("%Y-%m-%d")
        )
    }

    /// Where the listing for one ingest day is saved
    pub fn listing_path(&self, date: NaiveDate) -> PathBuf {
        self.archive_root
            .join(ARCHIVE_PREFIX)
            .join(format!("{}.xml", date.format("%Y-%m-%d")))
    }

    /// Mirror each ingest day in order
    pub fn fetch_range(&self, dates: &[NaiveDate]) -> Result<FetchStats> {
        let mut stats = FetchStats::default();
        for &date in dates {
            let day = self.fetch_day(date)?;
            info!(
                "{}: {} files downloaded, {} cached",
                date, day.files_downloaded, day.files_cached
            );
            stats.merge(&day);
        }
        Ok(stats)
    }

    /// Mirror one ingest day
    pub fn fetch_day(&self, date: NaiveDate) -> Result<FetchStats> {
        let mut stats = FetchStats::default();
        fs::create_dir_all(day_directory(&self.archive_root, date))?;

        let listing_path = self.listing_path(date);
        if listing_path.exists() {
            info!("Keeping cached {}", listing_path.display());
            stats.listings_cached += 1;
        } else {
            stats.bytes_downloaded += self.download(&self.listing_url(date), &listing_path)?;
            stats.listings_downloaded += 1;
        }

        let listing = fs::read_to_string(&listing_path)?;
        let keys = parse_listing_keys(&listing)?;
        debug!("{} lists {} keys", listing_path.display(), keys.len());

        for key in keys {
            let Some(path) = self.key_path(&key) else {
                warn!("Skipping unsafe archive key '{}'", key);
                continue;
            };
            if path.exists() {
                debug!("Keeping cached {}", path.display());
                stats.files_cached += 1;
                continue;
            }
            let url = format!("https://{}/{}", self.bucket, key);
            stats.bytes_downloaded += self.download(&url, &path)?;
            stats.files_downloaded += 1;
        }

        Ok(stats)
    }

    /// Local path of an archive key, or `None` if the key would escape the root
    fn key_path(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)));
        safe.then(|| self.archive_root.join(relative))
    }

    /// Download `url` to `path` through a `.part` file, returning the byte count
    fn download(&self, url: &str, path: &Path) -> Result<u64> {
        debug!("Downloading {}", url);
        let to_error = |source: reqwest::Error| OpenAqError::Download {
            url: url.to_string(),
            source,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(to_error)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut partial = path.as_os_str().to_owned();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        let bytes = {
            let mut file = File::create(&partial)?;
            response.copy_to(&mut file).map_err(to_error)?
        };
        fs::rename(&partial, path)?;

        info!("Downloaded {} ({} bytes)", path.display(), bytes);
        Ok(bytes)
    }
}

/// Object keys listed in an S3 `ListBucketResult` document
pub fn parse_listing_keys(xml: &str) -> Result<Vec<String>> {
    let pattern = Regex::new(r"<Key>(.+?)</Key>")?;
    Ok(pattern
        .captures_iter(xml)
        .map(|caps| caps[1].to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>openaq-fetches</Name><Prefix>realtime-gzipped/2020-01-01/</Prefix><Marker></Marker><MaxKeys>1000</MaxKeys><Delimiter>/</Delimiter><IsTruncated>false</IsTruncated><Contents><Key>realtime-gzipped/2020-01-01/1577836976.ndjson.gz</Key><Size>56419</Size></Contents><Contents><Key>realtime-gzipped/2020-01-01/1577837574.ndjson.gz</Key><Size>61203</Size></Contents></ListBucketResult>"#;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    fn fetcher(root: &Path) -> ArchiveFetcher {
        ArchiveFetcher::new(&ArchiveConfig::default().with_archive_root(root)).unwrap()
    }

    #[test]
    fn test_parse_listing_keys() {
        let keys = parse_listing_keys(LISTING).unwrap();
        assert_eq!(
            keys,
            vec![
                "realtime-gzipped/2020-01-01/1577836976.ndjson.gz",
                "realtime-gzipped/2020-01-01/1577837574.ndjson.gz",
            ]
        );
        assert!(parse_listing_keys("<ListBucketResult/>").unwrap().is_empty());
    }

    #[test]
    fn test_listing_url_and_path() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = fetcher(temp_dir.path());

        assert_eq!(
            fetcher.listing_url(date()),
            "https://openaq-fetches.s3.amazonaws.com/?delimiter=%2F&prefix=realtime-gzipped%2F2020-01-01%2F"
        );
        assert_eq!(
            fetcher.listing_path(date()),
            temp_dir.path().join("realtime-gzipped/2020-01-01.xml")
        );
    }

    #[test]
    fn test_fully_cached_day_needs_no_network() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = fetcher(temp_dir.path());
        let day_dir = temp_dir.path().join("realtime-gzipped/2020-01-01");
        fs::create_dir_all(&day_dir).unwrap();
        fs::write(fetcher.listing_path(date()), LISTING).unwrap();
        fs::write(day_dir.join("1577836976.ndjson.gz"), b"").unwrap();
        fs::write(day_dir.join("1577837574.ndjson.gz"), b"").unwrap();

        let stats = fetcher.fetch_range(&[date()]).unwrap();
        assert_eq!(
            stats,
            FetchStats {
                listings_cached: 1,
                files_cached: 2,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_unsafe_keys_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = fetcher(temp_dir.path());

        assert!(fetcher.key_path("../etc/passwd").is_none());
        assert!(fetcher.key_path("/etc/passwd").is_none());
        assert_eq!(
            fetcher.key_path("realtime-gzipped/2020-01-01/a.ndjson.gz"),
            Some(temp_dir.path().join("realtime-gzipped/2020-01-01/a.ndjson.gz"))
        );
    }
}
