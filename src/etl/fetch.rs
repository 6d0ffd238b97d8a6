use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use reqwest::blocking::Client;

use crate::config::Config;
use crate::data::resolve_data_path;
use crate::errors::{Error, Result};

use super::Etl;

pub const ETL_NAME: &str = "fetch";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub url: String,
    pub dest: PathBuf,
}

/// Mirrors the configured monthly trip files into the local data directory.
pub struct FetchEtl<'a> {
    config: &'a Config,
    client: Client,
}

impl<'a> FetchEtl<'a> {
    pub fn new(config: &'a Config) -> Result<FetchEtl<'a>> {
        let client = Client::builder().timeout(DOWNLOAD_TIMEOUT).build()?;
        Ok(FetchEtl { config, client })
    }

    fn file_name(&self, month: &str) -> String {
        format!("{}_{}.parquet", self.config.fetch.dataset, month)
    }

    fn download(&self, download: &Download) -> Result<()> {
        let part = download.dest.with_extension("parquet.part");
        let mut response = self.client.get(&download.url).send()?.error_for_status()?;
        let mut file = File::create(&part)?;
        if let Err(err) = response.copy_to(&mut file) {
            drop(file);
            return Err(discard_partial(&part, err.into()));
        }
        fs::rename(&part, &download.dest)?;
        Ok(())
    }
}

/// Removes a half-written download; the download error is what the caller sees.
fn discard_partial(part: &Path, err: Error) -> Error {
    if let Err(cleanup) = fs::remove_file(part) {
        warn!(etl_name = ETL_NAME, err = cleanup.to_string().as_str(); "Could not remove {}", part.display());
    }
    err
}

impl Etl for FetchEtl<'_> {
    type Input = Vec<Download>;
    type Output = Vec<Download>;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn extract(&mut self, dir: &Path) -> Result<Self::Input> {
        let data_dir = dir.join(resolve_data_path(self.config, dir).path);
        fs::create_dir_all(&data_dir)?;

        if self.config.fetch.months.is_empty() {
            warn!(etl_name = ETL_NAME; "No months configured, nothing to download");
        }

        let base_url = self.config.fetch.base_url.trim_end_matches('/');
        Ok(self
            .config
            .fetch
            .months
            .iter()
            .map(|month| {
                let name = self.file_name(month);
                Download {
                    url: format!("{base_url}/{name}"),
                    dest: data_dir.join(name),
                }
            })
            .collect())
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let mut pending = Vec::new();
        for download in input {
            if download.dest.try_exists()? {
                info!(etl_name = ETL_NAME; "Already present, skipping {}", download.dest.display());
            } else {
                pending.push(download);
            }
        }
        Ok(pending)
    }

    fn load(&mut self, _dir: &Path, output: Self::Output) -> Result<()> {
        info!(etl_name = ETL_NAME, files = output.len(); "Downloading trip files");
        for download in tqdm::tqdm(output.iter()) {
            info!(etl_name = ETL_NAME; "Downloading {}", download.url);
            self.download(download)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::errors::ErrorKind;

    fn config(base_url: &str, months: &[&str]) -> Config {
        Config {
            fetch: FetchConfig {
                base_url: base_url.to_string(),
                dataset: "yellow_tripdata".to_string(),
                months: months.iter().map(|m| m.to_string()).collect(),
            },
            ..Config::default()
        }
    }

    #[test]
    fn one_download_per_month() {
        let root = tempfile::tempdir().unwrap();
        let config = config("https://example.test/trip-data/", &["2023-01", "2023-02"]);
        let mut fetch = FetchEtl::new(&config).unwrap();

        let downloads = fetch.extract(root.path()).unwrap();

        let data_dir = root.path().join("data/raw");
        assert!(data_dir.is_dir());
        assert_eq!(
            downloads,
            vec![
                Download {
                    url: "https://example.test/trip-data/yellow_tripdata_2023-01.parquet".to_string(),
                    dest: data_dir.join("yellow_tripdata_2023-01.parquet"),
                },
                Download {
                    url: "https://example.test/trip-data/yellow_tripdata_2023-02.parquet".to_string(),
                    dest: data_dir.join("yellow_tripdata_2023-02.parquet"),
                },
            ]
        );
    }

    #[test]
    fn present_files_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        let config = config("https://example.test", &["2023-01", "2023-02"]);
        let mut fetch = FetchEtl::new(&config).unwrap();
        let downloads = fetch.extract(root.path()).unwrap();
        fs::write(&downloads[0].dest, b"cached").unwrap();

        let pending = fetch.transform(downloads.clone()).unwrap();

        assert_eq!(pending, vec![downloads[1].clone()]);
    }

    #[test]
    fn no_months_is_a_no_op() {
        let root = tempfile::tempdir().unwrap();
        let config = config("https://example.test", &[]);
        FetchEtl::new(&config).unwrap().process(root.path()).unwrap();
        assert_eq!(fs::read_dir(root.path().join("data/raw")).unwrap().count(), 0);
    }

    #[test]
    fn failed_cleanup_keeps_the_download_error() {
        let root = tempfile::tempdir().unwrap();
        let part = root.path().join("never_written.parquet.part");
        let download_err = Error::new(ErrorKind::Http, "connection reset");

        assert_eq!(discard_partial(&part, download_err.clone()), download_err);
    }

    #[test]
    fn partial_file_is_removed() {
        let root = tempfile::tempdir().unwrap();
        let part = root.path().join("trips.parquet.part");
        fs::write(&part, b"half").unwrap();

        discard_partial(&part, Error::new(ErrorKind::Http, "connection reset"));

        assert!(!part.exists());
    }

    #[test]
    fn unreachable_source_is_an_http_error() {
        let root = tempfile::tempdir().unwrap();
        let config = config("http://127.0.0.1:1", &["2023-01"]);

        let err = FetchEtl::new(&config).unwrap().process(root.path()).unwrap_err();

        assert_eq!(err.kind, ErrorKind::Http);
        assert_eq!(fs::read_dir(root.path().join("data/raw")).unwrap().count(), 0);
    }
}
