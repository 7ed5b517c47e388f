//! Result directory: location and retrieval of completed-shard artifacts.
//!
//! Contract:
//! - result URL shape: `http://{ip}:{port}/api/v1/mapreduce/result/{id}`;
//! - cache path shape: `{cachedir}/mr-result-{id}`;
//! - downloads send `Authorization: Token {api_token}` and succeed iff the
//!   node answers HTTP 200;
//! - payloads stream to a `.tmp` sibling and rename into place, so a
//!   finished cache file is never partial.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mapflow_common::{MapFlowError, Result, ResultId};

use crate::shard::ShardResult;

pub(crate) fn result_url(result: &ShardResult) -> String {
    format!(
        "http://{}/api/v1/mapreduce/result/{}",
        result.host.ip_and_port(),
        result.result_id
    )
}

pub(crate) fn cache_path(cachedir: &Path, result_id: &ResultId) -> PathBuf {
    cachedir.join(format!("mr-result-{result_id}"))
}

pub(crate) fn download_to_cache(
    url: &str,
    api_token: &str,
    path: &Path,
    timeout_ms: u64,
) -> Result<()> {
    let mut builder = reqwest::blocking::Client::builder();
    if timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(timeout_ms));
    }
    let client = builder
        .build()
        .map_err(|e| MapFlowError::Download(format!("http client init failed: {e}")))?;

    let mut response = client
        .get(url)
        .header(
            reqwest::header::AUTHORIZATION,
            format!("Token {api_token}"),
        )
        .send()
        .map_err(|e| MapFlowError::Download(format!("request for {url} failed: {e}")))?;

    if response.status().as_u16() != 200 {
        return Err(MapFlowError::Download(format!(
            "received non-200 response for {url}: {}",
            response.status()
        )));
    }

    let tmp = tmp_sibling(path);
    let mut file = fs::File::create(&tmp)?;
    io::copy(&mut response, &mut file)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

// `Path::with_extension` would truncate result ids containing dots.
fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
