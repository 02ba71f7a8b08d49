//! Builds a local OSRM dataset for the container-backed tests: fetch the
//! Geofabrik extract once, then run extract/partition/customize through the
//! `osrm/osrm-backend` image.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

pub const OSRM_IMAGE: &str = "osrm/osrm-backend";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset io: {0}")]
    Io(#[from] io::Error),
    #[error("extract download: {0}")]
    Download(#[from] reqwest::Error),
    #[error("`{step}` exited with {status}")]
    Step { step: String, status: String },
}

/// A Geofabrik extract such as `europe/germany/berlin`.
#[derive(Debug, Clone)]
pub struct Extract {
    pub path: String,
}

impl Extract {
    pub fn berlin() -> Self {
        Self {
            path: "europe/germany/berlin".to_string(),
        }
    }

    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("region")
    }

    fn url(&self) -> String {
        format!("https://download.geofabrik.de/{}-latest.osm.pbf", self.path)
    }
}

#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub data_dir: PathBuf,
    /// `<name>-latest.osrm`, as passed to `osrm-routed`.
    pub osrm_file: String,
}

impl PreparedDataset {
    /// Seconds since the epoch of the partition file, used to key reusable
    /// containers to one preprocessing run.
    pub fn stamp(&self) -> u64 {
        fs::metadata(self.data_dir.join(format!("{}.partition", self.osrm_file)))
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|time| time.duration_since(std::time::SystemTime::UNIX_EPOCH).ok())
            .map_or(0, |elapsed| elapsed.as_secs())
    }
}

/// Prepares `extract` under `data_root`, skipping every step whose output
/// already exists.
pub fn prepare(
    extract: &Extract,
    data_root: impl AsRef<Path>,
) -> Result<PreparedDataset, DatasetError> {
    let data_root = data_root.as_ref();
    let data_root = if data_root.is_absolute() {
        data_root.to_path_buf()
    } else {
        std::env::current_dir()?.join(data_root)
    };
    let data_dir = data_root.join(extract.name());
    fs::create_dir_all(&data_dir)?;

    let pbf_file = format!("{}-latest.osm.pbf", extract.name());
    let osrm_file = format!("{}-latest.osrm", extract.name());

    let pbf_path = data_dir.join(&pbf_file);
    if !pbf_path.exists() {
        download(&extract.url(), &pbf_path)?;
    }
    if !data_dir.join(&osrm_file).exists() {
        let input = format!("/data/{pbf_file}");
        osrm_step(&data_dir, &["osrm-extract", "-p", "/opt/car.lua", &input])?;
    }
    let mld_files = ["partition", "mldgr", "cells"];
    if !mld_files
        .iter()
        .all(|suffix| data_dir.join(format!("{osrm_file}.{suffix}")).exists())
    {
        osrm_step(&data_dir, &["osrm-partition", &format!("/data/{osrm_file}")])?;
        osrm_step(&data_dir, &["osrm-customize", &format!("/data/{osrm_file}")])?;
    }

    Ok(PreparedDataset { data_dir, osrm_file })
}

fn download(url: &str, dest: &Path) -> Result<(), DatasetError> {
    eprintln!("downloading {url}");
    let bytes = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
    let partial = dest.with_extension("part");
    let mut writer = BufWriter::new(File::create(&partial)?);
    writer.write_all(&bytes)?;
    writer.flush()?;
    fs::rename(partial, dest)?;
    Ok(())
}

fn osrm_step(data_dir: &Path, args: &[&str]) -> Result<(), DatasetError> {
    let status = Command::new("docker")
        .args(["run", "--rm", "-t", "-v"])
        .arg(format!("{}:/data", data_dir.display()))
        .arg(OSRM_IMAGE)
        .args(args)
        .status()?;
    if status.success() {
        return Ok(());
    }
    Err(DatasetError::Step {
        step: args.first().copied().unwrap_or("osrm").to_string(),
        status: status.to_string(),
    })
}
