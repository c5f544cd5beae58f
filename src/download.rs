//! Fetch the two raw catalogs with the external `kaggle` CLI and unpack
//! the CSV each archive carries.

use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use zip::ZipArchive;

use crate::error::{PipelineError, Result};

/// A Kaggle dataset and the CSV we need out of its archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KaggleDataset {
    pub slug: &'static str,
    pub archive: &'static str,
    pub member: &'static str,
}

pub const GAMES_DATASET: KaggleDataset = KaggleDataset {
    slug: "fronkongames/steam-games-dataset",
    archive: "steam-games-dataset.zip",
    member: "games.csv",
};

pub const STORE_DATASET: KaggleDataset = KaggleDataset {
    slug: "nikdavis/steam-store-games",
    archive: "steam-store-games.zip",
    member: "steam.csv",
};

/// File names the games catalog is found under, most likely first.
pub const GAMES_FILE_NAMES: &[&str] = &["games.csv", "steam_games.csv", "steam-games.csv"];
pub const STORE_FILE_NAMES: &[&str] = &["steam.csv", "steam_store_games.csv", "steam-store-games.csv"];

/// How many archive members to list when the expected one is absent.
const LISTED_MEMBERS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadOptions {
    /// Program invoked for downloads.
    pub kaggle_command: String,
    /// Download even when both CSVs are already present.
    pub force: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        DownloadOptions {
            kaggle_command: "kaggle".to_string(),
            force: false,
        }
    }
}

/// Paths of the two raw catalogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFiles {
    pub games: PathBuf,
    pub store: PathBuf,
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Where the Kaggle CLI looks for its token: `$KAGGLE_CONFIG_DIR/kaggle.json`
/// when set, else `~/.kaggle/kaggle.json`.
pub fn credentials_path() -> PathBuf {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    credentials_path_from(std::env::var_os("KAGGLE_CONFIG_DIR"), home)
}

fn credentials_path_from(config_dir: Option<OsString>, home: Option<OsString>) -> PathBuf {
    match config_dir {
        Some(dir) => PathBuf::from(dir).join("kaggle.json"),
        None => home
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("~"))
            .join(".kaggle")
            .join("kaggle.json"),
    }
}

pub fn check_credentials(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::MissingCredentials(path.to_path_buf()))
    }
}

// ---------------------------------------------------------------------------
// Locating and fetching sources
// ---------------------------------------------------------------------------

/// The first of `names` that exists in `dir`.
pub fn locate_file(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names.iter().map(|n| dir.join(n)).find(|p| p.is_file())
}

pub fn locate_sources(dir: &Path) -> Option<SourceFiles> {
    Some(SourceFiles {
        games: locate_file(dir, GAMES_FILE_NAMES)?,
        store: locate_file(dir, STORE_FILE_NAMES)?,
    })
}

/// Return the two catalogs in `dir`, downloading them first unless both
/// are present and `opts.force` is off.
pub fn ensure_sources(dir: &Path, opts: &DownloadOptions) -> Result<SourceFiles> {
    if !opts.force {
        if let Some(found) = locate_sources(dir) {
            info!(
                "Using existing {} and {}",
                found.games.display(),
                found.store.display()
            );
            return Ok(found);
        }
    }

    check_credentials(&credentials_path())?;
    fs::create_dir_all(dir)?;
    for dataset in [GAMES_DATASET, STORE_DATASET] {
        download_dataset(&dataset, dir, &opts.kaggle_command)?;
    }

    locate_sources(dir).ok_or_else(|| {
        PipelineError::Download(format!(
            "catalog CSVs not found in {} after download",
            dir.display()
        ))
    })
}

/// Run `kaggle datasets download` for one dataset and unpack its CSV.
pub fn download_dataset(dataset: &KaggleDataset, dir: &Path, kaggle: &str) -> Result<PathBuf> {
    info!("Downloading {} into {}", dataset.slug, dir.display());
    let status = Command::new(kaggle)
        .args(["datasets", "download", "-d", dataset.slug, "-p"])
        .arg(dir)
        .arg("--force")
        .status()
        .map_err(|e| PipelineError::Download(format!("could not run '{kaggle}': {e}")))?;
    if !status.success() {
        return Err(PipelineError::Download(format!(
            "'{kaggle}' exited with {status} for {}",
            dataset.slug
        )));
    }

    let archive = dir.join(dataset.archive);
    let extracted = extract_member(&archive, dataset.member, dir)?;
    if let Err(e) = fs::remove_file(&archive) {
        warn!("Could not remove {}: {e}", archive.display());
    }
    Ok(extracted)
}

/// Extract `member` from the archive into `dir`. When the archive has no
/// such entry, list its first members and extract everything.
pub fn extract_member(archive_path: &Path, member: &str, dir: &Path) -> Result<PathBuf> {
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    let target = dir.join(Path::new(member).file_name().unwrap_or(OsStr::new(member)));

    if archive.file_names().any(|n| n == member) {
        let mut entry = archive.by_name(member)?;
        let mut out = BufWriter::new(File::create(&target)?);
        io::copy(&mut entry, &mut out)?;
        out.flush()?;
        info!("Extracted {}", target.display());
        return Ok(target);
    }

    let listed: Vec<&str> = archive.file_names().take(LISTED_MEMBERS).collect();
    warn!(
        "{member} not found in {}; first members: {listed:?}. Extracting all",
        archive_path.display()
    );
    archive.extract(dir)?;
    Ok(target)
}
