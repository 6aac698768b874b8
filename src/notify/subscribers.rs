//! Subscriber sheet: a single-column CSV of email addresses with a header row.
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Deduplicated active addresses.
    async fn read(&self) -> Result<BTreeSet<String>>;
    /// `Ok(false)` when the address is already subscribed.
    async fn add(&self, email: &str) -> Result<bool>;
}

pub fn is_valid_email(email: &str) -> bool {
    email.contains('@')
}

pub struct CsvSubscriberStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvSubscriberStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Blank, header-like and address-less cells are skipped; the rest trimmed.
fn read_sheet(path: &Path) -> Result<BTreeSet<String>> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "subscriber sheet not found; treating as empty");
        return Ok(BTreeSet::new());
    }
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("open subscriber sheet {}", path.display()))?;

    let mut out = BTreeSet::new();
    for row in rdr.records() {
        let row = row.context("read subscriber row")?;
        if let Some(cell) = row.get(0).map(str::trim) {
            if is_valid_email(cell) {
                out.insert(cell.to_string());
            }
        }
    }
    Ok(out)
}

fn append_row(path: &Path, email: &str) -> Result<()> {
    let fresh = !path.exists() || std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open subscriber sheet {}", path.display()))?;
    if !fresh && !ends_with_newline(&mut file)? {
        file.write_all(b"\n").context("terminate last subscriber row")?;
    }
    let mut w = csv::Writer::from_writer(file);
    if fresh {
        w.write_record(["email"])?;
    }
    w.write_record([email])?;
    w.flush().context("flush subscriber sheet")?;
    Ok(())
}

/// Hand-edited sheets often lack a final newline.
fn ends_with_newline(file: &mut std::fs::File) -> Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1)).context("seek subscriber sheet")?;
    file.read_exact(&mut last).context("read subscriber sheet")?;
    Ok(last[0] == b'\n')
}

#[async_trait]
impl SubscriberStore for CsvSubscriberStore {
    async fn read(&self) -> Result<BTreeSet<String>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_sheet(&path))
            .await
            .context("subscriber read task")?
    }

    async fn add(&self, email: &str) -> Result<bool> {
        let email = email.trim().to_string();
        if !is_valid_email(&email) {
            bail!("invalid email address: {email:?}");
        }
        let _guard = self.write_lock.lock().await;
        if self.read().await?.contains(&email) {
            return Ok(false);
        }
        let path = self.path.clone();
        let added = email.clone();
        tokio::task::spawn_blocking(move || append_row(&path, &added))
            .await
            .context("subscriber write task")??;
        tracing::info!(email = email.as_str(), "subscriber added");
        Ok(true)
    }
}
