//! Subcommand implementations

use anyhow::{bail, Context, Result};
use blobfile::{
    BinaryBlobFile, BlobError, BlobFile, BlobLocation, BlobStore, Mode, ObjectStoreBackend,
    OpenOptions, TextBlobFile,
};
use std::fs;
use std::io::{self, Read, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Open `url`, failing with `NotFound` when the object does not exist
fn open_existing<M: Mode>(url: &str, options: OpenOptions) -> Result<BlobFile<M>> {
    let location = BlobLocation::parse(url)?;
    let backend = ObjectStoreBackend::from_location(&location, &options)
        .with_context(|| format!("Failed to connect to {}", location))?;
    if !backend.exists(&location)? {
        return Err(BlobError::NotFound(location.name()).into());
    }
    Ok(BlobFile::open(Arc::new(backend), location, options)?)
}

pub fn cat(url: &str, options: OpenOptions, lines: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if lines {
        let mut file: TextBlobFile = open_existing(url, options)?;
        for line in &mut file {
            out.write_all(line?.as_bytes())?;
        }
        file.close()?;
    } else {
        let mut file: BinaryBlobFile = open_existing(url, options)?;
        let contents = file.read(None)?;
        debug!("Read {} bytes from {}", contents.len(), file.name());
        out.write_all(&contents)?;
        file.close()?;
    }

    out.flush()?;
    Ok(())
}

pub fn put(url: &str, options: OpenOptions, input: Option<&Path>) -> Result<()> {
    let data = match input {
        Some(path) => fs::read(path).with_context(|| format!("Failed to read {:?}", path))?,
        None => {
            let mut data = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut data)
                .context("Failed to read stdin")?;
            data
        }
    };

    let file: BinaryBlobFile = blobfile::open_url(url, options)?;
    file.scope(|file| -> Result<()> {
        file.write(&data)?;
        info!("Uploaded {} bytes to {}", data.len(), file.name());
        Ok(())
    })
}

pub fn truncate(url: &str, options: OpenOptions, size: u64) -> Result<()> {
    let mut file: BinaryBlobFile = open_existing(url, options)?;
    // The push cuts at the cursor, so start from the end of the content
    let original = file.seek(SeekFrom::End(0))?;
    let truncated = file.truncate(Some(size))?;
    file.close()?;

    info!("Truncated {} from {} to {} bytes", file.name(), original, truncated);
    Ok(())
}

pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{:?} already exists; pass --force to overwrite", path);
    }
    fs::write(path, OpenOptions::default_config_content())
        .with_context(|| format!("Failed to write {:?}", path))?;
    info!("Wrote sample options to {:?}", path);
    Ok(())
}
