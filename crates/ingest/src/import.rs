use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use tracing::{info, warn};
use xesload_core::config::Config;
use xesload_core::error::{Result, XesError};
use xesload_core::model::ImportSummary;
use xesload_core::store::RowStore;
use xesload_store::Store;

use crate::loader::{LoadConfig, LoadEngine};
use crate::parser::parse;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub struct Source {
    pub reader: Box<dyn BufRead + Send>,
    pub bytes: u64,
    pub gzip: bool,
}

/// Opens an XES document, transparently decompressing gzip input detected by
/// its magic bytes rather than by file name.
pub fn open_source(path: &Path) -> Result<Source> {
    let file = File::open(path)
        .map_err(|e| XesError::Io(format!("failed to open {}: {e}", path.display())))?;
    let bytes = file
        .metadata()
        .map(|m| m.len())
        .map_err(|e| XesError::Io(format!("failed to stat {}: {e}", path.display())))?;

    let mut reader = BufReader::new(file);
    let head = reader
        .fill_buf()
        .map_err(|e| XesError::Io(format!("failed to read {}: {e}", path.display())))?;
    let gzip = head.starts_with(&GZIP_MAGIC);

    let reader: Box<dyn BufRead + Send> = if gzip {
        Box::new(BufReader::new(MultiGzDecoder::new(reader)))
    } else {
        Box::new(reader)
    };
    Ok(Source {
        reader,
        bytes,
        gzip,
    })
}

/// Parses `source` straight into `store` on the calling thread. Any failure rolls
/// back everything written by this import.
pub fn import_reader<R, S>(source: R, store: S, cfg: LoadConfig) -> Result<ImportSummary>
where
    R: BufRead,
    S: RowStore,
{
    let mut engine = LoadEngine::new(store, cfg)?;
    match parse(source, &mut engine) {
        Ok(_) => Ok(engine.summary()),
        Err(err) => {
            if let Err(rollback_err) = engine.abort() {
                warn!(error = %rollback_err, "rollback after failed import also failed");
            }
            Err(err)
        }
    }
}

pub fn import_file(path: &Path, store: &Store, cfg: &Config) -> Result<ImportSummary> {
    let source = open_source(path)?;
    info!(
        path = %path.display(),
        bytes = source.bytes,
        gzip = source.gzip,
        "importing event log"
    );
    if cfg.reset_before_import {
        store.reset()?;
    }
    let writer = store.writer()?;
    import_reader(source.reader, writer, LoadConfig::from(cfg))
}
