//! Runner: one end-to-end ingestion cycle
//!
//! Inventory is processed before reservations. Inventory ingestion is a
//! full replace: a pre-statement deactivates every existing row inside
//! the same transaction as the insert of the new snapshot. Reservation
//! batches go through a staging table and a left-anti-join merge so
//! re-ingesting a file never duplicates rows; `rejected_imports` is
//! append-only by design. After its batches are committed the drop-file
//! is renamed into the success directory.

use anyhow::{Context as _, Result};
use tracing::{error, info};

use revpipe_config::PipelineConfig;
use revpipe_extract::{ArchiveLayout, Extractor, FileInfo, InventoryExtract, ReservationExtract};
use revpipe_store::{InsertOptions, StoreEngine};

const INVENTORY_DEACTIVATE: &str = "UPDATE inventory SET is_active = FALSE";

/// Drives one cycle: extract, persist, archive.
pub struct Runner<'a> {
    config: &'a PipelineConfig,
    engine: &'a dyn StoreEngine,
    archive: ArchiveLayout,
}

impl<'a> Runner<'a> {
    pub fn new(config: &'a PipelineConfig, engine: &'a dyn StoreEngine) -> Self {
        Self {
            config,
            engine,
            archive: ArchiveLayout::new(&config.archive_path),
        }
    }

    /// One ingestion cycle. Errors returned here are cycle-level; the
    /// scheduler logs them and keeps going.
    pub fn run(&self) -> Result<()> {
        info!("Ingestion started!");
        let extractor = revpipe_extract::for_config(self.config)?;

        if let Some(extract) = extractor.extract_inventory()? {
            self.ingest_inventory(extract)?;
        }

        let extracts = extractor.extract_reservations()?;
        if !extracts.is_empty() {
            info!(batches = extracts.len(), "Processing reservation records...");
            for (index, extract) in extracts.into_iter().enumerate() {
                info!(batch = index + 1, "Processing reservations batch");
                if let Err(err) = self.ingest_reservations(extract) {
                    // One bad file must not poison the rest of the cycle.
                    error!(error = %err, "Reservations batch failed");
                }
            }
        }

        Ok(())
    }

    fn ingest_inventory(&self, extract: InventoryExtract) -> Result<()> {
        info!(
            file = %extract.file.original_filename,
            rows = extract.batch.len(),
            "Processing inventory records..."
        );

        let inserted = self.engine.insert_rows(
            "inventory",
            &extract.batch,
            InsertOptions::safe().with_pre(INVENTORY_DEACTIVATE),
        )?;
        info!(rows = inserted, "Inventory snapshot replaced");

        self.commit_to_success(&extract.file)
    }

    fn ingest_reservations(&self, extract: ReservationExtract) -> Result<()> {
        info!("Processing rejected reservations...");
        self.engine
            .insert_rows("rejected_imports", &extract.rejected, InsertOptions::safe())?;

        info!("Processing reservations...");
        self.engine.insert_rows(
            "staging_reservation_imports",
            &extract.imports,
            InsertOptions::safe()
                .with_pre(
                    "CREATE TEMP TABLE staging_reservation_imports AS \
                     SELECT * FROM reservation_imports WHERE 1=0",
                )
                .with_post(
                    "INSERT INTO reservation_imports \
                     SELECT stg.* \
                     FROM staging_reservation_imports AS stg \
                     LEFT JOIN reservation_imports AS tbl \
                     ON tbl.reservation_hash = stg.reservation_hash \
                     WHERE tbl.reservation_hash IS NULL",
                ),
        )?;

        info!("Processing reservation stay dates...");
        self.engine.insert_rows(
            "staging_reservation_stay_dates",
            &extract.stay_dates,
            InsertOptions::safe()
                .with_pre(
                    "CREATE TEMP TABLE staging_reservation_stay_dates AS \
                     SELECT * FROM reservation_stay_dates WHERE 1=0",
                )
                .with_post(
                    "INSERT INTO reservation_stay_dates \
                     SELECT stg.* \
                     FROM staging_reservation_stay_dates AS stg \
                     LEFT JOIN reservation_stay_dates AS tbl \
                     ON tbl.reservation_hash = stg.reservation_hash \
                     AND tbl.stay_date_hash = stg.stay_date_hash \
                     WHERE tbl.reservation_hash IS NULL",
                ),
        )?;

        self.commit_to_success(&extract.file)
    }

    /// Final lifecycle step: the processed file leaves tmp for success.
    fn commit_to_success(&self, file: &FileInfo) -> Result<()> {
        let success_path = self.archive.success_path(&file.original_filename);
        std::fs::create_dir_all(self.archive.success_dir()).with_context(|| {
            format!("creating success directory '{}'", self.archive.success_dir().display())
        })?;
        std::fs::rename(&file.temporary_filepath, &success_path).with_context(|| {
            format!(
                "archiving '{}' to '{}'",
                file.temporary_filepath.display(),
                success_path.display()
            )
        })?;
        info!(file = %success_path.display(), "Done!");
        Ok(())
    }
}
