//! Book Synchronization
//!
//! Drives one pass over the source records. Every book ends up with exactly one page in
//! the document store, keyed by title, whose "Highlights" sub-page is archived and
//! recreated on each run. Derived content is replaced, never merged.
//!
//! Per page: `Absent -> Created -> MetadataSynced -> HighlightsReplaced -> SummaryAppended`.
//!
//! Records are processed strictly one after another. Failures are contained at the
//! narrowest scope: a failed append batch is logged and skipped, a failed page write
//! aborts only that record.

use std::time::Instant;

use tracing::Instrument;

use crate::blocks::{self, ContentBlock};
use crate::config::Language;
use crate::cover::CoverResolver;
use crate::error::SyncError;
use crate::kobo::SourceReader;
use crate::model::{AnnotationRecord, SourceRecord};
use crate::notion::{BookProperties, DocumentStore, MAX_APPEND_BLOCKS, Page, Parent, Properties};
use crate::summary::Summarizer;
use crate::unpack_error;

pub enum SyncResult<T> {
    Created(T),
    Updated(T),
    Error,
}

impl<T> SyncResult<T> {
    pub fn record(self, stats: &mut SyncStats) -> Option<T> {
        match self {
            SyncResult::Created(v) => {
                stats.created += 1;
                Some(v)
            }
            SyncResult::Updated(v) => {
                stats.updated += 1;
                Some(v)
            }
            SyncResult::Error => {
                stats.failed += 1;
                None
            }
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncStats {
    pub created: i32,
    pub updated: i32,
    pub failed: i32,
    pub skipped: i32,
    pub blocks_written: i32,
    pub failed_batches: i32,
    pub summaries: i32,
    pub summary_failures: i32,
}

impl SyncStats {
    pub fn synced(&self) -> i32 {
        self.created + self.updated
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub batches: usize,
    pub failed_batches: usize,
    pub blocks_written: usize,
}

#[derive(Debug, Clone)]
pub struct SummaryOptions {
    pub language: Language,
    pub replace_existing: bool,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub batch_size: usize,
    pub category: String,
    pub highlights_title: String,
    /// `None` turns summarization off.
    pub summary: Option<SummaryOptions>,
    pub only_title: Option<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: MAX_APPEND_BLOCKS,
            category: "Books".to_string(),
            highlights_title: "Highlights".to_string(),
            summary: None,
            only_title: None,
        }
    }
}

/// The two pages a record writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPages {
    pub main: Page,
    pub highlights: Page,
}

struct Replaced {
    pages: TargetPages,
    annotations: Vec<AnnotationRecord>,
    report: BatchReport,
}

pub fn log_write_error(page_id: &str, batch: usize, size: usize, e: &dyn std::error::Error) {
    tracing::error!(
        page_id,
        batch,
        size,
        error = %unpack_error(e),
        "failed to append blocks, batch skipped"
    );
}

/// Appends `blocks` in order, at most `batch_size` per call. A failed call is logged and
/// the remaining batches still go out.
pub async fn append_in_batches(
    store: &dyn DocumentStore,
    page_id: &str,
    blocks: &[ContentBlock],
    batch_size: usize,
) -> BatchReport {
    let mut report = BatchReport::default();
    let size = batch_size.clamp(1, MAX_APPEND_BLOCKS);

    for (i, batch) in blocks.chunks(size).enumerate() {
        report.batches += 1;
        match store.append_children(page_id, batch).await {
            Ok(()) => report.blocks_written += batch.len(),
            Err(e) => {
                report.failed_batches += 1;
                log_write_error(page_id, i, batch.len(), &e);
            }
        }
    }

    report
}

pub struct Syncer<'a> {
    store: &'a dyn DocumentStore,
    source: &'a dyn SourceReader,
    covers: &'a dyn CoverResolver,
    summarizer: Option<&'a dyn Summarizer>,
    options: SyncOptions,
}

impl<'a> Syncer<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        source: &'a dyn SourceReader,
        covers: &'a dyn CoverResolver,
        options: SyncOptions,
    ) -> Self {
        Self {
            store,
            source,
            covers,
            summarizer: None,
            options,
        }
    }

    pub fn with_summarizer(mut self, summarizer: &'a dyn Summarizer) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub async fn sync(&self, records: &[SourceRecord]) -> SyncStats {
        let run = tracing::info_span!("sync", books = records.len());
        let mut stats = SyncStats::default();

        tracing::info!(parent: &run, "starting bookmark synchronization");

        for record in records {
            if let Some(only) = &self.options.only_title {
                if &record.title != only {
                    stats.skipped += 1;
                    continue;
                }
            }

            let span = tracing::info_span!(parent: &run, "book", title = %record.title);
            self.sync_record(record, &mut stats).instrument(span).await;
        }

        tracing::info!(
            parent: &run,
            synced = stats.synced(),
            failed = stats.failed,
            failed_batches = stats.failed_batches,
            "all {} books processed",
            records.len() - stats.skipped as usize
        );
        stats
    }

    async fn sync_record(&self, record: &SourceRecord, stats: &mut SyncStats) {
        tracing::info!("syncing bookmarks");
        let started = Instant::now();

        let outcome = match self.replace_highlights(record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %unpack_error(&e), "record aborted");
                SyncResult::<()>::Error.record(stats);
                return;
            }
        };

        let Some(Replaced {
            pages,
            annotations,
            report,
        }) = outcome.record(stats)
        else {
            return;
        };
        stats.blocks_written += report.blocks_written as i32;
        stats.failed_batches += report.failed_batches as i32;

        if report.failed_batches > 0 {
            tracing::warn!(
                failed = report.failed_batches,
                batches = report.batches,
                "some highlight batches were not written"
            );
        }
        tracing::info!(
            "synced {} bookmarks in {:.2} seconds",
            report.blocks_written,
            started.elapsed().as_secs_f64()
        );

        if let (Some(summarizer), Some(options)) = (self.summarizer, &self.options.summary) {
            self.append_summary(summarizer, options, record, &pages.main, &annotations, stats)
                .await;
        }
    }

    /// Steps up to and including the highlights write. Returns the record's pages, its
    /// annotations for the summary step, and how the batches went.
    async fn replace_highlights(
        &self,
        record: &SourceRecord,
    ) -> Result<SyncResult<Replaced>, SyncError> {
        // Read local data before touching the store so a bad read leaves the page alone.
        let annotations = self
            .source
            .annotations_for_title(&record.title)
            .await
            .map_err(SyncError::Source)?;

        let cover = self.resolve_cover(record).await;
        let (pages, created) = self.upsert_pages(record, cover.as_deref()).await?;

        let rendered = blocks::render(&annotations);
        let report = append_in_batches(
            self.store,
            &pages.highlights.id,
            &rendered,
            self.options.batch_size,
        )
        .await;

        let value = Replaced {
            pages,
            annotations,
            report,
        };
        Ok(if created {
            SyncResult::Created(value)
        } else {
            SyncResult::Updated(value)
        })
    }

    async fn resolve_cover(&self, record: &SourceRecord) -> Option<String> {
        match self.covers.lookup(&record.title, &record.isbn).await {
            Ok(cover) => cover,
            Err(e) => {
                tracing::warn!("cover lookup failed, continuing without cover: {:#}", e);
                None
            }
        }
    }

    /// Finds or creates the book page and gives it a fresh, empty highlights sub-page.
    /// The returned flag is true when the book page was created.
    async fn upsert_pages(
        &self,
        record: &SourceRecord,
        cover: Option<&str>,
    ) -> Result<(TargetPages, bool), SyncError> {
        let properties = Properties::Book(BookProperties::from_record(record, &self.options.category));

        let existing = self
            .store
            .query_by_title(&record.title)
            .await
            .map_err(SyncError::Lookup)?;

        let (main, created) = match existing {
            Some(page) => {
                self.store
                    .update_page(&page.id, Some(&properties), cover, cover)
                    .await
                    .map_err(SyncError::page("update"))?;
                self.archive_highlights(&page).await?;
                (page, false)
            }
            None => {
                let page = self
                    .store
                    .create_page(&Parent::Database, &properties, cover, cover)
                    .await
                    .map_err(SyncError::page("create"))?;
                tracing::info!(page_id = %page.id, "created page");
                (page, true)
            }
        };

        let highlights = self
            .store
            .create_page(
                &Parent::Page(main.id.clone()),
                &Properties::Title(self.options.highlights_title.clone()),
                None,
                None,
            )
            .await
            .map_err(SyncError::page("create highlights"))?;

        Ok((TargetPages { main, highlights }, created))
    }

    async fn archive_highlights(&self, page: &Page) -> Result<(), SyncError> {
        let children = self
            .store
            .list_children(&page.id)
            .await
            .map_err(SyncError::page("list children of"))?;

        for child in children
            .iter()
            .filter(|c| c.is_page_titled(&self.options.highlights_title))
        {
            self.store
                .archive(child)
                .await
                .map_err(SyncError::page("archive highlights"))?;
            tracing::debug!(block_id = %child.id, "archived old highlights");
        }

        Ok(())
    }

    async fn append_summary(
        &self,
        summarizer: &dyn Summarizer,
        options: &SummaryOptions,
        record: &SourceRecord,
        main: &Page,
        annotations: &[AnnotationRecord],
        stats: &mut SyncStats,
    ) {
        tracing::info!("summarizing bookmarks");
        let started = Instant::now();

        let source = blocks::summary_source(annotations);
        let markup = match summarizer
            .summarize(&record.title, &source, options.language)
            .await
        {
            Ok(markup) => markup,
            Err(e) => {
                stats.summary_failures += 1;
                tracing::error!("summarization failed, page keeps its highlights: {:#}", e);
                return;
            }
        };
        tracing::info!(
            "summarized bookmarks in {:.2} seconds",
            started.elapsed().as_secs_f64()
        );

        if options.replace_existing {
            if let Err(e) = self.archive_body(main).await {
                stats.summary_failures += 1;
                tracing::error!(error = %unpack_error(&e), "could not clear previous summary");
                return;
            }
        }

        let started = Instant::now();
        let summary_blocks = blocks::compile(&markup);
        let report =
            append_in_batches(self.store, &main.id, &summary_blocks, self.options.batch_size).await;

        stats.blocks_written += report.blocks_written as i32;
        stats.failed_batches += report.failed_batches as i32;
        stats.summaries += 1;
        tracing::info!(
            blocks = summary_blocks.len(),
            "synced summary in {:.2} seconds",
            started.elapsed().as_secs_f64()
        );
    }

    /// Archives every live top-level block of the page except sub-pages.
    async fn archive_body(&self, page: &Page) -> Result<(), SyncError> {
        let children = self
            .store
            .list_children(&page.id)
            .await
            .map_err(SyncError::page("list children of"))?;

        for child in children.iter().filter(|c| !c.is_page()) {
            self.store
                .archive(child)
                .await
                .map_err(SyncError::page("archive summary of"))?;
        }
        Ok(())
    }
}
