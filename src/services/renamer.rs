//! RenameCopier — lists every object under the search prefix, rewrites its
//! key with a [`RenameRule`] and issues one server-side copy per object,
//! strictly one request at a time.

use crate::{
    errors::{RenameError, RenameResult},
    models::{object_ref::ObjectRef, rename_rule::RenameRule},
    services::{listing::list_objects, store::ObjectStore},
};
use clap::ValueEnum;
use futures::{TryStreamExt, pin_mut};
use std::{
    collections::HashSet,
    io::{self, Write},
};
use tracing::{debug, error, info, warn};

/// What to do when a single copy fails. Listing failures always abort.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CopyErrorPolicy {
    /// Stop the run at the first failed copy.
    #[default]
    Abort,
    /// Log the failure, keep copying, and fail the run at the end.
    Continue,
}

/// Everything a run needs besides the store itself.
#[derive(Clone, Debug)]
pub struct RenamePlan {
    pub source_bucket: String,
    pub destination_bucket: String,
    pub search_prefix: String,
    pub rule: RenameRule,
    pub page_size: Option<i32>,
    pub on_copy_error: CopyErrorPolicy,
    pub skip_unchanged: bool,
    pub dry_run: bool,
}

/// Counters reported at the end of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub listed: usize,
    pub copied: usize,
    /// Copies a dry run would have issued.
    pub planned: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Decision {
    Copy,
    Skip(&'static str),
}

pub struct RenameCopier<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    plan: &'a RenamePlan,
}

impl<'a, S: ObjectStore + ?Sized> RenameCopier<'a, S> {
    pub fn new(store: &'a S, plan: &'a RenamePlan) -> Self {
        Self { store, plan }
    }

    fn decide(
        &self,
        source: &ObjectRef,
        destination: &ObjectRef,
        written: &HashSet<String>,
    ) -> Decision {
        if written.contains(&source.key) {
            return Decision::Skip("object was written earlier in this run");
        }
        if !self.plan.rule.leaves_unchanged(&source.key) {
            return Decision::Copy;
        }
        if self.plan.skip_unchanged {
            Decision::Skip("key does not contain the old identifier")
        } else if source == destination {
            Decision::Skip("copy would target the source object itself")
        } else {
            Decision::Copy
        }
    }

    /// Run to completion, writing one `Copied ...` line per copy to `out`.
    ///
    /// Returns the run summary, or the first error under
    /// [`CopyErrorPolicy::Abort`]. Under [`CopyErrorPolicy::Continue`] every
    /// object is attempted and [`RenameError::CopiesFailed`] is returned if
    /// any copy failed.
    pub async fn run<W: Write>(&self, out: &mut W) -> RenameResult<RunSummary> {
        let plan = self.plan;
        info!(
            source = %plan.source_bucket,
            destination = %plan.destination_bucket,
            prefix = %plan.search_prefix,
            old = %plan.rule.old_identifier,
            new = %plan.rule.new_identifier,
            dry_run = plan.dry_run,
            "starting rename-copy"
        );

        let mut summary = RunSummary::default();
        // Copies into the source bucket can show up later in the same
        // listing; they must not be renamed again.
        let track_written = plan.source_bucket == plan.destination_bucket;
        let mut written = HashSet::new();
        let listing = list_objects(
            self.store,
            &plan.source_bucket,
            &plan.search_prefix,
            plan.page_size,
        );
        pin_mut!(listing);

        while let Some(source) = listing.try_next().await? {
            summary.listed += 1;
            let destination = ObjectRef::new(
                plan.destination_bucket.as_str(),
                plan.rule.apply(&source.key),
            );

            if let Decision::Skip(reason) = self.decide(&source, &destination, &written) {
                warn!(object = %source, reason, "skipping object");
                summary.skipped += 1;
                continue;
            }

            if plan.dry_run {
                write_line(out, format_args!("Would copy {} to {}", source, destination));
                summary.planned += 1;
                continue;
            }

            debug!(from = %source, to = %destination, "copying object");
            match self.store.copy_object(&source, &destination).await {
                Ok(()) => {
                    write_line(out, format_args!("Copied {} to {}", source, destination));
                    summary.copied += 1;
                    if track_written {
                        written.insert(destination.key);
                    }
                }
                Err(err) => {
                    summary.failed += 1;
                    match plan.on_copy_error {
                        CopyErrorPolicy::Abort => {
                            error!(error = %err, code = ?err.code(), "copy failed; aborting run");
                            return Err(err.into());
                        }
                        CopyErrorPolicy::Continue => {
                            error!(error = %err, code = ?err.code(), "copy failed; continuing");
                        }
                    }
                }
            }
        }

        info!(
            listed = summary.listed,
            copied = summary.copied,
            planned = summary.planned,
            skipped = summary.skipped,
            failed = summary.failed,
            "rename-copy finished"
        );

        if summary.failed > 0 {
            return Err(RenameError::CopiesFailed {
                failed: summary.failed,
                attempted: summary.copied + summary.failed,
            });
        }
        Ok(summary)
    }
}

/// Copy lines are the tool's output; a closed stdout must not abort a run
/// halfway through the copies.
fn write_line<W: Write>(out: &mut W, line: std::fmt::Arguments<'_>) {
    if let Err(err) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
        if err.kind() != io::ErrorKind::BrokenPipe {
            debug!("failed to write copy line: {}", err);
        }
    }
}
