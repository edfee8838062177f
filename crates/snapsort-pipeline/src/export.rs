//! Archive export: category folders plus a plain-text summary, as tar.gz.
//!
//! Entry layout:
//!
//! ```text
//! receipts/lunch_receipt_2026-10-18.jpg
//! receipts/lunch_receipt_2026-10-18_2.jpg
//! travel/beach_sunset_2026-10-18.png
//! summary.txt
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::Builder;
use tracing::{info, instrument};

use snapsort_core::defaults::{EXPORT_DATE_FORMAT, SUMMARY_FILE_NAME, UNCATEGORIZED};
use snapsort_core::{extension_for_media_type, sanitize_filename, Error, ImageResult, Item, Result};

use crate::normalize::slugify;

/// Where one item lands in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub index: usize,
    pub category: String,
    pub path: String,
}

/// Folder name for a category label.
pub fn folder_name(category: &str) -> String {
    let flattened = category.trim().replace(['/', '\\'], "_");
    if flattened.is_empty() {
        return UNCATEGORIZED.to_string();
    }
    sanitize_filename(&flattened)
}

fn file_extension(item: &Item, result: &ImageResult) -> String {
    let ext = extension_for_media_type(&item.media_type);
    if ext != "bin" {
        return ext.to_string();
    }
    result
        .original_name
        .as_deref()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| slugify(ext).to_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| ext.to_string())
}

/// Pair results with items by index, rejecting inconsistent input.
fn pair_up<'a>(items: &'a [Item], results: &'a [ImageResult]) -> Result<Vec<(&'a Item, &'a ImageResult)>> {
    if items.len() != results.len() {
        return Err(Error::InvalidInput(format!(
            "Got {} images but {} results",
            items.len(),
            results.len()
        )));
    }

    let mut by_index: Vec<Option<&ImageResult>> = vec![None; items.len()];
    for result in results {
        let slot = by_index.get_mut(result.index).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Result index {} is outside the batch of {}",
                result.index,
                items.len()
            ))
        })?;
        if slot.replace(result).is_some() {
            return Err(Error::InvalidInput(format!(
                "Result index {} appears more than once",
                result.index
            )));
        }
    }

    Ok(items
        .iter()
        .zip(by_index)
        .filter_map(|(item, result)| result.map(|r| (item, r)))
        .collect())
}

/// Compute archive paths, one per item, in index order.
pub fn plan_archive(
    items: &[Item],
    results: &[ImageResult],
    date: NaiveDate,
) -> Result<Vec<ArchiveEntry>> {
    let date = date.format(EXPORT_DATE_FORMAT).to_string();
    let mut used = HashSet::new();

    pair_up(items, results)?
        .into_iter()
        .enumerate()
        .map(|(index, (item, result))| {
            let folder = folder_name(&result.analysis.category);
            let stem = match slugify(&result.analysis.content) {
                s if s.is_empty() => format!("image_document_{}", index + 1),
                s => s,
            };
            let ext = file_extension(item, result);

            let mut path = format!("{}/{}_{}.{}", folder, stem, date, ext);
            let mut n = 2;
            while !used.insert(path.clone()) {
                path = format!("{}/{}_{}_{}.{}", folder, stem, date, n, ext);
                n += 1;
            }

            Ok(ArchiveEntry {
                index,
                category: folder,
                path,
            })
        })
        .collect()
}

/// Plain-text summary of an export.
pub fn summary_report(
    results: &[ImageResult],
    entries: &[ArchiveEntry],
    descriptions: &BTreeMap<String, String>,
    date: NaiveDate,
) -> String {
    let by_index: BTreeMap<usize, &ImageResult> = results.iter().map(|r| (r.index, r)).collect();
    let successful = results.iter().filter(|r| r.is_success()).count();

    let mut categories: Vec<(&str, usize)> = Vec::new();
    for entry in entries {
        match categories.iter_mut().find(|(name, _)| *name == entry.category) {
            Some((_, count)) => *count += 1,
            None => categories.push((&entry.category, 1)),
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "Snapsort Export Summary");
    let _ = writeln!(out, "=======================");
    let _ = writeln!(out, "Generated: {}", date.format(EXPORT_DATE_FORMAT));
    let _ = writeln!(out);
    let _ = writeln!(out, "Total images: {}", results.len());
    let _ = writeln!(out, "Successful: {}", successful);
    let _ = writeln!(out, "Failed: {}", results.len() - successful);
    let _ = writeln!(out);
    let _ = writeln!(out, "Categories ({}):", categories.len());
    for (name, count) in &categories {
        let noun = if *count == 1 { "image" } else { "images" };
        match descriptions.get(*name).filter(|d| !d.is_empty()) {
            Some(description) => {
                let _ = writeln!(out, "  - {} ({} {}): {}", name, count, noun, description);
            }
            None => {
                let _ = writeln!(out, "  - {} ({} {})", name, count, noun);
            }
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Details:");
    for entry in entries {
        let Some(result) = by_index.get(&entry.index) else {
            continue;
        };
        let status = if result.is_success() { "success" } else { "error" };
        let text = result.analysis.extracted_text.trim();
        let _ = writeln!(
            out,
            "  [{}] {} -> {}",
            entry.index + 1,
            result.original_name.as_deref().unwrap_or("(unnamed)"),
            entry.path
        );
        let _ = writeln!(
            out,
            "      Category: {} | Confidence: {}% | Status: {}",
            entry.category, result.analysis.confidence, status
        );
        let _ = writeln!(out, "      Text: {}", if text.is_empty() { "-" } else { text });
        if let Some(error) = &result.error_message {
            let _ = writeln!(out, "      Error: {}", error);
        }
    }
    out
}

fn append_file<W: std::io::Write>(
    tar: &mut Builder<W>,
    path: &str,
    data: &[u8],
    mtime: u64,
) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(mtime);
    header.set_cksum();
    tar.append_data(&mut header, path, data)
        .map_err(|e| Error::Archive(format!("Failed to add {}: {}", path, e)))
}

/// Build the tar.gz archive in memory.
///
/// `descriptions` maps category names to descriptions for the summary.
#[instrument(skip_all, fields(subsystem = "pipeline", component = "export", op = "build_archive", batch_size = items.len()))]
pub fn build_archive(
    items: &[Item],
    results: &[ImageResult],
    descriptions: &BTreeMap<String, String>,
    now: DateTime<Utc>,
) -> Result<Vec<u8>> {
    let date = now.date_naive();
    let entries = plan_archive(items, results, date)?;
    let summary = summary_report(results, &entries, descriptions, date);
    let mtime = now.timestamp().max(0) as u64;

    let mut archive = Vec::new();
    {
        let encoder = GzEncoder::new(&mut archive, Compression::default());
        let mut tar = Builder::new(encoder);

        for entry in &entries {
            append_file(&mut tar, &entry.path, &items[entry.index].data, mtime)?;
        }
        append_file(&mut tar, SUMMARY_FILE_NAME, summary.as_bytes(), mtime)?;

        tar.into_inner()
            .and_then(|encoder| encoder.finish())
            .map_err(|e| Error::Archive(format!("Failed to finalize archive: {}", e)))?;
    }

    info!(
        entries = entries.len(),
        archive_bytes = archive.len(),
        "Archive built"
    );
    Ok(archive)
}

/// Download name for an archive built on `date`.
pub fn archive_file_name(date: NaiveDate) -> String {
    format!("snapsort-{}.tar.gz", date.format(EXPORT_DATE_FORMAT))
}
