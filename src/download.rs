use crate::classify::{classify, SiteKind, SiteMatch};
use crate::document::ParsedDocument;
use crate::extract::extract_images;
use crate::fetch::{FetchRequest, Transport};
use crate::paths::{file_exists, image_filename, sanitize_title, OutputPaths, FALLBACK_TITLE};
use crate::{EngineError, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use url::Url;

const NAVER_POST_VIEW_URL: &str = "https://blog.naver.com/PostView.naver";
const SBS_PROGRAM_HOST: &str = "programs.sbs.co.kr";
const SBS_PROGRAM_MOBILE_HOST: &str = "m.programs.sbs.co.kr";

/// What to fetch for a classified URL and what to call the output folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePlan {
    pub site: SiteMatch,
    pub title: String,
    pub request: FetchRequest,
}

pub fn plan_site(url: &str, site: SiteMatch) -> SitePlan {
    let primary = site.primary_id.as_deref();
    let secondary = site.secondary_id.as_deref();

    let (request, title) = match site.kind {
        SiteKind::NaverBlog => {
            // The post body lives in the PostView iframe, not the outer blog page.
            let iframe_url = format!(
                "{NAVER_POST_VIEW_URL}?blogId={}&logNo={}",
                primary.unwrap_or(""),
                secondary.unwrap_or("")
            );
            (FetchRequest::new(iframe_url, false, false), secondary)
        }
        SiteKind::NaverPost => (FetchRequest::new(url, true, false), secondary),
        SiteKind::Sbskpop => (FetchRequest::new(url, false, false), primary),
        SiteKind::SbsProgram => {
            let mobile_url = if url.contains(SBS_PROGRAM_MOBILE_HOST) {
                url.to_string()
            } else {
                url.replace(SBS_PROGRAM_HOST, SBS_PROGRAM_MOBILE_HOST)
            };
            (FetchRequest::new(mobile_url, true, false), primary)
        }
        SiteKind::Weverse | SiteKind::Berriz => {
            return SitePlan {
                title: artist_title(primary, secondary),
                request: FetchRequest::new(url, true, true),
                site,
            };
        }
        SiteKind::Unknown => (FetchRequest::new(url, false, false), None),
    };

    SitePlan {
        title: sanitize_title(title.unwrap_or(FALLBACK_TITLE)),
        request,
        site,
    }
}

fn artist_title(artist: Option<&str>, post: Option<&str>) -> String {
    let artist = artist.unwrap_or(FALLBACK_TITLE);
    let title = match post {
        Some(post) => format!("{artist}_{post}"),
        None => artist.to_string(),
    };
    sanitize_title(&title)
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadSummary {
    pub site: SiteKind,
    pub title: String,
    pub source_url: String,
    pub fetched_url: String,
    /// Unset when nothing was found and no folder was created.
    pub output_dir: Option<String>,
    pub images_found: usize,
    pub downloaded: usize,
    pub skipped_existing: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageStatus {
    Downloaded,
    SkippedExisting,
    HttpError(u16),
}

/// Runs one full pass for `url`: classify, fetch, extract, then save each image that is not
/// already on disk.
///
/// Events go to `log_line` as `(level, event, data)`; every `data` carries a `message`.
/// Only a failed page fetch (or a local filesystem error) ends the run with an error; failures
/// of individual images are logged and counted.
pub fn run_site_download<T, FLog>(
    url: &str,
    transport: &T,
    output: &OutputPaths,
    mut log_line: FLog,
) -> Result<DownloadSummary>
where
    T: Transport + ?Sized,
    FLog: FnMut(&str, &str, serde_json::Value) -> Result<()>,
{
    let url = url.trim();
    if url.is_empty() {
        return Err(EngineError::InvalidUrl("empty URL provided".to_string()));
    }

    let site = classify(url);
    let plan = plan_site(url, site);
    let kind = plan.site.kind;

    if kind == SiteKind::Unknown {
        log_line(
            "warn",
            "site_unrecognized",
            serde_json::json!({
                "message": format!("Site not recognized: {url}"),
                "url": url,
            }),
        )?;
    } else {
        log_line(
            "info",
            "site_detected",
            serde_json::json!({
                "message": format!("{} detected: {}", kind.label(), plan.title),
                "site": kind,
                "primary_id": plan.site.primary_id,
                "secondary_id": plan.site.secondary_id,
                "title": plan.title,
            }),
        )?;
    }

    let fetched_url = plan.request.url.clone();
    log_line(
        "info",
        "page_fetch_begin",
        serde_json::json!({
            "message": format!("Fetching page: {fetched_url}"),
            "url": fetched_url,
            "script": plan.request.needs_script_execution,
            "scroll": plan.request.needs_scroll,
        }),
    )?;

    let page = match transport.fetch_page(&plan.request) {
        Ok(page) => page,
        Err(err) => {
            log_line(
                "error",
                "page_fetch_failed",
                serde_json::json!({
                    "message": format!("Could not fetch {fetched_url}: {err}"),
                    "url": fetched_url,
                    "error": err.to_string(),
                }),
            )?;
            return Err(err);
        }
    };

    if let Some(reason) = &page.fallback_reason {
        log_line(
            "warn",
            "page_fetch_fallback",
            serde_json::json!({
                "message": format!("JavaScript rendering skipped ({reason}); using plain HTTP"),
                "reason": reason,
            }),
        )?;
    }
    log_line(
        "info",
        "page_fetched",
        serde_json::json!({
            "message": format!("Fetched {} bytes", page.html.len()),
            "mode": page.mode,
            "bytes": page.html.len(),
        }),
    )?;

    let document = ParsedDocument::parse(page.html);
    let extraction = extract_images(kind, &document, &fetched_url);
    for note in &extraction.notes {
        log_line(
            "info",
            "extraction_note",
            serde_json::json!({ "message": note }),
        )?;
    }
    log_line(
        "info",
        "extraction_done",
        serde_json::json!({
            "message": extraction.summary,
            "images": extraction.urls.len(),
        }),
    )?;

    let mut summary = DownloadSummary {
        site: kind,
        title: plan.title.clone(),
        source_url: url.to_string(),
        fetched_url: fetched_url.clone(),
        output_dir: None,
        images_found: extraction.urls.len(),
        downloaded: 0,
        skipped_existing: 0,
        failed: 0,
    };

    if extraction.urls.is_empty() {
        log_line(
            "warn",
            "no_images_found",
            serde_json::json!({ "message": "No images found to download" }),
        )?;
        return Ok(summary);
    }

    let dir = output.ensure_title_dir(&plan.title)?;
    summary.output_dir = Some(dir.to_string_lossy().to_string());
    log_line(
        "info",
        "download_begin",
        serde_json::json!({
            "message": format!("Found {} images to download", extraction.urls.len()),
            "output_dir": summary.output_dir,
        }),
    )?;

    for (index, image_url) in extraction.urls.iter().enumerate() {
        let filename = image_filename(image_url, index + 1);
        let request_url = resolve_image_url(image_url, &fetched_url);

        match save_image(transport, &request_url, &dir, &filename) {
            Ok(ImageStatus::Downloaded) => {
                summary.downloaded += 1;
                log_line(
                    "info",
                    "image_downloaded",
                    serde_json::json!({
                        "message": format!("Downloaded: {filename}"),
                        "file": filename,
                        "url": request_url,
                    }),
                )?;
            }
            Ok(ImageStatus::SkippedExisting) => {
                summary.skipped_existing += 1;
                log_line(
                    "info",
                    "image_skipped_exists",
                    serde_json::json!({
                        "message": format!("Skipped (exists): {filename}"),
                        "file": filename,
                    }),
                )?;
            }
            Ok(ImageStatus::HttpError(status)) => {
                summary.failed += 1;
                log_line(
                    "warn",
                    "image_http_error",
                    serde_json::json!({
                        "message": format!("Error {status}: {request_url}"),
                        "status": status,
                        "url": request_url,
                    }),
                )?;
            }
            Err(err) => {
                summary.failed += 1;
                log_line(
                    "warn",
                    "image_download_failed",
                    serde_json::json!({
                        "message": format!("Error downloading {request_url}: {err}"),
                        "url": request_url,
                        "error": err.to_string(),
                    }),
                )?;
            }
        }
    }

    log_line(
        "info",
        "download_done",
        serde_json::json!({
            "message": format!(
                "Done: {} downloaded, {} skipped, {} failed",
                summary.downloaded, summary.skipped_existing, summary.failed
            ),
            "downloaded": summary.downloaded,
            "skipped_existing": summary.skipped_existing,
            "failed": summary.failed,
        }),
    )?;

    Ok(summary)
}

/// Extracted URLs are kept as found; relative ones (generic pages) are resolved only for
/// the request itself.
fn resolve_image_url(image_url: &str, page_url: &str) -> String {
    if Url::parse(image_url).is_ok() {
        return image_url.to_string();
    }
    Url::parse(page_url)
        .and_then(|base| base.join(image_url))
        .map(|joined| joined.to_string())
        .unwrap_or_else(|_| image_url.to_string())
}

fn save_image<T>(transport: &T, url: &str, dir: &Path, filename: &str) -> Result<ImageStatus>
where
    T: Transport + ?Sized,
{
    if file_exists(dir, filename) {
        return Ok(ImageStatus::SkippedExisting);
    }

    let response = transport.fetch_image(url)?;
    if response.status != 200 {
        return Ok(ImageStatus::HttpError(response.status));
    }

    let written = write_new_file(&dir.join(filename), |file| {
        file.write_all(&response.body)?;
        file.flush()
    });
    match written {
        Ok(()) => Ok(ImageStatus::Downloaded),
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            Ok(ImageStatus::SkippedExisting)
        }
        Err(err) => Err(err.into()),
    }
}

/// Creates `path` (never replacing an existing file) and fills it with `write`. A partially
/// written file is removed so the next run does not mistake it for a finished download.
fn write_new_file<F>(path: &Path, write: F) -> std::io::Result<()>
where
    F: FnOnce(&mut std::fs::File) -> std::io::Result<()>,
{
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    if let Err(err) = write(&mut file) {
        drop(file);
        let _ = std::fs::remove_file(path);
        return Err(err);
    }
    Ok(())
}
