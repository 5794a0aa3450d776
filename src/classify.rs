//! Recognizes which supported site a URL belongs to.

use serde::Serialize;
use url::Url;

const NAVER_BLOG_HOST: &str = "blog.naver.com";
const NAVER_POST_HOST: &str = "post.naver.com";
const SBSKPOP_HOST: &str = "sbskpop.kr";
const SBS_PROGRAM_HOST: &str = "programs.sbs.co.kr";
const WEVERSE_HOST: &str = "weverse.io";
const BERRIZ_HOST: &str = "berriz.in";
const UNKNOWN_ID: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    NaverBlog,
    NaverPost,
    Sbskpop,
    SbsProgram,
    Weverse,
    Berriz,
    Unknown,
}

impl SiteKind {
    pub fn label(self) -> &'static str {
        match self {
            SiteKind::NaverBlog => "Naver Blog",
            SiteKind::NaverPost => "Naver Post",
            SiteKind::Sbskpop => "SBS K-Pop Magazine",
            SiteKind::SbsProgram => "SBS Program",
            SiteKind::Weverse => "Weverse",
            SiteKind::Berriz => "Berriz",
            SiteKind::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteMatch {
    pub kind: SiteKind,
    pub primary_id: Option<String>,
    pub secondary_id: Option<String>,
}

impl SiteMatch {
    fn new(kind: SiteKind, primary: Option<&str>, secondary: Option<&str>) -> Self {
        Self {
            kind,
            primary_id: primary.map(str::to_string),
            secondary_id: secondary.map(str::to_string),
        }
    }

    pub fn unknown() -> Self {
        Self::new(SiteKind::Unknown, None, None)
    }
}

pub fn classify(url: &str) -> SiteMatch {
    let url = url.trim();
    let Ok(parsed) = Url::parse(url) else {
        return SiteMatch::unknown();
    };
    let host = parsed.host_str().unwrap_or("");
    // Identifiers come from the text as typed; `Url` would percent-encode them.
    let (path, query) = raw_path_and_query(url);
    let segments = path_segments(path);

    if host == NAVER_BLOG_HOST && segments.len() >= 2 && is_ascii_number(segments[1]) {
        return SiteMatch::new(SiteKind::NaverBlog, Some(segments[0]), Some(segments[1]));
    }

    if let (Some(blog_id), Some(log_no)) =
        (raw_query_value(query, "blogId="), raw_query_value(query, "logNo="))
    {
        return SiteMatch::new(SiteKind::NaverBlog, Some(blog_id), Some(log_no));
    }

    if host.contains(NAVER_POST_HOST) {
        if let Some(volume_no) = raw_query_value(query, "volumeNo=") {
            return SiteMatch::new(SiteKind::NaverPost, None, Some(volume_no));
        }
    }

    if host.contains(SBSKPOP_HOST) {
        let id = segments
            .first()
            .copied()
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_ID);
        return SiteMatch::new(SiteKind::Sbskpop, Some(id), None);
    }

    if host.contains(SBS_PROGRAM_HOST) {
        let board_no = parsed
            .query_pairs()
            .find(|(k, v)| k == "board_no" && !v.is_empty())
            .map(|(_, v)| v.into_owned())
            .unwrap_or_else(|| UNKNOWN_ID.to_string());
        return SiteMatch::new(SiteKind::SbsProgram, Some(&board_no), None);
    }

    if host.contains(WEVERSE_HOST) {
        return match segments.as_slice() {
            [artist, "media", post, ..] => {
                SiteMatch::new(SiteKind::Weverse, Some(*artist), Some(*post))
            }
            [artist, ..] => SiteMatch::new(SiteKind::Weverse, Some(*artist), None),
            [] => SiteMatch::new(SiteKind::Weverse, Some(UNKNOWN_ID), None),
        };
    }

    if host.contains(BERRIZ_HOST) {
        return match segments.as_slice() {
            [_, artist, "media", _, post, ..] => {
                SiteMatch::new(SiteKind::Berriz, Some(*artist), Some(*post))
            }
            [_, artist, ..] => SiteMatch::new(SiteKind::Berriz, Some(*artist), None),
            _ => SiteMatch::new(SiteKind::Berriz, Some(UNKNOWN_ID), None),
        };
    }

    SiteMatch::unknown()
}

/// Path and query of `url` exactly as written: the path starts after the authority and runs
/// to `?` or `#`, the query runs from `?` to `#`.
fn raw_path_and_query(url: &str) -> (&str, &str) {
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority_end = after_scheme.find(['/', '?', '#']).unwrap_or(after_scheme.len());
    let rest = &after_scheme[authority_end..];
    let rest = rest.split('#').next().unwrap_or("");
    match rest.split_once('?') {
        Some((path, query)) => (path, query),
        None => (rest, ""),
    }
}

/// Splits a URL path into segments after trimming outer slashes. Inner empty segments
/// (from `//`) are kept so positions line up with the raw path.
fn path_segments(path: &str) -> Vec<&str> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').collect()
}

fn is_ascii_number(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Substring after the first `marker` up to the next `&`. Not a query parser:
/// malformed queries still yield whatever follows the marker.
fn raw_query_value<'a>(query: &'a str, marker: &str) -> Option<&'a str> {
    let (_, rest) = query.split_once(marker)?;
    Some(rest.split('&').next().unwrap_or(""))
}
