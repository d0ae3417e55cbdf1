//! Flat delimited files addressed by row position: crawled page lists,
//! chapter menus and directory listings.

use std::fs;
use std::io;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use super::error::{StoreError, StoreResult};
use super::models::{ChapterReference, PageRecord};

/// How `read_at` interprets its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// The index-th row of a delimited file.
    Rows,
    /// The index-th entry name of a directory, sorted lexicographically.
    Directory,
}

/// Overwrites `path` with one `index,value` row per value, indices from 0.
pub fn write_indexed<P, I, S>(path: P, values: I) -> StoreResult<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let rows = values
        .into_iter()
        .enumerate()
        .map(|(index, value)| vec![index.to_string(), value.as_ref().to_string()]);
    write_rows(path, rows)
}

/// Overwrites `path` with the given rows, creating parent directories.
pub fn write_rows<P, R, S>(path: P, rows: impl IntoIterator<Item = R>) -> StoreResult<()>
where
    P: AsRef<Path>,
    R: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|err| StoreError::io(path, io::Error::from(err)))?;
    let mut written = 0usize;
    for row in rows {
        writer
            .write_record(row)
            .map_err(|err| StoreError::io(path, io::Error::from(err)))?;
        written += 1;
    }
    writer.flush().map_err(|err| StoreError::io(path, err))?;
    debug!(path = %path.display(), rows = written, "records written");
    Ok(())
}

pub fn read_all<P: AsRef<Path>>(path: P) -> StoreResult<Vec<Vec<String>>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|err| StoreError::format(path, err))?;
    reader
        .records()
        .map(|record| {
            record
                .map(|record| record.iter().map(str::to_string).collect())
                .map_err(|err| StoreError::format(path, err))
        })
        .collect()
}

/// Entry names of a directory in lexicographic order.
pub fn list_directory<P: AsRef<Path>>(path: P) -> StoreResult<Vec<String>> {
    let path = path.as_ref();
    let mut names = fs::read_dir(path)
        .map_err(|err| StoreError::io(path, err))?
        .map(|entry| {
            entry
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .map_err(|err| StoreError::io(path, err))
        })
        .collect::<StoreResult<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

/// The row (or directory entry, as a one-field row) at `index`. Never clamps.
pub fn read_at<P: AsRef<Path>>(path: P, index: usize, lookup: Lookup) -> StoreResult<Vec<String>> {
    let path = path.as_ref();
    let rows = match lookup {
        Lookup::Rows => read_all(path)?,
        Lookup::Directory => list_directory(path)?
            .into_iter()
            .map(|name| vec![name])
            .collect(),
    };
    let len = rows.len();
    rows.into_iter().nth(index).ok_or_else(|| StoreError::Index {
        path: path.to_path_buf(),
        index,
        len,
    })
}

/// Rows whose `column` matches `pattern`, case-insensitively, with their
/// positions. A directory path matches entry names. An empty pattern matches
/// every row; a pattern that is not a valid regex is matched literally.
pub fn find_matching<P: AsRef<Path>>(
    path: P,
    pattern: &str,
    column: usize,
) -> StoreResult<Vec<(usize, Vec<String>)>> {
    let path = path.as_ref();
    let (rows, column) = if path.is_dir() {
        let entries = list_directory(path)?
            .into_iter()
            .map(|name| vec![name])
            .collect::<Vec<_>>();
        (entries, 0)
    } else {
        (read_all(path)?, column)
    };
    let matcher = Matcher::new(pattern);
    Ok(rows
        .into_iter()
        .enumerate()
        .filter(|(_, row)| matcher.is_match(row.get(column).map(String::as_str)))
        .collect())
}

/// Page records of a crawled chapter file.
pub fn read_page_records<P: AsRef<Path>>(path: P) -> StoreResult<Vec<PageRecord>> {
    let path = path.as_ref();
    read_all(path)?
        .into_iter()
        .enumerate()
        .map(|(line, row)| match row.as_slice() {
            [index, value, ..] => index
                .trim()
                .parse::<usize>()
                .map(|index| PageRecord::new(index, value.as_str()))
                .map_err(|err| {
                    let reason = format!("line {}: bad index {index:?}: {err}", line + 1);
                    StoreError::format(path, reason)
                }),
            _ => Err(StoreError::format(
                path,
                format!("line {}: expected index and value", line + 1),
            )),
        })
        .collect()
}

/// Pages that were recorded with the error sentinel instead of an image.
pub fn find_errors<P: AsRef<Path>>(path: P, sentinel: &str) -> StoreResult<Vec<PageRecord>> {
    Ok(read_page_records(path)?
        .into_iter()
        .filter(|record| record.value == sentinel)
        .collect())
}

/// The chapter at row `identity` of a `title,url,last_update,state` menu file.
pub fn read_chapter<P: AsRef<Path>>(path: P, identity: usize) -> StoreResult<ChapterReference> {
    let path = path.as_ref();
    match read_at(path, identity, Lookup::Rows)?.as_slice() {
        [title, url, ..] if !url.trim().is_empty() => {
            Ok(ChapterReference::new(title.trim(), url.trim()))
        }
        _ => Err(StoreError::format(
            path,
            format!("chapter row {identity} has no url"),
        )),
    }
}

enum Matcher {
    All,
    Pattern(Regex),
    Literal(String),
}

impl Matcher {
    fn new(pattern: &str) -> Self {
        if pattern.is_empty() {
            return Matcher::All;
        }
        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => Matcher::Pattern(regex),
            Err(_) => Matcher::Literal(pattern.to_lowercase()),
        }
    }

    fn is_match(&self, field: Option<&str>) -> bool {
        match (self, field) {
            (Matcher::All, _) => true,
            (_, None) => false,
            (Matcher::Pattern(regex), Some(field)) => regex.is_match(field),
            (Matcher::Literal(needle), Some(field)) => field.to_lowercase().contains(needle),
        }
    }
}
