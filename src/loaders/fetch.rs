use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::LoadError;

/// Read size between progress reports
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Where a URL's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Remote(String),
}

impl Source {
    /// Classify a URL: `http(s)://` is remote, `file://` and bare paths are
    /// local, any other scheme is rejected.
    pub fn parse(url: &str) -> Result<Self, LoadError> {
        let lower = url.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Source::Remote(url.to_string()));
        }
        if lower.starts_with("file://") {
            return Ok(Source::File(PathBuf::from(&url["file://".len()..])));
        }
        if let Some(scheme_end) = url.find("://") {
            let scheme = &url[..scheme_end];
            if scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
                return Err(LoadError::UnsupportedScheme(url.to_string()));
            }
        }
        Ok(Source::File(PathBuf::from(url)))
    }

    /// Directory for resolving relative references, local files only
    pub fn base_dir(&self) -> Option<&Path> {
        match self {
            Source::File(path) => path.parent(),
            Source::Remote(_) => None,
        }
    }

    /// Resolve `relative` against this source's location
    pub fn join(&self, relative: &str) -> Source {
        match self {
            Source::File(path) => Source::File(
                path.parent()
                    .map(|dir| dir.join(relative))
                    .unwrap_or_else(|| PathBuf::from(relative)),
            ),
            Source::Remote(url) => {
                let base = url.split(['?', '#']).next().unwrap_or(url);
                let dir = match base.rfind('/') {
                    Some(idx) => &base[..=idx],
                    None => base,
                };
                Source::Remote(format!("{dir}{relative}"))
            }
        }
    }

    /// Last path segment without its extension
    pub fn stem(&self) -> String {
        let name = match self {
            Source::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Source::Remote(url) => url
                .split(['?', '#'])
                .next()
                .and_then(|u| u.rsplit('/').next())
                .unwrap_or_default()
                .to_string(),
        };
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => name,
        }
    }
}

/// Fetch all bytes behind `source`, reporting percent loaded per chunk when
/// the total size is known.
pub fn fetch(source: &Source, progress: &mut dyn FnMut(f32)) -> Result<Vec<u8>, LoadError> {
    match source {
        Source::File(path) => {
            let io_err = |e| LoadError::Io {
                path: path.display().to_string(),
                source: e,
            };
            let file = File::open(path).map_err(io_err)?;
            let total = file.metadata().ok().map(|m| m.len());
            read_chunks(file, total, progress).map_err(io_err)
        }
        Source::Remote(url) => {
            log::debug!("GET {}", url);
            let response = ureq::get(url).call().map_err(|e| LoadError::Http {
                url: url.clone(),
                reason: e.to_string(),
            })?;
            let total = response
                .header("Content-Length")
                .and_then(|v| v.trim().parse::<u64>().ok());
            read_chunks(response.into_reader(), total, progress).map_err(|e| LoadError::Http {
                url: url.clone(),
                reason: e.to_string(),
            })
        }
    }
}

fn read_chunks(
    mut reader: impl Read,
    total: Option<u64>,
    progress: &mut dyn FnMut(f32),
) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(total.unwrap_or(0).min(256 * 1024 * 1024) as usize);
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        bytes.extend_from_slice(&chunk[..n]);
        if let Some(total) = total.filter(|t| *t > 0) {
            progress((bytes.len() as f64 / total as f64 * 100.0).min(100.0) as f32);
        }
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn classifies_urls() {
        assert_eq!(
            Source::parse("https://example.com/a.hdr").unwrap(),
            Source::Remote("https://example.com/a.hdr".into())
        );
        assert_eq!(
            Source::parse("file:///tmp/a.glb").unwrap(),
            Source::File(PathBuf::from("/tmp/a.glb"))
        );
        assert_eq!(
            Source::parse("assets/a.glb").unwrap(),
            Source::File(PathBuf::from("assets/a.glb"))
        );
        assert!(matches!(
            Source::parse("ftp://example.com/a.glb"),
            Err(LoadError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn joins_relative_references() {
        let remote = Source::Remote("https://host/models/helmet/Helmet.gltf?v=2".into());
        assert_eq!(
            remote.join("Helmet.bin"),
            Source::Remote("https://host/models/helmet/Helmet.bin".into())
        );

        let local = Source::File(PathBuf::from("assets/helmet/Helmet.gltf"));
        assert_eq!(
            local.join("tex/a.png"),
            Source::File(PathBuf::from("assets/helmet/tex/a.png"))
        );
    }

    #[test]
    fn stem_strips_extension() {
        assert_eq!(Source::parse("a/b/burning_dragon.glb").unwrap().stem(), "burning_dragon");
        assert_eq!(Source::Remote("https://x/y/DamagedHelmet.gltf".into()).stem(), "DamagedHelmet");
    }

    #[test]
    fn progress_reported_per_chunk_when_total_known() {
        let data = vec![7u8; CHUNK_SIZE * 2 + 10];
        let mut reports = Vec::new();

        let bytes = read_chunks(Cursor::new(data.clone()), Some(data.len() as u64), &mut |p| reports.push(p))
            .unwrap();

        assert_eq!(bytes, data);
        assert!(!reports.is_empty());
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(reports.last().copied(), Some(100.0));
    }

    #[test]
    fn no_progress_without_total() {
        let mut reports = 0;
        read_chunks(Cursor::new(vec![1u8; 10]), None, &mut |_| reports += 1).unwrap();
        assert_eq!(reports, 0);
    }

    #[test]
    fn missing_file_is_io_error() {
        let source = Source::parse("definitely/not/here.glb").unwrap();
        assert!(matches!(fetch(&source, &mut |_| {}), Err(LoadError::Io { .. })));
    }
}
