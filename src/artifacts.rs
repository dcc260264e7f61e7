//! Failure artifacts.
//!
//! Screenshots are written with a filename derived from the failing
//! scenario's name; collisions get a numeric suffix instead of clobbering
//! an earlier capture.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Write `bytes` under `dir` as `<slug>.png`, suffixing on collision.
pub fn write_screenshot(dir: &Path, scenario: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let slug = slugify(scenario);
    let mut path = dir.join(format!("{slug}.png"));
    let mut counter = 1u32;
    while path.exists() {
        counter += 1;
        path = dir.join(format!("{slug}-{counter}.png"));
    }
    write_atomic(&path, bytes)?;
    Ok(path)
}

fn slugify(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "scenario".to_string()
    } else {
        slug
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(tmp, path)?;
    Ok(())
}
