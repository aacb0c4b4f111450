//! Environment discovery: container images under a root, or the local host.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::error::Result;
use crate::runner::{DEFAULT_TIMEOUT, Exec, ShellRunner};
use crate::source::default_sources;

use super::environment::Environment;
use super::registry::EnvironmentSet;

/// How environments are found and executed.
#[derive(Debug, Clone)]
pub struct DiscoverOptions {
    /// Directory scanned for container images. `None` inventories the
    /// local host instead.
    pub image_dir: Option<PathBuf>,
    /// File extension identifying an image.
    pub image_extension: String,
    /// Container runtime used to run commands inside an image.
    pub runtime_binary: String,
    /// Per-command timeout.
    pub timeout: Duration,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            image_dir: None,
            image_extension: "img".to_string(),
            runtime_binary: "singularity".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Find container images under `root`, shortest identifier first so the
/// cheapest environments come up before the big ones. Equal lengths sort
/// lexicographically to keep the order reproducible.
pub fn find_images(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/**/*.{}", root.display(), extension);
    let mut images = Vec::new();
    for entry in glob::glob(&pattern)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?
    {
        match entry {
            Ok(path) if path.is_file() => images.push(path),
            Ok(_) => {}
            Err(err) => warn!("skipping unreadable path during image discovery: {err}"),
        }
    }
    images.sort_by(|a, b| {
        a.as_os_str()
            .len()
            .cmp(&b.as_os_str().len())
            .then_with(|| a.cmp(b))
    });
    Ok(images)
}

/// Build the environment set: one environment per discovered image, or a
/// single local-host environment when no image directory is configured.
pub fn build_environments(options: &DiscoverOptions) -> Result<EnvironmentSet> {
    let mut set = EnvironmentSet::new();
    match &options.image_dir {
        Some(root) => {
            for image in find_images(root, &options.image_extension)? {
                let identifier = image.display().to_string();
                debug!("discovered image `{identifier}`");
                // Container runtimes write mount warnings to stderr, which
                // must not end up in the captured listing.
                let runner = ShellRunner::new(options.timeout).merge_stderr(false);
                let prefix = format!("{} exec {} ", options.runtime_binary, identifier);
                let exec = Exec::new(Arc::new(runner)).with_prefix(prefix);
                set.register(Environment::new(identifier, exec, default_sources()));
            }
        }
        None => {
            let exec = Exec::new(Arc::new(ShellRunner::new(options.timeout)));
            set.register(Environment::new(
                local_identifier(),
                exec,
                default_sources(),
            ));
        }
    }
    Ok(set)
}

/// Best-effort hostname for the local environment's identifier.
fn local_identifier() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|name| !name.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn images_are_sorted_shortest_identifier_first() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("bb.img"));
        touch(&dir.path().join("a.img"));
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub").join("c.img"));
        touch(&dir.path().join("notes.txt"));

        let images = find_images(dir.path(), "img").unwrap();
        let names: Vec<String> = images
            .iter()
            .map(|path| {
                path.strip_prefix(dir.path())
                    .unwrap()
                    .display()
                    .to_string()
            })
            .collect();
        assert_eq!(names, ["a.img", "bb.img", "sub/c.img"]);
    }

    #[test]
    fn equal_length_identifiers_sort_lexicographically() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.img"));
        touch(&dir.path().join("a.img"));

        let images = find_images(dir.path(), "img").unwrap();
        assert!(images[0].ends_with("a.img"));
    }

    #[test]
    fn only_the_configured_extension_matches() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.img"));
        touch(&dir.path().join("b.sif"));

        let images = find_images(dir.path(), "sif").unwrap();
        assert_eq!(images.len(), 1);
        assert!(images[0].ends_with("b.sif"));
    }

    #[test]
    fn directories_named_like_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("fake.img")).unwrap();
        touch(&dir.path().join("real.img"));

        let images = find_images(dir.path(), "img").unwrap();
        assert_eq!(images.len(), 1);
        assert!(images[0].ends_with("real.img"));
    }

    #[test]
    fn one_environment_per_discovered_image() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.img"));
        touch(&dir.path().join("bb.img"));

        let options = DiscoverOptions {
            image_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let set = build_environments(&options).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.identifiers()[0].ends_with("a.img"));
    }

    #[test]
    fn an_empty_image_dir_yields_an_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let options = DiscoverOptions {
            image_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert!(build_environments(&options).unwrap().is_empty());
    }

    #[test]
    fn without_an_image_dir_the_local_host_is_inventoried() {
        let set = build_environments(&DiscoverOptions::default()).unwrap();
        assert_eq!(set.len(), 1);
        assert!(!set.identifiers()[0].is_empty());
    }
}
