//! Structure materialization.
//! Walks a validated [`Spec`] depth-first, pre-order, and creates every node on disk,
//! producing one human-readable log line per created or skipped node.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::spec::{validate_relative_path, Node, NodeKind, Spec};

/// Observer notified with each log line as the run advances.
pub trait Progress: Send + Sync {
    fn on_line(&self, line: &str);
}

impl<F> Progress for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_line(&self, line: &str) {
        self(line)
    }
}

/// Result of one materialization run.
///
/// `log` lists, in traversal order, everything that was created or skipped. When
/// `ok` is false the last line is tagged `error:` and `error` holds the cause;
/// entities created before the failure stay on disk.
#[derive(Debug, Default)]
pub struct Outcome {
    pub ok: bool,
    pub log: Vec<String>,
    pub error: Option<Error>,
}

impl Outcome {
    /// Human-readable single-line status.
    pub fn message(&self) -> String {
        match &self.error {
            None => format!("Structure created ({} entries)", self.log.len()),
            Some(err) => format!("Structure creation failed: {err}"),
        }
    }

    pub fn into_result(self) -> Result<Vec<String>> {
        match self.error {
            None => Ok(self.log),
            Some(err) => Err(err),
        }
    }
}

/// Creates spec nodes on disk.
#[derive(Clone, Default)]
pub struct Materializer {
    progress: Option<Arc<dyn Progress>>,
}

impl std::fmt::Debug for Materializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Materializer").field("progress", &self.progress.is_some()).finish()
    }
}

impl Materializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Materializes `spec` below `root`.
    ///
    /// The first I/O failure aborts the remainder of the run. Unknown node kinds
    /// and permission failures are logged and do not abort.
    pub fn materialize<P: AsRef<Path>>(&self, root: P, spec: &Spec) -> Outcome {
        let root = root.as_ref();
        debug!("Materializing {} nodes into {}", spec.node_count(), root.display());

        let mut run = Run {
            log: Vec::new(),
            progress: self.progress.as_deref(),
        };
        match run.walk(root, spec.nodes()) {
            Ok(()) => Outcome {
                ok: true,
                log: run.log,
                error: None,
            },
            Err(err) => {
                run.fail(&err);
                Outcome {
                    ok: false,
                    log: run.log,
                    error: Some(err),
                }
            }
        }
    }
}

struct Run<'a> {
    log: Vec<String>,
    progress: Option<&'a dyn Progress>,
}

impl Run<'_> {
    fn walk(&mut self, root: &Path, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            self.create(root, node)?;
        }
        Ok(())
    }

    fn create(&mut self, root: &Path, node: &Node) -> Result<()> {
        validate_relative_path(&node.path).map_err(Error::ConfigError)?;
        let path = root.join(&node.path);
        // A symlink node may replace a link at its own path; nothing may be written through one.
        let link_allowed = matches!(node.kind, NodeKind::Symlink { .. });
        reject_symlinked_components(root, Path::new(&node.path), link_allowed)?;

        match &node.kind {
            NodeKind::Directory { children } => {
                fs::create_dir_all(&path).map_err(|e| Error::filesystem(&path, e))?;
                self.record(format!("created directory: {}", path.display()));
                let walked = self.walk(&path, children);
                // Applied once the subtree is done, even when a child failed, so restrictive
                // modes do not block children.
                self.apply_permissions(&path, node.permissions);
                walked?;
            }
            NodeKind::File { content } => {
                create_parent(&path)?;
                fs::write(&path, content).map_err(|e| Error::filesystem(&path, e))?;
                self.record(format!("created file: {}", path.display()));
                self.apply_permissions(&path, node.permissions);
            }
            NodeKind::Symlink { target } => {
                create_parent(&path)?;
                let resolved = resolve_link_target(&path, Path::new(target));
                if !resolved.exists() {
                    return Err(Error::filesystem(
                        &path,
                        io::Error::new(
                            io::ErrorKind::NotFound,
                            format!("symlink target '{}' does not exist", target),
                        ),
                    ));
                }
                create_symlink(Path::new(target), &path)
                    .map_err(|e| Error::filesystem(&path, e))?;
                self.record(format!("created symlink: {} -> {}", path.display(), target));
            }
            NodeKind::Unknown { kind } => {
                self.warn(format!("unknown type '{}' for {}, skipped", kind, path.display()));
            }
        }
        Ok(())
    }

    fn apply_permissions(&mut self, path: &Path, permissions: Option<u32>) {
        let Some(mode) = permissions else {
            return;
        };
        if let Err(e) = set_mode(path, mode) {
            self.warn(format!(
                "failed to set permissions {:o} on {}: {}",
                mode,
                path.display(),
                e
            ));
        }
    }

    fn record(&mut self, line: String) {
        info!("{}", line);
        self.push(line);
    }

    fn warn(&mut self, line: String) {
        warn!("{}", line);
        self.push(format!("warning: {line}"));
    }

    fn fail(&mut self, err: &Error) {
        error!("{}", err);
        self.push(format!("error: {err}"));
    }

    fn push(&mut self, line: String) {
        if let Some(progress) = self.progress {
            progress.on_line(&line);
        }
        self.log.push(line);
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
    }
    Ok(())
}

/// Fails when an existing component of `relative` below `root` is a symlink.
///
/// The last component may be a symlink when `allow_last` is set.
fn reject_symlinked_components(root: &Path, relative: &Path, allow_last: bool) -> Result<()> {
    let mut current = root.to_path_buf();
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        current.push(component);
        let is_last = components.peek().is_none();
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() && !(is_last && allow_last) => {
                return Err(Error::filesystem(
                    &current,
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "refusing to write through a symlink",
                    ),
                ));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => return Err(Error::filesystem(&current, e)),
        }
    }
    Ok(())
}

/// Location a symlink at `link` pointing at `target` refers to.
fn resolve_link_target(link: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        return target.to_path_buf();
    }
    match link.parent() {
        Some(parent) => parent.join(target),
        None => target.to_path_buf(),
    }
}

/// Creates `link` pointing at `target`, replacing an existing symlink at `link`.
pub(crate) fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    if let Ok(meta) = fs::symlink_metadata(link) {
        if !meta.file_type().is_symlink() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "an entry that is not a symlink already exists",
            ));
        }
        fs::remove_file(link).or_else(|_| fs::remove_dir(link))?;
    }
    symlink(target, link)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    if resolve_link_target(link, target).is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(not(any(unix, windows)))]
fn symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

// Only the write bits map onto a platform without POSIX modes.
#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(mode & 0o222 == 0);
    fs::set_permissions(path, permissions)
}
