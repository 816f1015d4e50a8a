//! Tool location: find qpdf and Ghostscript, preferring binaries shipped
//! alongside the application over system-installed copies.
//!
//! Resolution order per tool:
//!
//! 1. The bundled tree — `$PDFSQUEEZE_TOOL_DIR` if set, else `tools/` next to
//!    the running executable — at `<root>/<tool>/bin/<tool>`.
//! 2. Each directory in `$PATH`, in order; first executable regular file wins.
//!
//! A bundled Ghostscript additionally gets resource discovery: its versioned
//! `share/ghostscript/<N.M>` tree supplies library paths, include paths, and
//! a font directory that are fed back into the command builder. A Ghostscript
//! found via PATH runs with its own built-in defaults instead.
//!
//! Results are cached process-wide — the bundle layout cannot change while
//! the application runs — but probe failures are never cached, so a user can
//! install a missing tool and retry without restarting.

use crate::error::SqueezeError;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Sentinel subdirectory that marks a usable Ghostscript resource root.
const RESOURCE_SENTINEL: &str = "Resource";

/// The external tools pdf-squeeze drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// qpdf — lossless structure rewriting.
    Qpdf,
    /// Ghostscript — lossy recompression and rasterisation.
    Ghostscript,
}

impl ToolKind {
    /// Executable file name.
    pub fn bin_name(self) -> &'static str {
        match self {
            ToolKind::Qpdf => "qpdf",
            ToolKind::Ghostscript => "gs",
        }
    }

    /// Subdirectory of the bundled tree that holds this tool.
    pub fn dir_name(self) -> &'static str {
        match self {
            ToolKind::Qpdf => "qpdf",
            ToolKind::Ghostscript => "gs",
        }
    }

    /// Name of the tool's `share/` resource directory, when it has one.
    fn share_name(self) -> Option<&'static str> {
        match self {
            ToolKind::Qpdf => None,
            ToolKind::Ghostscript => Some("ghostscript"),
        }
    }
}

/// Runtime resource tree of a bundled Ghostscript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBundle {
    /// Library search paths, exported as `GS_LIB`. Never empty.
    pub lib_paths: Vec<PathBuf>,
    /// Include search paths, passed as `-I` flags.
    pub include_paths: Vec<PathBuf>,
    /// Font directory, exported as `GS_FONTPATH` and passed as `-sFONTPATH`.
    pub font_path: Option<PathBuf>,
}

/// A located tool, ready to spawn.
#[derive(Debug, Clone)]
pub struct ResolvedTool {
    /// Absolute path to the executable.
    pub program: PathBuf,
    /// Resource tree for a bundled Ghostscript; `None` means the tool uses
    /// its own built-in defaults.
    pub bundle: Option<ResourceBundle>,
}

static QPDF: OnceCell<ResolvedTool> = OnceCell::new();
static GHOSTSCRIPT: OnceCell<ResolvedTool> = OnceCell::new();

/// Locate a tool, probing the filesystem at most once per process.
pub fn locate(kind: ToolKind) -> Result<ResolvedTool, SqueezeError> {
    let cell = match kind {
        ToolKind::Qpdf => &QPDF,
        ToolKind::Ghostscript => &GHOSTSCRIPT,
    };
    // get_or_try_init leaves the cell empty on Err, so a failed probe can be
    // retried after the user installs the missing tool.
    cell.get_or_try_init(|| probe(kind)).cloned()
}

fn probe(kind: ToolKind) -> Result<ResolvedTool, SqueezeError> {
    if let Some(root) = bundled_root() {
        if let Some(tool) = probe_bundled(&root, kind)? {
            info!("using bundled {} at {}", kind.bin_name(), tool.program.display());
            return Ok(tool);
        }
    }

    if let Some(path_var) = std::env::var_os("PATH") {
        if let Some(program) = find_in_search_path(kind.bin_name(), &path_var) {
            info!("using system {} at {}", kind.bin_name(), program.display());
            // Found outside the bundle: resource discovery is skipped and the
            // tool runs with its own built-in defaults.
            return Ok(ResolvedTool {
                program,
                bundle: None,
            });
        }
    }

    Err(SqueezeError::MissingBinary {
        tool: kind.bin_name().to_string(),
    })
}

/// Root of the bundled tool tree, if one can be determined.
fn bundled_root() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("PDFSQUEEZE_TOOL_DIR") {
        return Some(PathBuf::from(dir));
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|d| d.join("tools")))
}

/// Probe `<root>/<tool>/bin/<tool>`; `Ok(None)` when the bundle simply does
/// not ship this tool.
fn probe_bundled(root: &Path, kind: ToolKind) -> Result<Option<ResolvedTool>, SqueezeError> {
    let home = root.join(kind.dir_name());
    let program = home.join("bin").join(kind.bin_name());
    if !is_executable(&program) {
        return Ok(None);
    }

    let bundle = match kind.share_name() {
        Some(share_name) => Some(discover_resources(&home.join("share").join(share_name))?),
        None => None,
    };

    Ok(Some(ResolvedTool { program, bundle }))
}

/// Build a [`ResourceBundle`] from a tool's `share/<name>` directory.
///
/// Prefers the highest-versioned subdirectory; falls back to treating the
/// share directory itself as the resource root when it carries the
/// `Resource` sentinel (layouts that flatten the version level).
fn discover_resources(share_dir: &Path) -> Result<ResourceBundle, SqueezeError> {
    let resource_root = match versioned_resource_root(share_dir)? {
        Some(root) => root,
        None if share_dir.join(RESOURCE_SENTINEL).is_dir() => share_dir.to_path_buf(),
        None => {
            return Err(SqueezeError::MissingResources {
                share_dir: share_dir.to_path_buf(),
                detail: "no versioned subdirectory and no Resource directory".into(),
            })
        }
    };
    debug!("Ghostscript resource root: {}", resource_root.display());

    let lib_dir = resource_root.join("lib");
    let init_dir = resource_root.join("Init");

    let mut lib_paths = vec![resource_root.clone()];
    if lib_dir.is_dir() {
        lib_paths.push(lib_dir.clone());
    }

    let mut include_paths = vec![resource_root.clone()];
    if init_dir.is_dir() {
        include_paths.push(init_dir);
    }
    if lib_dir.is_dir() {
        include_paths.push(lib_dir);
    }

    // Modern layouts keep fonts inside the resource root; older bundles used
    // a fonts/ directory directly under share/.
    let font_candidates = [resource_root.join("Font"), share_dir.join("fonts")];
    let font_path = font_candidates.into_iter().find(|p| p.is_dir());

    Ok(ResourceBundle {
        lib_paths,
        include_paths,
        font_path,
    })
}

/// Among `share_dir`'s immediate subdirectories whose names start with a
/// digit, pick the highest version. Returns `Ok(None)` when no such
/// subdirectory exists; fails when the share directory itself cannot be read.
fn versioned_resource_root(share_dir: &Path) -> Result<Option<PathBuf>, SqueezeError> {
    let entries = std::fs::read_dir(share_dir).map_err(|e| SqueezeError::MissingResources {
        share_dir: share_dir.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut best: Option<(Vec<u32>, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            continue;
        }
        let key = version_key(&name);
        if best.as_ref().map_or(true, |(k, _)| key > *k) {
            best = Some((key, path));
        }
    }
    Ok(best.map(|(_, p)| p))
}

/// Dotted version name → numeric sort key, so `10.1` outranks `9.0`.
fn version_key(name: &str) -> Vec<u32> {
    name.split('.')
        .map(|part| {
            part.chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
                .parse()
                .unwrap_or(0)
        })
        .collect()
}

/// Walk the search-path variable and return the first executable regular
/// file with the given name.
fn find_in_search_path(bin_name: &str, path_var: &std::ffi::OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(path_var) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let candidate = dir.join(bin_name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
