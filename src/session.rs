//! Owns open-document buffers, the chosen project root and main source file,
//! and the last rebuild's program; orchestrates rebuilds.
//!
//! A rebuild replaces the whole symbol model and every loaded module's AST
//! from scratch — nothing from a prior rebuild is reused. Under
//! the single-threaded cooperative model query handlers only ever need a shared borrow of the last
//! built [`ResolvedProgram`]; only `open`/`close`/`rebuild` need `&mut self`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::loader::{self, SearchPaths};
use crate::resolver::{self, ResolvedProgram};

/// Directory entries or files that anchor project-root discovery when
/// walking upward from the workspace root.
const BUILD_MARKERS: &[&str] = &["vela.toml", ".git"];

pub struct Session {
    pub project_root: PathBuf,
    pub main_file: PathBuf,
    search: SearchPaths,
    /// Open-document text, keyed by canonical path. Shadows the on-disk text
    /// of the same path until the document is closed.
    buffers: HashMap<PathBuf, String>,
    program: Option<ResolvedProgram>,
}

impl Session {
    pub fn new(project_root: PathBuf, main_file: PathBuf) -> Self {
        let mut search = SearchPaths::new(project_root.clone());
        search.stdlib_dir = stdlib_dir_near(&project_root);
        Self {
            project_root,
            main_file,
            search,
            buffers: HashMap::new(),
            program: None,
        }
    }

    /// Discovers a project root and main source file from the workspace root
    /// handed to `initialize`.
    pub fn discover(workspace_root: &Path) -> Self {
        let project_root = find_project_root(workspace_root).unwrap_or_else(|| workspace_root.to_path_buf());
        let main_file = find_main_file(&project_root);
        debug!(root = %project_root.display(), main = %main_file.display(), "discovered project");
        Self::new(project_root, main_file)
    }

    /// Records (or replaces) an open document's buffer. Does not rebuild —
    /// callers trigger that separately on the exact rebuild triggers (open, save, initialized).
    pub fn open(&mut self, path: PathBuf, text: String) {
        self.buffers.insert(canonical(&path), text);
    }

    /// Replaces an already-open document's buffer in place, e.g. on
    /// `didSave` when the save carries full text.
    pub fn update(&mut self, path: &Path, text: String) {
        self.buffers.insert(canonical(path), text);
    }

    pub fn close(&mut self, path: &Path) {
        self.buffers.remove(&canonical(path));
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.buffers.contains_key(&canonical(path))
    }

    pub fn buffer(&self, path: &Path) -> Option<&str> {
        self.buffers.get(&canonical(path)).map(String::as_str)
    }

    /// Re-parses and re-resolves the whole program from the main file,
    /// discarding the previous symbol model entirely.
    pub fn rebuild(&mut self) {
        info!(main = %self.main_file.display(), "rebuilding program");
        let loaded = loader::load_program_with_overlay(&self.main_file, &self.search, &self.buffers);
        self.program = Some(resolver::resolve(loaded));
    }

    pub fn program(&self) -> Option<&ResolvedProgram> {
        self.program.as_ref()
    }

    /// Every open document's canonical path, for diagnostic republishing on
    /// rebuild.
    pub fn open_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.buffers.keys()
    }
}

pub fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(d) = dir {
        if BUILD_MARKERS.iter().any(|marker| d.join(marker).exists()) || d.join("src").is_dir() {
            return Some(d.to_path_buf());
        }
        dir = d.parent();
    }
    None
}

/// `src/<root-name>.vl` if present, else the first `.vl` file in `src/` in
/// sorted order for determinism.
fn find_main_file(project_root: &Path) -> PathBuf {
    let src = project_root.join("src");

    if let Some(root_name) = project_root.file_name().and_then(|n| n.to_str()) {
        let candidate = src.join(format!("{root_name}.vl"));
        if candidate.is_file() {
            return candidate;
        }
    }

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(&src)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|ext| ext == "vl").unwrap_or(false))
        .collect();
    candidates.sort();
    candidates.into_iter().next().unwrap_or_else(|| src.join("main.vl"))
}

fn stdlib_dir_near(project_root: &Path) -> Option<PathBuf> {
    let candidate = project_root.join("stdlib");
    candidate.is_dir().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tempdir(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("vela-session-test-{name}-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("src")).unwrap();
        dir
    }

    fn write(path: &Path, contents: &str) {
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn finds_main_file_named_after_the_project_root() {
        let root = tempdir("named");
        write(&root.join("src").join(format!(
            "{}.vl",
            root.file_name().unwrap().to_str().unwrap()
        )), "module exe Main;\nbegin\nend\n");
        let session = Session::discover(&root);
        assert_eq!(session.project_root, root);
        assert!(session.main_file.is_file());
    }

    #[test]
    fn falls_back_to_first_source_file_in_src() {
        let root = tempdir("fallback");
        write(&root.join("src").join("Zeta.vl"), "module lib Zeta;\n");
        write(&root.join("src").join("Alpha.vl"), "module lib Alpha;\n");
        let session = Session::discover(&root);
        assert_eq!(session.main_file.file_name().unwrap(), "Alpha.vl");
    }

    #[test]
    fn rebuild_sees_an_open_buffer_over_disk_contents() {
        let root = tempdir("overlay");
        let main = root.join("src").join("Main.vl");
        write(&main, "module exe Main;\nbegin\nend\n");

        let mut session = Session::new(root.clone(), main.clone());
        session.open(main.clone(), "module exe Main;\nconst X = 1;\nbegin\nend\n".to_string());
        session.rebuild();

        let program = session.program().unwrap();
        assert!(program.symbols.find_in_module("Main", "X").is_some());
    }
}
