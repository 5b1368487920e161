//! Artifact persistence for a finished MSM run.
//!
//! Purpose
//! -------
//! Publish the six artifacts of a run (transition matrix, reversible counts,
//! trimmed pre-reversible counts, state mapping, populations, and the fixed
//! assignments) as one unit: either all of them become visible or none do.
//!
//! Key behaviors
//! -------------
//! - [`ArtifactSink`] splits persistence into [`ArtifactSink::prepare`], run
//!   before any computation to reject unusable destinations, and
//!   [`ArtifactSink::persist`], run once every artifact exists.
//! - [`DirectorySink`] writes each artifact to a hidden temporary file in the
//!   target directory and renames them into place only after every write
//!   succeeded. Any failure removes the temporaries and anything already
//!   renamed.
//! - [`MemorySink`] renders the same bytes into memory, for embedding and
//!   tests.
//!
//! File formats
//! ------------
//! - `tProb.mtx`, `tCounts.mtx`, `tCounts.UnSym.mtx`: Matrix Market
//!   `coordinate real general`, 1-based indices.
//! - `Mapping.dat`: one integer per original state, `-1` for removed states.
//! - `Populations.dat`: one value per trimmed state in `%.18e` notation.
//! - `Assignments.Fixed.dat`: one trajectory per line, whitespace-separated
//!   labels, `-1` for unassigned frames.
use crate::msm::{
    core::{Assignments, SparseMatrix, StateMapping},
    errors::{MSMError, MSMResult},
};
use ndarray::Array1;
use std::{
    collections::BTreeMap,
    fmt::Write as _,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

/// One persisted output of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    TransitionMatrix,
    ReversibleCounts,
    TrimmedCounts,
    Mapping,
    Populations,
    Assignments,
}

impl ArtifactKind {
    /// Every artifact, in publication order.
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::TransitionMatrix,
        ArtifactKind::ReversibleCounts,
        ArtifactKind::TrimmedCounts,
        ArtifactKind::Mapping,
        ArtifactKind::Populations,
        ArtifactKind::Assignments,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::TransitionMatrix => "tProb.mtx",
            ArtifactKind::ReversibleCounts => "tCounts.mtx",
            ArtifactKind::TrimmedCounts => "tCounts.UnSym.mtx",
            ArtifactKind::Mapping => "Mapping.dat",
            ArtifactKind::Populations => "Populations.dat",
            ArtifactKind::Assignments => "Assignments.Fixed.dat",
        }
    }
}

/// Borrowed view of everything a run persists.
#[derive(Debug, Clone, Copy)]
pub struct Artifacts<'a> {
    pub transition: &'a SparseMatrix,
    pub reversible_counts: &'a SparseMatrix,
    pub trimmed_counts: &'a SparseMatrix,
    pub mapping: &'a StateMapping,
    pub populations: &'a Array1<f64>,
    pub assignments: &'a Assignments,
}

impl Artifacts<'_> {
    /// Serialized bytes of one artifact.
    pub fn render(&self, kind: ArtifactKind) -> String {
        match kind {
            ArtifactKind::TransitionMatrix => matrix_market(self.transition),
            ArtifactKind::ReversibleCounts => matrix_market(self.reversible_counts),
            ArtifactKind::TrimmedCounts => matrix_market(self.trimmed_counts),
            ArtifactKind::Mapping => lines(self.mapping.to_labels().iter()),
            ArtifactKind::Populations => {
                let mut out = String::new();
                for p in self.populations.iter() {
                    let _ = writeln!(out, "{p:.18e}");
                }
                out
            }
            ArtifactKind::Assignments => {
                let mut out = String::new();
                for traj in self.assignments.trajectories() {
                    let row: Vec<String> = traj.iter().map(i32::to_string).collect();
                    let _ = writeln!(out, "{}", row.join(" "));
                }
                out
            }
        }
    }
}

/// Destination for the artifacts of a run.
pub trait ArtifactSink {
    /// Validate the destination before any computation starts.
    fn prepare(&mut self) -> MSMResult<()>;

    /// Publish all artifacts, or none of them on error. Returns a
    /// description (path or key) of each published artifact.
    fn persist(&mut self, artifacts: &Artifacts<'_>) -> MSMResult<Vec<String>>;
}

/// Matrix Market `coordinate real general` text of `m`.
pub fn matrix_market(m: &SparseMatrix) -> String {
    let mut out = String::from("%%MatrixMarket matrix coordinate real general\n%\n");
    let _ = writeln!(out, "{} {} {}", m.n_rows(), m.n_cols(), m.nnz());
    for (i, j, v) in m.iter() {
        let _ = writeln!(out, "{} {} {v:e}", i + 1, j + 1);
    }
    out
}

fn lines<T: std::fmt::Display>(values: impl Iterator<Item = T>) -> String {
    let mut out = String::new();
    for v in values {
        let _ = writeln!(out, "{v}");
    }
    out
}

/// In-memory sink keyed by artifact file name.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: BTreeMap<&'static str, String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&str> {
        self.files.get(kind.file_name()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ArtifactSink for MemorySink {
    fn prepare(&mut self) -> MSMResult<()> {
        if let Some(name) = self.files.keys().next() {
            return Err(MSMError::OutputExists { path: (*name).to_string() });
        }
        Ok(())
    }

    fn persist(&mut self, artifacts: &Artifacts<'_>) -> MSMResult<Vec<String>> {
        let rendered: BTreeMap<&'static str, String> = ArtifactKind::ALL
            .iter()
            .map(|&kind| (kind.file_name(), artifacts.render(kind)))
            .collect();
        self.files = rendered;
        Ok(ArtifactKind::ALL.iter().map(|k| k.file_name().to_string()).collect())
    }
}

/// Sink writing the artifacts into an existing directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, kind: ArtifactKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    fn staging_path(&self, kind: ArtifactKind) -> PathBuf {
        self.dir.join(format!(".{}.{}.tmp", kind.file_name(), std::process::id()))
    }

    fn check_not_present(&self) -> MSMResult<()> {
        for kind in ArtifactKind::ALL {
            let path = self.path_of(kind);
            if path.exists() {
                return Err(MSMError::OutputExists { path: path.display().to_string() });
            }
        }
        Ok(())
    }
}

fn io_error(path: &Path, err: std::io::Error) -> MSMError {
    MSMError::Io { path: path.display().to_string(), reason: err.to_string() }
}

fn write_file(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

impl ArtifactSink for DirectorySink {
    /// # Errors
    /// - [`MSMError::OutputDirMissing`] if the directory does not exist.
    /// - [`MSMError::OutputExists`] if any artifact is already present.
    /// - [`MSMError::OutputNotWritable`] if a scratch file cannot be created.
    fn prepare(&mut self) -> MSMResult<()> {
        if !self.dir.is_dir() {
            return Err(MSMError::OutputDirMissing { path: self.dir.display().to_string() });
        }
        self.check_not_present()?;
        let scratch = self.dir.join(format!(".rust_msm_write_check.{}", std::process::id()));
        write_file(&scratch, "").map_err(|e| MSMError::OutputNotWritable {
            path: self.dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let _ = fs::remove_file(&scratch);
        Ok(())
    }

    fn persist(&mut self, artifacts: &Artifacts<'_>) -> MSMResult<Vec<String>> {
        self.check_not_present()?;

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(ArtifactKind::ALL.len());
        for kind in ArtifactKind::ALL {
            let tmp = self.staging_path(kind);
            if let Err(e) = write_file(&tmp, &artifacts.render(kind)) {
                let _ = fs::remove_file(&tmp);
                for (t, _) in &staged {
                    let _ = fs::remove_file(t);
                }
                return Err(io_error(&tmp, e));
            }
            staged.push((tmp, self.path_of(kind)));
        }

        let mut published: Vec<PathBuf> = Vec::with_capacity(staged.len());
        for (k, (tmp, target)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(tmp, target) {
                for p in &published {
                    let _ = fs::remove_file(p);
                }
                for (t, _) in &staged[k..] {
                    let _ = fs::remove_file(t);
                }
                return Err(io_error(target, e));
            }
            published.push(target.clone());
        }
        Ok(published.iter().map(|p| p.display().to_string()).collect())
    }
}
