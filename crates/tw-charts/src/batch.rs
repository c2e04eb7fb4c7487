//! Independent chart jobs: each is attempted, failures are collected.

use std::path::{Path, PathBuf};

use tracing::{error, info};

type DrawFn<'a> = Box<dyn FnOnce(&Path) -> anyhow::Result<()> + 'a>;

/// One named chart and the closure that draws it to a path.
pub struct ChartJob<'a> {
    pub name: String,
    draw: DrawFn<'a>,
}

impl<'a> ChartJob<'a> {
    pub fn new(name: impl Into<String>, draw: impl FnOnce(&Path) -> anyhow::Result<()> + 'a) -> Self {
        Self {
            name: name.into(),
            draw: Box::new(draw),
        }
    }

    /// A job that always fails, for charts whose inputs are missing.
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(name, move |_| Err(anyhow::anyhow!(reason)))
    }
}

impl std::fmt::Debug for ChartJob<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartJob").field("name", &self.name).finish()
    }
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    pub rendered: Vec<PathBuf>,
    /// `(chart name, error message)`.
    pub failed: Vec<(String, String)>,
}

impl RenderReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: RenderReport) {
        self.rendered.extend(other.rendered);
        self.failed.extend(other.failed);
    }
}

/// Render every job to `<dir>/<name>.png`.
///
/// A failing job is logged and recorded; the batch carries on.
pub fn run(dir: &Path, jobs: Vec<ChartJob<'_>>) -> RenderReport {
    let mut report = RenderReport::default();
    if let Err(e) = std::fs::create_dir_all(dir) {
        error!("Cannot create {}: {}", dir.display(), e);
        report.failed = jobs
            .into_iter()
            .map(|j| (j.name, format!("output directory unavailable: {e}")))
            .collect();
        return report;
    }

    for job in jobs {
        let path = dir.join(format!("{}.png", job.name));
        match (job.draw)(&path) {
            Ok(()) => {
                info!("Saved {}", path.display());
                report.rendered.push(path);
            }
            Err(e) => {
                error!("Error creating {}: {:#}", job.name, e);
                report.failed.push((job.name, format!("{e:#}")));
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_failures_do_not_stop_batch() {
        let dir = TempDir::new().unwrap();
        let jobs = vec![
            ChartJob::new("first", |p| {
                std::fs::write(p, b"png")?;
                Ok(())
            }),
            ChartJob::new("broken", |_| anyhow::bail!("no font")),
            ChartJob::skipped("missing", "column 'x' not present"),
            ChartJob::new("last", |p| {
                std::fs::write(p, b"png")?;
                Ok(())
            }),
        ];
        let report = run(dir.path(), jobs);

        assert_eq!(
            report.rendered,
            vec![dir.path().join("first.png"), dir.path().join("last.png")]
        );
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0], ("broken".to_string(), "no font".to_string()));
        assert_eq!(report.failed[1].1, "column 'x' not present");
        assert!(!report.is_complete());
    }

    #[test]
    fn test_creates_output_directory() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested").join("charts");
        let report = run(&out, vec![ChartJob::new("a", |p| Ok(std::fs::write(p, b"")?))]);
        assert!(report.is_complete());
        assert!(out.join("a.png").exists());
    }

    #[test]
    fn test_merge_reports() {
        let mut a = RenderReport {
            rendered: vec![PathBuf::from("a.png")],
            failed: vec![],
        };
        a.merge(RenderReport {
            rendered: vec![],
            failed: vec![("b".into(), "err".into())],
        });
        assert_eq!(a.rendered.len(), 1);
        assert_eq!(a.failed.len(), 1);
    }
}
