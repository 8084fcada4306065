use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use directories::UserDirs;
use resume_core::PlatformActions;
use tracing::info;
use url::Url;

/// Print, download and link handling backed by the host system.
pub struct SystemActions {
    print_command: String,
    print_args: Vec<String>,
    download_dir: Option<PathBuf>,
}

impl SystemActions {
    pub fn new(print_command: String, print_args: Vec<String>) -> Self {
        Self {
            print_command,
            print_args,
            download_dir: None,
        }
    }

    pub fn with_download_dir(mut self, dir: PathBuf) -> Self {
        self.download_dir = Some(dir);
        self
    }

    fn resolve_download_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.download_dir {
            return Ok(dir.clone());
        }
        let dirs = UserDirs::new().ok_or_else(|| anyhow!("unable to resolve home directory"))?;
        Ok(dirs
            .download_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dirs.home_dir().to_path_buf()))
    }
}

impl PlatformActions for SystemActions {
    fn print(&self, document: &Path) -> Result<()> {
        let status = Command::new(&self.print_command)
            .args(&self.print_args)
            .arg(document)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("failed to run {}", self.print_command))?;
        if !status.success() {
            bail!("{} exited with {}", self.print_command, status);
        }
        info!(?document, command = %self.print_command, "sent document to printer");
        Ok(())
    }

    fn download(&self, document: &Path, file_name: &str) -> Result<PathBuf> {
        let dir = self.resolve_download_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create download directory {:?}", dir))?;
        let destination = unique_destination(&dir, file_name);
        fs::copy(document, &destination)
            .with_context(|| format!("failed to copy {:?} to {:?}", document, destination))?;
        info!(?destination, "saved copy of document");
        Ok(destination)
    }

    fn open_url(&self, url: &Url) -> Result<()> {
        webbrowser::open(url.as_str()).with_context(|| format!("failed to open {url}"))?;
        info!(%url, "opened website");
        Ok(())
    }
}

/// `dir/file_name`, or `dir/stem (n).ext` for the first free `n` when taken.
fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let extension = name.extension().and_then(|s| s.to_str());

    (1..)
        .map(|n| match extension {
            Some(ext) => dir.join(format!("{stem} ({n}).{ext}")),
            None => dir.join(format!("{stem} ({n})")),
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn download_copies_under_fixed_name_without_overwriting() {
        let source_dir = tempdir().unwrap();
        let source = source_dir.path().join("cv-final.pdf");
        fs::write(&source, b"%PDF-1.7").unwrap();

        let downloads = tempdir().unwrap();
        let actions = SystemActions::new("lp".into(), Vec::new())
            .with_download_dir(downloads.path().to_path_buf());

        let first = actions.download(&source, "resume.pdf").unwrap();
        assert_eq!(first, downloads.path().join("resume.pdf"));
        assert_eq!(fs::read(&first).unwrap(), b"%PDF-1.7");

        let second = actions.download(&source, "resume.pdf").unwrap();
        assert_eq!(second, downloads.path().join("resume (1).pdf"));
    }

    #[test]
    fn download_of_missing_document_fails() {
        let downloads = tempdir().unwrap();
        let actions = SystemActions::new("lp".into(), Vec::new())
            .with_download_dir(downloads.path().to_path_buf());
        assert!(actions
            .download(Path::new("/nonexistent/resume.pdf"), "resume.pdf")
            .is_err());
    }

    #[test]
    fn unique_destination_without_extension() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("resume"), b"").unwrap();
        assert_eq!(
            unique_destination(dir.path(), "resume"),
            dir.path().join("resume (1)")
        );
    }

    #[cfg(unix)]
    #[test]
    fn print_reports_command_status() {
        let ok = SystemActions::new("true".into(), Vec::new());
        assert!(ok.print(Path::new("resume.pdf")).is_ok());

        let failing = SystemActions::new("false".into(), Vec::new());
        let err = failing.print(Path::new("resume.pdf")).unwrap_err();
        assert!(err.to_string().starts_with("false exited with"));

        let missing = SystemActions::new("definitely-not-a-printer".into(), Vec::new());
        assert!(missing.print(Path::new("resume.pdf")).is_err());
    }
}
