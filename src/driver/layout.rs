use crate::config::PathsConfig;
use crate::driver::tool::ExtractionJob;
use crate::error::{Result, WarcBatchError};
use crate::input::InputRecord;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory layout shared by every extraction in a batch.
///
/// All paths are resolved once, against the working directory at startup, so
/// later changes of the process's current directory do not move them.
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    base_directory: PathBuf,
    output_directory: PathBuf,
    scratch_directory: PathBuf,
    output_prefix: String,
    create_scratch: bool,
}

impl WorkspaceLayout {
    pub fn new(paths: &PathsConfig) -> Self {
        let base_directory = if paths.base_directory.is_absolute() {
            paths.base_directory.clone()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&paths.base_directory).components().collect())
                .unwrap_or_else(|_| paths.base_directory.clone())
        };

        Self {
            output_directory: base_directory.join(&paths.output_dir_name),
            scratch_directory: base_directory.join(&paths.scratch_dir_name),
            base_directory,
            output_prefix: paths.output_prefix.clone(),
            create_scratch: paths.create_scratch_dir,
        }
    }

    /// Creates the output directory, and the scratch directory when enabled.
    /// Existing directories are left untouched.
    pub fn initialize(&self) -> Result<()> {
        create_directory(&self.output_directory)?;

        if self.create_scratch {
            create_directory(&self.scratch_directory)?;
        }

        Ok(())
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn scratch_directory(&self) -> &Path {
        &self.scratch_directory
    }

    pub fn output_path_for(&self, record: &InputRecord) -> PathBuf {
        self.output_directory
            .join(format!("{}{}", self.output_prefix, record.basename()))
    }

    pub fn job_for(&self, record: &InputRecord, log_output: bool) -> ExtractionJob {
        let outfile = self.output_path_for(record);
        let log_file = log_output.then(|| sidecar_path(&outfile, "tool.log"));

        ExtractionJob {
            source: record.as_str().to_string(),
            outfile,
            download_dir: self.scratch_directory.clone(),
            log_file,
        }
    }
}

/// `<outfile>.<suffix>`, the naming the extractor itself uses for `.log` and `.done`.
pub fn sidecar_path(outfile: &Path, suffix: &str) -> PathBuf {
    let mut name = outfile.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn create_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| WarcBatchError::Directory {
        path: path.display().to_string(),
        source,
    })
}
