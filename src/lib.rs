pub mod constants;
pub mod error;
pub mod pause;
pub mod presets;

use chrono::{DateTime, Local};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;
use tracing::{debug, info, warn};

pub use error::BuildError;

use constants::{exit, messages, tool};

/// One wrapper instance: a script to package and an optional icon to embed.
///
/// Both paths are relative to the project directory unless absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub name: String,
    pub script: PathBuf,
    pub icon: Option<PathBuf>,
}

impl BuildTarget {
    pub fn new(name: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<PathBuf>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// File name the packaging tool gives the executable, without extension.
    pub fn artifact_stem(&self) -> String {
        self.script
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

#[derive(Debug)]
pub enum BuildOutcome {
    Succeeded { artifact: PathBuf },
    Failed(BuildError),
}

#[derive(Debug)]
pub struct BuildReport {
    pub target: BuildTarget,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub outcome: BuildOutcome,
}

impl BuildReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, BuildOutcome::Succeeded { .. })
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn exit_code(&self) -> u8 {
        match &self.outcome {
            BuildOutcome::Succeeded { .. } => exit::SUCCESS,
            BuildOutcome::Failed(err) => err.exit_code(),
        }
    }

    pub fn banner(&self) -> String {
        match &self.outcome {
            BuildOutcome::Succeeded { .. } => messages::SUCCESS_BANNER.to_string(),
            BuildOutcome::Failed(err) => format!("{} {}", messages::FAILURE_BANNER, err),
        }
    }

    pub fn print_summary(&self) {
        let secs = self.elapsed().num_milliseconds() as f64 / 1000.0;
        println!();
        println!("{}", self.banner());
        println!("  Target: {}", self.target.name);
        if let BuildOutcome::Succeeded { artifact } = &self.outcome {
            println!("  Executable: {}", artifact.display());
        }
        println!(
            "  Finished at {} ({:.1}s)",
            self.finished_at.format("%Y-%m-%d %H:%M:%S"),
            secs
        );
    }
}

/// Resolves the directory every target path is relative to.
///
/// An explicit override wins; otherwise it is the directory holding the
/// running executable, so the caller's working directory never matters.
pub fn resolve_project_dir(override_dir: Option<&Path>) -> Result<PathBuf, BuildError> {
    let candidate = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => {
            let exe = std::env::current_exe()
                .map_err(|_| BuildError::ProjectDirMissing(PathBuf::from(".")))?;
            exe.parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| BuildError::ProjectDirMissing(exe.clone()))?
        }
    };

    let dir = candidate
        .canonicalize()
        .map_err(|_| BuildError::ProjectDirMissing(candidate.clone()))?;
    if !dir.is_dir() {
        return Err(BuildError::ProjectDirMissing(dir));
    }

    debug!("Project directory: {}", dir.display());
    Ok(dir)
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .and_then(|m| m.modified().ok())
}

/// Runs the packaging tool for build targets inside one project directory.
pub struct Packager {
    tool: String,
    project_dir: PathBuf,
    extra_flags: Vec<String>,
}

impl Packager {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool::DEFAULT_TOOL.to_string(),
            project_dir: project_dir.into(),
            extra_flags: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    /// Flags passed to the tool after the fixed set, before the script.
    pub fn with_extra_flags(mut self, flags: Vec<String>) -> Self {
        self.extra_flags = flags;
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Finds the tool on PATH. Relative paths resolve against the project dir.
    pub fn resolve_tool(&self) -> Result<PathBuf, BuildError> {
        which::which_in(&self.tool, std::env::var_os("PATH"), &self.project_dir)
            .map_err(|_| BuildError::ToolNotFound(self.tool.clone()))
    }

    /// Checks that the script and icon exist before anything is spawned.
    pub fn preflight(&self, target: &BuildTarget) -> Result<(), BuildError> {
        let script = self.project_dir.join(&target.script);
        if !script.is_file() {
            return Err(BuildError::ScriptMissing(script));
        }

        if let Some(icon) = &target.icon {
            let icon = self.project_dir.join(icon);
            if !icon.is_file() {
                return Err(BuildError::IconMissing(icon));
            }
        }

        Ok(())
    }

    pub fn command_args(&self, target: &BuildTarget) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![tool::ONEFILE_FLAG.into(), tool::WINDOWED_FLAG.into()];

        if let Some(icon) = &target.icon {
            args.push(tool::ICON_FLAG.into());
            args.push(icon.as_os_str().to_owned());
        }

        // Overwrite earlier output without prompting
        args.push(tool::NOCONFIRM_FLAG.into());

        args.extend(self.extra_flags.iter().map(OsString::from));
        args.push(target.script.as_os_str().to_owned());
        args
    }

    pub fn command(&self, target: &BuildTarget) -> Result<Command, BuildError> {
        let tool_path = self.resolve_tool()?;
        let mut cmd = Command::new(tool_path);
        cmd.args(self.command_args(target))
            .current_dir(&self.project_dir);
        Ok(cmd)
    }

    /// Where the executable should land once the tool finishes.
    pub fn expected_artifact(&self, target: &BuildTarget) -> PathBuf {
        let dist = self
            .extra_flag_value("--distpath")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(tool::DIST_DIR));
        let stem = self
            .extra_flag_value("--name")
            .unwrap_or_else(|| target.artifact_stem());

        self.project_dir
            .join(dist)
            .join(format!("{}{}", stem, std::env::consts::EXE_SUFFIX))
    }

    /// The command line `build` would run, for display.
    pub fn dry_run(&self, target: &BuildTarget) -> String {
        std::iter::once(OsString::from(&self.tool))
            .chain(self.command_args(target))
            .map(|arg| {
                let arg = arg.to_string_lossy().into_owned();
                if arg.contains(char::is_whitespace) {
                    format!("\"{}\"", arg)
                } else {
                    arg
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn build(&self, target: &BuildTarget) -> BuildReport {
        let started_at = Local::now();
        info!("Building target '{}' from {}", target.name, target.script.display());

        let outcome = match self.run(target) {
            Ok(artifact) => {
                info!("Wrote {}", artifact.display());
                BuildOutcome::Succeeded { artifact }
            }
            Err(err) => {
                warn!("Target '{}' failed: {}", target.name, err);
                BuildOutcome::Failed(err)
            }
        };

        BuildReport {
            target: target.clone(),
            started_at,
            finished_at: Local::now(),
            outcome,
        }
    }

    fn run(&self, target: &BuildTarget) -> Result<PathBuf, BuildError> {
        self.preflight(target)?;

        let mut cmd = self.command(target)?;
        debug!("Running {:?} in {}", cmd, self.project_dir.display());

        let artifact = self.expected_artifact(target);
        let previous = modified_time(&artifact);
        if let Some(previous) = previous {
            debug!("Existing {} last modified {:?}", artifact.display(), previous);
        }

        let status = cmd.status().map_err(|source| BuildError::Spawn {
            tool: self.tool.clone(),
            source,
        })?;

        if !status.success() {
            return Err(match status.code() {
                Some(code) => BuildError::ToolFailed { code },
                None => BuildError::ToolTerminated,
            });
        }

        // A file left by an earlier build does not count
        let written = match (previous, modified_time(&artifact)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(before), Some(after)) => after != before,
        };
        if !written {
            return Err(BuildError::ArtifactMissing(artifact));
        }

        Ok(artifact)
    }

    fn extra_flag_value(&self, flag: &str) -> Option<String> {
        let prefix = format!("{}=", flag);
        let mut flags = self.extra_flags.iter();
        while let Some(arg) = flags.next() {
            if arg == flag {
                return flags.next().cloned();
            }
            if let Some(value) = arg.strip_prefix(&prefix) {
                return Some(value.to_string());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn capture_app() -> BuildTarget {
        BuildTarget::new("capture-app", "capture_app.py").with_icon("icon.ico")
    }

    #[test]
    fn test_command_args_main() {
        let packager = Packager::new("/work");
        let args = packager.command_args(&BuildTarget::new("main", "main.py"));
        assert_eq!(
            args,
            vec!["--onefile", "--windowed", "--noconfirm", "main.py"]
                .into_iter()
                .map(OsString::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_command_args_with_icon_and_extra_flags() {
        let packager = Packager::new("/work").with_extra_flags(vec!["--clean".into()]);
        let args = packager.command_args(&capture_app());
        assert_eq!(
            args,
            vec![
                "--onefile",
                "--windowed",
                "--icon",
                "icon.ico",
                "--noconfirm",
                "--clean",
                "capture_app.py",
            ]
            .into_iter()
            .map(OsString::from)
            .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_expected_artifact() {
        let packager = Packager::new("/work");
        let artifact = packager.expected_artifact(&capture_app());
        assert_eq!(
            artifact,
            PathBuf::from("/work/dist").join(format!("capture_app{}", std::env::consts::EXE_SUFFIX))
        );
    }

    #[test]
    fn test_expected_artifact_follows_name_and_distpath() {
        let packager = Packager::new("/work").with_extra_flags(vec![
            "--name".into(),
            "Viewer".into(),
            "--distpath=out".into(),
        ]);
        let artifact = packager.expected_artifact(&capture_app());
        assert_eq!(
            artifact,
            PathBuf::from("/work/out").join(format!("Viewer{}", std::env::consts::EXE_SUFFIX))
        );
    }

    #[test]
    fn test_dry_run_quotes_spaces() {
        let packager = Packager::new("/work");
        let line = packager.dry_run(&BuildTarget::new("main", "my app.py"));
        assert_eq!(line, "pyinstaller --onefile --windowed --noconfirm \"my app.py\"");
    }

    #[test]
    fn test_preflight_reports_missing_script() {
        let dir = TempDir::new().unwrap();
        let packager = Packager::new(dir.path());
        let err = packager
            .preflight(&BuildTarget::new("main", "main.py"))
            .unwrap_err();
        assert!(matches!(err, BuildError::ScriptMissing(p) if p.ends_with("main.py")));
    }

    #[test]
    fn test_preflight_reports_missing_icon() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("capture_app.py"), "print('hi')\n").unwrap();
        let packager = Packager::new(dir.path());
        let err = packager.preflight(&capture_app()).unwrap_err();
        assert!(matches!(err, BuildError::IconMissing(p) if p.ends_with("icon.ico")));
    }

    #[test]
    fn test_missing_tool_fails_before_running() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.py"), "print('hi')\n").unwrap();
        let packager = Packager::new(dir.path()).with_tool("definitely-not-a-packager-xyz");

        let report = packager.build(&BuildTarget::new("main", "main.py"));
        assert!(!report.succeeded());
        assert!(matches!(report.outcome, BuildOutcome::Failed(BuildError::ToolNotFound(_))));
        assert_eq!(report.exit_code(), exit::PRECONDITION_FAILED);
        assert!(report.banner().starts_with("Build failed!"));
    }

    #[test]
    fn test_resolve_project_dir_override() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_project_dir(Some(dir.path())).unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap());

        let missing = dir.path().join("nope");
        assert!(matches!(
            resolve_project_dir(Some(&missing)),
            Err(BuildError::ProjectDirMissing(_))
        ));
    }

    #[test]
    fn test_resolve_project_dir_defaults_to_executable_dir() {
        let resolved = resolve_project_dir(None).unwrap();
        let exe_dir = std::env::current_exe()
            .unwrap()
            .parent()
            .unwrap()
            .canonicalize()
            .unwrap();
        assert_eq!(resolved, exe_dir);
    }

    #[test]
    fn test_artifact_stem_falls_back_to_name() {
        assert_eq!(BuildTarget::new("main", "main.py").artifact_stem(), "main");
        assert_eq!(BuildTarget::new("odd", "").artifact_stem(), "odd");
    }
}
