use anyhow::Result;
use capture_build::constants::{defaults, exit, messages, tool};
use capture_build::pause::{self, PausePolicy};
use capture_build::presets;
use capture_build::{BuildReport, BuildTarget, Packager, resolve_project_dir};
use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::fmt::Display;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "build-exe")]
#[command(
    about = "Package a Python script into a single-file windowed executable",
    long_about = None
)]
struct Args {
    #[arg(
        default_value = defaults::TARGET,
        help = "Target preset to build (e.g., 'main', 'capture-app')"
    )]
    target: String,

    #[arg(
        long,
        conflicts_with_all = ["target", "script", "icon"],
        help = "Build every available preset"
    )]
    all: bool,

    #[arg(long, help = "Script to package, overriding the preset's script")]
    script: Option<PathBuf>,

    #[arg(long, help = "Icon to embed, overriding the preset's icon")]
    icon: Option<PathBuf>,

    #[arg(
        long,
        help = "Directory holding the scripts (defaults to this executable's directory)"
    )]
    project_dir: Option<PathBuf>,

    #[arg(long, default_value = tool::DEFAULT_TOOL, help = "Packaging tool to run")]
    tool: String,

    #[arg(long, help = "Print the packaging command without running it")]
    dry_run: bool,

    #[arg(long, help = "List available target presets")]
    list_presets: bool,

    #[arg(long, help = "Save a target preset: 'name:script[,icon]'")]
    save_preset: Option<String>,

    #[arg(long, help = "Exit without waiting for a keypress")]
    no_pause: bool,

    #[arg(
        long,
        conflicts_with = "no_pause",
        help = "Wait for a keypress only when the build fails"
    )]
    pause_on_failure: bool,

    #[arg(short, long, action = ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,

    #[arg(last = true, help = "Extra flags passed to the packaging tool")]
    extra: Vec<String>,
}

impl Args {
    fn pause_policy(&self) -> PausePolicy {
        if self.no_pause {
            PausePolicy::Never
        } else if self.pause_on_failure {
            PausePolicy::OnFailure
        } else {
            PausePolicy::Always
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn list_presets(project_dir: &Path) -> Result<()> {
    println!("\nAVAILABLE TARGET PRESETS");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let builtin = presets::get_builtin_presets();
    let custom = presets::load_presets(project_dir)?;

    let mut builtin_names: Vec<_> = builtin.keys().collect();
    builtin_names.sort();

    println!("\nBuilt-in presets:");
    for name in builtin_names {
        if !custom.contains_key(name) {
            println!("  {} = {}", name, builtin[name]);
        }
    }

    let preset_file = presets::get_preset_file_path(project_dir);
    if !custom.is_empty() {
        let mut custom_names: Vec<_> = custom.keys().collect();
        custom_names.sort();

        println!("\nCustom presets:");
        for name in custom_names {
            println!("  {} = {}", name, custom[name]);
        }
        println!("\nCustom presets file: {}", preset_file.display());
    } else {
        println!("\nCustom presets: (none)");
        println!("   Save presets with: --save-preset name:script[,icon]");
        println!("   File will be created at: {}", preset_file.display());
    }

    println!("\nUsage:");
    println!("   build-exe <name>");
    println!("   Example: build-exe capture-app");
    println!();

    Ok(())
}

fn save_preset_from_string(project_dir: &Path, preset_str: &str) -> Result<()> {
    let Some((name, value)) = preset_str.split_once(':') else {
        return Err(anyhow::anyhow!(
            "Invalid preset format. Use: name:script[,icon]\nExample: --save-preset viewer:capture_app.py,icon.ico"
        ));
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow::anyhow!("Preset name must not be empty"));
    }

    let spec = presets::parse_target_spec(value).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid target format: {}\nUse: script[,icon] (e.g., 'capture_app.py,icon.ico')",
            value.trim()
        )
    })?;

    let mut preset_map = presets::load_presets(project_dir)?;
    println!("Preset '{}' saved: {}", name, spec);
    preset_map.insert(name.to_string(), spec);
    presets::save_presets(project_dir, &preset_map)?;

    println!("\nUse with: build-exe {}", name);

    Ok(())
}

fn select_targets(args: &Args, project_dir: &Path) -> Result<Vec<BuildTarget>> {
    let all_presets = presets::get_all_presets(project_dir)?;

    if args.all {
        let mut names: Vec<_> = all_presets.keys().cloned().collect();
        names.sort();
        return Ok(names
            .into_iter()
            .map(|name| all_presets[&name].clone().into_target(&name))
            .collect());
    }

    let mut target = match (all_presets.get(&args.target), &args.script) {
        (Some(spec), _) => spec.clone().into_target(&args.target),
        (None, Some(script)) => BuildTarget::new(&args.target, script),
        (None, None) => {
            return Err(anyhow::anyhow!(
                "Preset '{}' not found. Use --list-presets to see available presets.",
                args.target
            ));
        }
    };

    if let Some(script) = &args.script {
        target.script = script.clone();
    }
    if let Some(icon) = &args.icon {
        target.icon = Some(icon.clone());
    }

    Ok(vec![target])
}

fn print_overall_summary(reports: &[BuildReport]) {
    println!("\nSUMMARY");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for report in reports {
        let mark = if report.succeeded() { "ok" } else { "FAILED" };
        println!("  {:<16} {}", report.target.name, mark);
    }
    println!();
}

fn finish(policy: PausePolicy, succeeded: bool, code: u8) -> ExitCode {
    if policy.should_pause(succeeded) {
        if let Err(e) = pause::wait_for_keypress(messages::PAUSE_PROMPT) {
            warn!("Could not wait for a keypress: {}", e);
        }
    }
    ExitCode::from(code)
}

fn fail_early(policy: PausePolicy, reason: impl Display) -> ExitCode {
    println!("{} {}", messages::FAILURE_BANNER, reason);
    finish(policy, false, exit::PRECONDITION_FAILED)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let policy = args.pause_policy();

    let project_dir = match resolve_project_dir(args.project_dir.as_deref()) {
        Ok(dir) => dir,
        Err(e) => {
            println!("{} {}", messages::FAILURE_BANNER, e);
            return finish(policy, false, e.exit_code());
        }
    };

    // Handle --list-presets
    if args.list_presets {
        if let Err(e) = list_presets(&project_dir) {
            return fail_early(policy, format!("{:#}", e));
        }
        return ExitCode::SUCCESS;
    }

    // Handle --save-preset
    if let Some(preset_str) = &args.save_preset {
        if let Err(e) = save_preset_from_string(&project_dir, preset_str) {
            return fail_early(policy, format!("{:#}", e));
        }
        return ExitCode::SUCCESS;
    }

    let targets = match select_targets(&args, &project_dir) {
        Ok(targets) => targets,
        Err(e) => return fail_early(policy, format!("{:#}", e)),
    };
    let packager = Packager::new(&project_dir)
        .with_tool(&args.tool)
        .with_extra_flags(args.extra.clone());

    if args.dry_run {
        for target in &targets {
            println!("[{}] {}", target.name, packager.dry_run(target));
        }
        return ExitCode::SUCCESS;
    }

    info!(
        "Packaging with {} in {}",
        packager.tool(),
        packager.project_dir().display()
    );

    let mut reports = Vec::with_capacity(targets.len());
    for target in &targets {
        println!("Packaging {} ...", target.script.display());
        let report = packager.build(target);
        report.print_summary();
        reports.push(report);
    }

    if reports.len() > 1 {
        print_overall_summary(&reports);
    }

    let code = reports
        .iter()
        .map(BuildReport::exit_code)
        .max()
        .unwrap_or(exit::SUCCESS);

    finish(policy, code == exit::SUCCESS, code)
}
