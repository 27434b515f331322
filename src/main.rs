use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};

use shader_forge::forge_build::{MANIFEST_FILE, UnitAction};
use shader_forge::ToolchainSelector;
use shader_forge::prelude::*;

#[derive(Parser, Debug)]
#[command(
    name = "shader-forge",
    version,
    about = "Compile every feature variant of a set of shaders, or copy precompiled ones when no compiler is installed."
)]
struct Cli {
    /// Build manifest (defaults to ./Shaders.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    manifest: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build all artifacts of the target
    Build(BuildArgs),
    /// List the build units without running them
    Plan(BuildArgs),
    /// Show the compiler selected for each target family
    Toolchains,
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Output root; artifacts land in <OUTPUT>/shaders
    #[arg(long, short, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Aggregate target name
    #[arg(long, value_name = "NAME")]
    target: Option<String>,

    /// Parallel units (0 = one per core, 1 = sequential)
    #[arg(long, short, value_name = "N")]
    jobs: Option<usize>,

    /// Keep building independent units after a failure
    #[arg(long, action = clap::ArgAction::SetTrue)]
    keep_going: bool,

    /// Rebuild units whose output is up to date
    #[arg(long, action = clap::ArgAction::SetTrue)]
    force: bool,

    /// Only build these families (spirv, sm6, sm5)
    #[arg(long = "family", value_name = "FAMILY")]
    families: Vec<TargetFamily>,

    /// Copy precompiled artifacts even where a compiler is installed
    #[arg(long, action = clap::ArgAction::SetTrue)]
    no_compiler: bool,

    /// GLSL source file or directory for SPIR-V
    #[arg(long, value_name = "PATH")]
    spirv: Vec<PathBuf>,

    /// HLSL source file or directory for shader model 6
    #[arg(long, value_name = "PATH")]
    sm6: Vec<PathBuf>,

    /// HLSL source file or directory for shader model 5
    #[arg(long, value_name = "PATH")]
    sm5: Vec<PathBuf>,
}

impl BuildArgs {
    fn sources(&self) -> impl Iterator<Item = (TargetFamily, &Vec<PathBuf>)> {
        [
            (TargetFamily::SpirV, &self.spirv),
            (TargetFamily::Sm6, &self.sm6),
            (TargetFamily::Sm5, &self.sm5),
        ]
        .into_iter()
        .filter(|(_, paths)| !paths.is_empty())
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);

    match &cli.command {
        Command::Build(args) => build(cli.manifest.as_deref(), args),
        Command::Plan(args) => plan(cli.manifest.as_deref(), args),
        Command::Toolchains => toolchains(cli.manifest.as_deref()),
    }
}

fn init_logger(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Reads the manifest. An explicit path must exist; the default one is
/// optional.
fn load_manifest(explicit: Option<&Path>) -> anyhow::Result<Option<ForgeManifest>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(MANIFEST_FILE);
            if !default.is_file() {
                return Ok(None);
            }
            default
        }
    };
    let manifest = ForgeManifest::load(&path)
        .with_context(|| format!("failed to load manifest {}", path.display()))?;
    Ok(Some(manifest))
}

fn pipeline(manifest_path: Option<&Path>, args: &BuildArgs) -> anyhow::Result<Pipeline> {
    let manifest = load_manifest(manifest_path)?;
    if manifest.is_none() && args.sources().next().is_none() {
        bail!("no {MANIFEST_FILE} found and no sources given (use --spirv, --sm6 or --sm5)");
    }
    let manifest = manifest.unwrap_or_default();

    let mut scheduler = manifest.scheduler().force(args.force);
    if let Some(jobs) = args.jobs {
        scheduler = scheduler.jobs(jobs);
    }
    if args.keep_going {
        scheduler = scheduler.policy(FailurePolicy::KeepGoing);
    }

    let mut pipeline = manifest.pipeline().with_scheduler(scheduler);
    if let Some(target) = &args.target {
        pipeline = pipeline.with_target(target);
    }
    if let Some(output) = &args.output {
        pipeline = pipeline.with_output_root(output);
    }
    for (family, paths) in args.sources() {
        pipeline.add_family(FamilyRequest::new(family).sources(paths.iter().cloned()));
    }
    if !args.families.is_empty() {
        pipeline.retain_families(&args.families);
    }
    if args.no_compiler {
        pipeline.disable_compilers();
    }
    Ok(pipeline)
}

fn build(manifest_path: Option<&Path>, args: &BuildArgs) -> anyhow::Result<()> {
    let result = pipeline(manifest_path, args)?.run()?;

    if !result.is_success() {
        bail!(
            "{} of {} units failed in target '{}'",
            result.report.failures.len(),
            result.report.total(),
            result.target.name()
        );
    }
    if let Some(manifest) = &result.manifest {
        println!("{}", manifest.display());
    }
    Ok(())
}

fn plan(manifest_path: Option<&Path>, args: &BuildArgs) -> anyhow::Result<()> {
    let plan = pipeline(manifest_path, args)?.plan()?;

    for (family, selection) in &plan.selections {
        println!("# {family}: {selection}");
    }
    for unit in &plan.units {
        let action = match &unit.action {
            UnitAction::Compile { .. } => "compile",
            UnitAction::CopyPrecompiled { .. } => "copy",
        };
        println!(
            "{:<8} {:<8} {}  <- {}",
            unit.family.key(),
            action,
            unit.artifact,
            unit.inputs()
                .iter()
                .map(|input| input.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    println!(
        "{} artifacts in target '{}'",
        plan.units.len(),
        plan.target.name()
    );
    Ok(())
}

fn toolchains(manifest_path: Option<&Path>) -> anyhow::Result<()> {
    let manifest = load_manifest(manifest_path)?.unwrap_or_default();
    let selector = ToolchainSelector::new(ToolProbe::from_env());

    for family in TargetFamily::ALL {
        let preference = manifest
            .families
            .get(family)
            .map(|table| table.compiler.clone())
            .unwrap_or_default();
        let selection = selector
            .select(family, &preference)
            .with_context(|| format!("invalid compiler setting for {family}"))?;
        println!("{:<8} {selection}", family.key());
    }
    Ok(())
}
