//! Pipeline Tests
//!
//! End-to-end builds of one aggregate target:
//! - A fragment source compiled with a (fake) installed compiler
//! - The same source served from the precompiled tree
//! - HLSL families side by side without collisions
//! - Directory sources, up-to-date reruns and failure policies
//! - The target manifest and build-script directives

mod common;

use std::fs;

use shader_forge::forge_build::UnitAction;
use shader_forge::{
    CompilerPreference, FailurePolicy, FamilyRequest, ForgeError, Pipeline, Scheduler,
    TargetFamily, ToolProbe, ToolchainSelection,
};

fn no_compilers() -> ToolProbe {
    ToolProbe::isolated("")
}

// ============================================================================
// Precompiled Fallback
// ============================================================================

#[test]
fn overlay_fragment_from_precompiled_tree() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let source = common::write_file(src.path(), "overlay_frag.glsl", b"// glsl");
    common::precompile(
        src.path(),
        &[
            "overlay_frag.spv",
            "multiview/overlay_frag.spv",
            "fovDecode/overlay_frag.spv",
            "multiview/fovDecode/overlay_frag.spv",
        ],
    );

    let result = Pipeline::new("engine_shaders", out.path())
        .with_probe(no_compilers())
        .family(FamilyRequest::new(TargetFamily::SpirV).source(&source))
        .run()
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.report.copied, 4);
    assert_eq!(result.report.compiled, 0);
    assert_eq!(
        common::list_files(&out.path().join("shaders")),
        [
            "engine_shaders.json",
            "fovDecode/overlay_frag.spv",
            "multiview/fovDecode/overlay_frag.spv",
            "multiview/overlay_frag.spv",
            "overlay_frag.spv",
        ]
    );

    let copied = fs::read_to_string(out.path().join("shaders/multiview/fovDecode/overlay_frag.spv"))
        .unwrap();
    assert_eq!(copied, "precompiled multiview/fovDecode/overlay_frag.spv");

    let target = result.into_target().unwrap();
    assert_eq!(target.name(), "engine_shaders");
    assert_eq!(target.sources(), [source]);
}

#[test]
fn missing_precompiled_artifact_fails_the_build() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let source = common::write_file(src.path(), "overlay_frag.glsl", b"// glsl");
    common::precompile(src.path(), &["overlay_frag.spv", "multiview/overlay_frag.spv"]);
    let stale = common::write_file(out.path(), "shaders/engine_shaders.json", b"{}");

    let result = Pipeline::new("engine_shaders", out.path())
        .with_probe(no_compilers())
        .with_scheduler(Scheduler::new().jobs(1).policy(FailurePolicy::KeepGoing))
        .family(FamilyRequest::new(TargetFamily::SpirV).source(&source))
        .run()
        .unwrap();

    assert!(!result.is_success());
    assert_eq!(result.report.copied, 2);
    assert_eq!(result.report.failures.len(), 2);
    assert!(result.manifest.is_none());
    assert!(!stale.exists());
    assert!(!out.path().join("shaders/fovDecode").exists());
    assert!(matches!(
        result.into_target(),
        Err(ForgeError::MissingPrecompiledArtifact { .. })
    ));
}

#[test]
fn sm5_and_sm6_share_a_target() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let source = common::write_file(src.path(), "videoStream_frag.hlsl", b"// hlsl");

    let pipeline = Pipeline::new("d3d_shaders", out.path())
        .with_probe(no_compilers())
        .family(FamilyRequest::new(TargetFamily::Sm5).source(&source))
        .family(FamilyRequest::new(TargetFamily::Sm6).source(&source));

    let plan = pipeline.plan().unwrap();
    assert_eq!(plan.units.len(), 8 + 2);
    assert_eq!(
        plan.selections,
        [
            (TargetFamily::Sm5, ToolchainSelection::Precompiled),
            (TargetFamily::Sm6, ToolchainSelection::Precompiled),
        ]
    );

    let sm5: Vec<_> = plan
        .target
        .artifact_paths()
        .map(ToString::to_string)
        .filter(|path| path.starts_with("SM5/"))
        .collect();
    assert_eq!(sm5.len(), 8);

    // Precompiled trees mirror the output layout, family subdir included.
    let relatives: Vec<String> = plan.target.artifact_paths().map(ToString::to_string).collect();
    let relatives: Vec<&str> = relatives.iter().map(String::as_str).collect();
    common::precompile(src.path(), &relatives);

    let result = pipeline.run().unwrap();
    assert!(result.is_success());
    let shaders = out.path().join("shaders");
    assert!(shaders.join("SM5/multiview/fovDecode/yuv3PlaneFmt/videoStream_frag.cso").is_file());
    assert!(shaders.join("SM6/multiview/videoStream_frag.cso").is_file());
}

#[test]
fn forced_precompiled_mode_never_compiles() {
    let src = tempfile::tempdir().unwrap();
    let source = common::write_file(src.path(), "lobby.hlsl", b"// hlsl");

    let plan = Pipeline::new("t", src.path().join("out"))
        .with_probe(no_compilers())
        .family(
            FamilyRequest::new(TargetFamily::Sm5)
                .source(&source)
                .compiler(CompilerPreference::Disabled),
        )
        .plan()
        .unwrap();

    assert_eq!(plan.units.len(), 4);
    assert!(
        plan.units
            .iter()
            .all(|unit| matches!(unit.action, UnitAction::CopyPrecompiled { .. }))
    );
}

// ============================================================================
// Sources
// ============================================================================

#[test]
fn directory_sources_are_sorted_and_skip_precompiled() {
    let src = tempfile::tempdir().unwrap();
    common::write_file(src.path(), "shaders/z_frag.glsl", b"");
    common::write_file(src.path(), "shaders/a_vert.glsl", b"");
    common::write_file(src.path(), "shaders/nested/m_vert.glsl", b"");
    common::write_file(src.path(), "shaders/readme.txt", b"");
    common::write_file(src.path(), "shaders/lobby.hlsl", b"");
    common::write_file(src.path(), "shaders/precompiled/stale_frag.glsl", b"");

    let request = FamilyRequest::new(TargetFamily::SpirV).source(src.path().join("shaders"));
    let found: Vec<_> = request
        .resolve_sources()
        .unwrap()
        .into_iter()
        .map(|path| path.strip_prefix(src.path()).unwrap().to_path_buf())
        .collect();

    assert_eq!(
        found,
        [
            std::path::PathBuf::from("shaders/a_vert.glsl"),
            "shaders/nested/m_vert.glsl".into(),
            "shaders/z_frag.glsl".into(),
        ]
    );
}

#[test]
fn same_source_twice_is_a_collision() {
    let src = tempfile::tempdir().unwrap();
    let source = common::write_file(src.path(), "overlay_frag.glsl", b"");

    let err = Pipeline::new("t", src.path().join("out"))
        .with_probe(no_compilers())
        .family(FamilyRequest::new(TargetFamily::SpirV).sources([&source, &source]))
        .plan()
        .unwrap_err();
    assert!(matches!(err, ForgeError::Configuration { .. }));
}

#[test]
fn unspecified_glsl_stops_planning() {
    let src = tempfile::tempdir().unwrap();
    let source = common::write_file(src.path(), "lobby.glsl", b"");

    let err = Pipeline::new("t", src.path().join("out"))
        .with_probe(no_compilers())
        .family(FamilyRequest::new(TargetFamily::SpirV).source(&source))
        .plan()
        .unwrap_err();
    assert!(matches!(err, ForgeError::Configuration { .. }));
}

// ============================================================================
// Reruns & Manifest
// ============================================================================

#[test]
fn rerun_is_up_to_date() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let source = common::write_file(src.path(), "lobby_vert.glsl", b"");
    common::precompile(src.path(), &["lobby_vert.spv", "multiview/lobby_vert.spv"]);

    let pipeline = Pipeline::new("t", out.path())
        .with_probe(no_compilers())
        .family(FamilyRequest::new(TargetFamily::SpirV).source(&source));

    assert_eq!(pipeline.run().unwrap().report.copied, 2);
    let second = pipeline.run().unwrap();
    assert_eq!(second.report.up_to_date, 2);
    assert_eq!(second.report.copied, 0);

    let forced = pipeline
        .clone()
        .with_scheduler(Scheduler::new().force(true))
        .run()
        .unwrap();
    assert_eq!(forced.report.copied, 2);
}

#[test]
fn failed_rebuild_removes_previous_manifest() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let source = common::write_file(src.path(), "lobby_vert.glsl", b"");
    common::precompile(src.path(), &["lobby_vert.spv", "multiview/lobby_vert.spv"]);

    let pipeline = Pipeline::new("engine_shaders", out.path())
        .with_probe(no_compilers())
        .with_scheduler(Scheduler::new().force(true))
        .family(FamilyRequest::new(TargetFamily::SpirV).source(&source));

    let manifest = pipeline.run().unwrap().manifest.unwrap();
    assert!(manifest.is_file());

    fs::remove_file(src.path().join("precompiled/multiview/lobby_vert.spv")).unwrap();
    let second = pipeline.run().unwrap();
    assert!(!second.is_success());
    assert!(second.manifest.is_none());
    assert!(!manifest.exists());
}

#[test]
fn manifest_lists_every_artifact_with_digest() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let source = common::write_file(src.path(), "lobby_vert.glsl", b"");
    common::precompile(src.path(), &["lobby_vert.spv", "multiview/lobby_vert.spv"]);

    let result = Pipeline::new("engine_shaders", out.path())
        .with_probe(no_compilers())
        .family(FamilyRequest::new(TargetFamily::SpirV).source(&source))
        .run()
        .unwrap();

    let manifest_path = result.manifest.clone().unwrap();
    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(manifest_path).unwrap()).unwrap();

    assert_eq!(manifest["target"], "engine_shaders");
    let artifacts = manifest["artifacts"].as_array().unwrap();
    assert_eq!(artifacts.len(), 2);
    assert_eq!(artifacts[1]["path"], "multiview/lobby_vert.spv");
    assert_eq!(artifacts[1]["family"], "spirv");
    assert_eq!(artifacts[1]["stage"], "vertex");
    assert_eq!(artifacts[1]["features"], serde_json::json!(["multiview"]));
    assert_eq!(artifacts[1]["xxh3"].as_str().unwrap().len(), 16);
    assert_ne!(artifacts[0]["xxh3"], artifacts[1]["xxh3"]);

    let mut directives = Vec::new();
    result
        .into_target()
        .unwrap()
        .emit_cargo_directives(&mut directives)
        .unwrap();
    let directives = String::from_utf8(directives).unwrap();
    assert!(directives.contains(&format!("cargo:rerun-if-changed={}", source.display())));
    assert!(directives.contains("cargo:rustc-env=ENGINE_SHADERS_DIR="));
}

// ============================================================================
// Compiled Build
// ============================================================================

#[cfg(unix)]
#[test]
fn overlay_fragment_with_installed_compiler() {
    let root = tempfile::tempdir().unwrap();
    common::fake_tool(&root.path().join("bin"), "glslc", common::RECORDING_COMPILER);
    let source = common::write_file(root.path(), "src/overlay_frag.glsl", b"void main() {}");

    let result = Pipeline::new("engine_shaders", root.path().join("out"))
        .with_probe(ToolProbe::isolated(root.path().join("bin")))
        .family(FamilyRequest::new(TargetFamily::SpirV).source(&source))
        .run()
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.report.compiled, 4);
    assert!(!root.path().join("src/precompiled").exists());

    let both = fs::read_to_string(
        root.path()
            .join("out/shaders/multiview/fovDecode/overlay_frag.spv"),
    )
    .unwrap();
    assert!(both.contains("-DENABLE_MULTIVIEW_EXT=1"));
    assert!(both.contains("-DENABLE_FOVEATED_DECODE=1"));

    let base = fs::read_to_string(root.path().join("out/shaders/overlay_frag.spv")).unwrap();
    assert!(!base.contains("-D"));
}

#[cfg(unix)]
#[test]
fn installing_a_compiler_rebuilds_fallback_copies() {
    let root = tempfile::tempdir().unwrap();
    let source = common::write_file(root.path(), "src/lobby_vert.glsl", b"void main() {}");
    common::precompile(
        &root.path().join("src"),
        &["lobby_vert.spv", "multiview/lobby_vert.spv"],
    );
    let output = root.path().join("out/shaders/lobby_vert.spv");

    let fallback = Pipeline::new("t", root.path().join("out"))
        .with_probe(no_compilers())
        .family(FamilyRequest::new(TargetFamily::SpirV).source(&source))
        .run()
        .unwrap();
    assert_eq!(fallback.report.copied, 2);
    assert_eq!(fs::read_to_string(&output).unwrap(), "precompiled lobby_vert.spv");

    common::fake_tool(&root.path().join("bin"), "glslc", common::RECORDING_COMPILER);
    let compiled = Pipeline::new("t", root.path().join("out"))
        .with_probe(ToolProbe::isolated(root.path().join("bin")))
        .family(FamilyRequest::new(TargetFamily::SpirV).source(&source))
        .run()
        .unwrap();
    assert!(compiled.is_success());
    assert_eq!(compiled.report.compiled, 2);
    assert_eq!(compiled.report.up_to_date, 0);
    assert!(fs::read_to_string(&output).unwrap().contains("-fshader-stage=vert"));
}

#[cfg(unix)]
#[test]
fn fail_fast_stops_after_compiler_error() {
    let root = tempfile::tempdir().unwrap();
    common::fake_tool(&root.path().join("bin"), "glslc", common::FAILING_COMPILER);
    let source = common::write_file(root.path(), "src/overlay_frag.glsl", b"");

    let result = Pipeline::new("t", root.path().join("out"))
        .with_probe(ToolProbe::isolated(root.path().join("bin")))
        .with_scheduler(Scheduler::new().jobs(1))
        .family(FamilyRequest::new(TargetFamily::SpirV).source(&source))
        .run()
        .unwrap();

    assert_eq!(result.report.failures.len(), 1);
    assert_eq!(result.report.skipped, 3);
    assert!(matches!(
        result.into_target(),
        Err(ForgeError::CompilerInvocation { status: Some(2), .. })
    ));
}
