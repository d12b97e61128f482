use super::*;
use clap::error::ErrorKind;
use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use mergedeploy_core::{
    DependencyContext, DependencyGraph, DependencyRecord, PackageRef, RootProject,
    DEPLOYER_SYMLINKS_CONF,
};
use mergedeploy_deployer::{deploy, DeployOptions, MergedDeployLayout};

use crate::dispatch::{
    format_deploy_outcome_lines, format_deploy_summary_line, format_plan_lines,
    run_deploy_command,
};
use crate::render::{
    format_progress_summary, render_status_line, resolve_output_style, OutputStyle,
};
use crate::settings::load_conf_with_home;

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_dir(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let sequence = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "mergedeploy-cli-tests-{label}-{}-{}-{}",
        std::process::id(),
        nanos,
        sequence
    ));
    fs::create_dir_all(&path).expect("must create test dir");
    path
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("must create parent dir");
    }
    fs::write(path, content).expect("must write file");
}

fn write_fixture_graph(root: &Path, with_broken_host: bool) -> PathBuf {
    write_file(&root.join("pkgs").join("glslang").join("bin").join("glslangValidator"), "tool");
    write_file(&root.join("pkgs").join("zlib").join("include").join("zlib.h"), "header");
    write_file(
        &root.join("pkgs").join("zlib").join("licenses").join("LICENSE"),
        "Zlib",
    );
    write_file(&root.join("pkgs").join("zlib").join("conaninfo.txt"), "[settings]");

    let broken = if with_broken_host {
        "\n[[host]]\nref = \"sophus/1.22.10\"\npackage_folder = \"pkgs/missing\"\n"
    } else {
        ""
    };
    let graph_path = root.join("graph.toml");
    write_file(
        &graph_path,
        &format!(
            r#"
[root]
name = "camera_calibration"
version = "0.1"

[[build]]
ref = "glslang/1.3.268.0"
package_folder = "pkgs/glslang"

[[host]]
ref = "opengl/system"

[[host]]
ref = "zlib/1.3.1"
package_folder = "pkgs/zlib"
{broken}"#
        ),
    );
    graph_path
}

#[test]
fn parse_deploy_command_with_repeated_conf_overrides() {
    let cli = Cli::try_parse_from([
        "mergedeploy",
        "deploy",
        "--graph",
        "graph.toml",
        "--output-folder",
        "out",
        "-c",
        "tools.deployer:symlinks=False",
        "--conf",
        "user.camera:profile=release",
        "--report",
        "report.json",
    ])
    .expect("deploy command must parse");

    assert_eq!(cli.style, StyleArg::Auto);
    let Commands::Deploy(args) = cli.command else {
        panic!("expected deploy command");
    };
    assert_eq!(args.graph, PathBuf::from("graph.toml"));
    assert_eq!(args.output_folder, PathBuf::from("out"));
    assert_eq!(
        args.conf,
        vec![
            "tools.deployer:symlinks=False".to_string(),
            "user.camera:profile=release".to_string()
        ]
    );
    assert!(args.conf_file.is_none());
    assert_eq!(args.report, Some(PathBuf::from("report.json")));
}

#[test]
fn deploy_output_folder_defaults_to_current_directory() {
    let cli = Cli::try_parse_from(["mergedeploy", "--style", "plain", "deploy", "--graph", "g.toml"])
        .expect("deploy command must parse");
    assert_eq!(cli.style, StyleArg::Plain);
    let Commands::Deploy(args) = cli.command else {
        panic!("expected deploy command");
    };
    assert_eq!(args.output_folder, PathBuf::from("."));
}

#[test]
fn deploy_requires_graph_argument() {
    let err = Cli::try_parse_from(["mergedeploy", "deploy"]).expect_err("graph is required");
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn style_rejects_unknown_values() {
    let err = Cli::try_parse_from(["mergedeploy", "--style", "fancy", "digest", "."])
        .expect_err("unknown style must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn completions_script_mentions_binary_name() {
    let mut command = Cli::command();
    let mut generated = Vec::new();
    clap_complete::generate(
        clap_complete::Shell::Bash,
        &mut command,
        "mergedeploy",
        &mut generated,
    );
    let script = String::from_utf8(generated).expect("completion script must be utf-8");
    assert!(script.contains("mergedeploy"));
    assert!(script.contains("deploy"));
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "Deployed dependencies to: /out/merged_deploy"),
        "Deployed dependencies to: /out/merged_deploy"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "Deployed dependencies to: /out/merged_deploy"),
        "[OK] Deployed dependencies to: /out/merged_deploy"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "opengl/system skipped"),
        "[WARN] opengl/system skipped"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "err", "copy failed"),
        "[ERR] copy failed"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "step", "deploy summary"),
        "[..] deploy summary"
    );
}

#[test]
fn resolve_output_style_follows_stdout_tty() {
    assert_eq!(resolve_output_style(true), OutputStyle::Rich);
    assert_eq!(resolve_output_style(false), OutputStyle::Plain);
}

#[test]
fn progress_summary_reports_counts_and_elapsed_millis() {
    assert_eq!(
        format_progress_summary("deploy", 2, 3, Duration::from_millis(1_250)),
        "deploy: 2/3 in 1.250s"
    );
    assert_eq!(
        format_progress_summary("deploy", 0, 0, Duration::from_micros(900)),
        "deploy: 0/0 in 0.000s"
    );
}

#[test]
fn format_plan_lines_lists_copies_and_skips_per_context() {
    let mut graph = DependencyGraph::new(RootProject {
        name: "camera_calibration".to_string(),
        version: None,
    });
    graph
        .add_dependency(
            DependencyContext::Build,
            DependencyRecord::new(
                PackageRef::parse("glslang/1.3.268.0").expect("reference should parse"),
                Some(PathBuf::from("/pkgs/glslang")),
            ),
        )
        .expect("glslang should be added");
    graph
        .add_dependency(
            DependencyContext::Host,
            DependencyRecord::new(
                PackageRef::parse("xorg/system").expect("reference should parse"),
                None,
            ),
        )
        .expect("xorg should be added");

    let lines = format_plan_lines(&graph, &MergedDeployLayout::new("/out"));
    assert_eq!(
        lines,
        vec![
            format!("target: {}", Path::new("/out").join("merged_deploy").display()),
            "build (1):".to_string(),
            format!("  copy glslang/1.3.268.0 from {}", Path::new("/pkgs/glslang").display()),
            "host (1):".to_string(),
            "  skip xorg/system (no package folder)".to_string(),
        ]
    );
}

#[test]
fn format_deploy_outcome_lines_scopes_warnings() {
    let root = test_dir("outcome-lines");
    let graph_path = write_fixture_graph(&root, false);
    let graph = DependencyGraph::load(&graph_path).expect("graph must load");
    let report = deploy(&graph, &root.join("out"), &DeployOptions::default())
        .expect("deploy must succeed");

    assert_eq!(
        format_deploy_outcome_lines(&report, OutputStyle::Rich),
        vec![
            "[WARN] merged_deploy: opengl/system does not have a package folder, skipping"
                .to_string(),
            "[..] deploy summary: copied=2 skipped=1".to_string(),
        ]
    );
    assert_eq!(
        format_deploy_summary_line(0, 0),
        "deploy summary: copied=0 skipped=0"
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn load_conf_prefers_overrides_over_home_conf() {
    let root = test_dir("conf-home");
    write_file(
        &root.join("global.conf"),
        "# defaults\ntools.deployer:symlinks=True\nuser.camera:profile=debug\n",
    );

    let conf = load_conf_with_home(
        None,
        &["tools.deployer:symlinks=False".to_string()],
        Some(&root),
    )
    .expect("conf must load");
    assert!(!conf
        .get_bool(DEPLOYER_SYMLINKS_CONF, true)
        .expect("bool must parse"));
    assert_eq!(conf.get_str("user.camera:profile"), Some("debug"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn load_conf_explicit_file_replaces_home_conf() {
    let root = test_dir("conf-explicit");
    write_file(&root.join("global.conf"), "user.camera:profile=debug\n");
    let explicit = root.join("ci.conf");
    write_file(&explicit, "tools.deployer:symlinks=0\n");

    let conf = load_conf_with_home(Some(&explicit), &[], Some(&root)).expect("conf must load");
    assert!(conf.get_str("user.camera:profile").is_none());
    assert!(!conf
        .get_bool(DEPLOYER_SYMLINKS_CONF, true)
        .expect("bool must parse"));

    let conf = load_conf_with_home(None, &[], None).expect("empty conf must load");
    assert!(conf.get_str(DEPLOYER_SYMLINKS_CONF).is_none());
    assert!(conf.get_str("user.camera:profile").is_none());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn load_conf_rejects_malformed_override() {
    let err = load_conf_with_home(None, &["symlinks".to_string()], None)
        .expect_err("malformed override must fail");
    assert!(err.to_string().contains("invalid conf override 'symlinks'"));
}

#[test]
fn deploy_command_writes_tree_and_report() {
    let root = test_dir("deploy-command");
    let graph_path = write_fixture_graph(&root, false);
    let output = root.join("out");
    let report_path = root.join("reports").join("deploy.json");

    let args = DeployArgs {
        graph: graph_path,
        output_folder: output.clone(),
        conf: vec!["tools.deployer:symlinks=False".to_string()],
        conf_file: None,
        report: Some(report_path.clone()),
    };
    run_deploy_command(&args, OutputStyle::Plain).expect("deploy command must succeed");

    let merged = output.join("merged_deploy");
    assert!(merged.join("build").join("bin").join("glslangValidator").is_file());
    assert!(merged.join("host").join("include").join("zlib.h").is_file());
    assert!(merged.join("host").join("licenses").join("zlib").join("LICENSE").is_file());
    assert!(!merged.join("host").join("conaninfo.txt").exists());

    let raw = fs::read_to_string(&report_path).expect("report must be written");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("report must be json");
    assert_eq!(value["version"], 1);
    assert_eq!(
        value["tree_digest"].as_str(),
        Some(
            mergedeploy_deployer::tree_digest(&merged)
                .expect("digest must succeed")
                .as_str()
        )
    );
    let entries = value["entries"].as_array().expect("entries must be an array");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["context"], "build");
    assert_eq!(entries[0]["reference"], "glslang/1.3.268.0");
    assert_eq!(entries[0]["outcome"]["status"], "copied");
    assert_eq!(entries[1]["outcome"]["status"], "skipped");
    assert_eq!(
        entries[1]["outcome"]["reason"],
        "opengl/system does not have a package folder, skipping"
    );

    let folders = value["deploy_folders"]
        .as_array()
        .expect("deploy folders must be an array");
    assert_eq!(folders.len(), 2);
    assert_eq!(folders[1]["context"], "host");
    assert_eq!(folders[1]["name"], "zlib");

    let host = value["graph"]["host"].as_array().expect("graph host deps");
    assert!(host[0].get("deploy_folder").is_none());
    assert_eq!(
        host[1]["deploy_folder"].as_str(),
        merged.join("host").to_str()
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn deploy_command_propagates_hard_failure_without_report() {
    let root = test_dir("deploy-failure");
    let graph_path = write_fixture_graph(&root, true);
    let report_path = root.join("deploy.json");

    let args = DeployArgs {
        graph: graph_path,
        output_folder: root.join("out"),
        conf: Vec::new(),
        conf_file: None,
        report: Some(report_path.clone()),
    };
    let err = run_deploy_command(&args, OutputStyle::Plain).expect_err("deploy must fail");
    let message = err.to_string();
    assert!(message.starts_with("merged_deploy: Copying of 'sophus/1.22.10' files failed: "));
    assert!(message.contains("You can use 'tools.deployer:symlinks' conf to disable symlinks"));
    assert!(!report_path.exists());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn deploy_command_rejects_non_boolean_symlink_conf() {
    let root = test_dir("deploy-bad-conf");
    let graph_path = write_fixture_graph(&root, false);

    let args = DeployArgs {
        graph: graph_path,
        output_folder: root.join("out"),
        conf: vec!["tools.deployer:symlinks=sometimes".to_string()],
        conf_file: None,
        report: None,
    };
    let err = run_deploy_command(&args, OutputStyle::Plain).expect_err("bad conf must fail");
    assert!(err.to_string().contains("tools.deployer:symlinks"));
    assert!(!root.join("out").join("merged_deploy").exists());

    let _ = fs::remove_dir_all(&root);
}
