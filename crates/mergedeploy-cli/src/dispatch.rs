use std::io;
use std::path::Path;

use anyhow::Result;
use clap::CommandFactory;
use mergedeploy_core::{DependencyContext, DependencyGraph};
use mergedeploy_deployer::{
    deploy_merged_with_progress, tree_digest, DeployOptions, DeployReport, MergedDeployLayout,
    MERGED_DEPLOY_DIR,
};

use crate::render::{output_style_for, render_status_line, OutputStyle, TerminalRenderer};
use crate::report::{build_report_document, write_report_document};
use crate::settings::load_conf;
use crate::{Cli, Commands, DeployArgs};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let style = output_style_for(cli.style);

    match cli.command {
        Commands::Deploy(args) => run_deploy_command(&args, style),
        Commands::Plan {
            graph,
            output_folder,
        } => {
            let graph = DependencyGraph::load(&graph)?;
            let layout = MergedDeployLayout::new(output_folder);
            TerminalRenderer::from_style(style).print_lines(&format_plan_lines(&graph, &layout));
            Ok(())
        }
        Commands::Digest { path } => {
            println!("{}", tree_digest(&path)?);
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "mergedeploy", &mut io::stdout());
            Ok(())
        }
    }
}

pub(crate) fn run_deploy_command(args: &DeployArgs, style: OutputStyle) -> Result<()> {
    let graph = DependencyGraph::load(&args.graph)?;
    let conf = load_conf(args.conf_file.as_deref(), &args.conf)?;
    let options = DeployOptions::from_conf(&conf)?;
    let renderer = TerminalRenderer::from_style(style);

    renderer.print_section(&format!("Deploying {}", graph.root.name));
    let report = deploy_with_progress(&graph, &args.output_folder, &options, renderer)?;
    renderer.print_lines(&format_deploy_outcome_lines(&report, style));

    if let Some(guidance) = report.failure().and_then(|failure| failure.guidance()) {
        renderer.print_status("err", &format!("{MERGED_DEPLOY_DIR}: {guidance}"));
    }
    report.ensure_succeeded()?;

    if let Some(report_path) = &args.report {
        let digest = tree_digest(report.target())?;
        let document = build_report_document(&graph, &report, digest);
        write_report_document(report_path, &document)?;
        renderer.print_status("step", &format!("report: {}", report_path.display()));
    }

    renderer.print_status("ok", &report.success_message());
    Ok(())
}

fn deploy_with_progress(
    graph: &DependencyGraph,
    output_folder: &Path,
    options: &DeployOptions,
    renderer: TerminalRenderer,
) -> Result<DeployReport> {
    let mut progress = renderer.start_progress("deploy", graph.dependency_count() as u64);
    let result = deploy_merged_with_progress(graph, output_folder, options, |processed, _| {
        progress.set(processed as u64)
    });

    match &result {
        Ok(report) if report.failure().is_none() => progress.finish_success(),
        _ => progress.finish_abandon(),
    }
    result
}

pub(crate) fn format_deploy_outcome_lines(report: &DeployReport, style: OutputStyle) -> Vec<String> {
    let mut lines = report
        .warnings()
        .into_iter()
        .map(|warning| render_status_line(style, "warn", &format!("{MERGED_DEPLOY_DIR}: {warning}")))
        .collect::<Vec<_>>();
    lines.push(render_status_line(
        style,
        "step",
        &format_deploy_summary_line(report.copied_count(), report.skipped_count()),
    ));
    lines
}

pub(crate) fn format_deploy_summary_line(copied: usize, skipped: usize) -> String {
    format!("deploy summary: copied={copied} skipped={skipped}")
}

pub(crate) fn format_plan_lines(graph: &DependencyGraph, layout: &MergedDeployLayout) -> Vec<String> {
    let mut lines = vec![format!("target: {}", layout.merged_root().display())];
    for context in DependencyContext::ALL {
        let dependencies = graph.dependencies(context);
        lines.push(format!("{} ({}):", context.as_str(), dependencies.len()));
        for record in dependencies {
            match &record.package_folder {
                Some(folder) => lines.push(format!(
                    "  copy {} from {}",
                    record.reference,
                    folder.display()
                )),
                None => lines.push(format!(
                    "  skip {} (no package folder)",
                    record.reference
                )),
            }
        }
    }
    lines
}
