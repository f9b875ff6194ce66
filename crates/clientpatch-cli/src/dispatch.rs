use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clientpatch_core::{PatchConfig, PatchLayout};
use clientpatch_overlay::{
    revert_generated, ApplyReport, GeneratedFiles, PatchManager, PatchStatus, RevertReport,
    RevertScope,
};
use tracing::debug;

use crate::completion::write_completions_script;
use crate::render::{render_status_line, OutputStyle, TerminalRenderer};
use crate::{Cli, Commands, GeneratedCommands, RootOptions};

pub(crate) const CONFIG_FILE_NAME: &str = "clientpatch.toml";

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let renderer = TerminalRenderer::current();

    match cli.command {
        Commands::Apply { version } => {
            let layout = current_layout(&cli.roots)?;
            let manager = PatchManager::new(&layout);
            renderer.print_section("apply");
            let mut progress = renderer.progress();
            let report = manager
                .apply_patch_with_progress(&version, &mut progress)
                .with_context(|| format!("failed to apply patch set '{version}'"))?;
            renderer.print_lines(&format_apply_lines(&report, renderer.style()));
        }
        Commands::Revert { yes } => {
            let layout = current_layout(&cli.roots)?;
            let manager = PatchManager::new(&layout);
            if !manager.has_something_to_revert()? {
                renderer.print_status("ok", "nothing to revert");
                return Ok(());
            }
            ensure_revert_confirmed(yes)?;

            renderer.print_section("revert");
            let mut progress = renderer.progress();
            let report = manager
                .revert_patch_with_progress(&mut progress)
                .context("failed to revert patch")?;
            renderer.print_lines(&format_revert_lines(&report, renderer.style()));
        }
        Commands::Status => {
            let layout = current_layout(&cli.roots)?;
            let status = PatchManager::new(&layout).status()?;
            renderer.print_lines(&format_status_lines(&status, renderer.style()));
        }
        Commands::Versions => {
            let layout = current_layout(&cli.roots)?;
            let versions = layout.available_versions().with_context(|| {
                format!(
                    "failed to list client versions: {}",
                    layout.versions_dir().display()
                )
            })?;
            if versions.is_empty() {
                renderer.print_status(
                    "warn",
                    &format!(
                        "no client versions found under {}",
                        layout.versions_dir().display()
                    ),
                );
            }
            for version in versions {
                println!("{version}");
            }
        }
        Commands::Doctor => {
            let layout = current_layout(&cli.roots)?;
            renderer.print_lines(&format_doctor_lines(&layout, renderer.style()));
        }
        Commands::Generated { command } => {
            let layout = current_layout(&cli.roots)?;
            run_generated_command(&layout, command, renderer)?;
        }
        Commands::Completions { shell } => {
            let mut stdout = io::stdout().lock();
            write_completions_script(shell, &mut stdout)?;
        }
    }

    Ok(())
}

fn run_generated_command(
    layout: &PatchLayout,
    command: GeneratedCommands,
    renderer: TerminalRenderer,
) -> Result<()> {
    match command {
        GeneratedCommands::Status { feature } => {
            let mut files = GeneratedFiles::for_feature(layout, &feature)?;
            if !files.has_revert_info()? {
                renderer.print_status("ok", &format!("{feature}: no generated files recorded"));
                return Ok(());
            }
            renderer.print_status(
                "step",
                &format!("{feature}: {} generated files recorded", files.files().len()),
            );
            for file in files.files() {
                println!("  {file}");
            }
        }
        GeneratedCommands::Revert { feature, version } => {
            let scope = match version {
                Some(version) => RevertScope::Version(version),
                None => RevertScope::All,
            };
            let removed = revert_generated(layout, &feature, &scope)
                .with_context(|| format!("failed to revert generated files for {feature}"))?;
            renderer.print_status(
                "ok",
                &format!("{feature}: removed {removed} generated files"),
            );
        }
    }
    Ok(())
}

fn current_layout(roots: &RootOptions) -> Result<PatchLayout> {
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    let config = resolve_config(roots, &cwd)?;
    debug!(
        target_root = %config.target_root.display(),
        patch_root = %config.patch_root.display(),
        "resolved config"
    );
    Ok(PatchLayout::new(&config))
}

/// `--config`, then `clientpatch.toml` in `cwd`, then the default layout with
/// the patch root at `--patch-root` or `cwd`. Root flags override whatever
/// the config says.
pub(crate) fn resolve_config(roots: &RootOptions, cwd: &Path) -> Result<PatchConfig> {
    let default_path = cwd.join(CONFIG_FILE_NAME);
    let mut config = match &roots.config {
        Some(path) => PatchConfig::load(&absolute_from(cwd, path))?,
        None if default_path.is_file() => PatchConfig::load(&default_path)?,
        None => {
            let patch_root = roots
                .patch_root
                .as_deref()
                .map(|path| absolute_from(cwd, path))
                .unwrap_or_else(|| cwd.to_path_buf());
            PatchConfig::discover(patch_root)?
        }
    };

    if let Some(target_root) = &roots.target_root {
        config.target_root = absolute_from(cwd, target_root);
    }
    if let Some(patch_root) = &roots.patch_root {
        config.patch_root = absolute_from(cwd, patch_root);
    }
    Ok(config)
}

fn absolute_from(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

pub(crate) fn ensure_revert_confirmed(yes: bool) -> Result<()> {
    if !yes {
        bail!(
            "revert deletes patched files and everything under the volatile directories; rerun with --yes to continue"
        );
    }
    Ok(())
}

pub(crate) fn format_apply_lines(report: &ApplyReport, style: OutputStyle) -> Vec<String> {
    vec![
        render_status_line(
            style,
            "ok",
            &format!(
                "applied {}: {} files installed, {} backed up",
                report.version, report.installed, report.backed_up
            ),
        ),
        render_status_line(
            style,
            "step",
            &format!("record: {}", report.record_path.display()),
        ),
    ]
}

pub(crate) fn format_revert_lines(report: &RevertReport, style: OutputStyle) -> Vec<String> {
    let mut lines = Vec::new();
    if report.recovered_journal {
        lines.push(render_status_line(
            style,
            "warn",
            "recovered an interrupted commit from its journal",
        ));
    }
    lines.push(render_status_line(
        style,
        "ok",
        &format!(
            "reverted: {} installed files removed, {} files restored, {} volatile files removed",
            report.removed_installed, report.restored, report.removed_volatile
        ),
    ));
    if report.pruned_dirs > 0 {
        lines.push(render_status_line(
            style,
            "step",
            &format!("pruned {} empty directories", report.pruned_dirs),
        ));
    }
    lines
}

pub(crate) fn format_status_lines(status: &PatchStatus, style: OutputStyle) -> Vec<String> {
    let mut lines = Vec::new();
    match &status.session {
        Some(session) => lines.push(render_status_line(
            style,
            "ok",
            &format!(
                "patched at {}: {} files installed, {} backed up",
                session.timestamp,
                session.installed.len(),
                session.backed_up.len()
            ),
        )),
        None => lines.push(render_status_line(style, "ok", "no patch applied")),
    }
    if status.interrupted {
        lines.push(render_status_line(
            style,
            "warn",
            "interrupted commit found; run `clientpatch revert --yes` to recover",
        ));
    } else if status.session.is_none() && status.has_something_to_revert {
        lines.push(render_status_line(
            style,
            "step",
            "volatile directories contain files",
        ));
    }

    let versions = if status.available_versions.is_empty() {
        "none".to_string()
    } else {
        status.available_versions.join(", ")
    };
    lines.push(render_status_line(
        style,
        "step",
        &format!("available versions: {versions}"),
    ));
    for dir in &status.missing_dirs {
        lines.push(render_status_line(
            style,
            "warn",
            &format!("missing directory: {}", dir.display()),
        ));
    }
    lines
}

pub(crate) fn format_doctor_lines(layout: &PatchLayout, style: OutputStyle) -> Vec<String> {
    let mut lines = vec![
        render_status_line(
            style,
            "step",
            &format!("target root: {}", layout.target_root().display()),
        ),
        render_status_line(
            style,
            "step",
            &format!("patch root: {}", layout.patch_root().display()),
        ),
        render_status_line(
            style,
            "step",
            &format!("backup: {}", layout.backup_dir().display()),
        ),
    ];

    let missing = layout.missing_dirs();
    if missing.is_empty() {
        lines.push(render_status_line(style, "ok", "patch directories present"));
    }
    for dir in missing {
        lines.push(render_status_line(
            style,
            "err",
            &format!("missing directory: {}", dir.display()),
        ));
    }
    for dir in layout.volatile_dirs() {
        lines.push(render_status_line(
            style,
            "step",
            &format!("volatile: {}", dir.display()),
        ));
    }
    lines
}
