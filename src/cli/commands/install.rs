//! Install command - run the install pass

use crate::cli::args::InstallArgs;
use crate::config::Config;
use crate::error::LazyInstallResult;
use crate::install::CommandRunner;
use crate::orchestrator::{Orchestrator, RunReport};
use crate::ui::{self, UiContext};
use crate::workspace::Workspace;
use std::sync::Arc;
use tracing::debug;

/// Execute the install command
pub async fn execute(args: InstallArgs, workspace: &Workspace, config: &Config) -> LazyInstallResult<()> {
    let argv = args
        .install_command
        .unwrap_or_else(|| config.install.command.clone());
    let runner = CommandRunner::from_argv(&argv)?;
    let force = args.force || config.install.force;

    debug!(
        "Install pass in {} (force: {})",
        workspace.root().display(),
        force
    );

    let report = Orchestrator::new(workspace.clone(), Arc::new(runner))
        .with_force(force)
        .run()
        .await?;

    print_summary(&UiContext::detect(), &report);
    Ok(())
}

/// Name each updated package; print nothing when nothing was updated
fn print_summary(ctx: &UiContext, report: &RunReport) {
    if report.updated.is_empty() {
        return;
    }

    ui::intro(ctx, "lazyinstall");
    if report.reset {
        ui::step_warn(ctx, "Install state was reset, every package was installed");
    }
    for name in &report.updated {
        ui::step_ok(ctx, name);
    }
    if !report.pruned.is_empty() {
        ui::remark(ctx, &format!("Forgot {}", report.pruned.join(", ")));
    }

    let noun = if report.updated.len() == 1 {
        "package"
    } else {
        "packages"
    };
    ui::outro_success(ctx, &format!("Updated {} {}", report.updated.len(), noun));
}
