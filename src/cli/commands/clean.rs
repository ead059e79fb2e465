//! Clean command - forget all recorded installs

use crate::cli::args::CleanArgs;
use crate::error::LazyInstallResult;
use crate::state::StateStore;
use crate::ui::{self, UiContext};
use crate::workspace::Workspace;
use tracing::info;

/// Execute the clean command
pub async fn execute(args: CleanArgs, workspace: &Workspace) -> LazyInstallResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let store = StateStore::new(workspace.state_path());

    let prompt = format!(
        "Delete {}? Every package will reinstall on the next run.",
        store.path().display()
    );
    if !ui::confirm(&ctx, &prompt, true).await? {
        ui::step_info(&ctx, "Aborted");
        return Ok(());
    }

    if store.clear().await? {
        info!("Deleted {}", store.path().display());
        ui::step_ok(&ctx, &format!("Deleted {}", store.path().display()));
    } else {
        ui::step_info(&ctx, "No install state to delete");
    }

    Ok(())
}
