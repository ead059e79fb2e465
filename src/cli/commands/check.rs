//! Check command - report what an install pass would do

use crate::cli::args::{CheckArgs, OutputFormat};
use crate::error::LazyInstallResult;
use crate::fingerprint::FingerprintEngine;
use crate::orchestrator::{self, PackagePlan};
use crate::state::StateStore;
use crate::ui::{self, UiContext};
use crate::workspace::Workspace;
use console::style;

/// Execute the check command
pub async fn execute(args: CheckArgs, workspace: &Workspace) -> LazyInstallResult<()> {
    let engine = FingerprintEngine::new(workspace.clone());
    let store = StateStore::new(workspace.state_path());
    let plan = orchestrator::plan(&engine, &store).await?;

    match args.format {
        OutputFormat::Table => print_table(&plan),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Plain => print_plain(&plan),
    }

    Ok(())
}

fn print_table(plan: &[PackagePlan]) {
    if plan.is_empty() {
        ui::step_info(&UiContext::detect(), "No packages declared");
        return;
    }

    println!("{:<40} {:<30}", "PACKAGE", "STATUS");
    println!("{}", "-".repeat(70));

    for entry in plan {
        let status = match entry.reason {
            Some(reason) => style(format!("install ({})", reason)).yellow().to_string(),
            None => style("up to date").green().to_string(),
        };
        println!("{:<40} {:<30}", entry.name, status);
    }

    let pending = plan.iter().filter(|p| p.reason.is_some()).count();
    println!();
    println!("{} of {} package(s) need installing", pending, plan.len());
}

fn print_plain(plan: &[PackagePlan]) {
    for entry in plan.iter().filter(|p| p.reason.is_some()) {
        println!("{}", entry.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::UpdateReason;

    #[test]
    fn plan_serializes_reasons() {
        let plan = vec![
            PackagePlan {
                name: "a".to_string(),
                reason: Some(UpdateReason::LocalDependencies),
            },
            PackagePlan {
                name: "b".to_string(),
                reason: None,
            },
        ];

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json[0]["reason"], "local-dependencies");
        assert!(json[1]["reason"].is_null());

        print_table(&plan);
        print_plain(&plan);
    }
}
