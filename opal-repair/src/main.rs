use clap::Parser;

mod cli;
mod disks;
mod halt;
mod logging;
mod ui;

use opal_error::RepairError;
use opal_hal::{LinuxHal, PowerAction, SystemOps};
use opal_workflow::imaging::SourceRoot;
use opal_workflow::{cancel, run_repair, ExecutionPlan, RunOptions};
use std::path::PathBuf;

fn main() {
    logging::init();
    cancel::install_handlers();

    let cli = cli::Cli::parse();
    let hal = LinuxHal::new();

    let result = match cli.command {
        cli::Command::ListDisks => disks::print_disks(&hal),
        cli::Command::Full {
            disk,
            dry_run,
            yes_i_know,
        } => run(&hal, disk, ExecutionPlan::full_reimage(), dry_run, yes_i_know),
        cli::Command::Repair {
            disk,
            os,
            home,
            no_verify,
            dry_run,
            yes_i_know,
        } => {
            let plan = ExecutionPlan {
                rewrite_partition_table: false,
                rewrite_os: os,
                rewrite_home: home,
                verify: !no_verify,
            };
            run(&hal, disk, plan, dry_run, yes_i_know)
        }
    };

    if let Err(err) = result {
        report_fatal(err);
    }
}

fn run(
    hal: &LinuxHal,
    disk: Option<PathBuf>,
    plan: ExecutionPlan,
    dry_run: bool,
    yes_i_know: bool,
) -> Result<(), RepairError> {
    let target = disks::select_disk(hal, disk)?;
    let source = SourceRoot::resolve_default()?;

    for line in plan.summary_lines() {
        log::info!("{line}");
    }

    disks::unmount_auto_mounted(hal, &target, dry_run)?;
    ui::confirm_disk_by_name(&target.disk().display().to_string(), yes_i_know)?;

    run_repair(hal, &target, &plan, &source, &RunOptions::new(dry_run, true))?;

    match ui::completion_prompt()? {
        ui::CompletionAction::Reboot => hal.power(PowerAction::Reboot, dry_run)?,
        ui::CompletionAction::Poweroff => hal.power(PowerAction::Poweroff, dry_run)?,
        ui::CompletionAction::None => {}
    }

    Ok(())
}

/// Single top-level handler for every fatal condition. Verification and
/// precondition failures keep their own diagnostics; tool failures
/// collapse into the generic imaging error, since operator recovery is
/// the same for all of them.
fn report_fatal(err: RepairError) -> ! {
    let code = err.exit_code();
    match &err {
        RepairError::Aborted => {
            // Nothing was harmed; no need to hold the console.
            log::error!("{err}");
            eprintln!("{err}");
            std::process::exit(code);
        }
        RepairError::TypeMismatch { .. }
        | RepairError::LabelMismatch { .. }
        | RepairError::SourceRootMissing(_)
        | RepairError::DiskNotFound(_)
        | RepairError::Interrupted => halt::await_operator(&err.to_string(), code),
        _ => halt::await_operator(
            &format!("Imaging error: {err}. Restart the repair process."),
            code,
        ),
    }
}
