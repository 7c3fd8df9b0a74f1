use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Opal dual-slot device repair and reimaging")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Full reimage: rewrite the partition table, both OS slots, and home.
    Full {
        /// Target disk (prompted for when omitted)
        #[arg(long)]
        disk: Option<PathBuf>,
        /// Log intended operations without executing them
        #[arg(long)]
        dry_run: bool,
        /// Skip interactive confirmation. This operation is destructive!
        #[arg(long)]
        yes_i_know: bool,
    },
    /// Partial repair of an intact layout; touched partitions are verified first.
    Repair {
        /// Target disk (prompted for when omitted)
        #[arg(long)]
        disk: Option<PathBuf>,
        /// Re-image both OS slots from the live source root
        #[arg(long)]
        os: bool,
        /// Reformat the home and var partitions
        #[arg(long)]
        home: bool,
        /// Skip the pre-flight type/label verification
        #[arg(long)]
        no_verify: bool,
        /// Log intended operations without executing them
        #[arg(long)]
        dry_run: bool,
        /// Skip interactive confirmation. This operation is destructive!
        #[arg(long)]
        yes_i_know: bool,
    },
    /// List candidate target disks.
    ListDisks,
}
