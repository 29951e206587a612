use std::process::ExitCode;

use anyhow::{bail, Result};

use projalign_core::config::{AlignOptions, MigrateOptions};
use projalign_core::defaults::{ALIGNED_PREFIX, UUIDIFIED_PREFIX};
use projalign_core::ProjalignError;

use crate::args::{Cli, Command};
use crate::io::export::Destination;
use crate::output;

mod align;
mod uuidify;

pub async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let failed = match cli.command {
        Command::Align {
            source,
            targets,
            output,
            replace,
            unsafe_mode,
            strict,
            scopes,
            include,
            schema,
            force,
            all_combinations,
        } => {
            ensure_single_output(output.is_some(), targets.len())?;
            let opts = AlignOptions {
                strict,
                unsafe_mode,
                scopes: scopes.into_iter().map(Into::into).collect(),
                include,
                allow_duplicates_after: force,
            };
            let dest = Destination::new(output, replace, ALIGNED_PREFIX);
            let pairs = align::pairs(&source, &targets, all_combinations).await;
            align::run(&pairs, &dest, &opts, &schema).await?
        }
        Command::Uuidify {
            projects,
            output,
            replace,
            unsafe_mode,
            duplicates,
            schema,
            force,
        } => {
            ensure_single_output(output.is_some(), projects.len())?;
            let opts = MigrateOptions {
                unsafe_mode,
                duplicates_only: duplicates,
                allow_duplicates_after: force,
            };
            let dest = Destination::new(output, replace, UUIDIFIED_PREFIX);
            uuidify::run(&projects, &dest, &opts, &schema).await?
        }
    };

    output::failures(&failed)?;
    Ok(if failed.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn ensure_single_output(has_output: bool, inputs: usize) -> Result<()> {
    if has_output && inputs > 1 {
        bail!("--output takes a single project, got {inputs}");
    }
    Ok(())
}

/// The document and its reference index disagree: stop instead of moving on
/// to the next project.
fn is_fatal(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ProjalignError>()
        .is_some_and(ProjalignError::is_orphaned_site)
}
