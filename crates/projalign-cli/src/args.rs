use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use projalign_core::config::AlignScope;
use projalign_core::project::CollectionKind;

#[derive(Parser, Debug, Clone)]
#[command(name = "projalign", version, about = "Reconcile and migrate project resource identifiers")]
pub struct Cli {
    /// Emit JSON reports on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging on stderr (RUST_LOG takes precedence).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Rename target resources to the identifiers of their source counterparts.
    Align {
        /// Project whose identifiers are authoritative.
        source: PathBuf,

        /// Projects to rewrite.
        #[arg(required = true)]
        targets: Vec<PathBuf>,

        /// Write the result here (single target only).
        #[arg(long, short, conflicts_with = "replace")]
        output: Option<PathBuf>,

        /// Overwrite each target in place.
        #[arg(long)]
        replace: bool,

        /// Accept non-unique matches and unknown component fields holding
        /// identifiers. Also proceeds without a schema bundle.
        #[arg(long = "unsafe")]
        unsafe_mode: bool,

        /// Only rename resources that are structurally equal.
        #[arg(long)]
        strict: bool,

        /// What to align.
        #[arg(long = "align", value_enum, value_delimiter = ',', default_value = "ids")]
        scopes: Vec<ScopeArg>,

        /// Only align these collections (e.g. `meshes,materials`).
        #[arg(long, value_delimiter = ',')]
        include: Option<Vec<CollectionKind>>,

        #[command(flatten)]
        schema: SchemaArgs,

        /// Write even if duplicate identifiers remain afterwards.
        #[arg(long)]
        force: bool,

        /// Align every listed project against every later one, the source
        /// first. Rewrites in place.
        #[arg(long, requires = "replace")]
        all_combinations: bool,
    },

    /// Replace legacy integer identifiers with random UUIDs.
    Uuidify {
        /// Projects to migrate.
        #[arg(required = true)]
        projects: Vec<PathBuf>,

        /// Write the result here (single project only).
        #[arg(long, short, conflicts_with = "replace")]
        output: Option<PathBuf>,

        /// Overwrite each project in place.
        #[arg(long)]
        replace: bool,

        /// Rewrite unknown component fields holding legacy identifiers.
        /// Also proceeds without a schema bundle.
        #[arg(long = "unsafe")]
        unsafe_mode: bool,

        /// Only report duplicate identifiers; write nothing.
        #[arg(long)]
        duplicates: bool,

        #[command(flatten)]
        schema: SchemaArgs,

        /// Write even if duplicate identifiers remain afterwards.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct SchemaArgs {
    /// Component schema bundle (default: `cache/component-schema.json` next to
    /// the source project for `align`, next to each project for `uuidify`).
    #[arg(long, conflicts_with = "no_schema")]
    pub schema: Option<PathBuf>,

    /// Use the native component definitions only.
    #[arg(long)]
    pub no_schema: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeArg {
    Ids,
}

impl From<ScopeArg> for AlignScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Ids => AlignScope::Ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn align_parses_lists() {
        let cli = Cli::try_parse_from([
            "projalign",
            "align",
            "a.wlp",
            "b.wlp",
            "c.wlp",
            "--include",
            "meshes,materials",
            "--strict",
        ])
        .unwrap();

        match cli.command {
            Command::Align {
                targets,
                include,
                scopes,
                strict,
                ..
            } => {
                assert_eq!(targets.len(), 2);
                assert_eq!(
                    include,
                    Some(vec![CollectionKind::Meshes, CollectionKind::Materials])
                );
                assert_eq!(scopes, vec![ScopeArg::Ids]);
                assert!(strict);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn output_conflicts_with_replace() {
        let err = Cli::try_parse_from(["projalign", "uuidify", "a.wlp", "--output", "b.wlp", "--replace"]);
        assert!(err.is_err());
    }

    #[test]
    fn all_combinations_requires_replace() {
        let err = Cli::try_parse_from(["projalign", "align", "a.wlp", "b.wlp", "--all-combinations"]);
        assert!(err.is_err());

        let cli = Cli::try_parse_from(["projalign", "align", "a.wlp", "b.wlp", "--all-combinations", "--replace"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Align {
                all_combinations: true,
                replace: true,
                ..
            }
        ));
    }

    #[test]
    fn unknown_collection_is_rejected() {
        let err = Cli::try_parse_from(["projalign", "align", "a.wlp", "b.wlp", "--include", "widgets"]);
        assert!(err.is_err());
    }
}
