use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use xfsite::model::{Category, DocId};

fn parse_doc(s: &str) -> Result<DocId, String> {
    s.parse()
}

fn parse_category(s: &str) -> Result<Category, String> {
    s.parse()
}

#[derive(Parser, Debug)]
#[command(
    name = "xfsite",
    bin_name = "xfsite",
    version,
    disable_help_subcommand = true,
    about = "Edit and store Xandeum Finance site content and roadmap",
    long_about = None,
    after_help = "Documents: whitepaper, architecture, integration, features"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Data directory (defaults to XFSITE_DATA_DIR or the OS data dir)
    #[arg(long, global = true, help_heading = "Options")]
    pub data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show page content, all documents or one
    #[command(display_order = 1)]
    Show {
        #[arg(value_parser = parse_doc)]
        doc: Option<DocId>,
    },

    /// Change a document's title or subtitle
    #[command(display_order = 2)]
    Meta {
        #[arg(value_parser = parse_doc)]
        doc: DocId,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        subtitle: Option<String>,
    },

    /// Add, edit, delete or inspect sections
    #[command(display_order = 3)]
    Section {
        #[command(subcommand)]
        action: SectionCommands,
    },

    /// Attach images to sections or remove them
    #[command(display_order = 4)]
    Image {
        #[command(subcommand)]
        action: ImageCommands,
    },

    /// Roadmap overview
    #[command(display_order = 10)]
    Roadmap {
        #[command(subcommand)]
        action: Option<RoadmapCommands>,
    },

    /// Add, update or delete roadmap tasks
    #[command(display_order = 11)]
    Task {
        #[command(subcommand)]
        action: TaskCommands,
    },

    /// Add, update or delete roadmap quarters
    #[command(display_order = 12)]
    Quarter {
        #[command(subcommand)]
        action: QuarterCommands,
    },

    /// Export content (or the roadmap) to a JSON file
    #[command(display_order = 20)]
    Export {
        /// Export the roadmap instead of page content
        #[arg(long)]
        roadmap: bool,

        /// Output path (defaults to the dated export name in the current dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace content (or the roadmap) from an exported JSON file
    #[command(display_order = 21)]
    Import {
        path: PathBuf,

        /// Import a roadmap file instead of page content
        #[arg(long)]
        roadmap: bool,
    },

    /// Restore built-in content for one document, all documents or the roadmap
    #[command(display_order = 22)]
    Reset {
        #[arg(value_parser = parse_doc, conflicts_with = "roadmap")]
        doc: Option<DocId>,

        #[arg(long)]
        roadmap: bool,

        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Write every stored record to a backup file
    #[command(display_order = 30)]
    Backup {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the records of a backup file back to storage
    #[command(display_order = 31)]
    Restore { path: PathBuf },

    /// Copy local records to the configured remote store
    #[command(display_order = 32)]
    Migrate,

    /// Check local and remote storage
    #[command(display_order = 33)]
    Health,

    /// Manage the cached remote credentials
    #[command(display_order = 40)]
    Remote {
        #[command(subcommand)]
        action: RemoteCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum SectionCommands {
    /// Add a section at the end of a document
    Add {
        #[arg(value_parser = parse_doc)]
        doc: DocId,

        #[arg(long)]
        title: String,

        #[arg(long, default_value = "", conflicts_with = "content_file")]
        content: String,

        /// Read the section body from a file
        #[arg(long)]
        content_file: Option<PathBuf>,

        /// Explicit section id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Open a section, change it and save it
    Edit {
        #[arg(value_parser = parse_doc)]
        doc: DocId,

        section: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,

        #[arg(long)]
        content_file: Option<PathBuf>,
    },

    /// Delete a section and its images
    Delete {
        #[arg(value_parser = parse_doc)]
        doc: DocId,

        section: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// List a section's images
    Images {
        #[arg(value_parser = parse_doc)]
        doc: DocId,

        section: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ImageCommands {
    /// Attach an image file or data URL to a section
    Attach {
        #[arg(value_parser = parse_doc)]
        doc: DocId,

        section: String,

        /// Image file path or `data:image/...;base64,...` URL
        source: String,

        /// Display name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Remove an image from a section
    Remove {
        #[arg(value_parser = parse_doc)]
        doc: DocId,

        section: String,

        image_id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum RoadmapCommands {
    /// Show every quarter and its tasks
    Show,
}

#[derive(Args, Debug, Default)]
pub struct TaskFields {
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, value_parser = parse_category)]
    pub category: Option<Category>,

    /// Percent complete, clamped to 0-100
    #[arg(long, allow_negative_numbers = true)]
    pub progress: Option<i64>,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a task to a quarter
    Add {
        quarter: String,

        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, value_parser = parse_category, default_value = "Foundation")]
        category: Category,

        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        progress: i64,
    },

    /// Change a task, or move it to another quarter
    Update {
        task: String,

        #[command(flatten)]
        fields: TaskFields,

        /// Move the task to this quarter
        #[arg(long)]
        quarter: Option<String>,
    },

    /// Delete a task
    Delete { task: String },
}

#[derive(Subcommand, Debug)]
pub enum QuarterCommands {
    /// Add a quarter (id and name are generated when omitted)
    Add {
        #[arg(long)]
        id: Option<String>,

        #[arg(long)]
        name: Option<String>,
    },

    /// Rename a quarter or change its id
    Update {
        quarter: String,

        #[arg(long, required_unless_present = "id")]
        name: Option<String>,

        /// New quarter id
        #[arg(long)]
        id: Option<String>,
    },

    /// Delete a quarter and all its tasks
    Delete {
        quarter: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum RemoteCommands {
    /// Cache remote credentials in the data directory
    Set {
        #[arg(long)]
        url: String,

        #[arg(long)]
        key: String,
    },

    /// Remove cached remote credentials
    Clear,

    /// Show the effective storage settings
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_document_aliases() {
        let cli = Cli::try_parse_from(["xfsite", "show", "features"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Show {
                doc: Some(DocId::FinancialFeatures)
            })
        ));
    }

    #[test]
    fn rejects_unknown_document() {
        assert!(Cli::try_parse_from(["xfsite", "show", "blog"]).is_err());
    }

    #[test]
    fn task_update_accepts_negative_progress() {
        let cli =
            Cli::try_parse_from(["xfsite", "task", "update", "core-ui", "--progress", "-5"])
                .unwrap();
        match cli.command {
            Some(Commands::Task {
                action: TaskCommands::Update { fields, .. },
            }) => assert_eq!(fields.progress, Some(-5)),
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn reset_doc_conflicts_with_roadmap() {
        assert!(
            Cli::try_parse_from(["xfsite", "reset", "whitepaper", "--roadmap", "--yes"]).is_err()
        );
    }

    #[test]
    fn quarter_update_takes_name_or_id() {
        let cli =
            Cli::try_parse_from(["xfsite", "quarter", "update", "q1-2026", "--id", "launch"])
                .unwrap();
        match cli.command {
            Some(Commands::Quarter {
                action: QuarterCommands::Update { quarter, name, id },
            }) => {
                assert_eq!(quarter, "q1-2026");
                assert_eq!(name, None);
                assert_eq!(id.as_deref(), Some("launch"));
            }
            other => panic!("unexpected parse: {:?}", other),
        }
        assert!(Cli::try_parse_from(["xfsite", "quarter", "update", "q1-2026"]).is_err());
    }
}
