//! # CLI Layer
//!
//! The CLI layer is the **only** place in the codebase that:
//! - Knows about terminal I/O (stdout, stderr)
//! - Uses `std::process::exit`
//! - Handles argument parsing
//! - Formats output for human consumption
//!
//! ## Responsibilities
//!
//! 1. **Context Setup**: logging, data directory, config, backends
//! 2. **Dispatch**: route each subcommand to the [`SiteApi`]
//! 3. **Output**: hand the returned [`CmdResult`] to `render`
//! 4. **Shutdown**: flush pending writes whatever the command did

use super::render::{print_messages, print_result};
use super::setup::{
    Cli, Commands, ImageCommands, QuarterCommands, RemoteCommands, RoadmapCommands,
    SectionCommands, TaskCommands,
};
use clap::Parser;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;
use xfsite::api::SiteApi;
use xfsite::blobs::{image_payload, media_type_for_path, parse_data_url, BlobPayload};
use xfsite::clock::SystemClock;
use xfsite::commands::content::{NewSection, SectionPatch};
use xfsite::commands::roadmap::{NewQuarter, NewTask, QuarterPatch, TaskPatch};
use xfsite::commands::storage::parse_backup;
use xfsite::commands::{CmdMessage, CmdResult};
use xfsite::config::{RemoteOverride, SiteConfig, StorageMode};
use xfsite::error::{Result, SiteError};
use xfsite::service::PersistenceService;

const DATA_DIR_ENV: &str = "XFSITE_DATA_DIR";
const LOG_ENV: &str = "XFSITE_LOG";

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let data_dir = resolve_data_dir(cli.data_dir.clone())?;
    let config = SiteConfig::load(&data_dir)?;

    // Credential commands work without opening storage
    if let Some(Commands::Remote { action }) = &cli.command {
        return handle_remote(action, &data_dir, &config);
    }

    let clock = Rc::new(SystemClock);
    let service = PersistenceService::from_config(&config, &data_dir, clock.clone());
    let mut api = SiteApi::open(
        service,
        clock,
        config.storage.debounce(),
        config.storage.user_id.clone(),
    )?;

    let outcome = dispatch(&mut api, cli.command);
    let flushed = api.flush();
    let result = outcome?;
    flushed?;

    print_result(&result);
    if result.has_errors() {
        return Err(SiteError::Api("command finished with errors".to_string()));
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from("finance", "xandeum", "xfsite")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| SiteError::Config("could not determine a data directory".to_string()))
}

fn require_yes(yes: bool, what: &str) -> Result<()> {
    if yes {
        Ok(())
    } else {
        Err(SiteError::Api(format!(
            "{} cannot be undone; pass --yes to confirm",
            what
        )))
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(SiteError::Io)
}

fn body(content: Option<String>, content_file: Option<PathBuf>) -> Result<Option<String>> {
    match content_file {
        Some(path) => read_text(&path).map(Some),
        None => Ok(content),
    }
}

/// A `data:` URL, or a path to an image file.
fn load_image(source: &str) -> Result<(BlobPayload, String)> {
    if source.starts_with("data:") {
        return Ok((parse_data_url(source)?, "image".to_string()));
    }
    let path = Path::new(source);
    let media_type = media_type_for_path(path).ok_or_else(|| {
        SiteError::Validation(format!("{} is not a recognised image file", source))
    })?;
    let bytes = fs::read(path).map_err(SiteError::Io)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string());
    Ok((image_payload(media_type, bytes)?, name))
}

fn write_output(path: &Path, contents: &str) -> Result<CmdResult> {
    fs::write(path, contents).map_err(SiteError::Io)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Wrote {}", path.display())));
    Ok(result)
}

fn dispatch(api: &mut SiteApi, command: Option<Commands>) -> Result<CmdResult> {
    let Some(command) = command else {
        return Ok(api.show_content(None));
    };

    match command {
        Commands::Show { doc } => Ok(api.show_content(doc)),
        Commands::Meta {
            doc,
            title,
            subtitle,
        } => api.update_document_meta(doc, title, subtitle),
        Commands::Section { action } => handle_section(api, action),
        Commands::Image { action } => handle_image(api, action),
        Commands::Roadmap { action } => match action {
            None | Some(RoadmapCommands::Show) => Ok(api.show_roadmap()),
        },
        Commands::Task { action } => handle_task(api, action),
        Commands::Quarter { action } => handle_quarter(api, action),
        Commands::Export { roadmap, output } => {
            let exported = if roadmap {
                api.export_roadmap()?
            } else {
                api.export_content()?
            };
            let mut result = CmdResult::default();
            result.messages = exported.messages;
            if let Some(file) = exported.export {
                let path = output.unwrap_or_else(|| PathBuf::from(&file.file_name));
                result
                    .messages
                    .extend(write_output(&path, &file.contents)?.messages);
            }
            Ok(result)
        }
        Commands::Import { path, roadmap } => {
            let raw = read_text(&path)?;
            if roadmap {
                api.import_roadmap(&raw)
            } else {
                api.import_content(&raw)
            }
        }
        Commands::Reset { doc, roadmap, yes } => {
            let target = match (roadmap, doc) {
                (true, _) => "Resetting the roadmap".to_string(),
                (false, Some(doc)) => format!("Resetting {}", doc),
                (false, None) => "Resetting all content".to_string(),
            };
            require_yes(yes, &target)?;
            if roadmap {
                api.reset_roadmap()
            } else {
                api.reset_content(doc)
            }
        }
        Commands::Backup { output } => {
            let mut result = api.backup()?;
            if let Some(backup) = result.backup.take() {
                let path = output.unwrap_or_else(|| {
                    PathBuf::from(format!(
                        "xandeum-backup-{}.json",
                        backup.timestamp.format("%Y-%m-%d")
                    ))
                });
                let json = serde_json::to_string_pretty(&backup)?;
                let written = write_output(&path, &json)?;
                result.messages.extend(written.messages);
            }
            Ok(result)
        }
        Commands::Restore { path } => {
            let backup = parse_backup(&read_text(&path)?)?;
            api.restore(&backup)
        }
        Commands::Migrate => api.migrate(),
        Commands::Health => Ok(api.health()),
        Commands::Remote { .. } => Err(SiteError::Api(
            "remote commands are handled before storage opens".to_string(),
        )),
    }
}

fn handle_section(api: &mut SiteApi, action: SectionCommands) -> Result<CmdResult> {
    match action {
        SectionCommands::Add {
            doc,
            title,
            content,
            content_file,
            id,
        } => {
            let content = body(Some(content), content_file)?.unwrap_or_default();
            api.add_section(doc, NewSection { id, title, content })
        }
        SectionCommands::Edit {
            doc,
            section,
            title,
            content,
            content_file,
        } => {
            let content = body(content, content_file)?;
            let patch = SectionPatch {
                title,
                content,
                images: None,
            };
            if patch.is_empty() {
                return Err(SiteError::Api(
                    "nothing to change; pass --title, --content or --content-file".to_string(),
                ));
            }
            api.start_edit(doc, &section)?;
            if let Some(title) = patch.title {
                api.edit_title(title)?;
            }
            if let Some(content) = patch.content {
                api.edit_content(content)?;
            }
            api.save_edit()
        }
        SectionCommands::Delete { doc, section, yes } => {
            require_yes(yes, &format!("Deleting section {}", section))?;
            api.delete_section(doc, &section)
        }
        SectionCommands::Images { doc, section } => api.section_images(doc, &section),
    }
}

fn handle_image(api: &mut SiteApi, action: ImageCommands) -> Result<CmdResult> {
    match action {
        ImageCommands::Attach {
            doc,
            section,
            source,
            name,
        } => {
            let (payload, default_name) = load_image(&source)?;
            api.start_edit(doc, &section)?;
            let image = match api.attach_image(&payload, name.as_deref().unwrap_or(&default_name)) {
                Ok(image) => image,
                Err(e) => {
                    api.cancel_edit()?;
                    return Err(e);
                }
            };
            let mut result = api.save_edit()?;
            result.add_message(CmdMessage::info(format!(
                "Attached {} as image {}",
                image.name, image.id
            )));
            Ok(result)
        }
        ImageCommands::Remove {
            doc,
            section,
            image_id,
        } => {
            api.start_edit(doc, &section)?;
            let image = match api.remove_image(image_id) {
                Ok(image) => image,
                Err(e) => {
                    api.cancel_edit()?;
                    return Err(e);
                }
            };
            let mut result = api.save_edit()?;
            result.add_message(CmdMessage::info(format!("Removed image {}", image.name)));
            Ok(result)
        }
    }
}

fn handle_task(api: &mut SiteApi, action: TaskCommands) -> Result<CmdResult> {
    match action {
        TaskCommands::Add {
            quarter,
            title,
            description,
            category,
            progress,
        } => api.add_task(
            &quarter,
            NewTask {
                title,
                description,
                category,
                progress,
            },
        ),
        TaskCommands::Update {
            task,
            fields,
            quarter,
        } => api.update_task(
            &task,
            TaskPatch {
                title: fields.title,
                description: fields.description,
                category: fields.category,
                progress: fields.progress,
                quarter,
            },
        ),
        TaskCommands::Delete { task } => api.delete_task(&task),
    }
}

fn handle_quarter(api: &mut SiteApi, action: QuarterCommands) -> Result<CmdResult> {
    match action {
        QuarterCommands::Add { id, name } => api.add_quarter(NewQuarter { id, name }),
        QuarterCommands::Update { quarter, name, id } => {
            api.update_quarter(&quarter, QuarterPatch { id, name })
        }
        QuarterCommands::Delete { quarter, yes } => {
            require_yes(yes, &format!("Deleting quarter {} and its tasks", quarter))?;
            api.delete_quarter(&quarter)
        }
    }
}

fn handle_remote(action: &RemoteCommands, data_dir: &Path, config: &SiteConfig) -> Result<()> {
    let mut result = CmdResult::default();
    match action {
        RemoteCommands::Set { url, key } => {
            RemoteOverride {
                url: url.clone(),
                api_key: key.clone(),
            }
            .save(data_dir)?;
            result.add_message(CmdMessage::success(format!(
                "Cached remote credentials for {}",
                url
            )));
            if config.storage.mode != StorageMode::Remote {
                result.add_message(CmdMessage::info(
                    "Storage mode is local; set storage.mode = \"remote\" to use them",
                ));
            }
        }
        RemoteCommands::Clear => {
            let message = if RemoteOverride::clear(data_dir)? {
                CmdMessage::success("Cleared cached remote credentials")
            } else {
                CmdMessage::info("No cached remote credentials")
            };
            result.add_message(message);
        }
        RemoteCommands::Show => {
            result.add_message(CmdMessage::info(format!(
                "Data directory: {}",
                data_dir.display()
            )));
            result.add_message(CmdMessage::info(format!(
                "Storage mode: {}",
                config.storage.mode
            )));
            result.add_message(CmdMessage::info(format!(
                "Remote URL: {}",
                config.remote.url.as_deref().unwrap_or("(none)")
            )));
            result.add_message(CmdMessage::info(format!(
                "Remote key: {}",
                if config.remote.api_key.is_some() {
                    "(set)"
                } else {
                    "(none)"
                }
            )));
        }
    }
    print_messages(&result.messages);
    Ok(())
}
