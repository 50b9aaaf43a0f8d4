use std::io::Write;
use std::path::PathBuf;

use persistence::{
    FileReport, FileStatus, SaveConfig, SaveCoordinator, SlotId, DEFAULT_FILE_EXTENSION,
};

pub const SAVE_DIR_ENV_VAR: &str = "SAVE_DIR";
pub const DEFAULT_SAVE_DIR: &str = "saves";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonOptions {
    pub dir: PathBuf,
    pub config: Option<PathBuf>,
    pub max_slots: Option<u32>,
    pub key: Option<String>,
    pub extension: Option<String>,
}

impl Default for CommonOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_SAVE_DIR),
            config: None,
            max_slots: None,
            key: None,
            extension: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    List,
    Info { slot: SlotId },
    Verify { slot: SlotId },
    Restore { slot: SlotId },
    Delete { slot: SlotId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Help,
    Run {
        kind: CommandKind,
        options: CommonOptions,
    },
}

pub fn parse_args(args: &[String], defaults: CommonOptions) -> Result<Invocation, String> {
    if args.is_empty() {
        return Err(usage_text());
    }
    if args[0] == "-h" || args[0] == "--help" {
        return Ok(Invocation::Help);
    }

    let mut options = defaults;
    let mut index = 0usize;
    while index < args.len() {
        let flag = args[index].as_str();
        if !flag.starts_with("--") {
            break;
        }
        let value = args
            .get(index + 1)
            .ok_or_else(|| format!("missing value for {flag}"))?;
        match flag {
            "--dir" => options.dir = PathBuf::from(value),
            "--config" => options.config = Some(PathBuf::from(value)),
            "--slots" => {
                let slots = value
                    .parse::<u32>()
                    .map_err(|_| format!("invalid --slots value '{value}' (expected u32)"))?;
                options.max_slots = Some(slots);
            }
            "--key" => options.key = Some(value.clone()),
            "--ext" => options.extension = Some(value.clone()),
            other => return Err(format!("unknown option '{other}'")),
        }
        index += 2;
    }

    let command = args
        .get(index)
        .ok_or_else(|| "missing subcommand".to_string())?
        .as_str();
    let command_args = &args[(index + 1)..];

    let kind = match command {
        "list" => {
            if !command_args.is_empty() {
                return Err("list takes no arguments".to_string());
            }
            CommandKind::List
        }
        "info" => CommandKind::Info {
            slot: parse_slot_arg(command, command_args)?,
        },
        "verify" => CommandKind::Verify {
            slot: parse_slot_arg(command, command_args)?,
        },
        "restore" => CommandKind::Restore {
            slot: parse_slot_arg(command, command_args)?,
        },
        "delete" => CommandKind::Delete {
            slot: parse_slot_arg(command, command_args)?,
        },
        other => return Err(format!("unknown subcommand '{other}'")),
    };

    Ok(Invocation::Run { kind, options })
}

fn parse_slot_arg(command: &str, args: &[String]) -> Result<SlotId, String> {
    match args {
        [slot] => slot.parse::<SlotId>(),
        [] => Err(format!("{command} requires a slot (index or 'quick')")),
        _ => Err(format!("{command} takes exactly one slot argument")),
    }
}

pub fn run<W: Write>(kind: CommandKind, opts: CommonOptions, stdout: &mut W) -> Result<(), String> {
    if !opts.dir.is_dir() {
        return Err(format!(
            "save directory {} does not exist",
            opts.dir.display()
        ));
    }
    let mut coordinator =
        SaveCoordinator::new(build_config(&opts)?).map_err(|error| error.to_string())?;

    match kind {
        CommandKind::List => {
            for summary in coordinator.list_slots() {
                write_line(stdout, &format_file(&summary.slot.to_string(), &summary.file))?;
            }
            Ok(())
        }
        CommandKind::Info { slot } => {
            let inspection = coordinator
                .inspect_slot(slot)
                .map_err(|error| error.to_string())?;
            match &inspection.primary {
                Some(primary) => write_line(stdout, &format_file(&slot.to_string(), primary))?,
                None => write_line(stdout, &format!("slot={slot} status=empty"))?,
            }
            for (index, backup) in &inspection.backups {
                write_line(stdout, &format_file(&format!("{slot} backup={index}"), backup))?;
            }
            Ok(())
        }
        CommandKind::Verify { slot } => {
            let inspection = coordinator
                .inspect_slot(slot)
                .map_err(|error| error.to_string())?;
            let primary = inspection
                .primary
                .ok_or_else(|| format!("slot {slot} has no save file"))?;
            match &primary.status {
                FileStatus::Valid { .. } => {
                    write_line(stdout, &format!("slot={slot} status=valid"))
                }
                FileStatus::Corrupted { reason } | FileStatus::Unreadable { reason } => {
                    Err(format!("slot {slot} failed verification: {reason}"))
                }
            }
        }
        CommandKind::Restore { slot } => {
            let index = coordinator
                .restore_from_backup(slot)
                .map_err(|error| error.to_string())?;
            write_line(stdout, &format!("slot={slot} restored_from_backup={index}"))
        }
        CommandKind::Delete { slot } => {
            let removed = coordinator
                .delete_save(slot)
                .map_err(|error| error.to_string())?;
            write_line(stdout, &format!("slot={slot} removed={removed}"))
        }
    }
}

fn build_config(opts: &CommonOptions) -> Result<SaveConfig, String> {
    let mut config = match &opts.config {
        Some(path) => SaveConfig::from_json_file(path).map_err(|error| error.to_string())?,
        None => SaveConfig::default(),
    };
    config.save_dir = opts.dir.clone();
    if let Some(max_slots) = opts.max_slots {
        config.max_save_slots = max_slots;
    }
    if let Some(extension) = &opts.extension {
        config.file_extension = extension.clone();
    }
    if opts.key.is_some() {
        config.encryption_key = opts.key.clone();
    }
    // Nothing here encodes a document, so encryption is only needed to read.
    if config.encryption_key.is_none() {
        config.enable_encryption = false;
    }
    if config.file_extension.is_empty() {
        config.file_extension = DEFAULT_FILE_EXTENSION.to_string();
    }
    Ok(config)
}

fn format_file(label: &str, report: &FileReport) -> String {
    match &report.status {
        FileStatus::Valid {
            schema_version,
            metadata,
        } => format!(
            "slot={label} status=valid schema={schema_version} name={:?} modified_unix={} playtime_s={:.0} location={:?} completion={:.1} deaths={}",
            metadata.display_name,
            metadata.modified_at.unix_timestamp(),
            metadata.playtime_seconds,
            metadata.location,
            metadata.completion_percent,
            metadata.death_count,
        ),
        FileStatus::Corrupted { reason } => {
            format!("slot={label} status=corrupted reason={reason:?}")
        }
        FileStatus::Unreadable { reason } => {
            format!("slot={label} status=unreadable reason={reason:?}")
        }
    }
}

fn write_line<W: Write>(stdout: &mut W, line: &str) -> Result<(), String> {
    writeln!(stdout, "{line}").map_err(|error| format!("failed to write output: {error}"))
}

pub fn usage_text() -> String {
    [
        "save_cli - inspect and repair a save directory",
        "",
        "Usage:",
        "  save_cli [options] list",
        "  save_cli [options] info <slot>",
        "  save_cli [options] verify <slot>",
        "  save_cli [options] restore <slot>",
        "  save_cli [options] delete <slot>",
        "",
        "Options:",
        "  --dir <path>      save directory (default: $SAVE_DIR or ./saves)",
        "  --config <file>   JSON save config",
        "  --slots <u32>     number of numbered slots",
        "  --key <key>       key for encrypted saves",
        "  --ext <ext>       save file extension",
        "",
        "<slot> is a slot index or 'quick'.",
    ]
    .join("\n")
}
