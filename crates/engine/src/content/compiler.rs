use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::info;

use crate::AppPaths;

use super::database::{CharacterDef, CharacterDefId, DefDatabase, EventDef};
use super::discovery::discover_mod_sources;
use super::types::{ContentDiscoveryError, ContentRequest};

const DEFAULT_MOVE_SPEED: f32 = 1.0;
const DEFAULT_JUMP_TIME: f32 = 0.5;
const DEFAULT_JUMP_SPEED: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    Discovery,
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDefInMod,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub mod_id: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (mod={}, file={}, line={}, column={})",
                self.code,
                self.message,
                self.mod_id,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (mod={}, file={})",
                self.code,
                self.message,
                self.mod_id,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

/// Borrowed parse context so every error can point at mod, file and node.
struct ParseCtx<'a, 'input> {
    mod_id: &'a str,
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl ParseCtx<'_, '_> {
    fn error(&self, code: ContentErrorCode, message: String, node: Node<'_, '_>) -> ContentCompileError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentCompileError {
            code,
            message,
            mod_id: self.mod_id.to_string(),
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn required_text(&self, node: Node<'_, '_>, field_name: &str) -> Result<String, ContentCompileError> {
        let value = node.text().map(str::trim).unwrap_or_default().to_string();
        if value.is_empty() {
            return Err(self.error(
                ContentErrorCode::MissingField,
                format!("field <{}> must not be empty", field_name),
                node,
            ));
        }
        Ok(value)
    }

    fn non_negative_f32(&self, node: Node<'_, '_>, field_name: &str) -> Result<f32, ContentCompileError> {
        let value = self.required_text(node, field_name)?;
        let parsed = value.parse::<f32>().map_err(|_| {
            self.error(
                ContentErrorCode::InvalidValue,
                format!("{} '{}' is not a valid number", field_name, value),
                node,
            )
        })?;
        if !parsed.is_finite() || parsed < 0.0 {
            return Err(self.error(
                ContentErrorCode::InvalidValue,
                format!("{} must be finite and >= 0", field_name),
                node,
            ));
        }
        Ok(parsed)
    }

    fn flag(&self, node: Node<'_, '_>, field_name: &str) -> Result<bool, ContentCompileError> {
        let value = self.required_text(node, field_name)?;
        match value.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(self.error(
                ContentErrorCode::InvalidValue,
                format!("invalid {} '{}'; allowed values: true, false", field_name, value),
                node,
            )),
        }
    }

    fn check_unique(
        &self,
        seen: &mut HashSet<String>,
        field: Node<'_, '_>,
        parent: &str,
    ) -> Result<String, ContentCompileError> {
        let field_name = field.tag_name().name().to_string();
        if !seen.insert(field_name.clone()) {
            return Err(self.error(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{}> in <{}>", field_name, parent),
                field,
            ));
        }
        Ok(field_name)
    }

    fn unknown_field(&self, field: Node<'_, '_>, parent: &str) -> ContentCompileError {
        self.error(
            ContentErrorCode::UnknownField,
            format!("unknown field <{}> in <{}>", field.tag_name().name(), parent),
            field,
        )
    }

    fn missing_field(&self, node: Node<'_, '_>, field_name: &str, parent: &str) -> ContentCompileError {
        self.error(
            ContentErrorCode::MissingField,
            format!("missing required field <{}> in <{}>", field_name, parent),
            node,
        )
    }
}

/// Compiles `<CharacterDef>`s from base content and enabled mods. Within a
/// mod a `defName` may appear once; across mods the last one loaded wins.
pub fn compile_def_database(
    app_paths: &AppPaths,
    request: &ContentRequest,
) -> Result<DefDatabase, ContentCompileError> {
    let sources = discover_mod_sources(app_paths, request)
        .map_err(|error| map_discovery_error(error, &app_paths.root))?;

    let mut merged = BTreeMap::<String, CharacterDef>::new();

    for source in &sources {
        let xml_files = collect_xml_files_sorted(&source.source_dir)
            .map_err(|error| read_error(&source.mod_id, error.path, error.source))?;
        let mut seen_in_mod = HashSet::<String>::new();

        for xml_file in xml_files {
            let raw = fs::read_to_string(&xml_file)
                .map_err(|source_err| read_error(&source.mod_id, xml_file.clone(), source_err))?;
            let defs = parse_defs_document(&source.mod_id, &xml_file, &raw)?;
            for def in defs {
                if !seen_in_mod.insert(def.def_name.clone()) {
                    return Err(ContentCompileError {
                        code: ContentErrorCode::DuplicateDefInMod,
                        message: format!(
                            "duplicate CharacterDef '{}' in mod '{}'; each mod may define a defName only once",
                            def.def_name, source.mod_id
                        ),
                        mod_id: source.mod_id.clone(),
                        file_path: xml_file.clone(),
                        location: None,
                    });
                }
                merged.insert(def.def_name.clone(), def);
            }
        }
    }

    let database = DefDatabase::from_character_defs(merged.into_values().collect());
    info!(
        mod_count = sources.len(),
        character_def_count = database.character_defs().len(),
        "content_compiled"
    );
    Ok(database)
}

fn parse_defs_document(
    mod_id: &str,
    file_path: &Path,
    raw: &str,
) -> Result<Vec<CharacterDef>, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        mod_id: mod_id.to_string(),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let ctx = ParseCtx {
        mod_id,
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(ctx.error(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            root,
        ));
    }

    let mut defs = Vec::<CharacterDef>::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "CharacterDef" {
            return Err(ctx.error(
                ContentErrorCode::UnknownDefType,
                format!(
                    "unsupported def type <{}>; only <CharacterDef> is supported",
                    child.tag_name().name()
                ),
                child,
            ));
        }
        defs.push(parse_character_def(&ctx, child)?);
    }

    Ok(defs)
}

fn parse_character_def(
    ctx: &ParseCtx<'_, '_>,
    node: Node<'_, '_>,
) -> Result<CharacterDef, ContentCompileError> {
    const PARENT: &str = "CharacterDef";
    let mut seen_fields = HashSet::<String>::new();
    let mut def_name: Option<String> = None;
    let mut label: Option<String> = None;
    let mut move_speed: Option<f32> = None;
    let mut jump_time: Option<f32> = None;
    let mut jump_speed: Option<f32> = None;
    let mut idle_clip: Option<String> = None;
    let mut walking_clip: Option<String> = None;
    let mut jumping_clip: Option<String> = None;
    let mut dialogue_bark = false;
    let mut quest_bark = false;
    let mut events = Vec::<EventDef>::new();

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = ctx.check_unique(&mut seen_fields, field, PARENT)?;
        match field_name.as_str() {
            "defName" => def_name = Some(ctx.required_text(field, "defName")?),
            "label" => label = Some(ctx.required_text(field, "label")?),
            "moveSpeed" => move_speed = Some(ctx.non_negative_f32(field, "moveSpeed")?),
            "jumpTime" => {
                let value = ctx.non_negative_f32(field, "jumpTime")?;
                if value <= 0.0 {
                    return Err(ctx.error(
                        ContentErrorCode::InvalidValue,
                        "jumpTime must be > 0".to_string(),
                        field,
                    ));
                }
                jump_time = Some(value);
            }
            "jumpSpeed" => jump_speed = Some(ctx.non_negative_f32(field, "jumpSpeed")?),
            "idleClip" => idle_clip = Some(ctx.required_text(field, "idleClip")?),
            "walkingClip" => walking_clip = Some(ctx.required_text(field, "walkingClip")?),
            "jumpingClip" => jumping_clip = Some(ctx.required_text(field, "jumpingClip")?),
            "dialogueBark" => dialogue_bark = ctx.flag(field, "dialogueBark")?,
            "questBark" => quest_bark = ctx.flag(field, "questBark")?,
            "events" => events = parse_events(ctx, field)?,
            _ => return Err(ctx.unknown_field(field, PARENT)),
        }
    }

    let Some(def_name) = def_name else {
        return Err(ctx.missing_field(node, "defName", PARENT));
    };
    let Some(label) = label else {
        return Err(ctx.missing_field(node, "label", PARENT));
    };

    Ok(CharacterDef {
        id: CharacterDefId(0),
        def_name,
        label,
        move_speed: move_speed.unwrap_or(DEFAULT_MOVE_SPEED),
        jump_time: jump_time.unwrap_or(DEFAULT_JUMP_TIME),
        jump_speed: jump_speed.unwrap_or(DEFAULT_JUMP_SPEED),
        idle_clip,
        walking_clip,
        jumping_clip,
        dialogue_bark,
        quest_bark,
        events,
    })
}

fn parse_events(
    ctx: &ParseCtx<'_, '_>,
    node: Node<'_, '_>,
) -> Result<Vec<EventDef>, ContentCompileError> {
    let mut events = Vec::new();
    for child in node.children().filter(|child| child.is_element()) {
        match child.tag_name().name() {
            "Dialogue" => events.push(parse_dialogue(ctx, child)?),
            "Quest" => events.push(parse_quest(ctx, child)?),
            other => {
                return Err(ctx.error(
                    ContentErrorCode::UnknownDefType,
                    format!("unsupported event <{}>; allowed: <Dialogue>, <Quest>", other),
                    child,
                ))
            }
        }
    }
    Ok(events)
}

/// A dialogue may be authored without lines; firing it then fails at runtime.
fn parse_dialogue(
    ctx: &ParseCtx<'_, '_>,
    node: Node<'_, '_>,
) -> Result<EventDef, ContentCompileError> {
    let mut lines = Vec::new();
    for child in node.children().filter(|child| child.is_element()) {
        if child.tag_name().name() != "line" {
            return Err(ctx.unknown_field(child, "Dialogue"));
        }
        lines.push(ctx.required_text(child, "line")?);
    }
    Ok(EventDef::Dialogue { lines })
}

fn parse_quest(ctx: &ParseCtx<'_, '_>, node: Node<'_, '_>) -> Result<EventDef, ContentCompileError> {
    const PARENT: &str = "Quest";
    let mut seen_fields = HashSet::<String>::new();
    let mut title: Option<String> = None;
    let mut item_tag: Option<String> = None;
    let mut required: Option<u32> = None;

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = ctx.check_unique(&mut seen_fields, field, PARENT)?;
        match field_name.as_str() {
            "title" => title = Some(ctx.required_text(field, "title")?),
            "itemTag" => item_tag = Some(ctx.required_text(field, "itemTag")?),
            "required" => {
                let value = ctx.required_text(field, "required")?;
                let parsed = value
                    .parse::<u32>()
                    .ok()
                    .filter(|count| *count > 0)
                    .ok_or_else(|| {
                        ctx.error(
                            ContentErrorCode::InvalidValue,
                            format!("required '{}' must be a positive integer", value),
                            field,
                        )
                    })?;
                required = Some(parsed);
            }
            _ => return Err(ctx.unknown_field(field, PARENT)),
        }
    }

    let Some(title) = title else {
        return Err(ctx.missing_field(node, "title", PARENT));
    };
    let Some(item_tag) = item_tag else {
        return Err(ctx.missing_field(node, "itemTag", PARENT));
    };

    Ok(EventDef::Quest {
        title,
        item_tag,
        required: required.unwrap_or(1),
    })
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let mut files = Vec::<PathBuf>::new();
    collect_recursive(root, &mut files)?;
    files.sort_by_cached_key(|path| normalize_rel_path(path.strip_prefix(root).unwrap_or(path)));
    Ok(files)
}

fn collect_recursive(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), ReadError> {
    let entries = fs::read_dir(current).map_err(|source| ReadError {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReadError {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(&path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            files.push(path);
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_error(mod_id: &str, path: PathBuf, source: std::io::Error) -> ContentCompileError {
    ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read content: {source}"),
        mod_id: mod_id.to_string(),
        file_path: path,
        location: None,
    }
}

fn map_discovery_error(error: ContentDiscoveryError, root: &Path) -> ContentCompileError {
    match error {
        ContentDiscoveryError::EnabledModMissing {
            mod_id,
            expected_dir,
        } => ContentCompileError {
            code: ContentErrorCode::Discovery,
            message: format!(
                "enabled mod '{}' not found at {}; check QUESTBOUND_ENABLED_MODS",
                mod_id,
                expected_dir.display()
            ),
            mod_id,
            file_path: expected_dir,
            location: None,
        },
        other => ContentCompileError {
            code: ContentErrorCode::Discovery,
            message: other.to_string(),
            mod_id: "<discovery>".to_string(),
            file_path: root.to_path_buf(),
            location: None,
        },
    }
}
