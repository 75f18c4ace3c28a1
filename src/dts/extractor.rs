/*!
# Method Extractor

Walks the classes of client-library declaration files and produces one
[`MethodInfo`] per public method: comment, parameters with resolved types,
return type and return comment.
*/

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use super::ast::{ClassDecl, Member, Signature, SourceFile, TypeExpr, TypeKind};
use super::jsdoc::{parse_jsdoc, JsDoc};
use super::parser::parse_source;
use super::resolver::{TypeIndex, TypeResolver, DEFAULT_MAX_DEPTH};
use crate::core::{read_text_file, Result};
use crate::offline_data::{MethodInfo, ParamInfo, TypeShape};

/// How extracted methods are keyed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStyle {
    /// `getKline`
    #[default]
    Method,
    /// `usdm-client.getKline`
    FileStem,
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Only these classes; empty means all classes
    pub class_filter: Vec<String>,
    pub skip_underscore: bool,
    pub promise_only: bool,
    pub key_style: KeyStyle,
    pub max_depth: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            class_filter: Vec::new(),
            skip_underscore: true,
            promise_only: false,
            key_style: KeyStyle::Method,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A parsed declaration file and its stem (`rest-client` for `rest-client.d.ts`)
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub stem: String,
    pub source: SourceFile,
}

pub fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.strip_suffix(".d.ts")
        .or_else(|| name.strip_suffix(".ts"))
        .unwrap_or(&name)
        .to_string()
}

pub fn parse_declaration_file(path: &Path) -> Result<ParsedFile> {
    let content = read_text_file(path)?;
    let source = parse_source(&content)?;
    debug!(
        "Parsed {} declarations from {}",
        source.declarations.len(),
        path.display()
    );
    Ok(ParsedFile {
        path: path.to_path_buf(),
        stem: file_stem(path),
        source,
    })
}

/// Parses files in parallel; unreadable or unparsable files are logged and skipped.
pub fn parse_declaration_files(paths: &[PathBuf]) -> Vec<ParsedFile> {
    paths
        .par_iter()
        .filter_map(|path| match parse_declaration_file(path) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                error!("Failed to process declaration file {}: {}", path.display(), e);
                None
            }
        })
        .collect()
}

/// Expands type roots (files or directories) into `.d.ts` file paths, sorted.
pub fn collect_declaration_files(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in roots {
        if root.is_file() {
            files.push(root.clone());
            continue;
        }
        if !root.is_dir() {
            warn!("Type root not found: {}", root.display());
            continue;
        }
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if entry.file_type().is_file() && path.to_string_lossy().ends_with(".d.ts") {
                files.push(path.to_path_buf());
            }
        }
    }
    files
}

pub struct MethodExtractor<'a> {
    resolver: TypeResolver<'a>,
    options: &'a ExtractOptions,
}

impl<'a> MethodExtractor<'a> {
    pub fn new(index: &'a TypeIndex, options: &'a ExtractOptions) -> Self {
        Self {
            resolver: TypeResolver::new(index).with_max_depth(options.max_depth),
            options,
        }
    }

    /// Extracts methods from all files; a later overload of a key replaces the earlier one.
    pub fn extract(&self, files: &[ParsedFile]) -> BTreeMap<String, MethodInfo> {
        let mut methods = BTreeMap::new();
        for file in files {
            for class in file.source.classes() {
                if !self.class_selected(&class.name) {
                    continue;
                }
                let before = methods.len();
                self.extract_class(file, class, &mut methods);
                debug!(
                    "{}: {} methods from class {}",
                    file.stem,
                    methods.len() - before,
                    class.name
                );
            }
        }
        methods
    }

    fn class_selected(&self, name: &str) -> bool {
        self.options.class_filter.is_empty() || self.options.class_filter.iter().any(|c| c == name)
    }

    fn extract_class(
        &self,
        file: &ParsedFile,
        class: &ClassDecl,
        out: &mut BTreeMap<String, MethodInfo>,
    ) {
        for member in &class.members {
            let Member::Method {
                name,
                signature,
                doc,
                modifiers,
                ..
            } = member
            else {
                continue;
            };

            if modifiers.is_static || !self.method_selected(name, signature) {
                continue;
            }

            let info = self.method_info(&class.name, name, signature, doc.as_deref());
            let key = match self.options.key_style {
                KeyStyle::Method => name.clone(),
                KeyStyle::FileStem => format!("{}.{}", file.stem, name),
            };
            out.insert(key, info);
        }
    }

    fn method_selected(&self, name: &str, signature: &Signature) -> bool {
        if name == "constructor" {
            return false;
        }
        if self.options.skip_underscore && name.starts_with('_') {
            return false;
        }
        if self.options.promise_only {
            return signature
                .return_type
                .as_ref()
                .map_or(false, returns_promise);
        }
        true
    }

    pub fn method_info(
        &self,
        class_name: &str,
        method_name: &str,
        signature: &Signature,
        raw_doc: Option<&str>,
    ) -> MethodInfo {
        let jsdoc = raw_doc.map(parse_jsdoc).unwrap_or_else(JsDoc::default);

        let params = signature
            .params
            .iter()
            .filter(|p| !p.is_this())
            .map(|p| ParamInfo {
                name: p.name.clone(),
                type_shape: match &p.type_expr {
                    Some(ty) => self.resolver.resolve(ty),
                    None => TypeShape::Any,
                },
                comment: jsdoc.param(&p.name).unwrap_or_default().to_string(),
            })
            .collect();

        let return_type = match &signature.return_type {
            Some(ty) => self.resolver.resolve(ty),
            None => TypeShape::Any,
        };

        MethodInfo {
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
            method_comment: jsdoc.description.clone(),
            params,
            return_type,
            return_comment: jsdoc.returns().unwrap_or_default().to_string(),
        }
    }
}

/// Declared return type is `Promise<...>`
fn returns_promise(ty: &TypeExpr) -> bool {
    matches!(
        &ty.unparenthesized().kind,
        TypeKind::Reference { name, args } if name == "Promise" && !args.is_empty()
    )
}

/// Parses the declaration files plus type roots and extracts their methods.
///
/// Type roots only contribute to the type index; methods come from
/// `declaration_files` alone.
pub fn extract_methods(
    declaration_files: &[PathBuf],
    type_roots: &[PathBuf],
    options: &ExtractOptions,
) -> BTreeMap<String, MethodInfo> {
    let parsed = parse_declaration_files(declaration_files);

    let extra: Vec<PathBuf> = collect_declaration_files(type_roots)
        .into_iter()
        .filter(|p| !declaration_files.contains(p))
        .collect();
    let support = parse_declaration_files(&extra);

    let index = TypeIndex::from_files(
        parsed
            .iter()
            .chain(support.iter())
            .map(|f| &f.source),
    );
    debug!("Type index holds {} named types", index.len());

    let methods = MethodExtractor::new(&index, options).extract(&parsed);
    info!(
        "Extracted {} method definitions from {} declaration file(s)",
        methods.len(),
        parsed.len()
    );
    methods
}
