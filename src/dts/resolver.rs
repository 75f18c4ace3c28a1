/*!
# Type Resolver

Turns syntactic [`TypeExpr`]s into [`TypeShape`] trees. Named types are
looked up in a [`TypeIndex`] built from every parsed declaration file of an
exchange, so a parameter typed `GetKlineParamsV5` expands into the object
with its (inherited) properties.

Expansion stops at a name already on the current resolution path and at
the configured depth; both yield a `reference`.
*/

use std::collections::{HashMap, HashSet};

use super::ast::{Declaration, Keyword, Member, SourceFile, TypeExpr, TypeKind};
use crate::offline_data::{PropertyShape, TypeShape};

pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Declaration a type name points to
#[derive(Debug, Clone)]
pub enum IndexedType {
    /// Interface or class; merged when declared more than once
    Object {
        members: Vec<Member>,
        extends: Vec<TypeExpr>,
    },
    Alias(TypeExpr),
    Enum {
        name: String,
        members: Vec<String>,
    },
}

/// Name → declaration table
#[derive(Debug, Clone, Default)]
pub struct TypeIndex {
    entries: HashMap<String, IndexedType>,
}

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_files<'a>(files: impl IntoIterator<Item = &'a SourceFile>) -> Self {
        let mut index = Self::new();
        for file in files {
            index.add_file(file);
        }
        index
    }

    pub fn add_file(&mut self, file: &SourceFile) {
        for decl in &file.declarations {
            match decl {
                Declaration::Interface(iface) => {
                    self.add_object(&iface.name, &iface.members, iface.extends.iter().cloned())
                }
                Declaration::Class(class) => {
                    self.add_object(&class.name, &class.members, class.extends.iter().cloned())
                }
                Declaration::TypeAlias(alias) => {
                    self.entries
                        .entry(alias.name.clone())
                        .or_insert_with(|| IndexedType::Alias(alias.target.clone()));
                }
                Declaration::Enum(e) => {
                    self.entries
                        .entry(e.name.clone())
                        .or_insert_with(|| IndexedType::Enum {
                            name: e.name.clone(),
                            members: e.members.iter().map(|m| m.name.clone()).collect(),
                        });
                }
                Declaration::Function(_) | Declaration::Variable(_) => {}
            }
        }
    }

    fn add_object(
        &mut self,
        name: &str,
        members: &[Member],
        extends: impl Iterator<Item = TypeExpr>,
    ) {
        let entry = self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| IndexedType::Object {
                members: Vec::new(),
                extends: Vec::new(),
            });
        if let IndexedType::Object {
            members: existing,
            extends: bases,
        } = entry
        {
            existing.extend(members.iter().cloned());
            bases.extend(extends);
        }
    }

    /// Looks up `A.B.C` by its full name, then by its last segment.
    pub fn get(&self, name: &str) -> Option<&IndexedType> {
        self.entries
            .get(name)
            .or_else(|| self.entries.get(simple_name(name)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

pub struct TypeResolver<'a> {
    index: &'a TypeIndex,
    max_depth: usize,
}

impl<'a> TypeResolver<'a> {
    pub fn new(index: &'a TypeIndex) -> Self {
        Self {
            index,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn resolve(&self, ty: &TypeExpr) -> TypeShape {
        let mut path = Vec::new();
        self.resolve_in(ty, &mut path)
    }

    fn resolve_in(&self, ty: &TypeExpr, path: &mut Vec<String>) -> TypeShape {
        match &ty.kind {
            TypeKind::Keyword(keyword) => match keyword {
                Keyword::String => TypeShape::String,
                Keyword::Number => TypeShape::Number,
                Keyword::Boolean => TypeShape::Boolean,
                Keyword::Null => TypeShape::Null,
                Keyword::Undefined => TypeShape::Undefined,
                Keyword::Any => TypeShape::Any,
                Keyword::Unknown => TypeShape::Unknown,
                _ => TypeShape::other(&ty.text),
            },
            TypeKind::Parenthesized(inner) => self.resolve_in(inner, path),
            TypeKind::Array(element) => TypeShape::Array {
                element_type: Box::new(self.resolve_in(element, path)),
            },
            TypeKind::Operator { operator, target } if operator == "readonly" => {
                self.resolve_in(target, path)
            }
            TypeKind::Union(types) => TypeShape::Union {
                types: self.flatten(types, path, |shape| match shape {
                    TypeShape::Union { types } => Ok(types),
                    other => Err(other),
                }),
            },
            TypeKind::Intersection(types) => TypeShape::Intersection {
                types: self.flatten(types, path, |shape| match shape {
                    TypeShape::Intersection { types } => Ok(types),
                    other => Err(other),
                }),
            },
            TypeKind::Reference { name, args } if !args.is_empty() => {
                let simple = simple_name(name);
                if (simple == "Array" || simple == "ReadonlyArray") && args.len() == 1 {
                    TypeShape::Array {
                        element_type: Box::new(self.resolve_in(&args[0], path)),
                    }
                } else {
                    TypeShape::Generic {
                        name: simple.to_string(),
                        type_arguments: args.iter().map(|a| self.resolve_in(a, path)).collect(),
                    }
                }
            }
            TypeKind::Reference { name, .. } => self.resolve_named(name, &ty.text, path),
            TypeKind::Object(members) => TypeShape::Object {
                name: ty.text.clone(),
                properties: self.own_properties(members, path),
            },
            TypeKind::Predicate => TypeShape::Boolean,
            _ => TypeShape::other(&ty.text),
        }
    }

    /// Resolves each part and splices nested shapes of the same kind.
    fn flatten(
        &self,
        types: &[TypeExpr],
        path: &mut Vec<String>,
        split: impl Fn(TypeShape) -> Result<Vec<TypeShape>, TypeShape>,
    ) -> Vec<TypeShape> {
        let mut out = Vec::with_capacity(types.len());
        for ty in types {
            match split(self.resolve_in(ty, path)) {
                Ok(nested) => out.extend(nested),
                Err(single) => out.push(single),
            }
        }
        out
    }

    fn resolve_named(&self, name: &str, text: &str, path: &mut Vec<String>) -> TypeShape {
        let Some(indexed) = self.index.get(name) else {
            return TypeShape::other(text);
        };
        let simple = simple_name(name).to_string();

        if path.contains(&simple) || path.len() >= self.max_depth {
            return TypeShape::reference(simple);
        }

        path.push(simple.clone());
        let shape = match indexed {
            IndexedType::Object { .. } => {
                let mut properties = Vec::new();
                let mut visited = HashSet::new();
                self.collect_properties(&simple, path, &mut visited, &mut properties);
                TypeShape::Object {
                    name: simple.clone(),
                    properties,
                }
            }
            IndexedType::Alias(target) => {
                let target_is_literal =
                    matches!(target.unparenthesized().kind, TypeKind::Object(_));
                match self.resolve_in(target, path) {
                    TypeShape::Object { properties, .. } if target_is_literal => TypeShape::Object {
                        name: simple.clone(),
                        properties,
                    },
                    resolved => resolved,
                }
            }
            IndexedType::Enum { name, members } => {
                let mut shapes: Vec<TypeShape> = members
                    .iter()
                    .map(|m| TypeShape::other(format!("{}.{}", name, m)))
                    .collect();
                if shapes.len() == 1 {
                    shapes.remove(0)
                } else {
                    TypeShape::Union { types: shapes }
                }
            }
        };
        path.pop();
        shape
    }

    /// Own properties first, then inherited ones not shadowed by the child
    fn collect_properties(
        &self,
        name: &str,
        path: &mut Vec<String>,
        visited: &mut HashSet<String>,
        out: &mut Vec<PropertyShape>,
    ) {
        if !visited.insert(name.to_string()) {
            return;
        }
        let Some(IndexedType::Object { members, extends }) = self.index.get(name) else {
            return;
        };

        for property in self.own_properties(members, path) {
            if !out.iter().any(|p| p.name == property.name) {
                out.push(property);
            }
        }

        for base in extends {
            if let Some(base_name) = base.reference_name() {
                self.collect_properties(simple_name(base_name), path, visited, out);
            }
        }
    }

    fn own_properties(&self, members: &[Member], path: &mut Vec<String>) -> Vec<PropertyShape> {
        let mut properties: Vec<PropertyShape> = Vec::new();
        for member in members {
            let (name, type_expr, optional) = match member {
                Member::Property {
                    name,
                    type_expr,
                    optional,
                    modifiers,
                    ..
                } if !modifiers.is_static => (name, type_expr, *optional),
                Member::Accessor {
                    name,
                    type_expr,
                    kind: super::ast::AccessorKind::Get,
                    ..
                } => (name, type_expr, false),
                _ => continue,
            };
            if properties.iter().any(|p| &p.name == name) {
                continue;
            }
            let type_shape = match type_expr {
                Some(ty) => self.resolve_in(ty, path),
                None => TypeShape::Any,
            };
            properties.push(PropertyShape {
                name: name.clone(),
                type_shape,
                optional,
            });
        }
        properties
    }
}
