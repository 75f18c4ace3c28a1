/*!
# Declaration AST

Syntax tree for the declaration-file subset. It only models what
reflection needs: classes, interfaces, aliases, enums, functions and
variables, with signatures and type expressions. Bodies do not exist in
declaration files.
*/

use serde::Serialize;

use crate::core::Span;

/// One parsed declaration file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceFile {
    /// Flattened: namespace and `declare global` contents included
    pub declarations: Vec<Declaration>,
}

impl SourceFile {
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Class(class) => Some(class),
            _ => None,
        })
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceDecl> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Interface(iface) => Some(iface),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "declaration", rename_all = "camelCase")]
pub enum Declaration {
    Class(ClassDecl),
    Interface(InterfaceDecl),
    TypeAlias(TypeAliasDecl),
    Enum(EnumDecl),
    Function(FunctionDecl),
    Variable(VariableDecl),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Class(d) => &d.name,
            Declaration::Interface(d) => &d.name,
            Declaration::TypeAlias(d) => &d.name,
            Declaration::Enum(d) => &d.name,
            Declaration::Function(d) => &d.name,
            Declaration::Variable(d) => &d.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeParam {
    pub name: String,
    pub constraint: Option<TypeExpr>,
    pub default: Option<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub extends: Option<TypeExpr>,
    pub implements: Vec<TypeExpr>,
    pub members: Vec<Member>,
    pub is_abstract: bool,
    pub doc: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub extends: Vec<TypeExpr>,
    pub members: Vec<Member>,
    pub doc: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeAliasDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub target: TypeExpr,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDecl {
    pub name: String,
    pub is_const: bool,
    pub members: Vec<EnumMember>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMember {
    pub name: String,
    /// Initializer source text, e.g. `"spot"` or `1 << 2`
    pub initializer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    pub name: String,
    pub signature: Signature,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDecl {
    pub name: String,
    pub type_expr: Option<TypeExpr>,
    pub is_const: bool,
    pub doc: Option<String>,
}

/// Callable shape shared by methods, functions, call signatures and function types
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Signature {
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    /// Identifier, or the source text of a destructuring pattern
    pub name: String,
    pub type_expr: Option<TypeExpr>,
    pub optional: bool,
    pub rest: bool,
}

impl Param {
    /// `this: T` pseudo-parameter
    pub fn is_this(&self) -> bool {
        self.name == "this"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Modifiers {
    pub is_static: bool,
    pub is_readonly: bool,
    pub is_abstract: bool,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessorKind {
    Get,
    Set,
}

/// Member of a class body, an interface body or an object literal type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "member", rename_all = "camelCase")]
pub enum Member {
    Method {
        name: String,
        modifiers: Modifiers,
        optional: bool,
        signature: Signature,
        doc: Option<String>,
    },
    Property {
        name: String,
        modifiers: Modifiers,
        optional: bool,
        type_expr: Option<TypeExpr>,
        doc: Option<String>,
    },
    Constructor {
        params: Vec<Param>,
        doc: Option<String>,
    },
    Accessor {
        name: String,
        kind: AccessorKind,
        modifiers: Modifiers,
        type_expr: Option<TypeExpr>,
        doc: Option<String>,
    },
    Call {
        signature: Signature,
    },
    Construct {
        signature: Signature,
    },
    Index {
        key_name: String,
        key_type: TypeExpr,
        value_type: Option<TypeExpr>,
    },
}

impl Member {
    pub fn name(&self) -> Option<&str> {
        match self {
            Member::Method { name, .. }
            | Member::Property { name, .. }
            | Member::Accessor { name, .. } => Some(name),
            Member::Constructor { .. } => Some("constructor"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Keyword {
    String,
    Number,
    Boolean,
    Null,
    Undefined,
    Any,
    Unknown,
    Void,
    Never,
    Object,
    Symbol,
    Bigint,
    This,
}

impl Keyword {
    pub fn from_ident(ident: &str) -> Option<Self> {
        let keyword = match ident {
            "string" => Keyword::String,
            "number" => Keyword::Number,
            "boolean" => Keyword::Boolean,
            "null" => Keyword::Null,
            "undefined" => Keyword::Undefined,
            "any" => Keyword::Any,
            "unknown" => Keyword::Unknown,
            "void" => Keyword::Void,
            "never" => Keyword::Never,
            "object" => Keyword::Object,
            "symbol" => Keyword::Symbol,
            "bigint" => Keyword::Bigint,
            "this" => Keyword::This,
            _ => return None,
        };
        Some(keyword)
    }
}

/// Type expression together with its whitespace-normalized source text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeExpr {
    pub kind: TypeKind,
    pub text: String,
}

impl TypeExpr {
    pub fn new(kind: TypeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Strips any number of enclosing parentheses.
    pub fn unparenthesized(&self) -> &TypeExpr {
        let mut current = self;
        while let TypeKind::Parenthesized(inner) = &current.kind {
            current = inner;
        }
        current
    }

    /// Name of a reference type (`Promise` for `Promise<T>`).
    pub fn reference_name(&self) -> Option<&str> {
        match &self.unparenthesized().kind {
            TypeKind::Reference { name, .. } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum TypeKind {
    Keyword(Keyword),
    /// String, number, boolean or negative-number literal
    Literal,
    Reference {
        name: String,
        args: Vec<TypeExpr>,
    },
    Array(Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),
    Union(Vec<TypeExpr>),
    Intersection(Vec<TypeExpr>),
    Object(Vec<Member>),
    Function(Box<Signature>),
    Parenthesized(Box<TypeExpr>),
    /// `keyof T`, `readonly T[]`, `unique symbol`
    Operator {
        operator: String,
        target: Box<TypeExpr>,
    },
    /// `x is T`, `asserts x`, `asserts x is T`
    Predicate,
    /// typeof queries, indexed access, conditional, mapped, template literal,
    /// constructor types, `infer X`
    Opaque,
}
