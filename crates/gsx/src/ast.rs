// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree (AST) types for GSX templates.
//!
//! This module defines the data structures that represent a parsed `.gsx`
//! file. The AST is produced by the parser, annotated in place by the
//! analyzer, and consumed by the code generator.
//!
//! # Structure
//!
//! A file is represented as a [`File`] containing:
//! - The package name
//! - Imports
//! - Host-language declarations and functions, captured verbatim
//! - [`Template`]s, whose bodies are trees of [`Node`]s
//!
//! # Node Types
//!
//! The [`Node`] enum is a closed set: adding a variant forces updates to
//! every pass. The only cross-variant operations are [`Node::position`] and
//! the comment-attachment helpers.
//!
//! # Raw code
//!
//! Wherever host-language code appears (interpolations, conditions,
//! iterables, parameter types, decl bodies) it is stored as the verbatim
//! byte range of the input. The compiler never tokenizes host expressions
//! beyond counting matched delimiters.

use crate::token::{Comment, CommentGroup, Position};
use serde::{Deserialize, Serialize};

/// Comments attached to a node.
///
/// A comment is attached to at most one node; comments that attach to no
/// node become orphans of the enclosing body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeComments {
    /// Comment groups immediately before the node.
    pub leading: Vec<CommentGroup>,
    /// A comment on the same line as the node's terminator.
    pub trailing: Option<Comment>,
}

impl NodeComments {
    /// True when no comments are attached.
    pub fn is_empty(&self) -> bool {
        self.leading.is_empty() && self.trailing.is_none()
    }
}

/// A complete parsed `.gsx` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    /// The file path positions report against.
    pub path: String,
    /// Package name from the `package` header.
    pub package_name: String,
    /// Imports, in source order.
    pub imports: Vec<Import>,
    /// `type` / `const` / `var` declarations, captured verbatim.
    pub host_decls: Vec<HostDecl>,
    /// Plain host functions and methods, captured verbatim.
    pub host_funcs: Vec<HostFunc>,
    /// Templates, in source order.
    pub templates: Vec<Template>,
    /// Comment groups before the package header.
    pub leading_comments: Vec<CommentGroup>,
    /// Comments that attached to no declaration.
    pub orphan_comments: Vec<CommentGroup>,
}

impl File {
    /// Creates an empty file for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            package_name: String::new(),
            imports: Vec::new(),
            host_decls: Vec::new(),
            host_funcs: Vec::new(),
            templates: Vec::new(),
            leading_comments: Vec::new(),
            orphan_comments: Vec::new(),
        }
    }
}

/// One import. `alias` is empty when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    /// Optional import alias.
    pub alias: String,
    /// The quoted import path, without quotes.
    pub path: String,
    /// Where the import appears.
    pub position: Position,
}

/// Kind of a verbatim host declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostDeclKind {
    /// `type ...`
    Type,
    /// `const ...`
    Const,
    /// `var ...`
    Var,
}

/// A `type` / `const` / `var` declaration captured verbatim, including any
/// body braces or parens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostDecl {
    /// Which keyword introduced the declaration.
    pub kind: HostDeclKind,
    /// The verbatim source text.
    pub code: String,
    /// Where the declaration starts.
    pub position: Position,
}

/// A host function or method captured verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostFunc {
    /// The verbatim source text, from `func` through the closing brace.
    pub code: String,
    /// Where the function starts.
    pub position: Position,
}

/// A method receiver on a template (`templ (c *Counter) Render() {...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    /// The receiver variable name.
    pub name: String,
    /// The receiver type, verbatim (e.g. `*Counter`).
    pub type_source: String,
}

/// A template parameter. The type is raw host source so generics and
/// complex types pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Verbatim type source.
    pub type_source: String,
}

/// A template declaration.
///
/// A template with a receiver is a *method template* and compiles to a
/// `Render(app)` method; one without compiles to a factory function
/// returning a view struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Template name.
    pub name: String,
    /// Parameters, in order.
    pub params: Vec<Param>,
    /// Present for method templates.
    pub receiver: Option<Receiver>,
    /// True when the body contains a `{children...}` slot.
    pub accepts_children: bool,
    /// The DSL body.
    pub body: Vec<Node>,
    /// Where the template starts.
    pub position: Position,
    /// Attached comments.
    pub comments: NodeComments,
    /// Reactive state cells found by the analyzer.
    pub state_vars: Vec<StateVar>,
    /// Reactive bindings found by the analyzer.
    pub bindings: Vec<StateBinding>,
    /// Element refs found by the analyzer.
    pub refs: Vec<RefInfo>,
}

impl Template {
    /// True when this template compiles to a `Render` method.
    pub fn is_method(&self) -> bool {
        self.receiver.is_some()
    }

    /// Looks up a state variable by name.
    pub fn state_var(&self, name: &str) -> Option<&StateVar> {
        self.state_vars.iter().find(|s| s.name == name)
    }
}

/// Host-language code captured verbatim, with its source position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeExpr {
    /// The verbatim expression text.
    pub code: String,
    /// Where the expression starts.
    pub position: Position,
}

impl CodeExpr {
    /// Creates a code expression.
    pub fn new(code: impl Into<String>, position: Position) -> Self {
        Self {
            code: code.into(),
            position,
        }
    }
}

/// A node in a template body.
///
/// The variant set is closed; every pass matches exhaustively so a new
/// variant cannot be silently ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// A tag element like `<div>...</div>`.
    Element(Element),
    /// Coalesced literal text between DSL delimiters.
    Text(TextContent),
    /// A host expression inside `{...}`.
    Interpolation(Interpolation),
    /// `@let name = <element>`.
    Let(LetBinding),
    /// `@for ... := range ... { ... }`.
    For(ForLoop),
    /// `@if cond { ... } @else { ... }`.
    If(IfStmt),
    /// `@Name(args) { children }`.
    ComponentCall(ComponentCall),
    /// `@name` - splice a pre-built view's render.
    ComponentExpr(ComponentExpr),
    /// The `{children...}` placeholder.
    ChildrenSlot(ChildrenSlot),
    /// Post-analyzer form: a `@let`-bound variable reference spliced
    /// verbatim instead of being wrapped as an expression.
    RawExpr(RawHostExpr),
    /// A verbatim host statement inlined in the body.
    HostStmt(HostStmt),
}

impl Node {
    /// The node's start position.
    pub fn position(&self) -> &Position {
        match self {
            Node::Element(n) => &n.position,
            Node::Text(n) => &n.position,
            Node::Interpolation(n) => &n.expr.position,
            Node::Let(n) => &n.position,
            Node::For(n) => &n.position,
            Node::If(n) => &n.position,
            Node::ComponentCall(n) => &n.position,
            Node::ComponentExpr(n) => &n.expr.position,
            Node::ChildrenSlot(n) => &n.position,
            Node::RawExpr(n) => &n.expr.position,
            Node::HostStmt(n) => &n.code.position,
        }
    }

    /// The node's attached comments.
    pub fn comments_mut(&mut self) -> &mut NodeComments {
        match self {
            Node::Element(n) => &mut n.comments,
            Node::Text(n) => &mut n.comments,
            Node::Interpolation(n) => &mut n.comments,
            Node::Let(n) => &mut n.comments,
            Node::For(n) => &mut n.comments,
            Node::If(n) => &mut n.comments,
            Node::ComponentCall(n) => &mut n.comments,
            Node::ComponentExpr(n) => &mut n.comments,
            Node::ChildrenSlot(n) => &mut n.comments,
            Node::RawExpr(n) => &mut n.comments,
            Node::HostStmt(n) => &mut n.comments,
        }
    }
}

/// A tag element.
///
/// `ref` and `key` attributes are extracted during parsing: they never
/// appear in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// The tag name (`div`, `span`, ...).
    pub tag: String,
    /// Attributes, minus `ref` / `key`.
    pub attributes: Vec<Attribute>,
    /// Child nodes.
    pub children: Vec<Node>,
    /// True for `<tag/>`.
    pub self_close: bool,
    /// Extracted `ref={...}` expression.
    pub ref_expr: Option<CodeExpr>,
    /// Extracted `key={...}` expression.
    pub ref_key: Option<CodeExpr>,
    /// Where the element starts.
    pub position: Position,
    /// Attached comments.
    pub comments: NodeComments,
}

/// One element attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// The attribute name.
    pub name: String,
    /// The attribute value. A bare attribute with no `=` is `true`.
    pub value: AttributeValue,
    /// Where the attribute name starts.
    pub position: Position,
}

/// The value of an [`Attribute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// A quoted string literal (unescaped value).
    Str(String),
    /// An integer literal, kept as its raw spelling.
    Int(String),
    /// A float literal, kept as its raw spelling.
    Float(String),
    /// `true` / `false`, or a bare attribute (`true`).
    Bool(bool),
    /// A host expression in `{...}`.
    Expr(CodeExpr),
}

/// Coalesced text content between DSL delimiters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// The joined text.
    pub text: String,
    /// Where the run starts.
    pub position: Position,
    /// Attached comments.
    pub comments: NodeComments,
}

/// A host expression inside `{...}` in a DSL context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpolation {
    /// The enclosed code, every byte between the outer braces.
    pub expr: CodeExpr,
    /// Attached comments.
    pub comments: NodeComments,
}

/// `@let name = <element>` - names a sub-tree for later reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetBinding {
    /// The bound name.
    pub name: String,
    /// The bound element.
    pub element: Element,
    /// Where the binding starts.
    pub position: Position,
    /// Attached comments.
    pub comments: NodeComments,
}

/// `@for [idx,] value := range <iterable> { body }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForLoop {
    /// Optional index variable (None when `_` or absent).
    pub index_var: Option<String>,
    /// The value variable (may be `_`).
    pub value_var: String,
    /// The iterable, captured verbatim.
    pub iterable: CodeExpr,
    /// Loop body.
    pub body: Vec<Node>,
    /// Where the loop starts.
    pub position: Position,
    /// Attached comments.
    pub comments: NodeComments,
}

/// `@if cond { ... } @else { ... }` - else-if nests an `IfStmt` as the sole
/// node of `else_body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    /// The condition, captured verbatim.
    pub condition: CodeExpr,
    /// Nodes when the condition holds.
    pub then_body: Vec<Node>,
    /// Nodes otherwise; empty when no `@else`.
    pub else_body: Vec<Node>,
    /// Where the statement starts.
    pub position: Position,
    /// Attached comments.
    pub comments: NodeComments,
}

/// `@Name(args) { children }` - invoke another template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentCall {
    /// The component name.
    pub name: String,
    /// Arguments, captured verbatim (without the parens).
    pub args: String,
    /// Children passed to the component, if any.
    pub children: Vec<Node>,
    /// True when the call appears inside a method template and mounts a
    /// struct component through the runtime cache.
    pub is_struct_mount: bool,
    /// Where the call starts.
    pub position: Position,
    /// Attached comments.
    pub comments: NodeComments,
}

/// `@name` - an expression whose `.Render(app)` is spliced in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentExpr {
    /// The expression, captured verbatim.
    pub expr: CodeExpr,
    /// Attached comments.
    pub comments: NodeComments,
}

/// The `{children...}` placeholder inside a template body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildrenSlot {
    /// Where the slot appears.
    pub position: Position,
    /// Attached comments.
    pub comments: NodeComments,
}

/// Post-analyzer node: a reference to a `@let`-bound element variable that
/// must be spliced verbatim rather than evaluated as an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHostExpr {
    /// The variable reference.
    pub expr: CodeExpr,
    /// Attached comments.
    pub comments: NodeComments,
}

/// A verbatim host statement inlined in a template body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostStmt {
    /// The statement, captured verbatim.
    pub code: CodeExpr,
    /// Attached comments.
    pub comments: NodeComments,
}

/// A reactive state cell visible to a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVar {
    /// Variable name.
    pub name: String,
    /// The cell's value type `T` (from `*tui.State[T]` or inferred from the
    /// `tui.NewState(...)` initializer).
    pub type_source: String,
    /// Initializer expression for local declarations.
    pub init: Option<String>,
    /// True when the cell arrived as a template parameter.
    pub is_param: bool,
}

/// Which element attribute a reactive binding updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingAttr {
    /// The element's text content.
    Text,
    /// The element's class attribute (recorded but not re-emitted).
    Class,
}

/// A reactive binding: when any of `state_vars` changes, re-evaluate
/// `expression` against `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateBinding {
    /// The state variables the expression depends on.
    pub state_vars: Vec<String>,
    /// The generated variable name of the element being updated. Must equal
    /// the name the generator synthesizes under the shared counter rules.
    pub target: String,
    /// Which attribute is updated.
    pub attribute: BindingAttr,
    /// The expression to re-evaluate, verbatim.
    pub expression: String,
    /// True when dependencies came from an explicit `deps={[...]}` list.
    pub explicit: bool,
}

/// Kind of an element ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefKind {
    /// A single element handle.
    Single,
    /// One handle per loop iteration, in order.
    List,
    /// Keyed handles (`key={...}` inside a loop).
    Map,
}

/// An element reference declared via `ref={...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefInfo {
    /// The ref expression. A simple identifier for function templates; any
    /// host expression for method templates.
    pub name: String,
    /// `name` with its first letter upper-cased; the view-struct field.
    pub export_name: String,
    /// How the ref is stored.
    pub kind: RefKind,
    /// Key type for `Map` refs, from the documented heuristic.
    pub key_type: Option<String>,
    /// True when the ref sits inside a `@for`.
    pub in_loop: bool,
    /// True when the ref sits inside an `@if` branch.
    pub in_conditional: bool,
}

/// Upper-cases the first letter of a ref name to form its export name.
pub fn export_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
