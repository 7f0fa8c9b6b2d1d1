// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Semantic analysis of parsed GSX files.
//!
//! Multi-pass over the AST; accumulates diagnostics and mutates the AST in
//! place for some transformations:
//!
//! 1. Component inventory: mark templates whose body has a children slot.
//! 2. `@let` collection.
//! 3. `@let`-reference rewrite: interpolations that name a bound element
//!    become [`Node::RawExpr`] so the generator splices instead of wrapping.
//! 4. Ref validation and [`RefInfo`] computation.
//! 5. Element validation: tags, attributes, utility classes.
//! 6. State inventory: `*tui.State[T]` parameters and `tui.NewState(...)`
//!    locals.
//! 7. State-binding discovery, advancing an element counter that mirrors the
//!    generator's variable numbering exactly (see [`folds_text_child`]).
//! 8. Import injection for the runtime library.
//!
//! All diagnostics accumulate; analysis never stops at the first problem.

use crate::ast::*;
use crate::classes;
use crate::error::{Diagnostic, Diagnostics};
use crate::token::Position;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Canonical import path of the runtime library.
pub const TUI_IMPORT_PATH: &str = "github.com/gsx-dev/tui";
/// Canonical alias of the runtime library.
pub const TUI_ALIAS: &str = "tui";

/// Tags an element may use.
const KNOWN_TAGS: &[&str] = &[
    "div", "span", "p", "ul", "li", "button", "input", "table", "progress", "hr", "br",
];

/// Tags that must not have children.
const VOID_TAGS: &[&str] = &["hr", "br", "input"];

/// Attributes an element may carry.
const KNOWN_ATTRIBUTES: &[&str] = &[
    "width", "height", "min_width", "max_width", "min_height", "max_height",
    "direction", "justify", "align", "gap", "flex_grow", "flex_shrink", "align_self",
    "padding", "margin",
    "border", "border_style", "background",
    "text", "text_style", "text_align",
    "focusable", "scrollable",
    "on_key_press", "on_click", "on_event", "on_focus", "on_blur",
    "on_channel", "on_timer",
    "class", "ref", "key", "deps", "id", "disabled",
];

lazy_static! {
    /// Hand-curated attribute misspellings checked before edit distance.
    static ref ATTRIBUTE_TYPOS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("onclick", "on_click");
        m.insert("onkeypress", "on_key_press");
        m.insert("onfocus", "on_focus");
        m.insert("onblur", "on_blur");
        m.insert("flexgrow", "flex_grow");
        m.insert("flexshrink", "flex_shrink");
        m.insert("alignself", "align_self");
        m.insert("textstyle", "text_style");
        m.insert("textalign", "text_align");
        m.insert("bg", "background");
        m.insert("w", "width");
        m.insert("h", "height");
        m
    };

    static ref RE_STATE_PARAM: Regex = Regex::new(r"^\*(?:tui\.)?State\[(.+)\]$").unwrap();
    static ref RE_NEW_STATE: Regex =
        Regex::new(r"^(\w+)\s*:=\s*(?:tui\.)?NewState\((.*)\)$").unwrap();
    static ref RE_STATE_GET: Regex =
        Regex::new(r"(?:\(\*\s*(\w+)\s*\)|(\w+))\.Get\(\)").unwrap();
    static ref RE_SIMPLE_IDENT: Regex = Regex::new(r"^[A-Za-z_]\w*$").unwrap();
    static ref RE_INT_LIT: Regex = Regex::new(r"^-?\d+$").unwrap();
    static ref RE_FLOAT_LIT: Regex = Regex::new(r"^-?(\d+\.\d*|\.\d+|\d+[eE][+-]?\d+)$").unwrap();
    static ref RE_SLICE_LIT: Regex = Regex::new(r"^(\[\][\w.\[\]\*]+)\s*\{").unwrap();
    static ref RE_MAP_LIT: Regex = Regex::new(r"^(map\[[^\]]+\][\w.\[\]\*]+)\s*\{").unwrap();
    static ref RE_PTR_LIT: Regex = Regex::new(r"^&([\w.]+)\s*\{").unwrap();
    static ref RE_STRUCT_LIT: Regex = Regex::new(r"^([\w.]+)\s*\{").unwrap();
}

/// Analyzes a parsed file, mutating it in place.
///
/// Returns every diagnostic discovered; the file is still usable for code
/// generation when only warnings (or no) diagnostics were produced.
pub fn analyze(file: &mut File) -> Diagnostics {
    let mut analyzer = Analyzer {
        diagnostics: Diagnostics::new(),
        uses_library: false,
    };
    analyzer.run(file);
    analyzer.diagnostics
}

struct Analyzer {
    diagnostics: Diagnostics,
    uses_library: bool,
}

impl Analyzer {
    fn run(&mut self, file: &mut File) {
        for template in &mut file.templates {
            self.uses_library |= !template.body.is_empty();

            // Pass 1: children slot inventory.
            template.accepts_children = body_has_children_slot(&template.body);

            // Pass 2 + 3: @let collection and reference rewrite.
            let mut let_names = HashSet::new();
            collect_let_names(&template.body, &mut let_names);
            rewrite_let_references(&mut template.body, &let_names);

            // Pass 4: refs.
            self.validate_refs(template);

            // Pass 5: elements.
            let is_method = template.is_method();
            let mut body = std::mem::take(&mut template.body);
            for node in &body {
                self.validate_node(node);
            }

            // Pass 6: state inventory.
            template.state_vars = self.collect_state_vars(template, &body, &file.host_decls);

            // Pass 7: binding discovery.
            let states: HashSet<String> =
                template.state_vars.iter().map(|s| s.name.clone()).collect();
            let mut discovery = BindingDiscovery {
                analyzer: &mut *self,
                states: &states,
                counter: 0,
                bindings: Vec::new(),
            };
            discovery.walk_body(&mut body, &BindingCtx::default());
            template.bindings = discovery.bindings;
            template.body = body;

            debug!(
                template = %template.name,
                method = is_method,
                states = template.state_vars.len(),
                bindings = template.bindings.len(),
                "analyzed template"
            );
        }

        // Pass 8: import injection.
        if self.uses_library
            && !file.imports.iter().any(|i| i.path == TUI_IMPORT_PATH)
        {
            file.imports.push(Import {
                alias: TUI_ALIAS.to_string(),
                path: TUI_IMPORT_PATH.to_string(),
                position: Position::new(file.path.clone(), 1, 1, 0),
            });
        }
    }

    // ------------------------------------------------------------------
    // Pass 4: refs
    // ------------------------------------------------------------------

    fn validate_refs(&mut self, template: &mut Template) {
        let is_method = template.is_method();
        let mut seen: HashSet<String> = HashSet::new();
        let mut refs = Vec::new();
        let body = std::mem::take(&mut template.body);
        self.walk_refs(&body, is_method, false, false, &mut seen, &mut refs);
        template.body = body;
        template.refs = refs;
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_refs(
        &mut self,
        nodes: &[Node],
        is_method: bool,
        in_loop: bool,
        in_conditional: bool,
        seen: &mut HashSet<String>,
        refs: &mut Vec<RefInfo>,
    ) {
        for node in nodes {
            match node {
                Node::Element(el) => {
                    self.check_element_ref(el, is_method, in_loop, in_conditional, seen, refs);
                    self.walk_refs(&el.children, is_method, in_loop, in_conditional, seen, refs);
                }
                Node::Let(binding) => {
                    self.check_element_ref(
                        &binding.element,
                        is_method,
                        in_loop,
                        in_conditional,
                        seen,
                        refs,
                    );
                    self.walk_refs(
                        &binding.element.children,
                        is_method,
                        in_loop,
                        in_conditional,
                        seen,
                        refs,
                    );
                }
                Node::For(for_loop) => {
                    self.walk_refs(&for_loop.body, is_method, true, in_conditional, seen, refs);
                }
                Node::If(if_stmt) => {
                    self.walk_refs(&if_stmt.then_body, is_method, in_loop, true, seen, refs);
                    self.walk_refs(&if_stmt.else_body, is_method, in_loop, true, seen, refs);
                }
                Node::ComponentCall(call) => {
                    self.walk_refs(&call.children, is_method, in_loop, in_conditional, seen, refs);
                }
                _ => {}
            }
        }
    }

    fn check_element_ref(
        &mut self,
        el: &Element,
        is_method: bool,
        in_loop: bool,
        in_conditional: bool,
        seen: &mut HashSet<String>,
        refs: &mut Vec<RefInfo>,
    ) {
        if el.ref_key.is_some() && !in_loop {
            self.diagnostics.push(Diagnostic::error(
                el.position.clone(),
                "key attribute is only valid inside @for",
            ));
        }

        let Some(ref_expr) = &el.ref_expr else {
            return;
        };
        let name = ref_expr.code.trim().to_string();

        if !is_method {
            if !RE_SIMPLE_IDENT.is_match(&name) {
                self.diagnostics.push(Diagnostic::error(
                    ref_expr.position.clone(),
                    format!("ref name {:?} must be a simple identifier", name),
                ));
                return;
            }
            if export_name(&name) == "Root" {
                self.diagnostics.push(Diagnostic::error(
                    ref_expr.position.clone(),
                    "ref name \"root\" collides with the view's Root field",
                ));
                return;
            }
            if !seen.insert(name.clone()) {
                self.diagnostics.push(Diagnostic::error(
                    ref_expr.position.clone(),
                    format!("duplicate ref name {:?}", name),
                ));
                return;
            }
        }

        let has_key = el.ref_key.is_some();
        let kind = if in_loop {
            if has_key {
                RefKind::Map
            } else {
                RefKind::List
            }
        } else {
            RefKind::Single
        };
        let key_type = el
            .ref_key
            .as_ref()
            .map(|key| infer_key_type(key.code.trim()).to_string());

        refs.push(RefInfo {
            export_name: export_name(&name),
            name,
            kind,
            key_type,
            in_loop,
            in_conditional,
        });
    }

    // ------------------------------------------------------------------
    // Pass 5: elements
    // ------------------------------------------------------------------

    fn validate_node(&mut self, node: &Node) {
        match node {
            Node::Element(el) => self.validate_element(el),
            Node::Let(binding) => self.validate_element(&binding.element),
            Node::For(for_loop) => {
                for child in &for_loop.body {
                    self.validate_node(child);
                }
            }
            Node::If(if_stmt) => {
                for child in if_stmt.then_body.iter().chain(&if_stmt.else_body) {
                    self.validate_node(child);
                }
            }
            Node::ComponentCall(call) => {
                for child in &call.children {
                    self.validate_node(child);
                }
            }
            _ => {}
        }
    }

    fn validate_element(&mut self, el: &Element) {
        if !KNOWN_TAGS.contains(&el.tag.as_str()) {
            self.diagnostics.push(Diagnostic::error(
                el.position.clone(),
                format!("unknown element tag <{}>", el.tag),
            ));
        } else if VOID_TAGS.contains(&el.tag.as_str()) && !el.children.is_empty() {
            self.diagnostics.push(Diagnostic::error(
                el.position.clone(),
                format!("void element <{}> must not have children", el.tag),
            ));
        }

        for attribute in &el.attributes {
            self.validate_attribute(attribute);
        }

        for child in &el.children {
            self.validate_node(child);
        }
    }

    fn validate_attribute(&mut self, attribute: &Attribute) {
        if !KNOWN_ATTRIBUTES.contains(&attribute.name.as_str()) {
            let mut diagnostic = Diagnostic::error(
                attribute.position.clone(),
                format!("unknown attribute {:?}", attribute.name),
            );
            if let Some(suggestion) = suggest_attribute(&attribute.name) {
                diagnostic = diagnostic.with_hint(format!("did you mean {:?}?", suggestion));
            }
            self.diagnostics.push(diagnostic);
            return;
        }

        match (&attribute.name[..], &attribute.value) {
            ("class", AttributeValue::Str(value)) => {
                self.validate_class_value(attribute, value);
                self.uses_library = true;
            }
            ("deps", AttributeValue::Expr(expr)) => {
                let trimmed = expr.code.trim();
                if !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
                    self.diagnostics.push(Diagnostic::error(
                        expr.position.clone(),
                        "deps must be an interpolation containing an array literal",
                    ));
                }
            }
            ("deps", _) => {
                self.diagnostics.push(Diagnostic::error(
                    attribute.position.clone(),
                    "deps must be an interpolation containing an array literal",
                ));
            }
            (_, AttributeValue::Expr(expr)) => {
                if expr.code.contains("tui.") {
                    self.uses_library = true;
                }
            }
            _ => {}
        }
    }

    /// Runs the utility-class resolver over a literal `class` value and
    /// reports every unknown token with a range-precise diagnostic.
    fn validate_class_value(&mut self, attribute: &Attribute, value: &str) {
        // Column of the value's first character: name, `="`, then value.
        let value_col = attribute.position.column + attribute.name.chars().count() + 2;
        for span in classes::class_spans(value) {
            if span.valid {
                continue;
            }
            let start = Position::new(
                attribute.position.file.clone(),
                attribute.position.line,
                value_col + span.start_col,
                attribute.position.offset,
            );
            let end = Position::new(
                attribute.position.file.clone(),
                attribute.position.line,
                value_col + span.end_col,
                attribute.position.offset,
            );
            let mut diagnostic = Diagnostic::error(
                start,
                format!("unknown utility class {:?}", span.class),
            )
            .with_end(end);
            if let Some(suggestion) = &span.suggestion {
                diagnostic = diagnostic.with_hint(format!("did you mean {:?}?", suggestion));
            }
            self.diagnostics.push(diagnostic);
        }
    }

    // ------------------------------------------------------------------
    // Pass 6: state inventory
    // ------------------------------------------------------------------

    fn collect_state_vars(
        &mut self,
        template: &Template,
        body: &[Node],
        host_decls: &[HostDecl],
    ) -> Vec<StateVar> {
        let mut vars = Vec::new();

        for param in &template.params {
            if let Some(caps) = RE_STATE_PARAM.captures(param.type_source.trim()) {
                vars.push(StateVar {
                    name: param.name.clone(),
                    type_source: caps[1].to_string(),
                    init: None,
                    is_param: true,
                });
            }
        }

        // File-level cells declared as `var name = tui.NewState(expr)`.
        for decl in host_decls {
            if decl.kind != HostDeclKind::Var {
                continue;
            }
            for line in decl.code.lines() {
                let line = line.trim().trim_start_matches("var ").trim();
                if let Some(idx) = line.find("= ") {
                    let (name, init) = (line[..idx].trim(), line[idx + 2..].trim());
                    if RE_SIMPLE_IDENT.is_match(name) {
                        if let Some(inner) = strip_new_state(init) {
                            vars.push(StateVar {
                                name: name.to_string(),
                                type_source: infer_state_type(inner).to_string(),
                                init: Some(inner.to_string()),
                                is_param: false,
                            });
                        }
                    }
                }
            }
        }

        collect_local_states(body, &mut vars);
        vars
    }

    // ------------------------------------------------------------------
    // Pass 7 context
    // ------------------------------------------------------------------

    fn validate_deps_list(
        &mut self,
        expr: &CodeExpr,
        states: &HashSet<String>,
    ) -> Option<Vec<String>> {
        let trimmed = expr.code.trim();
        let inner = trimmed.strip_prefix('[')?.strip_suffix(']')?;
        let names: Vec<String> = inner
            .split(',')
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            self.diagnostics.push(Diagnostic::warning(
                expr.position.clone(),
                "empty deps list disables reactivity for this element",
            ));
        }
        for name in &names {
            if !states.contains(name) {
                self.diagnostics.push(Diagnostic::error(
                    expr.position.clone(),
                    format!("unknown state name {:?} in deps", name),
                ));
            }
        }
        Some(names)
    }
}

// ----------------------------------------------------------------------
// Shared walks and helpers
// ----------------------------------------------------------------------

fn body_has_children_slot(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| match node {
        Node::ChildrenSlot(_) => true,
        Node::Element(el) => body_has_children_slot(&el.children),
        Node::Let(binding) => body_has_children_slot(&binding.element.children),
        Node::For(for_loop) => body_has_children_slot(&for_loop.body),
        Node::If(if_stmt) => {
            body_has_children_slot(&if_stmt.then_body) || body_has_children_slot(&if_stmt.else_body)
        }
        Node::ComponentCall(call) => body_has_children_slot(&call.children),
        _ => false,
    })
}

fn collect_let_names(nodes: &[Node], names: &mut HashSet<String>) {
    for node in nodes {
        match node {
            Node::Let(binding) => {
                names.insert(binding.name.clone());
                collect_let_names(&binding.element.children, names);
            }
            Node::Element(el) => collect_let_names(&el.children, names),
            Node::For(for_loop) => collect_let_names(&for_loop.body, names),
            Node::If(if_stmt) => {
                collect_let_names(&if_stmt.then_body, names);
                collect_let_names(&if_stmt.else_body, names);
            }
            Node::ComponentCall(call) => collect_let_names(&call.children, names),
            _ => {}
        }
    }
}

/// Replaces interpolations whose code is a bare `@let` name with
/// [`Node::RawExpr`], distinguishing "splice a pre-built element variable"
/// from "evaluate a host expression".
fn rewrite_let_references(nodes: &mut [Node], names: &HashSet<String>) {
    for node in nodes.iter_mut() {
        match node {
            Node::Interpolation(interp) => {
                let code = interp.expr.code.trim();
                if RE_SIMPLE_IDENT.is_match(code) && names.contains(code) {
                    *node = Node::RawExpr(RawHostExpr {
                        expr: CodeExpr::new(code.to_string(), interp.expr.position.clone()),
                        comments: std::mem::take(&mut interp.comments),
                    });
                }
            }
            Node::Element(el) => rewrite_let_references(&mut el.children, names),
            Node::Let(binding) => rewrite_let_references(&mut binding.element.children, names),
            Node::For(for_loop) => rewrite_let_references(&mut for_loop.body, names),
            Node::If(if_stmt) => {
                rewrite_let_references(&mut if_stmt.then_body, names);
                rewrite_let_references(&mut if_stmt.else_body, names);
            }
            Node::ComponentCall(call) => rewrite_let_references(&mut call.children, names),
            _ => {}
        }
    }
}

/// Key-type heuristic for `key={...}`: expressions ending in `ID`/`Id` are
/// strings, anything mentioning `int` is an int, everything else defaults to
/// string. Documented as intentionally incomplete.
pub(crate) fn infer_key_type(key_expr: &str) -> &'static str {
    if key_expr.ends_with("ID") || key_expr.ends_with("Id") {
        "string"
    } else if key_expr.contains("int") || key_expr.contains("Int") {
        "int"
    } else {
        "string"
    }
}

fn strip_new_state(init: &str) -> Option<&str> {
    let rest = init
        .strip_prefix("tui.NewState(")
        .or_else(|| init.strip_prefix("NewState("))?;
    rest.strip_suffix(')')
}

fn collect_local_states(nodes: &[Node], vars: &mut Vec<StateVar>) {
    for node in nodes {
        match node {
            Node::HostStmt(stmt) => {
                if let Some(caps) = RE_NEW_STATE.captures(stmt.code.code.trim()) {
                    let init = caps[2].to_string();
                    vars.push(StateVar {
                        name: caps[1].to_string(),
                        type_source: infer_state_type(&init).to_string(),
                        init: Some(init),
                        is_param: false,
                    });
                }
            }
            Node::Element(el) => collect_local_states(&el.children, vars),
            Node::Let(binding) => collect_local_states(&binding.element.children, vars),
            Node::For(for_loop) => collect_local_states(&for_loop.body, vars),
            Node::If(if_stmt) => {
                collect_local_states(&if_stmt.then_body, vars);
                collect_local_states(&if_stmt.else_body, vars);
            }
            Node::ComponentCall(call) => collect_local_states(&call.children, vars),
            _ => {}
        }
    }
}

/// Infers the value type of a state cell from its initializer literal.
pub(crate) fn infer_state_type(init: &str) -> String {
    let init = init.trim();
    if RE_INT_LIT.is_match(init) {
        return "int".to_string();
    }
    if RE_FLOAT_LIT.is_match(init) {
        return "float64".to_string();
    }
    if init == "true" || init == "false" {
        return "bool".to_string();
    }
    if init.starts_with('"') || init.starts_with('`') {
        return "string".to_string();
    }
    if let Some(caps) = RE_SLICE_LIT.captures(init) {
        return caps[1].to_string();
    }
    if let Some(caps) = RE_MAP_LIT.captures(init) {
        return caps[1].to_string();
    }
    if let Some(caps) = RE_PTR_LIT.captures(init) {
        return format!("*{}", &caps[1]);
    }
    if let Some(caps) = RE_STRUCT_LIT.captures(init) {
        return caps[1].to_string();
    }
    "any".to_string()
}

/// Extracts the state variables an expression reads via `name.Get()` or
/// `(*name).Get()`, keeping only names in `states` and preserving first-seen
/// order.
pub(crate) fn state_deps_in_expr(code: &str, states: &HashSet<String>) -> Vec<String> {
    let mut out = Vec::new();
    for caps in RE_STATE_GET.captures_iter(code) {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        if states.contains(name) && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

/// Recursively collects every state dependency under `nodes`: element
/// attributes, interpolations, nested conditions, iterables, and component
/// arguments.
pub(crate) fn collect_state_deps(nodes: &[Node], states: &HashSet<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push_all = |deps: Vec<String>, out: &mut Vec<String>| {
        for dep in deps {
            if !out.iter().any(|n| n == &dep) {
                out.push(dep);
            }
        }
    };

    for node in nodes {
        match node {
            Node::Element(el) => {
                for attribute in &el.attributes {
                    if let AttributeValue::Expr(expr) = &attribute.value {
                        push_all(state_deps_in_expr(&expr.code, states), &mut out);
                    }
                }
                push_all(collect_state_deps(&el.children, states), &mut out);
            }
            Node::Interpolation(interp) => {
                push_all(state_deps_in_expr(&interp.expr.code, states), &mut out);
            }
            Node::Let(binding) => {
                let element_nodes = [Node::Element(binding.element.clone())];
                push_all(collect_state_deps(&element_nodes, states), &mut out);
            }
            Node::For(for_loop) => {
                push_all(state_deps_in_expr(&for_loop.iterable.code, states), &mut out);
                push_all(collect_state_deps(&for_loop.body, states), &mut out);
            }
            Node::If(if_stmt) => {
                push_all(state_deps_in_expr(&if_stmt.condition.code, states), &mut out);
                push_all(collect_state_deps(&if_stmt.then_body, states), &mut out);
                push_all(collect_state_deps(&if_stmt.else_body, states), &mut out);
            }
            Node::ComponentCall(call) => {
                push_all(state_deps_in_expr(&call.args, states), &mut out);
                push_all(collect_state_deps(&call.children, states), &mut out);
            }
            _ => {}
        }
    }
    out
}

/// True when an element folds its single text-like child into a
/// `tui.WithText(...)` option instead of emitting a child element.
///
/// The analyzer's binding counter and the generator's variable numbering
/// both call this; they must stay in lockstep.
pub(crate) fn folds_text_child(element: &Element) -> bool {
    matches!(element.tag.as_str(), "span" | "p")
        && element.children.len() == 1
        && matches!(
            element.children[0],
            Node::Text(_) | Node::Interpolation(_)
        )
}

/// Walk context for binding discovery.
#[derive(Debug, Clone, Default)]
struct BindingCtx {
    in_loop: bool,
    /// Inside a reactive wrapper; the wrapper rebuilds, so inner bindings
    /// are not separately emitted.
    in_reactive: bool,
    /// Explicit deps inherited from an enclosing element.
    explicit_deps: Option<Vec<String>>,
}

struct BindingDiscovery<'a> {
    analyzer: &'a mut Analyzer,
    states: &'a HashSet<String>,
    counter: usize,
    bindings: Vec<StateBinding>,
}

impl<'a> BindingDiscovery<'a> {
    fn next_var(&mut self) -> String {
        let name = format!("__v_{}", self.counter);
        self.counter += 1;
        name
    }

    fn walk_body(&mut self, nodes: &mut [Node], ctx: &BindingCtx) {
        for node in nodes.iter_mut() {
            self.walk_node(node, ctx);
        }
    }

    fn walk_node(&mut self, node: &mut Node, ctx: &BindingCtx) {
        match node {
            Node::Element(el) => {
                self.walk_element(el, None, ctx);
            }
            Node::Let(binding) => {
                // The bound element is emitted under the user's name and
                // consumes no counter slot.
                let name = binding.name.clone();
                self.walk_element(&mut binding.element, Some(name), ctx);
            }
            Node::Interpolation(interp) => {
                // A text-like node outside an element still becomes its own
                // element in the generated code.
                let var = self.next_var();
                if !ctx.in_loop && !ctx.in_reactive {
                    self.record_binding(
                        &var,
                        BindingAttr::Text,
                        interp.expr.code.trim().to_string(),
                        ctx,
                    );
                }
            }
            Node::Text(_) => {
                self.next_var();
            }
            Node::ComponentCall(call) => {
                self.next_var();
                self.walk_body(&mut call.children, ctx);
            }
            Node::ComponentExpr(_) => {
                self.next_var();
            }
            Node::For(for_loop) => {
                let mut inner = ctx.clone();
                inner.in_loop = true;
                if !ctx.in_loop {
                    let deps = for_loop_deps(for_loop, self.states);
                    inner.in_reactive = ctx.in_reactive || !deps.is_empty();
                }
                self.walk_body(&mut for_loop.body, &inner);
            }
            Node::If(if_stmt) => {
                let mut inner = ctx.clone();
                if !ctx.in_loop {
                    let deps = if_stmt_deps(if_stmt, self.states);
                    inner.in_reactive = ctx.in_reactive || !deps.is_empty();
                }
                self.walk_body(&mut if_stmt.then_body, &inner);
                self.walk_body(&mut if_stmt.else_body, &inner);
            }
            _ => {}
        }
    }

    fn walk_element(&mut self, el: &mut Element, let_name: Option<String>, ctx: &BindingCtx) {
        let var = match let_name {
            Some(name) => name,
            None => self.next_var(),
        };

        let mut ctx = ctx.clone();
        if let Some(deps_attr) = el
            .attributes
            .iter()
            .find(|a| a.name == "deps")
            .cloned()
        {
            if let AttributeValue::Expr(expr) = &deps_attr.value {
                if let Some(names) = self.analyzer.validate_deps_list(expr, self.states) {
                    ctx.explicit_deps = Some(names);
                }
            }
        }

        // Dynamic class attribute on the element itself.
        if !ctx.in_loop && !ctx.in_reactive {
            let class_expr = el.attributes.iter().find_map(|a| {
                if a.name == "class" {
                    if let AttributeValue::Expr(expr) = &a.value {
                        return Some(expr.code.clone());
                    }
                }
                None
            });
            if let Some(code) = class_expr {
                self.record_binding(&var, BindingAttr::Class, code.trim().to_string(), &ctx);
            }
        }

        if folds_text_child(el) {
            // The single text-like child becomes a WithText option: no
            // extra counter slot, and any binding targets the element.
            if let Node::Interpolation(interp) = &el.children[0] {
                if !ctx.in_loop && !ctx.in_reactive {
                    self.record_binding(
                        &var,
                        BindingAttr::Text,
                        interp.expr.code.trim().to_string(),
                        &ctx,
                    );
                }
            }
            return;
        }

        for child in el.children.iter_mut() {
            match child {
                Node::Interpolation(interp) => {
                    let child_var = self.next_var();
                    if !ctx.in_loop && !ctx.in_reactive {
                        self.record_binding(
                            &child_var,
                            BindingAttr::Text,
                            interp.expr.code.trim().to_string(),
                            &ctx,
                        );
                    }
                }
                Node::Text(_) => {
                    self.next_var();
                }
                other => self.walk_node(other, &ctx),
            }
        }
    }

    fn record_binding(
        &mut self,
        target: &str,
        attribute: BindingAttr,
        expression: String,
        ctx: &BindingCtx,
    ) {
        let (state_vars, explicit) = match &ctx.explicit_deps {
            Some(names) => (names.clone(), true),
            None => (state_deps_in_expr(&expression, self.states), false),
        };
        if state_vars.is_empty() {
            return;
        }
        self.bindings.push(StateBinding {
            state_vars,
            target: target.to_string(),
            attribute,
            expression,
            explicit,
        });
    }
}

/// State dependencies of a `@for`: its iterable plus everything under it.
pub(crate) fn for_loop_deps(for_loop: &ForLoop, states: &HashSet<String>) -> Vec<String> {
    let mut out = state_deps_in_expr(&for_loop.iterable.code, states);
    for dep in collect_state_deps(&for_loop.body, states) {
        if !out.contains(&dep) {
            out.push(dep);
        }
    }
    out
}

/// State dependencies of an `@if`: the condition, every branch, and any
/// nested else-if conditions.
pub(crate) fn if_stmt_deps(if_stmt: &IfStmt, states: &HashSet<String>) -> Vec<String> {
    let mut out = state_deps_in_expr(&if_stmt.condition.code, states);
    for dep in collect_state_deps(&if_stmt.then_body, states) {
        if !out.contains(&dep) {
            out.push(dep);
        }
    }
    for dep in collect_state_deps(&if_stmt.else_body, states) {
        if !out.contains(&dep) {
            out.push(dep);
        }
    }
    out
}

/// Suggests a replacement for an unknown attribute name.
fn suggest_attribute(name: &str) -> Option<String> {
    if let Some(fixed) = ATTRIBUTE_TYPOS.get(name) {
        return Some((*fixed).to_string());
    }
    let mut best: Option<(usize, &str)> = None;
    for candidate in KNOWN_ATTRIBUTES {
        let distance = crate::classes::levenshtein(name, candidate);
        if distance > 3 {
            continue;
        }
        let better = match best {
            None => true,
            Some((d, c)) => distance < d || (distance == d && *candidate < c),
        };
        if better {
            best = Some((distance, candidate));
        }
    }
    best.map(|(_, c)| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_file;

    fn analyzed(source: &str) -> (File, Diagnostics) {
        let (mut file, parse_diags) = parse_file("t.gsx", source);
        assert!(
            !parse_diags.has_errors(),
            "parse failed: {:?}",
            parse_diags.items()
        );
        let diagnostics = analyze(&mut file);
        (file, diagnostics)
    }

    #[test]
    fn test_unknown_tag_reported() {
        let (_, diagnostics) = analyzed("package x\ntempl T() { <badTag/> }\n");
        assert!(diagnostics.has_errors());
        assert!(diagnostics
            .items()
            .iter()
            .any(|d| d.message == "unknown element tag <badTag>"));
    }

    #[test]
    fn test_void_tag_with_children_reported() {
        let (_, diagnostics) = analyzed("package x\ntempl T() { <hr>text</hr> }\n");
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_unknown_attribute_suggestion() {
        let (_, diagnostics) = analyzed("package x\ntempl T() { <div onclick={fn}></div> }\n");
        let d = diagnostics
            .items()
            .iter()
            .find(|d| d.message.contains("unknown attribute"))
            .expect("diagnostic");
        assert_eq!(d.hint.as_deref(), Some("did you mean \"on_click\"?"));
    }

    #[test]
    fn test_unknown_utility_class_has_range_and_hint() {
        let (_, diagnostics) =
            analyzed("package x\ntempl T() { <div class=\"flex-columns\"></div> }\n");
        let d = diagnostics
            .items()
            .iter()
            .find(|d| d.message.contains("unknown utility class"))
            .expect("diagnostic");
        assert_eq!(d.message, "unknown utility class \"flex-columns\"");
        assert_eq!(d.hint.as_deref(), Some("did you mean \"flex-col\"?"));
        let end = d.end_position.as_ref().expect("end position");
        assert_eq!(end.column - d.position.column, "flex-columns".len());
    }

    #[test]
    fn test_state_param_detection() {
        let (file, _) = analyzed("package x\ntempl C(count *tui.State[int]) { <span>{count.Get()}</span> }\n");
        let template = &file.templates[0];
        assert_eq!(template.state_vars.len(), 1);
        assert_eq!(template.state_vars[0].name, "count");
        assert_eq!(template.state_vars[0].type_source, "int");
        assert!(template.state_vars[0].is_param);
    }

    #[test]
    fn test_local_state_type_inference() {
        let (file, _) = analyzed(
            "package x\ntempl C() {\n\tcount := tui.NewState(0)\n\tname := tui.NewState(\"hi\")\n\titems := tui.NewState([]string{})\n\t<span>{count.Get()}</span>\n}\n",
        );
        let vars = &file.templates[0].state_vars;
        assert_eq!(vars.len(), 3);
        assert_eq!(vars[0].type_source, "int");
        assert_eq!(vars[1].type_source, "string");
        assert_eq!(vars[2].type_source, "[]string");
    }

    #[test]
    fn test_infer_state_type_table() {
        assert_eq!(infer_state_type("42"), "int");
        assert_eq!(infer_state_type("4.5"), "float64");
        assert_eq!(infer_state_type("true"), "bool");
        assert_eq!(infer_state_type("\"s\""), "string");
        assert_eq!(infer_state_type("[]int{1, 2}"), "[]int");
        assert_eq!(infer_state_type("map[string]int{}"), "map[string]int");
        assert_eq!(infer_state_type("&Model{}"), "*Model");
        assert_eq!(infer_state_type("Model{}"), "Model");
        assert_eq!(infer_state_type("someCall()"), "any");
    }

    #[test]
    fn test_binding_targets_first_element() {
        let (file, _) =
            analyzed("package x\ntempl C(count *tui.State[int]) { <span>{count.Get()}</span> }\n");
        let bindings = &file.templates[0].bindings;
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].target, "__v_0");
        assert_eq!(bindings[0].attribute, BindingAttr::Text);
        assert_eq!(bindings[0].state_vars, vec!["count"]);
        assert!(!bindings[0].explicit);
    }

    #[test]
    fn test_binding_counter_matches_generator_numbering() {
        // div (0) > span folds its child; span is 1; second span is 2 with
        // its interpolation folded into WithText.
        let (file, _) = analyzed(
            "package x\ntempl C(count *tui.State[int]) {\n\t<div>\n\t\t<span>static</span>\n\t\t<span>{count.Get()}</span>\n\t</div>\n}\n",
        );
        let bindings = &file.templates[0].bindings;
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].target, "__v_2");
    }

    #[test]
    fn test_bindings_skipped_inside_loops() {
        let (file, _) = analyzed(
            "package x\ntempl C(count *tui.State[int], items []string) {\n\t@for _, item := range items { <span>{count.Get()}</span> }\n}\n",
        );
        assert!(file.templates[0].bindings.is_empty());
    }

    #[test]
    fn test_bindings_skipped_inside_reactive_if() {
        // The wrapper rebuilds its children, so the inner binding must not
        // be emitted separately.
        let (file, _) = analyzed(
            "package x\ntempl C(count *tui.State[int]) {\n\t<div>\n\t@if count.Get() > 0 { <span>{count.Get()}</span> }\n\t</div>\n}\n",
        );
        assert!(file.templates[0].bindings.is_empty());
    }

    #[test]
    fn test_explicit_deps_override_scan() {
        let (file, diagnostics) = analyzed(
            "package x\ntempl C(count *tui.State[int], other *tui.State[int]) {\n\t<span deps={[other]}>{count.Get()}</span>\n}\n",
        );
        assert!(!diagnostics.has_errors());
        let bindings = &file.templates[0].bindings;
        assert_eq!(bindings.len(), 1);
        assert!(bindings[0].explicit);
        assert_eq!(bindings[0].state_vars, vec!["other"]);
    }

    #[test]
    fn test_empty_deps_is_warning_not_error() {
        let (_, diagnostics) = analyzed(
            "package x\ntempl C(count *tui.State[int]) {\n\t<span deps={[]}>{count.Get()}</span>\n}\n",
        );
        assert!(!diagnostics.has_errors());
        assert!(diagnostics
            .items()
            .iter()
            .any(|d| d.severity == crate::error::Severity::Warning));
    }

    #[test]
    fn test_unknown_state_in_deps_is_error() {
        let (_, diagnostics) = analyzed(
            "package x\ntempl C(count *tui.State[int]) {\n\t<span deps={[missing]}>{count.Get()}</span>\n}\n",
        );
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_ref_kinds() {
        let (file, diagnostics) = analyzed(
            "package x\ntempl T(items []Item) {\n\t<div ref={root2}></div>\n\t@for _, item := range items {\n\t\t<div ref={rows} key={item.ID}></div>\n\t\t<div ref={cells}></div>\n\t}\n}\n",
        );
        assert!(!diagnostics.has_errors(), "{:?}", diagnostics.items());
        let refs = &file.templates[0].refs;
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].kind, RefKind::Single);
        assert_eq!(refs[1].kind, RefKind::Map);
        assert_eq!(refs[1].key_type.as_deref(), Some("string"));
        assert_eq!(refs[2].kind, RefKind::List);
        assert_eq!(refs[0].export_name, "Root2");
    }

    #[test]
    fn test_duplicate_ref_rejected() {
        let (_, diagnostics) = analyzed(
            "package x\ntempl T() {\n\t<div ref={a}></div>\n\t<div ref={a}></div>\n}\n",
        );
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_root_ref_name_rejected() {
        let (_, diagnostics) = analyzed("package x\ntempl T() { <div ref={root}></div> }\n");
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_key_outside_loop_rejected() {
        let (_, diagnostics) =
            analyzed("package x\ntempl T() { <div ref={a} key={b.ID}></div> }\n");
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_method_template_ref_expressions_allowed() {
        let (file, diagnostics) = analyzed(
            "package x\ntempl (c *Counter) View() {\n\t<div ref={c.row}></div>\n\t<div ref={c.row}></div>\n}\n",
        );
        assert!(!diagnostics.has_errors());
        assert_eq!(file.templates[0].refs.len(), 2);
    }

    #[test]
    fn test_let_reference_rewritten_to_raw_expr() {
        let (file, _) = analyzed(
            "package x\ntempl T() {\n\t@let row = <div></div>\n\t<div>{row}</div>\n}\n",
        );
        let Node::Element(el) = &file.templates[0].body[1] else {
            panic!("expected element");
        };
        assert!(matches!(el.children[0], Node::RawExpr(_)));
    }

    #[test]
    fn test_children_slot_marks_accepts_children() {
        let (file, _) = analyzed("package x\ntempl Card() { <div>{children...}</div> }\n");
        assert!(file.templates[0].accepts_children);
    }

    #[test]
    fn test_import_injected_when_missing() {
        let (file, _) = analyzed("package x\ntempl T() { <hr/> }\n");
        assert!(file
            .imports
            .iter()
            .any(|i| i.path == TUI_IMPORT_PATH && i.alias == TUI_ALIAS));
    }

    #[test]
    fn test_import_not_duplicated() {
        let (file, _) = analyzed(
            "package x\nimport tui \"github.com/gsx-dev/tui\"\ntempl T() { <hr/> }\n",
        );
        let count = file
            .imports
            .iter()
            .filter(|i| i.path == TUI_IMPORT_PATH)
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_state_deps_in_expr_forms() {
        let states: HashSet<String> =
            ["count", "name"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            state_deps_in_expr("count.Get() + (*name).Get()", &states),
            vec!["count", "name"]
        );
        assert_eq!(
            state_deps_in_expr("other.Get()", &states),
            Vec::<String>::new()
        );
    }
}
