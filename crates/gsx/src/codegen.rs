// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Go code generation from the analyzed AST.
//!
//! Single-pass emitter. The generated module has this structure:
//!
//! ```go
//! // Code generated by gsx. DO NOT EDIT.
//!
//! package name
//!
//! import (
//!     tui "github.com/gsx-dev/tui"
//! )
//!
//! // host declarations and functions, verbatim
//!
//! type NameView struct { ... }          // one per function template
//! func Name(...) NameView { ... }
//!
//! func (c *Counter) Render(app *tui.App) *tui.Element { ... }  // method templates
//! ```
//!
//! # Variable numbering
//!
//! Element variables are `__v_0`, `__v_1`, ... in visit order. The
//! analyzer's binding discovery advances a counter under identical rules
//! (see [`crate::analyzer::folds_text_child`]); if the two ever diverge,
//! bindings target the wrong element, so the pipeline tests compile a fixed
//! corpus and assert that every binding target is declared.
//!
//! # Reactive wrappers
//!
//! An `@if` / `@for` whose condition or body reads state compiles to a
//! hidden wrapper element plus an update closure that clears and rebuilds
//! the wrapper's children, bound to every state dependency.

use crate::analyzer::{folds_text_child, for_loop_deps, if_stmt_deps};
use crate::ast::*;
use crate::classes;
use crate::sourcemap::SourceMap;
use crate::token::Position;
use std::collections::HashSet;
use tracing::debug;

/// Output of [`generate`].
#[derive(Debug, Clone)]
pub struct Generated {
    /// The unformatted Go source.
    pub code: String,
    /// Mappings from generated lines back to the template.
    pub source_map: SourceMap,
}

/// Generates Go source for an analyzed file.
pub fn generate(file: &File) -> Generated {
    let mut generator = GoCodeGenerator::new(&file.path);
    generator.emit_file(file);
    debug!(lines = generator.line - 1, "generated code");
    Generated {
        code: std::mem::take(&mut generator.out),
        source_map: generator.map,
    }
}

/// Maps an attribute name to its option constructor, for attributes that
/// translate one-to-one.
fn attr_option(name: &str) -> Option<&'static str> {
    Some(match name {
        "width" => "tui.WithWidth",
        "height" => "tui.WithHeight",
        "min_width" => "tui.WithMinWidth",
        "max_width" => "tui.WithMaxWidth",
        "min_height" => "tui.WithMinHeight",
        "max_height" => "tui.WithMaxHeight",
        "direction" => "tui.WithDirection",
        "justify" => "tui.WithJustify",
        "align" => "tui.WithAlign",
        "align_self" => "tui.WithAlignSelf",
        "gap" => "tui.WithGap",
        "flex_grow" => "tui.WithFlexGrow",
        "flex_shrink" => "tui.WithFlexShrink",
        "padding" => "tui.WithPadding",
        "margin" => "tui.WithMargin",
        "border" => "tui.WithBorder",
        "border_style" => "tui.WithBorderStyle",
        "background" => "tui.WithBackground",
        "text" => "tui.WithText",
        "text_style" => "tui.WithTextStyle",
        "text_align" => "tui.WithTextAlign",
        "focusable" => "tui.WithFocusable",
        "scrollable" => "tui.WithScrollable",
        "on_key_press" => "tui.WithOnKeyPress",
        "on_click" => "tui.WithOnClick",
        "on_event" => "tui.WithOnEvent",
        "on_focus" => "tui.WithOnFocus",
        "on_blur" => "tui.WithOnBlur",
        "id" => "tui.WithID",
        "disabled" => "tui.WithDisabled",
        _ => return None,
    })
}

/// Quotes a string as a Go string literal.
fn go_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Per-template emission context.
struct TemplateCtx {
    /// Method receiver variable, used as the mount context.
    receiver: Option<String>,
    /// State names visible to the template.
    states: HashSet<String>,
    /// State name -> value type, for bind-callback signatures.
    state_types: Vec<(String, String)>,
}

impl TemplateCtx {
    fn state_type(&self, name: &str) -> &str {
        self.state_types
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_str())
            .unwrap_or("any")
    }
}

struct GoCodeGenerator {
    out: String,
    indent: usize,
    /// 1-indexed line the next `write_line` call produces.
    line: usize,
    map: SourceMap,
    var_counter: usize,
    cond_counter: usize,
    loop_counter: usize,
    children_counter: usize,
    /// Mount call-site counter, reset per method template.
    mount_counter: usize,
    loop_depth: usize,
    /// Synthesized or user loop index variables, innermost last.
    loop_index_stack: Vec<String>,
    /// Component-call view variables whose watchers aggregate after the body.
    pending_child_watchers: Vec<String>,
    /// `on_channel` / `on_timer` expressions deferred to after the body.
    pending_watcher_exprs: Vec<String>,
    /// First top-level element variable of the current template.
    root_var: Option<String>,
}

impl GoCodeGenerator {
    fn new(file: &str) -> Self {
        Self {
            out: String::new(),
            indent: 0,
            line: 1,
            map: SourceMap::new(file),
            var_counter: 0,
            cond_counter: 0,
            loop_counter: 0,
            children_counter: 0,
            mount_counter: 0,
            loop_depth: 0,
            loop_index_stack: Vec::new(),
            pending_child_watchers: Vec::new(),
            pending_watcher_exprs: Vec::new(),
            root_var: None,
        }
    }

    fn write_line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push('\t');
        }
        self.out.push_str(text);
        self.out.push('\n');
        self.line += 1;
    }

    /// Writes a verbatim multi-line block at the current indent.
    fn write_block(&mut self, text: &str) {
        for line in text.lines() {
            self.write_line(line);
        }
    }

    fn blank(&mut self) {
        self.out.push('\n');
        self.line += 1;
    }

    fn indented<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.indent += 1;
        let result = f(self);
        self.indent -= 1;
        result
    }

    fn record(&mut self, position: &Position, length: usize) {
        self.map
            .record(self.line, self.indent + 1, position.line, position.column, length);
    }

    fn next_var(&mut self) -> String {
        let name = format!("__v_{}", self.var_counter);
        self.var_counter += 1;
        name
    }

    // ------------------------------------------------------------------
    // File layout
    // ------------------------------------------------------------------

    fn emit_file(&mut self, file: &File) {
        self.write_line("// Code generated by gsx. DO NOT EDIT.");
        self.blank();
        self.write_line(&format!("package {}", file.package_name));
        self.blank();

        if !file.imports.is_empty() {
            self.write_line("import (");
            let mut seen = HashSet::new();
            self.indented(|g| {
                for import in &file.imports {
                    if !seen.insert((import.alias.clone(), import.path.clone())) {
                        continue;
                    }
                    if import.alias.is_empty() {
                        g.write_line(&go_quote(&import.path));
                    } else {
                        g.write_line(&format!("{} {}", import.alias, go_quote(&import.path)));
                    }
                }
            });
            self.write_line(")");
            self.blank();
        }

        for decl in &file.host_decls {
            self.record(&decl.position, decl.code.lines().next().unwrap_or("").len());
            self.write_block(&decl.code);
            self.blank();
        }

        for func in &file.host_funcs {
            self.record(&func.position, func.code.lines().next().unwrap_or("").len());
            self.write_block(&func.code);
            self.blank();
        }

        for template in &file.templates {
            if template.is_method() {
                self.emit_method_template(file, template);
            } else {
                self.emit_function_template(template);
            }
        }
    }

    fn reset_template_state(&mut self) {
        self.var_counter = 0;
        self.cond_counter = 0;
        self.loop_counter = 0;
        self.children_counter = 0;
        self.mount_counter = 0;
        self.loop_depth = 0;
        self.loop_index_stack.clear();
        self.pending_child_watchers.clear();
        self.pending_watcher_exprs.clear();
        self.root_var = None;
    }

    fn template_ctx(template: &Template) -> TemplateCtx {
        TemplateCtx {
            receiver: template.receiver.as_ref().map(|r| r.name.clone()),
            states: template.state_vars.iter().map(|s| s.name.clone()).collect(),
            state_types: template
                .state_vars
                .iter()
                .map(|s| (s.name.clone(), s.type_source.clone()))
                .collect(),
        }
    }

    // ------------------------------------------------------------------
    // Function templates
    // ------------------------------------------------------------------

    fn emit_function_template(&mut self, template: &Template) {
        self.reset_template_state();
        let ctx = Self::template_ctx(template);
        let view = format!("{}View", template.name);

        for group in &template.comments.leading {
            for comment in &group.comments {
                self.write_block(&comment.text);
            }
        }

        // View struct.
        self.record(&template.position, template.name.len());
        self.write_line(&format!("type {view} struct {{"));
        self.indented(|g| {
            g.write_line("Root     *tui.Element");
            g.write_line("Watchers []tui.Watcher");
            for r in &template.refs {
                let field_type = match r.kind {
                    RefKind::Single => "*tui.Ref".to_string(),
                    RefKind::List => "*tui.RefList".to_string(),
                    RefKind::Map => format!(
                        "*tui.RefMap[{}]",
                        r.key_type.as_deref().unwrap_or("string")
                    ),
                };
                g.write_line(&format!("{} {}", r.export_name, field_type));
            }
        });
        self.write_line("}");
        self.blank();
        self.write_line(&format!(
            "func (v {view}) GetRoot() *tui.Element {{ return v.Root }}"
        ));
        self.blank();
        self.write_line(&format!(
            "func (v {view}) GetWatchers() []tui.Watcher {{ return v.Watchers }}"
        ));
        self.blank();

        // Factory signature.
        let mut params: Vec<String> = template
            .params
            .iter()
            .map(|p| format!("{} {}", p.name, p.type_source))
            .collect();
        if template.accepts_children {
            params.push("children []*tui.Element".to_string());
        }
        self.record(&template.position, template.name.len());
        self.write_line(&format!(
            "func {}({}) {view} {{",
            template.name,
            params.join(", ")
        ));

        self.indented(|g| {
            g.write_line(&format!("view := {view}{{}}"));
            g.write_line("__watchers := []tui.Watcher{}");
            // Refs are forward-declared so inline handlers can capture them.
            for r in &template.refs {
                let ctor = match r.kind {
                    RefKind::Single => "tui.NewRef()".to_string(),
                    RefKind::List => "tui.NewRefList()".to_string(),
                    RefKind::Map => format!(
                        "tui.NewRefMap[{}]()",
                        r.key_type.as_deref().unwrap_or("string")
                    ),
                };
                g.write_line(&format!("{} := {}", r.name, ctor));
            }

            for node in &template.body {
                let var = g.emit_node(node, None, &ctx);
                if g.root_var.is_none() && matches!(node, Node::Element(_)) {
                    g.root_var = var;
                }
            }

            let child_watchers = std::mem::take(&mut g.pending_child_watchers);
            for child in child_watchers {
                g.write_line(&format!(
                    "__watchers = append(__watchers, {child}.GetWatchers()...)"
                ));
            }
            let watcher_exprs = std::mem::take(&mut g.pending_watcher_exprs);
            for expr in watcher_exprs {
                g.write_line(&format!("__watchers = append(__watchers, {expr})"));
            }

            g.emit_bindings(template, &ctx);

            if let Some(root) = g.root_var.clone() {
                g.write_line(&format!("view.Root = {root}"));
            }
            g.write_line("view.Watchers = __watchers");
            for r in &template.refs {
                g.write_line(&format!("view.{} = {}", r.export_name, r.name));
            }
            g.write_line("return view");
        });
        self.write_line("}");
        self.blank();
    }

    // ------------------------------------------------------------------
    // Method templates
    // ------------------------------------------------------------------

    fn emit_method_template(&mut self, file: &File, template: &Template) {
        self.reset_template_state();
        let ctx = Self::template_ctx(template);
        let receiver = template.receiver.as_ref().expect("method template");

        for group in &template.comments.leading {
            for comment in &group.comments {
                self.write_block(&comment.text);
            }
        }

        self.record(&template.position, template.name.len());
        self.write_line(&format!(
            "func ({} {}) Render(app *tui.App) *tui.Element {{",
            receiver.name, receiver.type_source
        ));
        self.indented(|g| {
            for node in &template.body {
                let var = g.emit_node(node, None, &ctx);
                if g.root_var.is_none() && matches!(node, Node::Element(_)) {
                    g.root_var = var;
                }
            }
            g.emit_bindings(template, &ctx);
            match g.root_var.clone() {
                Some(root) => g.write_line(&format!("return {root}")),
                None => g.write_line("return tui.NewElement()"),
            }
        });
        self.write_line("}");
        self.blank();

        self.emit_receiver_helpers(file, receiver);
    }

    /// Emits `UpdateProps` / `BindApp` for a method template's receiver,
    /// based on the struct declaration captured in the same file.
    fn emit_receiver_helpers(&mut self, file: &File, receiver: &Receiver) {
        let struct_name = receiver.type_source.trim_start_matches('*').to_string();
        let Some(fields) = find_struct_fields(file, &struct_name) else {
            return;
        };

        let is_lib_type = |t: &str| {
            t.contains("tui.State")
                || t.contains("tui.Events")
                || t.contains("tui.Ref")
        };
        let prop_fields: Vec<&StructField> =
            fields.iter().filter(|f| !is_lib_type(&f.type_source)).collect();
        let bindable_fields: Vec<&StructField> = fields
            .iter()
            .filter(|f| f.type_source.contains("tui.State") || f.type_source.contains("tui.Events"))
            .collect();

        if !prop_fields.is_empty() {
            self.write_line(&format!(
                "func ({} {}) UpdateProps(fresh {}) {{",
                receiver.name, receiver.type_source, receiver.type_source
            ));
            self.indented(|g| {
                for field in &prop_fields {
                    g.write_line(&format!(
                        "{recv}.{name} = fresh.{name}",
                        recv = receiver.name,
                        name = field.name
                    ));
                }
            });
            self.write_line("}");
            self.blank();
            self.write_line(&format!(
                "var _ tui.PropsUpdater = (*{struct_name})(nil)"
            ));
            self.blank();
        }

        if !bindable_fields.is_empty() {
            self.write_line(&format!(
                "func ({} {}) BindApp(app *tui.App) {{",
                receiver.name, receiver.type_source
            ));
            self.indented(|g| {
                for field in &bindable_fields {
                    g.write_line(&format!("if {}.{} != nil {{", receiver.name, field.name));
                    g.indented(|g| {
                        g.write_line(&format!("{}.{}.BindApp(app)", receiver.name, field.name));
                    });
                    g.write_line("}");
                }
            });
            self.write_line("}");
            self.blank();
            self.write_line(&format!("var _ tui.AppBinder = (*{struct_name})(nil)"));
            self.blank();
        }
    }

    // ------------------------------------------------------------------
    // Body nodes
    // ------------------------------------------------------------------

    /// Emits one body node. Returns the generated variable when the node
    /// produced an element-valued variable.
    fn emit_node(&mut self, node: &Node, parent: Option<&str>, ctx: &TemplateCtx) -> Option<String> {
        match node {
            Node::Element(el) => Some(self.emit_element(el, None, parent, ctx)),
            Node::Let(binding) => {
                // Named subtree; spliced where `{name}` appears, so it is
                // not attached to a parent here.
                self.emit_element(&binding.element, Some(binding.name.clone()), None, ctx);
                None
            }
            Node::Text(text) => {
                let var = self.next_var();
                self.record(&text.position, text.text.len());
                self.write_line(&format!(
                    "{var} := tui.NewElement(tui.WithText({}))",
                    go_quote(&text.text)
                ));
                if let Some(parent) = parent {
                    self.write_line(&format!("{parent}.AddChild({var})"));
                }
                Some(var)
            }
            Node::Interpolation(interp) => {
                let var = self.next_var();
                let code = interp.expr.code.trim();
                self.record(&interp.expr.position, code.len());
                self.write_line(&format!("{var} := tui.NewElement(tui.WithText({code}))"));
                if let Some(parent) = parent {
                    self.write_line(&format!("{parent}.AddChild({var})"));
                }
                Some(var)
            }
            Node::RawExpr(raw) => {
                let name = raw.expr.code.trim();
                if let Some(parent) = parent {
                    self.write_line(&format!("{parent}.AddChild({name})"));
                }
                Some(name.to_string())
            }
            Node::HostStmt(stmt) => {
                self.record(&stmt.code.position, stmt.code.code.lines().next().unwrap_or("").len());
                self.write_block(&stmt.code.code);
                None
            }
            Node::ChildrenSlot(_) => {
                self.write_line("for _, __child := range children {");
                self.indented(|g| match parent {
                    Some(parent) => g.write_line(&format!("{parent}.AddChild(__child)")),
                    None => g.write_line("_ = __child"),
                });
                self.write_line("}");
                None
            }
            Node::ComponentExpr(expr) => {
                let var = self.next_var();
                self.record(&expr.expr.position, expr.expr.code.len());
                self.write_line(&format!(
                    "{var} := {}.Render(app)",
                    expr.expr.code.trim()
                ));
                if let Some(parent) = parent {
                    self.write_line(&format!("{parent}.AddChild({var})"));
                }
                Some(var)
            }
            Node::ComponentCall(call) => self.emit_component_call(call, parent, ctx),
            Node::For(for_loop) => {
                self.emit_for(for_loop, parent, ctx);
                None
            }
            Node::If(if_stmt) => {
                self.emit_if(if_stmt, parent, ctx);
                None
            }
        }
    }

    fn emit_element(
        &mut self,
        el: &Element,
        name_override: Option<String>,
        parent: Option<&str>,
        ctx: &TemplateCtx,
    ) -> String {
        let var = match name_override {
            Some(name) => name,
            None => self.next_var(),
        };

        let folds = folds_text_child(el);
        let mut options: Vec<String> = Vec::new();

        match el.tag.as_str() {
            "hr" => options.push("tui.WithHorizontalRule()".to_string()),
            "br" => {
                options.push("tui.WithWidth(0)".to_string());
                options.push("tui.WithHeight(1)".to_string());
            }
            _ => {}
        }

        if folds {
            match &el.children[0] {
                Node::Text(text) => {
                    options.push(format!("tui.WithText({})", go_quote(&text.text)))
                }
                Node::Interpolation(interp) => {
                    options.push(format!("tui.WithText({})", interp.expr.code.trim()))
                }
                _ => {}
            }
        }

        for attribute in &el.attributes {
            match attribute.name.as_str() {
                "class" => match &attribute.value {
                    AttributeValue::Str(value) => {
                        let resolved = classes::resolve_classes(value);
                        options.extend(resolved.options);
                        if !resolved.text_methods.is_empty() {
                            options.push(format!(
                                "tui.WithTextStyle(tui.NewTextStyle().{})",
                                resolved.text_methods.join(".")
                            ));
                        }
                    }
                    // Dynamic classes have no compile-time resolution.
                    _ => {}
                },
                "deps" => {}
                "on_channel" | "on_timer" => {
                    if let AttributeValue::Expr(expr) = &attribute.value {
                        self.pending_watcher_exprs.push(expr.code.trim().to_string());
                    }
                }
                name => {
                    if let Some(option) = attr_option(name) {
                        options.push(format!(
                            "{option}({})",
                            render_attr_value(&attribute.value)
                        ));
                    }
                }
            }
        }

        self.record(&el.position, el.tag.len());
        self.write_line(&format!("{var} := tui.NewElement({})", options.join(", ")));

        if let Some(ref_expr) = &el.ref_expr {
            let target = ref_expr.code.trim();
            if self.loop_depth > 0 {
                if let Some(key) = &el.ref_key {
                    self.write_line(&format!("{target}.Put({}, {var})", key.code.trim()));
                } else {
                    self.write_line(&format!("{target}.Append({var})"));
                }
            } else {
                self.write_line(&format!("{target}.Set({var})"));
            }
        }

        if let Some(parent) = parent {
            self.write_line(&format!("{parent}.AddChild({var})"));
        }

        if !folds {
            for child in &el.children {
                self.emit_node(child, Some(&var), ctx);
            }
        }

        var
    }

    fn emit_component_call(
        &mut self,
        call: &ComponentCall,
        parent: Option<&str>,
        ctx: &TemplateCtx,
    ) -> Option<String> {
        let var = self.next_var();
        self.record(&call.position, call.name.len());

        if call.is_struct_mount {
            // Children are built exactly like the function-call branch and
            // passed as the constructor's trailing argument, so the element
            // counter advances through them here just as it does in the
            // analyzer's binding walk.
            let ctor_args = if call.children.is_empty() {
                call.args.clone()
            } else {
                let slice = self.emit_children_slice(&call.children, ctx);
                if call.args.trim().is_empty() {
                    slice
                } else {
                    format!("{}, {slice}", call.args)
                }
            };
            let receiver = ctx.receiver.as_deref().unwrap_or("app");
            let index = self.mount_index_expr();
            self.mount_counter += 1;
            self.write_line(&format!(
                "{var} := tui.Mount({receiver}, {index}, func() tui.Renderable {{ return {}({ctor_args}) }})",
                call.name
            ));
            if let Some(parent) = parent {
                self.write_line(&format!("{parent}.AddChild({var})"));
            }
            return Some(var);
        }

        if call.children.is_empty() {
            self.write_line(&format!("{var} := {}({})", call.name, call.args));
        } else {
            let slice = self.emit_children_slice(&call.children, ctx);
            let args = if call.args.trim().is_empty() {
                slice
            } else {
                format!("{}, {slice}", call.args)
            };
            self.write_line(&format!("{var} := {}({args})", call.name));
        }

        self.pending_child_watchers.push(var.clone());
        if let Some(parent) = parent {
            self.write_line(&format!("{parent}.AddChild({var}.Root)"));
        }
        Some(var)
    }

    /// Emits the `__children_k` slice build for a component call's children
    /// and returns the slice variable. Inner view structs contribute their
    /// `.Root`; element-valued children pass through directly.
    fn emit_children_slice(&mut self, children: &[Node], ctx: &TemplateCtx) -> String {
        let slice = format!("__children_{}", self.children_counter);
        self.children_counter += 1;
        self.write_line(&format!("{slice} := []*tui.Element{{}}"));
        for child in children {
            match child {
                Node::ComponentCall(inner) if !inner.is_struct_mount => {
                    if let Some(child_var) = self.emit_node(child, None, ctx) {
                        self.write_line(&format!("{slice} = append({slice}, {child_var}.Root)"));
                    }
                }
                _ => {
                    if let Some(child_var) = self.emit_node(child, None, ctx) {
                        self.write_line(&format!("{slice} = append({slice}, {child_var})"));
                    }
                }
            }
        }
        slice
    }

    /// The mount cache index for the current call site: a compile-time
    /// integer outside loops, otherwise a runtime expression built from the
    /// enclosing loop indices.
    fn mount_index_expr(&self) -> String {
        if self.loop_index_stack.is_empty() {
            return self.mount_counter.to_string();
        }
        let mut parts = vec![format!("{}*1000000", self.mount_counter)];
        for (i, idx) in self.loop_index_stack.iter().enumerate() {
            if i + 1 < self.loop_index_stack.len() {
                parts.push(format!("{idx}*1000000"));
            } else {
                parts.push(idx.clone());
            }
        }
        parts.join(" + ")
    }

    // ------------------------------------------------------------------
    // Control flow
    // ------------------------------------------------------------------

    fn emit_for(&mut self, for_loop: &ForLoop, parent: Option<&str>, ctx: &TemplateCtx) {
        let deps = if self.loop_depth == 0 {
            for_loop_deps(for_loop, &ctx.states)
        } else {
            Vec::new()
        };

        if let (false, Some(parent)) = (deps.is_empty(), parent) {
            let parent = parent.to_string();
            let wrapper = format!("__loop_{}", self.loop_counter);
            self.loop_counter += 1;

            self.record(&for_loop.position, for_loop.iterable.code.len());
            self.write_line(&format!(
                "{wrapper} := tui.NewElement(tui.WithDirection({parent}.Style().Direction), tui.WithGap({parent}.Style().Gap))"
            ));
            self.write_line(&format!("{parent}.AddChild({wrapper})"));
            let update = format!("__update_{wrapper}");
            self.write_line(&format!("{update} := func() {{"));
            self.indented(|g| {
                g.write_line(&format!("{wrapper}.RemoveChildren()"));
                g.emit_plain_for(for_loop, &wrapper, ctx);
            });
            self.write_line("}");
            self.write_line(&format!("{update}()"));
            for dep in &deps {
                self.write_line(&format!(
                    "{dep}.Bind(func(_ {}) {{ {update}() }})",
                    ctx.state_type(dep)
                ));
            }
            return;
        }

        self.emit_plain_for(for_loop, parent.unwrap_or(""), ctx);
    }

    fn emit_plain_for(&mut self, for_loop: &ForLoop, parent: &str, ctx: &TemplateCtx) {
        // A loop index is always synthesized so nested struct mounts can
        // build a unique runtime key.
        let (index, synthesized) = match &for_loop.index_var {
            Some(name) => (name.clone(), false),
            None => (format!("__idx_{}", self.loop_depth), true),
        };

        self.record(&for_loop.position, for_loop.iterable.code.len());
        self.write_line(&format!(
            "for {index}, {} := range {} {{",
            for_loop.value_var,
            for_loop.iterable.code.trim()
        ));
        self.loop_depth += 1;
        self.loop_index_stack.push(index.clone());
        self.indented(|g| {
            if synthesized {
                g.write_line(&format!("_ = {index}"));
            }
            for node in &for_loop.body {
                let parent_opt = (!parent.is_empty()).then_some(parent);
                g.emit_node(node, parent_opt, ctx);
            }
        });
        self.loop_index_stack.pop();
        self.loop_depth -= 1;
        self.write_line("}");
    }

    fn emit_if(&mut self, if_stmt: &IfStmt, parent: Option<&str>, ctx: &TemplateCtx) {
        let deps = if self.loop_depth == 0 {
            if_stmt_deps(if_stmt, &ctx.states)
        } else {
            Vec::new()
        };

        if let (false, Some(parent)) = (deps.is_empty(), parent) {
            let parent = parent.to_string();
            let wrapper = format!("__cond_{}", self.cond_counter);
            self.cond_counter += 1;

            self.record(&if_stmt.position, if_stmt.condition.code.len());
            self.write_line(&format!(
                "{wrapper} := tui.NewElement(tui.WithDirection({parent}.Style().Direction), tui.WithGap({parent}.Style().Gap))"
            ));
            self.write_line(&format!("{parent}.AddChild({wrapper})"));
            let update = format!("__update_{wrapper}");
            self.write_line(&format!("{update} := func() {{"));
            self.indented(|g| {
                g.write_line(&format!("{wrapper}.RemoveChildren()"));
                g.emit_plain_if(if_stmt, Some(&wrapper), ctx);
            });
            self.write_line("}");
            self.write_line(&format!("{update}()"));
            for dep in &deps {
                self.write_line(&format!(
                    "{dep}.Bind(func(_ {}) {{ {update}() }})",
                    ctx.state_type(dep)
                ));
            }
            return;
        }

        self.emit_plain_if(if_stmt, parent, ctx);
    }

    fn emit_plain_if(&mut self, if_stmt: &IfStmt, parent: Option<&str>, ctx: &TemplateCtx) {
        self.record(&if_stmt.position, if_stmt.condition.code.len());
        self.write_line(&format!("if {} {{", if_stmt.condition.code.trim()));
        self.indented(|g| {
            for node in &if_stmt.then_body {
                g.emit_node(node, parent, ctx);
            }
        });

        let mut else_body = &if_stmt.else_body;
        loop {
            if else_body.is_empty() {
                break;
            }
            if else_body.len() == 1 {
                if let Node::If(nested) = &else_body[0] {
                    self.write_line(&format!("}} else if {} {{", nested.condition.code.trim()));
                    self.indented(|g| {
                        for node in &nested.then_body {
                            g.emit_node(node, parent, ctx);
                        }
                    });
                    else_body = &nested.else_body;
                    continue;
                }
            }
            self.write_line("} else {");
            self.indented(|g| {
                for node in else_body {
                    g.emit_node(node, parent, ctx);
                }
            });
            break;
        }
        self.write_line("}");
    }

    // ------------------------------------------------------------------
    // State bindings
    // ------------------------------------------------------------------

    fn emit_bindings(&mut self, template: &Template, ctx: &TemplateCtx) {
        for binding in &template.bindings {
            let setter = match binding.attribute {
                BindingAttr::Text => "SetText",
                // Class rebinding has no runtime setter; nothing to emit.
                BindingAttr::Class => continue,
            };
            let target = &binding.target;
            let expr = &binding.expression;

            if binding.state_vars.len() == 1 {
                let state = &binding.state_vars[0];
                self.write_line(&format!(
                    "{state}.Bind(func(_ {}) {{ {target}.{setter}({expr}) }})",
                    ctx.state_type(state)
                ));
            } else {
                let update = format!("__update_{target}");
                self.write_line(&format!("{update} := func() {{"));
                self.indented(|g| {
                    g.write_line(&format!("{target}.{setter}({expr})"));
                });
                self.write_line("}");
                for state in &binding.state_vars {
                    self.write_line(&format!(
                        "{state}.Bind(func(_ {}) {{ {update}() }})",
                        ctx.state_type(state)
                    ));
                }
            }
        }
    }
}

/// A field parsed out of a verbatim struct declaration.
#[derive(Debug, Clone, PartialEq)]
struct StructField {
    name: String,
    type_source: String,
}

/// Finds the struct declaration for `name` among the file's host decls and
/// parses its fields line by line. Embedded fields and unparseable lines
/// are skipped.
fn find_struct_fields(file: &File, name: &str) -> Option<Vec<StructField>> {
    let header = format!("type {name} struct");
    let decl = file
        .host_decls
        .iter()
        .find(|d| d.kind == HostDeclKind::Type && d.code.starts_with(&header))?;

    let open = decl.code.find('{')?;
    let close = decl.code.rfind('}')?;
    let body = &decl.code[open + 1..close];

    let mut fields = Vec::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let line = line.split("//").next().unwrap_or("").trim();
        let Some((names, type_source)) = line.split_once(char::is_whitespace) else {
            continue; // embedded field
        };
        let type_source = type_source.trim().to_string();
        for field_name in names.split(',') {
            fields.push(StructField {
                name: field_name.trim().to_string(),
                type_source: type_source.clone(),
            });
        }
    }
    Some(fields)
}

fn render_attr_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Str(s) => go_quote(s),
        AttributeValue::Int(raw) | AttributeValue::Float(raw) => raw.clone(),
        AttributeValue::Bool(b) => b.to_string(),
        AttributeValue::Expr(expr) => expr.code.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::parser::parse_file;

    fn generate_source(source: &str) -> String {
        let (mut file, parse_diags) = parse_file("t.gsx", source);
        assert!(
            !parse_diags.has_errors(),
            "parse failed: {:?}",
            parse_diags.items()
        );
        let diags = analyze(&mut file);
        assert!(!diags.has_errors(), "analyze failed: {:?}", diags.items());
        generate(&file).code
    }

    #[test]
    fn test_go_quote() {
        assert_eq!(go_quote("a\"b\\c\nd"), "\"a\\\"b\\\\c\\nd\"");
    }

    #[test]
    fn test_hello_template() {
        let code = generate_source("package x\ntempl Hello() { <span>Hello World</span> }\n");
        assert!(code.contains("package x"));
        assert!(code.contains("tui \"github.com/gsx-dev/tui\""));
        assert!(code.contains("type HelloView struct {"));
        assert!(code.contains("func Hello() HelloView {"));
        assert!(code.contains("__v_0 := tui.NewElement(tui.WithText(\"Hello World\"))"));
        assert!(code.contains("view.Root = __v_0"));
        assert!(code.contains("return view"));
    }

    #[test]
    fn test_counter_binding() {
        let code = generate_source(
            "package x\ntempl Counter(count *tui.State[int]) { <span>{count.Get()}</span> }\n",
        );
        assert!(code.contains("__v_0 := tui.NewElement(tui.WithText(count.Get()))"));
        assert!(code.contains("count.Bind(func(_ int) { __v_0.SetText(count.Get()) })"));
    }

    #[test]
    fn test_plain_for_loop() {
        let code = generate_source(
            "package x\ntempl L(items []string) {\n\t<ul>\n\t@for _, item := range items { <li>{item}</li> }\n\t</ul>\n}\n",
        );
        assert!(code.contains("for __idx_0, item := range items {"));
        assert!(code.contains("_ = __idx_0"));
        assert!(code.contains("__v_0.AddChild(__v_1)"));
    }

    #[test]
    fn test_reactive_for_wrapper() {
        let code = generate_source(
            "package x\ntempl L(items *tui.State[[]string]) {\n\t<div> @for _, item := range items.Get() { <li>{item}</li> } </div>\n}\n",
        );
        assert!(code.contains(
            "__loop_0 := tui.NewElement(tui.WithDirection(__v_0.Style().Direction), tui.WithGap(__v_0.Style().Gap))"
        ));
        assert!(code.contains("__v_0.AddChild(__loop_0)"));
        assert!(code.contains("__update___loop_0 := func() {"));
        assert!(code.contains("__loop_0.RemoveChildren()"));
        assert!(code.contains("__update___loop_0()"));
        assert!(code.contains("items.Bind(func(_ []string) { __update___loop_0() })"));
    }

    #[test]
    fn test_reactive_if_wrapper() {
        let code = generate_source(
            "package x\ntempl T(count *tui.State[int]) {\n\t<div> @if count.Get() > 0 { <span>positive</span> } @else { <span>rest</span> } </div>\n}\n",
        );
        assert!(code.contains("__cond_0 := tui.NewElement("));
        assert!(code.contains("__update___cond_0 := func() {"));
        assert!(code.contains("__cond_0.RemoveChildren()"));
        assert!(code.contains("if count.Get() > 0 {"));
        assert!(code.contains("} else {"));
        assert!(code.contains("count.Bind(func(_ int) { __update___cond_0() })"));
    }

    #[test]
    fn test_else_if_chain_flattens() {
        let code = generate_source(
            "package x\ntempl T(n int) {\n\t@if n > 2 { <hr/> } @else @if n > 1 { <hr/> } @else { <hr/> }\n}\n",
        );
        assert!(code.contains("if n > 2 {"));
        assert!(code.contains("} else if n > 1 {"));
        assert!(code.contains("} else {"));
    }

    #[test]
    fn test_refs_forward_declared_and_exported() {
        let code = generate_source(
            "package x\ntempl T(items []string) {\n\t<div ref={box}>\n\t@for _, item := range items { <li ref={rows}>{item}</li> }\n\t</div>\n}\n",
        );
        assert!(code.contains("box := tui.NewRef()"));
        assert!(code.contains("rows := tui.NewRefList()"));
        assert!(code.contains("box.Set(__v_0)"));
        assert!(code.contains("rows.Append(__v_1)"));
        assert!(code.contains("Box *tui.Ref"));
        assert!(code.contains("Rows *tui.RefList"));
        assert!(code.contains("view.Box = box"));
        assert!(code.contains("view.Rows = rows"));
    }

    #[test]
    fn test_keyed_ref_map() {
        let code = generate_source(
            "package x\ntempl T(items []Item) {\n\t@for _, item := range items { <div ref={cells} key={item.ID}></div> }\n}\n",
        );
        assert!(code.contains("cells := tui.NewRefMap[string]()"));
        assert!(code.contains("cells.Put(item.ID, __v_0)"));
        assert!(code.contains("Cells *tui.RefMap[string]"));
    }

    #[test]
    fn test_method_template_render_and_mount() {
        let code = generate_source(
            "package x\n\ntype App struct {\n\ttitle string\n}\n\ntempl (a *App) View() {\n\t<div>\n\t@Counter(a.title)\n\t</div>\n}\n",
        );
        assert!(code.contains("func (a *App) Render(app *tui.App) *tui.Element {"));
        assert!(code.contains(
            "__v_1 := tui.Mount(a, 0, func() tui.Renderable { return Counter(a.title) })"
        ));
        assert!(code.contains("return __v_0"));
        // Prop field synthesis for the receiver struct.
        assert!(code.contains("func (a *App) UpdateProps(fresh *App) {"));
        assert!(code.contains("a.title = fresh.title"));
        assert!(code.contains("var _ tui.PropsUpdater = (*App)(nil)"));
    }

    #[test]
    fn test_bind_app_for_state_fields() {
        let code = generate_source(
            "package x\n\ntype Counter struct {\n\tcount *tui.State[int]\n\tlabel string\n}\n\ntempl (c *Counter) View() { <span>hi</span> }\n",
        );
        assert!(code.contains("func (c *Counter) BindApp(app *tui.App) {"));
        assert!(code.contains("if c.count != nil {"));
        assert!(code.contains("c.count.BindApp(app)"));
        assert!(code.contains("var _ tui.AppBinder = (*Counter)(nil)"));
        // label is a prop, count is not.
        assert!(code.contains("c.label = fresh.label"));
        assert!(!code.contains("c.count = fresh.count"));
    }

    #[test]
    fn test_struct_mount_with_children_keeps_counter_sync() {
        // A struct-mounted call's children must advance the element counter
        // the same way the analyzer's binding walk does, or the binding
        // after the call targets an undeclared variable.
        let source = "package x\ntempl (a *App) View() {\n\tcount := tui.NewState(0)\n\t<div>\n\t\t@Counter(a.n) { <span>inner</span> }\n\t\t<span>{count.Get()}</span>\n\t</div>\n}\n";
        let code = generate_source(source);
        assert!(code.contains("__children_0 := []*tui.Element{}"));
        assert!(code.contains("__children_0 = append(__children_0, __v_2)"));
        assert!(code.contains(
            "__v_1 := tui.Mount(a, 0, func() tui.Renderable { return Counter(a.n, __children_0) })"
        ));
        // The trailing span lands on __v_3 in both walks.
        assert!(code.contains("__v_3 := tui.NewElement(tui.WithText(count.Get()))"));
        assert!(code.contains("count.Bind(func(_ int) { __v_3.SetText(count.Get()) })"));
    }

    #[test]
    fn test_mount_index_in_nested_loops() {
        let code = generate_source(
            "package x\ntempl (a *App) View() {\n\t<div>\n\t@for _, row := range a.rows {\n\t\t@for _, cell := range row {\n\t\t\t@Cell(cell)\n\t\t}\n\t}\n\t</div>\n}\n",
        );
        assert!(code.contains("0*1000000 + __idx_0*1000000 + __idx_1"));
    }

    #[test]
    fn test_component_call_with_children_slice() {
        let code = generate_source(
            "package x\ntempl Card() { <div>{children...}</div> }\ntempl T() {\n\t@Card() { <span>inner</span> }\n}\n",
        );
        assert!(code.contains("func Card(children []*tui.Element) CardView {"));
        assert!(code.contains("for _, __child := range children {"));
        assert!(code.contains("__children_0 := []*tui.Element{}"));
        assert!(code.contains("__children_0 = append(__children_0, __v_1)"));
        assert!(code.contains("__v_0 := Card(__children_0)"));
        assert!(code.contains("__watchers = append(__watchers, __v_0.GetWatchers()...)"));
    }

    #[test]
    fn test_void_and_break_elements() {
        let code = generate_source("package x\ntempl T() { <div><hr/><br/></div> }\n");
        assert!(code.contains("tui.NewElement(tui.WithHorizontalRule())"));
        assert!(code.contains("tui.NewElement(tui.WithWidth(0), tui.WithHeight(1))"));
    }

    #[test]
    fn test_class_attribute_resolution() {
        let code = generate_source(
            "package x\ntempl T() { <div class=\"flex-col gap-2 font-bold text-cyan\"></div> }\n",
        );
        assert!(code.contains("tui.WithDirection(tui.Vertical)"));
        assert!(code.contains("tui.WithGap(2)"));
        assert!(code
            .contains("tui.WithTextStyle(tui.NewTextStyle().Bold().Foreground(tui.ColorCyan))"));
    }

    #[test]
    fn test_watcher_attributes_deferred() {
        let code = generate_source(
            "package x\ntempl T(w tui.Watcher) { <div on_channel={w}></div> }\n",
        );
        assert!(code.contains("__watchers = append(__watchers, w)"));
        assert!(!code.contains("tui.WithOnChannel"));
    }

    #[test]
    fn test_handler_attribute_inline() {
        let code = generate_source(
            "package x\ntempl T(h func()) { <button on_click={h}></button> }\n",
        );
        assert!(code.contains("tui.NewElement(tui.WithOnClick(h))"));
    }

    #[test]
    fn test_let_binding_spliced() {
        let code = generate_source(
            "package x\ntempl T() {\n\t@let row = <div></div>\n\t<div>{row}</div>\n}\n",
        );
        assert!(code.contains("row := tui.NewElement()"));
        assert!(code.contains("__v_0.AddChild(row)"));
    }

    #[test]
    fn test_multi_state_binding_shares_update_closure() {
        let code = generate_source(
            "package x\ntempl T(a *tui.State[int], b *tui.State[string]) {\n\t<span>{a.Get() + len(b.Get())}</span>\n}\n",
        );
        assert!(code.contains("__update___v_0 := func() {"));
        assert!(code.contains("__v_0.SetText(a.Get() + len(b.Get()))"));
        assert!(code.contains("a.Bind(func(_ int) { __update___v_0() })"));
        assert!(code.contains("b.Bind(func(_ string) { __update___v_0() })"));
    }

    #[test]
    fn test_source_map_points_into_template() {
        let (mut file, _) = parse_file(
            "t.gsx",
            "package x\ntempl Hello() { <span>Hello World</span> }\n",
        );
        analyze(&mut file);
        let generated = generate(&file);
        // The element creation line maps back to line 2 of the template.
        let element_line = generated
            .code
            .lines()
            .position(|l| l.contains("tui.NewElement"))
            .unwrap()
            + 1;
        let mapping = generated.source_map.lookup(element_line).unwrap();
        assert_eq!(mapping.gsx_line, 2);
    }

    #[test]
    fn test_binding_targets_are_declared() {
        // The analyzer's counter and the generator's numbering must agree:
        // every binding target is a variable the generator declared.
        let corpus = [
            "package x\ntempl T(count *tui.State[int], flag *tui.State[bool]) {\n\t<div>\n\t\t<span>one</span>\n\t\t<p>{count.Get()}</p>\n\t\t<div>{count.Get()}{flag.Get()}</div>\n\t</div>\n}\n",
            // Struct-mounted component call carrying children, followed by
            // a bound element.
            "package x\ntempl (a *App) View() {\n\tcount := tui.NewState(0)\n\t<div>\n\t\t@Counter(a.n) { <span>inner</span> }\n\t\t<span>{count.Get()}</span>\n\t</div>\n}\n",
        ];
        for source in corpus {
            let (mut file, _) = parse_file("t.gsx", source);
            let diags = analyze(&mut file);
            assert!(!diags.has_errors(), "{:?}", diags.items());
            let code = generate(&file).code;
            for binding in &file.templates[0].bindings {
                assert!(
                    code.contains(&format!("{} := tui.NewElement", binding.target)),
                    "binding target {} not declared in:\n{}",
                    binding.target,
                    code
                );
            }
        }
    }
}
