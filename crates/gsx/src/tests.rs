// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! End-to-end pipeline scenarios: source in, generated Go and diagnostics
//! out. Unit behavior lives in each module's own test block; these tests
//! exercise the full lex -> parse -> analyze -> generate path.

use crate::compiler::compile;
use crate::error::Severity;
use crate::{analyze, generate, parse_file};

fn compile_ok(source: &str) -> String {
    let bundle = compile("t.gsx", source).unwrap();
    assert!(
        !bundle.has_errors(),
        "unexpected diagnostics: {:?}",
        bundle.diagnostics.items()
    );
    bundle.generated
}

#[test]
fn scenario_hello() {
    let generated = compile_ok("package x\ntempl Hello() { <span>Hello World</span> }\n");
    assert!(generated.contains("package x"));
    assert!(generated.contains("tui \"github.com/gsx-dev/tui\""));
    assert!(generated.contains("func Hello() HelloView {"));
    assert!(generated.contains("__v_0 := tui.NewElement(tui.WithText(\"Hello World\"))"));
    assert!(generated.contains("return view"));
}

#[test]
fn scenario_counter_binding() {
    let generated = compile_ok(
        "package x\ntempl Counter(count *tui.State[int]) { <span>{count.Get()}</span> }\n",
    );
    assert!(generated.contains("__v_0 := tui.NewElement(tui.WithText(count.Get()))"));
    assert!(generated.contains("count.Bind(func(_ int) { __v_0.SetText(count.Get()) })"));
}

#[test]
fn scenario_for_loop_mapping() {
    let generated = compile_ok(
        "package x\ntempl L(items []string) {\n\t<ul>\n\t@for _, item := range items { <li>{item}</li> }\n\t</ul>\n}\n",
    );
    assert!(generated.contains("for __idx_0, item := range items {"));
    assert!(generated.contains("__v_0.AddChild(__v_1)"));
    // A fresh element per iteration, attached to the loop's parent element.
    assert!(generated.contains("__v_1 := tui.NewElement("));
}

#[test]
fn scenario_reactive_for() {
    let generated = compile_ok(
        "package x\ntempl L(items *tui.State[[]string]) {\n\t<div> @for _, item := range items.Get() { <li>{item}</li> } </div>\n}\n",
    );
    assert!(generated.contains(
        "__loop_0 := tui.NewElement(tui.WithDirection(__v_0.Style().Direction), tui.WithGap(__v_0.Style().Gap))"
    ));
    assert!(generated.contains("__v_0.AddChild(__loop_0)"));
    assert!(generated.contains("__update___loop_0 := func() {"));
    assert!(generated.contains("__update___loop_0()"));
    assert!(generated.contains("items.Bind(func(_ []string) { __update___loop_0() })"));
}

#[test]
fn scenario_unknown_tag_error() {
    let bundle = compile("t.gsx", "package x\ntempl T() { <badTag/> }\n").unwrap();
    assert!(bundle.has_errors());
    assert!(bundle.generated.is_empty(), "no output on error");
    let diagnostic = bundle
        .diagnostics
        .items()
        .iter()
        .find(|d| d.message == "unknown element tag <badTag>")
        .expect("diagnostic present");
    assert_eq!(diagnostic.position.line, 2);
    assert_eq!(diagnostic.position.file, "t.gsx");
}

#[test]
fn scenario_utility_class_suggestion() {
    let bundle = compile(
        "t.gsx",
        "package x\ntempl T() { <div class=\"flex-columns\"></div> }\n",
    )
    .unwrap();
    assert!(bundle.has_errors());
    let diagnostic = bundle
        .diagnostics
        .items()
        .iter()
        .find(|d| d.message.contains("unknown utility class"))
        .expect("diagnostic present");
    assert_eq!(diagnostic.message, "unknown utility class \"flex-columns\"");
    assert_eq!(diagnostic.hint.as_deref(), Some("did you mean \"flex-col\"?"));
    let end = diagnostic.end_position.as_ref().expect("range-precise");
    assert_eq!(
        end.column - diagnostic.position.column,
        "flex-columns".len(),
        "the range spans exactly the offending token"
    );
}

#[test]
fn diagnostics_render_in_file_line_col_format() {
    let bundle = compile("app.gsx", "package x\ntempl T() { <badTag/> }\n").unwrap();
    let rendered = bundle.diagnostics.items()[0].to_string();
    assert!(rendered.starts_with("app.gsx:2:"));
}

#[test]
fn multiline_attributes_parse_like_single_line() {
    let one = compile_ok("package x\ntempl T() { <div width=3 height=4 focusable></div> }\n");
    let multi = compile_ok(
        "package x\ntempl T() { <div\n\twidth=3\n\theight=4\n\tfocusable\n></div> }\n",
    );
    // Identical generated output modulo nothing: same options, same order.
    let pick = |code: &str| {
        code.lines()
            .find(|l| l.contains("tui.NewElement"))
            .unwrap()
            .trim()
            .to_string()
    };
    assert_eq!(pick(&one), pick(&multi));
}

#[test]
fn host_for_with_semicolons_is_one_statement() {
    let generated = compile_ok(
        "package x\ntempl T() {\n\ttotal := 0\n\tfor i := 0; i < 3; i++ {\n\t\ttotal += i\n\t}\n\t<span>done</span>\n}\n",
    );
    assert!(generated.contains("for i := 0; i < 3; i++ {"));
    assert!(generated.contains("total += i"));
}

#[test]
fn text_coalescing_round_trip() {
    let generated = compile_ok("package x\ntempl T() { <span>q/k, j/k</span> }\n");
    assert!(generated.contains("tui.WithText(\"q/k, j/k\")"));
}

#[test]
fn empty_deps_is_warning_only() {
    let bundle = compile(
        "t.gsx",
        "package x\ntempl T(count *tui.State[int]) { <span deps={[]}>{count.Get()}</span> }\n",
    )
    .unwrap();
    assert!(!bundle.has_errors());
    assert!(bundle
        .diagnostics
        .items()
        .iter()
        .any(|d| d.severity == Severity::Warning));
    assert!(!bundle.generated.is_empty());
}

#[test]
fn reactive_if_suppresses_inner_bindings() {
    let generated = compile_ok(
        "package x\ntempl T(count *tui.State[int]) {\n\t<div> @if count.Get() > 0 { <span>{count.Get()}</span> } </div>\n}\n",
    );
    // The wrapper rebuilds its children; the inner interpolation must not
    // get its own SetText binding.
    assert!(generated.contains("__update___cond_0"));
    assert!(!generated.contains("SetText"));
}

#[test]
fn binding_targets_match_generated_declarations() {
    // Counter-synchronization between analyzer and generator, checked over
    // a corpus that mixes folding, nesting, loops, and conditionals.
    let corpus = [
        "package x\ntempl A(count *tui.State[int]) { <span>{count.Get()}</span> }\n",
        "package x\ntempl B(count *tui.State[int]) {\n\t<div>\n\t\t<span>label</span>\n\t\t<p>{count.Get()}</p>\n\t</div>\n}\n",
        "package x\ntempl C(count *tui.State[int], items []string) {\n\t<div>\n\t\t@for _, item := range items { <li>{item}</li> }\n\t\t<span>{count.Get()}</span>\n\t</div>\n}\n",
        "package x\ntempl D(a *tui.State[int], b *tui.State[int]) {\n\t<div>\n\t\t<div>{a.Get()}</div>\n\t\t<div>{b.Get()}{a.Get()}</div>\n\t</div>\n}\n",
        // A struct-mounted component call with children inside a method
        // template, followed by a bound element.
        "package x\ntempl (a *App) View() {\n\tcount := tui.NewState(0)\n\t<div>\n\t\t@Counter(a.n) { <span>inner</span> }\n\t\t<span>{count.Get()}</span>\n\t</div>\n}\n",
    ];

    for source in corpus {
        let (mut file, parse_diags) = parse_file("t.gsx", source);
        assert!(!parse_diags.has_errors());
        let diags = analyze(&mut file);
        assert!(!diags.has_errors(), "{:?}", diags.items());
        let generated = generate(&file).code;
        for template in &file.templates {
            for binding in &template.bindings {
                assert!(
                    generated.contains(&format!("{} := tui.NewElement", binding.target)),
                    "binding target {} is not a declared element in:\n{}",
                    binding.target,
                    generated
                );
            }
        }
    }
}

#[test]
fn host_code_round_trips_verbatim() {
    let source = "package x\n\nconst limit = 10\n\ntype Row struct {\n\tName string\n}\n\nfunc clamp(v int) int {\n\tif v > limit {\n\t\treturn limit\n\t}\n\treturn v\n}\n\ntempl T() { <span>hi</span> }\n";
    let (file, diags) = parse_file("t.gsx", source);
    assert!(!diags.has_errors());
    for decl in &file.host_decls {
        assert!(source.contains(&decl.code), "decl not verbatim: {}", decl.code);
    }
    for func in &file.host_funcs {
        assert!(source.contains(&func.code), "func not verbatim: {}", func.code);
    }
    // And they survive into the generated output unchanged.
    let generated = compile_ok(source);
    assert!(generated.contains("const limit = 10"));
    assert!(generated.contains("func clamp(v int) int {"));
}

#[test]
fn token_positions_are_monotone() {
    let source = "package x\n\ntempl T(items []string) {\n\t<div class=\"flex-col\">\n\t@for _, item := range items { <li>{item}</li> }\n\t</div>\n}\n";
    let mut lexer = crate::Lexer::new("t.gsx", source);
    let mut last = 0usize;
    loop {
        let token = lexer.next_token();
        if token.is_eof() {
            break;
        }
        assert!(
            token.position.offset >= last,
            "byte offsets must be monotone"
        );
        last = token.position.offset;
    }
}

#[test]
fn source_map_written_next_to_output() {
    assert_eq!(
        crate::SourceMap::map_path(&crate::output_path("app.gsx")),
        "app.gsx.go.map"
    );
}

#[test]
fn full_app_compiles() {
    // A small but representative app: host code, state, refs, loops,
    // conditionals, components, classes.
    let source = r#"package app

import "fmt"

type Item struct {
	ID   string
	Name string
}

func label(item Item) string {
	return fmt.Sprintf("%s!", item.Name)
}

templ Row(item Item) {
	<li class="flex-row gap-1">{label(item)}</li>
}

templ List(items *tui.State[[]Item], title string) {
	<div class="flex-col border-rounded p-1" ref={box}>
		<span class="font-bold">{title}</span>
		@if len(items.Get()) == 0 {
			<p>empty</p>
		} @else {
			<p>has items</p>
		}
		@for _, item := range items.Get() {
			<li>{item.Name}</li>
		}
	</div>
}
"#;
    let generated = compile_ok(source);
    assert!(generated.contains("package app"));
    assert!(generated.contains("\"fmt\""));
    assert!(generated.contains("func Row(item Item) RowView {"));
    assert!(generated.contains("func List(items *tui.State[[]Item], title string) ListView {"));
    assert!(generated.contains("box := tui.NewRef()"));
    assert!(generated.contains("__cond_0"));
    assert!(generated.contains("__loop_0"));
}
