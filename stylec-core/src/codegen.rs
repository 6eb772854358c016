//! Groovy code generator.
//!
//! A pure function from [`CompilationUnit`] to source text. All
//! naming decisions (camel-casing, reserved words, collisions) are
//! made here so the rest of the pipeline can keep the original
//! style-language names.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use crate::ir::{CompilationUnit, Expr, FunctionIr, ReturnType, RunStep, Stmt, VarScope, VarType};
use crate::parser::OptionDefault;
use crate::registry::{self, Builtin, Code, Helper, Special};

/// Render the compilation unit as Groovy source.
pub fn generate(unit: &CompilationUnit) -> String {
    Codegen::new(unit).render()
}

/// Identifiers that must not be produced by name translation: Groovy
/// and Java keywords plus names the generated class itself uses.
const RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "def", "default", "do", "double", "else", "enum", "extends", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "in", "instanceof", "int", "interface",
    "long", "native", "new", "package", "private", "protected", "public", "return", "short",
    "static", "super", "switch", "synchronized", "this", "throw", "throws", "trait", "transient",
    "try", "var", "void", "volatile", "while",
    // identifiers owned by the generated class
    "entry", "bibDB", "bibWriter", "bibProcessor", "types", "run", "callType", "main",
    "addPeriod", "chrToInt", "intToChr", "isEmpty",
];

struct Codegen<'u> {
    unit: &'u CompilationUnit,
    /// Style-language function name -> Groovy method name.
    methods: HashMap<String, String>,
    /// Style-language global name -> Groovy field name.
    fields: HashMap<String, String>,
    /// Support-class and framework imports, sorted.
    imports: BTreeSet<String>,
    /// Memoized helper methods, first-use order.
    helpers: Vec<Helper>,
    uses_call_type: bool,
}

impl<'u> Codegen<'u> {
    fn new(unit: &'u CompilationUnit) -> Codegen<'u> {
        let mut methods = HashMap::new();
        let mut fields = HashMap::new();
        let mut used_methods: HashSet<String> = RESERVED.iter().map(|s| s.to_string()).collect();
        let mut used_fields = used_methods.clone();
        for function in &unit.functions {
            let name = unique(&function.name, &mut used_methods);
            methods.insert(function.name.clone(), name);
        }
        for global in unit.int_globals.iter().chain(&unit.str_globals) {
            let name = unique(global, &mut used_fields);
            fields.insert(global.clone(), name);
        }

        let mut codegen = Codegen {
            unit,
            methods,
            fields,
            imports: BTreeSet::new(),
            helpers: Vec::new(),
            uses_call_type: false,
        };
        for import in [
            "bib.runtime.DB",
            "bib.runtime.Entry",
            "bib.runtime.Processor",
            "bib.runtime.Writer",
        ] {
            codegen.imports.insert(import.to_string());
        }
        for function in &unit.functions {
            codegen.scan_stmts(&function.body);
        }
        for step in &unit.run {
            if let RunStep::Execute(name) | RunStep::Iterate(name) | RunStep::Reverse(name) = step
                && let Some(builtin) = registry::lookup(name)
            {
                codegen.note_builtin(builtin);
            }
        }
        codegen
    }

    // ------------------------------------------------------------------
    // Usage collection: imports, helpers, type dispatch
    // ------------------------------------------------------------------

    fn scan_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            match stmt {
                Stmt::VoidCall { builtin, args } => {
                    self.note_builtin(builtin);
                    self.scan_exprs(args);
                }
                Stmt::VoidCallUser { args, .. } => self.scan_exprs(args),
                Stmt::Assign { value, .. } => self.scan_expr(value),
                Stmt::If {
                    cond,
                    then_arm,
                    else_arm,
                } => {
                    self.scan_expr(cond);
                    self.scan_stmts(then_arm);
                    self.scan_stmts(else_arm);
                }
                Stmt::While { cond, body } => {
                    self.scan_expr(cond);
                    self.scan_stmts(body);
                }
                Stmt::Discard(value) | Stmt::Return(value) => self.scan_expr(value),
            }
        }
    }

    fn scan_exprs(&mut self, exprs: &[Rc<Expr>]) {
        for expr in exprs {
            self.scan_expr(expr);
        }
    }

    fn scan_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Call { builtin, args } => {
                self.note_builtin(builtin);
                self.scan_exprs(args);
            }
            Expr::CallUser { args, .. } => self.scan_exprs(args),
            Expr::Ternary {
                cond,
                then_value,
                else_value,
            } => {
                self.scan_expr(cond);
                self.scan_expr(then_value);
                self.scan_expr(else_value);
            }
            Expr::Not(inner) => self.scan_expr(inner),
            _ => {}
        }
    }

    fn note_builtin(&mut self, builtin: &'static Builtin) {
        if let Some(import) = builtin.import() {
            self.imports.insert(import);
        }
        match builtin.code {
            Code::Helper(helper) => {
                if !self.helpers.contains(&helper) {
                    self.helpers.push(helper);
                }
            }
            Code::Special(Special::CallType) => self.uses_call_type = true,
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::IntLit(value) => value.to_string(),
            Expr::StrLit(text) => quote(text),
            Expr::Param { index, .. } => format!("p{index}"),
            Expr::Var { name, scope } => match scope {
                VarScope::GlobalInt | VarScope::GlobalStr => self.fields[name].clone(),
                VarScope::Field => format!("entry.getExpanded({}, bibDB)", quote(name)),
                VarScope::EntryInt => format!("entry.getLocalInt({})", quote(name)),
                VarScope::EntryStr => format!("entry.getLocalString({})", quote(name)),
            },
            Expr::Call { builtin, args } => self.call(builtin, args),
            Expr::CallUser {
                name,
                args,
                uses_entry,
                ..
            } => self.user_call(name, args, *uses_entry),
            Expr::Ternary {
                cond,
                then_value,
                else_value,
            } => format!(
                "({} ? {} : {})",
                self.cond(cond),
                self.expr(then_value),
                self.expr(else_value)
            ),
            Expr::Not(inner) => format!("({} ? 0 : 1)", self.cond(inner)),
            Expr::Name(_) | Expr::CodeBlock(_) => {
                unreachable!("unevaluated operands are consumed during interpretation")
            }
        }
    }

    /// Render an expression in guard position, unwrapping the
    /// `(... ? 1 : 0)` value form of boolean built-ins.
    fn cond(&self, expr: &Expr) -> String {
        match expr {
            Expr::Call { builtin, args } => match builtin.code {
                Code::Bool { template } => self.fill(template, args),
                _ => self.expr(expr),
            },
            Expr::Not(inner) => format!("!({})", self.cond(inner)),
            _ => self.expr(expr),
        }
    }

    fn call(&self, builtin: &'static Builtin, args: &[Rc<Expr>]) -> String {
        match builtin.code {
            Code::Infix { op } => {
                format!("({} {} {})", self.expr(&args[1]), op, self.expr(&args[0]))
            }
            Code::Bool { template } => format!("({} ? 1 : 0)", self.fill(template, args)),
            Code::Fmt { template } => self.fill(template, args),
            Code::Delegate { class, method } => {
                // Support routines take their operands in reverse
                // demand order.
                let rendered: Vec<String> = args.iter().rev().map(|a| self.expr(a)).collect();
                format!("{class}.{method}({})", rendered.join(", "))
            }
            Code::Helper(helper) => {
                let rendered: Vec<String> = args.iter().map(|a| self.expr(a)).collect();
                format!("{}({})", helper.method(), rendered.join(", "))
            }
            Code::Special(Special::CallType) => "callType(entry)".to_string(),
            Code::Special(_) => {
                unreachable!("control built-ins are lowered during interpretation")
            }
        }
    }

    fn fill(&self, template: &str, args: &[Rc<Expr>]) -> String {
        let mut out = template.to_string();
        for (slot, arg) in args.iter().enumerate() {
            out = out.replace(&format!("{{{slot}}}"), &self.expr(arg));
        }
        out
    }

    fn user_call(&self, name: &str, args: &[Rc<Expr>], uses_entry: bool) -> String {
        let mut rendered = Vec::with_capacity(args.len() + 1);
        if uses_entry {
            rendered.push("entry".to_string());
        }
        rendered.extend(args.iter().map(|a| self.expr(a)));
        format!("{}({})", self.methods[name], rendered.join(", "))
    }

    // ------------------------------------------------------------------
    // Statements and methods
    // ------------------------------------------------------------------

    fn stmts(&self, stmts: &[Stmt], depth: usize, out: &mut String) {
        for stmt in stmts {
            self.stmt(stmt, depth, out);
        }
    }

    fn stmt(&self, stmt: &Stmt, depth: usize, out: &mut String) {
        let pad = "  ".repeat(depth);
        match stmt {
            Stmt::VoidCall { builtin, args } => {
                out.push_str(&format!("{pad}{}\n", self.call(builtin, args)));
            }
            Stmt::VoidCallUser {
                name,
                args,
                uses_entry,
            } => {
                out.push_str(&format!("{pad}{}\n", self.user_call(name, args, *uses_entry)));
            }
            Stmt::Assign { target, value } => {
                let value = self.expr(value);
                let line = match target.scope {
                    VarScope::GlobalInt | VarScope::GlobalStr => {
                        format!("{} = {value}", self.fields[&target.name])
                    }
                    VarScope::EntryInt => {
                        format!("entry.setLocalInt({}, {value})", quote(&target.name))
                    }
                    VarScope::EntryStr => {
                        format!("entry.setLocalString({}, {value})", quote(&target.name))
                    }
                    VarScope::Field => unreachable!("fields are rejected as assignment targets"),
                };
                out.push_str(&format!("{pad}{line}\n"));
            }
            Stmt::If {
                cond,
                then_arm,
                else_arm,
            } => {
                out.push_str(&format!("{pad}if ({}) {{\n", self.cond(cond)));
                self.stmts(then_arm, depth + 1, out);
                if else_arm.is_empty() {
                    out.push_str(&format!("{pad}}}\n"));
                } else {
                    out.push_str(&format!("{pad}}} else {{\n"));
                    self.stmts(else_arm, depth + 1, out);
                    out.push_str(&format!("{pad}}}\n"));
                }
            }
            Stmt::While { cond, body } => {
                out.push_str(&format!("{pad}while ({}) {{\n", self.cond(cond)));
                self.stmts(body, depth + 1, out);
                out.push_str(&format!("{pad}}}\n"));
            }
            Stmt::Discard(value) => {
                out.push_str(&format!("{pad}{}\n", self.expr(value)));
            }
            Stmt::Return(value) => {
                out.push_str(&format!("{pad}return {}\n", self.expr(value)));
            }
        }
    }

    fn method(&self, function: &FunctionIr, out: &mut String) {
        let ret = match function.ret {
            ReturnType::Void => "void",
            ReturnType::Int => "int",
            ReturnType::Str => "String",
        };
        let mut params = Vec::new();
        if function.uses_entry {
            params.push("Entry entry".to_string());
        }
        for param in &function.params {
            params.push(format!("{} p{}", groovy_type(param.ty), param.index));
        }
        out.push_str(&format!(
            "\n  {ret} {}({}) {{\n",
            self.methods[&function.name],
            params.join(", ")
        ));
        self.stmts(&function.body, 2, out);
        out.push_str("  }\n");
    }

    // ------------------------------------------------------------------
    // Class assembly
    // ------------------------------------------------------------------

    fn render(&self) -> String {
        let unit = self.unit;
        let mut out = String::new();

        for import in &self.imports {
            out.push_str(&format!("import {import}\n"));
        }
        out.push_str(&format!("\nclass {} {{\n\n", unit.class_name));
        out.push_str("  DB bibDB\n  Writer bibWriter\n  Processor bibProcessor\n");

        if self.uses_call_type {
            self.type_map(&mut out);
        }

        if !unit.int_globals.is_empty() || !unit.str_globals.is_empty() {
            out.push('\n');
            for name in &unit.int_globals {
                out.push_str(&format!("  int {} = 0\n", self.fields[name]));
            }
            for name in &unit.str_globals {
                out.push_str(&format!("  String {} = ''\n", self.fields[name]));
            }
        }

        self.constructor(&mut out);

        for helper in &self.helpers {
            out.push_str(helper_method(*helper));
        }
        for function in &unit.functions {
            self.method(function, &mut out);
        }
        if self.uses_call_type {
            self.dispatch_method(&mut out);
        }
        self.run_method(&mut out);

        out.push_str("}\n");
        out
    }

    fn type_map(&self, out: &mut String) {
        let handlers: Vec<&FunctionIr> = self
            .unit
            .functions
            .iter()
            .filter(|f| f.is_entry_handler())
            .collect();
        if handlers.is_empty() {
            out.push_str("\n  final Map types = [:]\n");
            return;
        }
        out.push_str("\n  final Map types = [\n");
        for handler in handlers {
            out.push_str(&format!(
                "    ({}): this.&{},\n",
                quote(&handler.name),
                self.methods[&handler.name]
            ));
        }
        out.push_str("  ]\n");
    }

    fn constructor(&self, out: &mut String) {
        out.push_str(&format!(
            "\n  {}(DB bibDB, Writer bibWriter, Processor bibProcessor) {{\n",
            self.unit.class_name
        ));
        out.push_str("    this.bibDB = bibDB\n");
        out.push_str("    this.bibWriter = bibWriter\n");
        out.push_str("    this.bibProcessor = bibProcessor\n");
        if !self.unit.options.is_empty() {
            // Defaults apply only where the processor has no value yet.
            out.push_str("    [\n");
            for (name, default) in &self.unit.options {
                let value = match default {
                    OptionDefault::Int(value) => value.to_string(),
                    OptionDefault::Str(text) => quote(text),
                };
                out.push_str(&format!("      ({}): {value},\n", quote(name)));
            }
            out.push_str("    ].each { name, value ->\n");
            out.push_str("      if (!bibProcessor.hasOption(name)) {\n");
            out.push_str("        bibProcessor.setOption(name, value)\n");
            out.push_str("      }\n");
            out.push_str("    }\n");
        }
        out.push_str("  }\n");
    }

    fn dispatch_method(&self, out: &mut String) {
        out.push_str("\n  void callType(Entry entry) {\n");
        out.push_str("    def handler = types[entry.getType()]\n");
        out.push_str("    if (handler == null) {\n");
        out.push_str("      handler = types['default.type']\n");
        out.push_str("    }\n");
        out.push_str("    if (handler == null) {\n");
        out.push_str(
            "      bibProcessor.warning('no style function for entry type ' + entry.getType())\n",
        );
        out.push_str("      return\n");
        out.push_str("    }\n");
        out.push_str("    handler(entry)\n");
        out.push_str("  }\n");
    }

    fn run_method(&self, out: &mut String) {
        out.push_str("\n  void run() {\n");
        for step in &self.unit.run {
            match step {
                RunStep::Execute(name) => {
                    if let Some(builtin) = registry::lookup(name) {
                        match builtin.code {
                            Code::Fmt { template } => out.push_str(&format!("    {template}\n")),
                            _ => {}
                        }
                    } else {
                        out.push_str(&format!("    {}()\n", self.methods[name]));
                    }
                }
                RunStep::Read => out.push_str(
                    "    // entry data is read by the surrounding bibliography processor\n",
                ),
                RunStep::Sort => out.push_str("    bibDB.sort()\n"),
                RunStep::Iterate(name) => self.entry_loop("each", name, out),
                RunStep::Reverse(name) => self.entry_loop("reverseEach", name, out),
            }
        }
        out.push_str("  }\n");
    }

    fn entry_loop(&self, iterator: &str, name: &str, out: &mut String) {
        let call = if let Some(builtin) = registry::lookup(name) {
            match builtin.code {
                Code::Special(Special::CallType) => "callType(entry)".to_string(),
                Code::Fmt { template } => template.to_string(),
                _ => String::new(),
            }
        } else {
            let uses_entry = self
                .unit
                .functions
                .iter()
                .find(|f| f.name == name)
                .is_some_and(|f| f.uses_entry);
            if uses_entry {
                format!("{}(entry)", self.methods[name])
            } else {
                format!("{}()", self.methods[name])
            }
        };
        out.push_str(&format!("    bibDB.{iterator} {{ entry ->\n"));
        if !call.is_empty() {
            out.push_str(&format!("      {call}\n"));
        }
        out.push_str("    }\n");
    }
}

fn groovy_type(ty: VarType) -> &'static str {
    match ty {
        VarType::Int => "int",
        VarType::Str => "String",
        VarType::Unknown => "def",
    }
}

/// Groovy single-quoted string literal.
fn quote(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Translate a style-language name into a camel-case identifier.
fn camel(name: &str) -> String {
    let mut out = String::new();
    let mut upper_next = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if out.is_empty() && ch.is_ascii_digit() {
                out.push('v');
            }
            if upper_next {
                out.extend(ch.to_uppercase());
                upper_next = false;
            } else {
                out.push(ch);
            }
        } else if !out.is_empty() {
            upper_next = true;
        }
    }
    if out.is_empty() {
        out.push('v');
    }
    out
}

/// Camel-case `name`, then disambiguate against everything already
/// taken so distinct style names never collide in the output.
fn unique(name: &str, used: &mut HashSet<String>) -> String {
    let base = camel(name);
    let mut candidate = base.clone();
    let mut suffix = 1;
    while used.contains(&candidate) {
        candidate = format!("{base}{suffix}");
        suffix += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// Full text of a memoized helper method.
fn helper_method(helper: Helper) -> &'static str {
    match helper {
        Helper::AddPeriod => {
            "\n  String addPeriod(String s) {\n    if (s == '' || s.endsWith('.') || s.endsWith('!') || s.endsWith('?')) {\n      return s\n    }\n    return s + '.'\n  }\n"
        }
        Helper::ChrToInt => {
            "\n  int chrToInt(String s) {\n    return s ? (int) s.charAt(0) : 0\n  }\n"
        }
        Helper::IntToChr => {
            "\n  String intToChr(int code) {\n    return Character.toString((char) code)\n  }\n"
        }
        Helper::IsEmpty => {
            "\n  int isEmpty(String s) {\n    return (s == null || s.trim() == '' ? 1 : 0)\n  }\n"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::build_ir;
    use crate::optimizer::optimize;
    use crate::parser::parse;

    fn generate_source(source: &str) -> String {
        let mut unit = build_ir(&parse(source).expect("parse"), "Style").expect("build");
        optimize(&mut unit);
        generate(&unit)
    }

    #[test]
    fn camel_cases_style_names() {
        assert_eq!(camel("chop.word"), "chopWord");
        assert_eq!(camel("format.name$"), "formatName");
        assert_eq!(camel("default.type"), "defaultType");
        assert_eq!(camel("x"), "x");
    }

    #[test]
    fn disambiguates_colliding_names() {
        let mut used = HashSet::new();
        assert_eq!(unique("a.b", &mut used), "aB");
        assert_eq!(unique("a-b", &mut used), "aB1");
    }

    #[test]
    fn reserved_words_are_avoided() {
        let mut used: HashSet<String> = RESERVED.iter().map(|s| s.to_string()).collect();
        assert_eq!(unique("new", &mut used), "new1");
    }

    #[test]
    fn renders_addition_with_reversed_demand_order() {
        let text = generate_source("FUNCTION {calc.sum}{ + }");
        assert!(text.contains("int calcSum(int p1, int p2) {"), "{text}");
        assert!(text.contains("return (p2 + p1)"), "{text}");
    }

    #[test]
    fn renders_duplicated_nodes_twice() {
        let text = generate_source("FUNCTION {twice}{ #2 duplicate$ + }");
        assert!(text.contains("int twice() {"), "{text}");
        assert!(text.contains("return (2 + 2)"), "{text}");
    }

    #[test]
    fn renders_an_empty_guard_on_the_negated_condition() {
        let text = generate_source("FUNCTION {noop}{ #1 'skip$ 'skip$ if$ }");
        assert!(text.contains("if (!(1)) {"), "{text}");
    }

    #[test]
    fn renders_an_expression_conditional_as_a_ternary() {
        let text = generate_source("FUNCTION {pick}{ #1 {#2}{#3} if$ }");
        assert!(text.contains("return (1 ? 2 : 3)"), "{text}");
    }

    #[test]
    fn renders_declared_globals_with_zero_values() {
        let text = generate_source("INTEGERS {one two three} STRINGS {s}");
        let one = text.find("int one = 0").expect("first field");
        let two = text.find("int two = 0").expect("second field");
        let three = text.find("int three = 0").expect("third field");
        assert!(one < two && two < three);
        assert!(text.contains("String s = ''"));
    }

    #[test]
    fn renders_comparisons_bare_in_guard_position() {
        let text = generate_source(
            "INTEGERS {i} FUNCTION {f}{ { i #0 > } { #1 'i := } while$ }",
        );
        assert!(text.contains("while (i > 0) {"), "{text}");
    }

    #[test]
    fn renders_delegates_in_reverse_demand_order_with_imports() {
        let text = generate_source(
            "ENTRY {title}{}{} FUNCTION {fmt}{ title \"t\" change.case$ write$ }",
        );
        assert!(text.contains("import bib.support.ChangeCase"), "{text}");
        assert!(
            text.contains(
                "bibWriter.print(ChangeCase.changeCase(entry.getExpanded('title', bibDB), 't'))"
            ),
            "{text}"
        );
    }

    #[test]
    fn emits_each_helper_once() {
        let text = generate_source(
            "FUNCTION {a}{ \"x\" add.period$ write$ } FUNCTION {b}{ \"y\" add.period$ write$ }",
        );
        assert_eq!(text.matches("String addPeriod(String s) {").count(), 1);
    }

    #[test]
    fn helpers_precede_the_translated_methods() {
        let text = generate_source("FUNCTION {a}{ \"x\" add.period$ write$ }");
        let helper = text.find("String addPeriod(String s) {").expect("helper");
        let method = text.find("void a() {").expect("method");
        assert!(helper < method);
    }

    #[test]
    fn emits_the_option_initializer_block() {
        let text = generate_source("OPTION INTEGER {min.crossrefs} #2");
        assert!(text.contains("('min.crossrefs'): 2,"), "{text}");
        assert!(text.contains("if (!bibProcessor.hasOption(name)) {"), "{text}");
    }

    #[test]
    fn emits_run_steps_in_command_order() {
        let text = generate_source(
            "FUNCTION {begin}{ \"p\" write$ } READ EXECUTE {begin} SORT",
        );
        // Inspect only the run() body; the method definitions above it
        // also mention these names.
        let run = text.split("void run() {").nth(1).expect("run body");
        let read = run.find("// entry data is read").expect("read comment");
        let begin = run.find("begin()").expect("execute call");
        let sort = run.find("bibDB.sort()").expect("sort call");
        assert!(read < begin && begin < sort);
    }

    #[test]
    fn emits_the_type_dispatch_for_call_type() {
        let text = generate_source(
            "FUNCTION {article}{ cite$ write$ } \
             FUNCTION {default.type}{ cite$ write$ } \
             ITERATE {call.type$}",
        );
        assert!(text.contains("('article'): this.&article,"), "{text}");
        assert!(text.contains("('default.type'): this.&defaultType,"), "{text}");
        assert!(text.contains("void callType(Entry entry) {"), "{text}");
        assert!(text.contains("bibDB.each { entry ->"), "{text}");
        assert!(text.contains("callType(entry)"), "{text}");
    }

    #[test]
    fn reverse_iterates_backwards_with_the_entry() {
        let text = generate_source(
            "FUNCTION {show}{ cite$ write$ } REVERSE {show}",
        );
        assert!(text.contains("bibDB.reverseEach { entry ->"), "{text}");
        assert!(text.contains("show(entry)"), "{text}");
    }

    #[test]
    fn entry_locals_render_get_and_set_accessors() {
        let text = generate_source(
            "ENTRY {}{count}{label} \
             FUNCTION {note}{ count #1 + 'count := label 'label := }",
        );
        assert!(
            text.contains("entry.setLocalInt('count', (entry.getLocalInt('count') + 1))"),
            "{text}"
        );
        assert!(
            text.contains("entry.setLocalString('label', entry.getLocalString('label'))"),
            "{text}"
        );
    }

    #[test]
    fn imports_are_sorted_and_deduplicated() {
        let text = generate_source(
            "FUNCTION {f}{ \"s\" purify$ \"t\" purify$ * write$ }",
        );
        assert_eq!(text.matches("import bib.support.Purify").count(), 1);
        let db = text.find("import bib.runtime.DB").expect("framework import");
        let purify = text.find("import bib.support.Purify").expect("support import");
        assert!(db < purify);
    }
}
