//! Compiler orchestration: source text in, Groovy text out.

use crate::codegen;
use crate::error::CompileError;
use crate::interp;
use crate::optimizer;
use crate::parser;
use crate::resolver::Resolver;

/// Compile style source into a Groovy class named `class_name`.
///
/// The translation is deterministic: identical inputs yield
/// byte-identical output.
pub fn compile_style(
    source: &str,
    class_name: &str,
    optimizing: bool,
) -> Result<String, CompileError> {
    let declarations = parser::parse(source)?;
    let mut unit = interp::build_ir(&declarations, class_name)?;
    if optimizing {
        optimizer::optimize(&mut unit);
    }
    Ok(codegen::generate(&unit))
}

/// Resolve `style` through `resolver` and compile it.
pub fn compile(
    resolver: &dyn Resolver,
    style: &str,
    class_name: &str,
    optimizing: bool,
) -> Result<String, CompileError> {
    let source = resolver.find(style).map_err(|_| CompileError::Resource {
        name: style.to_string(),
    })?;
    compile_style(&source, class_name, optimizing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::DirResolver;
    use std::fs;

    const SMALL_STYLE: &str = "\
        ENTRY {author title}{}{label} \
        INTEGERS {count} \
        STRINGS {out} \
        FUNCTION {emit}{ out write$ newline$ } \
        FUNCTION {article}{ title \"t\" change.case$ 'out := emit count #1 + 'count := } \
        FUNCTION {default.type}{ cite$ 'out := emit } \
        READ \
        ITERATE {call.type$} \
        SORT \
        REVERSE {call.type$} \
        EXECUTE {emit}";

    #[test]
    fn compiles_a_small_style_end_to_end() {
        let text = compile_style(SMALL_STYLE, "Plain", true).expect("compile");
        assert!(text.starts_with("import bib.runtime.DB\n"), "{text}");
        assert!(text.contains("class Plain {"), "{text}");
        assert!(text.contains("import bib.support.ChangeCase"), "{text}");
        assert!(text.contains("int count = 0"), "{text}");
        assert!(text.contains("String out = ''"), "{text}");
        assert!(text.contains("void callType(Entry entry) {"), "{text}");
        assert!(text.contains("void run() {"), "{text}");
        assert!(text.ends_with("}\n"), "{text}");
    }

    #[test]
    fn output_is_deterministic() {
        let first = compile_style(SMALL_STYLE, "Plain", true).expect("compile");
        let second = compile_style(SMALL_STYLE, "Plain", true).expect("compile");
        assert_eq!(first, second);
    }

    #[test]
    fn disabling_the_optimizer_keeps_discarded_values() {
        let source = "FUNCTION {f}{ #1 pop$ } EXECUTE {f}";
        let optimized = compile_style(source, "Style", true).expect("compile");
        let plain = compile_style(source, "Style", false).expect("compile");
        assert!(optimized.contains("void f() {\n  }"), "{optimized}");
        assert!(plain.contains("void f() {\n    1\n  }"), "{plain}");
    }

    #[test]
    fn surfaces_front_end_errors() {
        let err = compile_style("FUNCTION {f}{ nonesuch }", "Style", true).expect_err("unknown");
        assert_eq!(
            err,
            CompileError::UnknownIdentifier {
                name: "nonesuch".to_string()
            }
        );
    }

    #[test]
    fn compiles_through_a_resolver() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("tiny.bst"), "EXECUTE {newline$}").expect("write");
        let resolver = DirResolver::new(vec![dir.path().to_path_buf()]);

        let text = compile(&resolver, "tiny", "Tiny", true).expect("compile");
        assert!(text.contains("class Tiny {"), "{text}");
        assert!(text.contains("bibWriter.println()"), "{text}");
    }

    #[test]
    fn missing_styles_become_resource_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = DirResolver::new(vec![dir.path().to_path_buf()]);
        let err = compile(&resolver, "nonesuch", "Style", true).expect_err("missing");
        assert_eq!(
            err,
            CompileError::Resource {
                name: "nonesuch".to_string()
            }
        );
    }
}
