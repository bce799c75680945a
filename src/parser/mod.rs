//! Parser module for scripts
//!
//! Lexical analysis and recursive descent parsing of script source into the
//! expression and statement trees of [`crate::ast`].

pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;

pub use error::ParseError;
pub use lexer::Lexer;
pub use parser::Parser;
pub use span::{HasSpan, Location, Span};

use crate::ast::{Expr, Script};
use crate::common::error::Result;

/// Parse a script source into its tree
pub fn parse_script(source: &str) -> Result<Script> {
    let script = parser::parse(source)?;
    log::debug!("parsed {} imports and {} statements", script.imports.len(), script.body.stmts.len());
    Ok(script)
}

/// Parse a single expression, used by tools and tests
pub fn parse_expression(source: &str) -> Result<Expr> {
    Ok(Parser::new(source)?.parse_standalone_expression()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StmtKind;
    use crate::common::Error;

    #[test]
    fn test_parse_simple_script() {
        let source = r#"
import java.io.IOException;

int total = 0;
for (int i = 0; i < 10; i++) {
    total += i;
}
return total;
"#;
        let script = parse_script(source).expect("Failed to parse");
        assert_eq!(script.imports.len(), 1);
        assert_eq!(script.body.stmts.len(), 3);
        assert!(matches!(script.body.stmts[2].kind, StmtKind::Return(Some(_))));
    }

    #[test]
    fn test_parse_error_location() {
        let err = parse_script("int x = ;").unwrap_err();
        match err {
            Error::Parse { line, column, .. } => assert_eq!((line, column), (1, 9)),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_recovers_at_next_statement() {
        let err = parse_script("int x = ;\nint y = 2;\nwhile (y < ) { y++; }\nProbe.hit(y);").unwrap_err();
        let Error::ParseErrors(list) = err else {
            panic!("expected several parse errors, got {:?}", err);
        };
        let lines: Vec<usize> = list
            .iter()
            .map(|e| match e {
                Error::Parse { line, .. } => *line,
                other => panic!("unexpected error {:?}", other),
            })
            .collect();
        assert_eq!(lines, vec![1, 3]);
    }

    #[test]
    fn test_recovery_inside_nested_blocks() {
        let err = parse_script("if (true) { int a = ; a = 1; }\nswitch (1) { case 1: foo(; break; }").unwrap_err();
        assert!(matches!(&err, Error::ParseErrors(list) if list.len() == 2), "{:?}", err);
    }

    #[test]
    fn test_import_alias() {
        let script = parse_script("import java.util.List as Seq; Seq s = null;").expect("Failed to parse");
        assert_eq!(script.imports[0].name, "java.util.List");
        assert_eq!(script.imports[0].alias.as_deref(), Some("Seq"));
        assert!(parse_script("import java.util.* as U;").is_err());
        // `as` is still an ordinary name
        assert!(parse_script("int as = 1; as++;").is_ok());
    }

    #[test]
    fn test_lexical_error() {
        assert!(matches!(parse_script("int x = #;"), Err(Error::Lexical { .. })));
    }
}
