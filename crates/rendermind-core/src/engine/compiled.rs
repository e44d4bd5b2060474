//! Compilation and entry-point contract checks.

use rhai::{Engine, Stmt, AST};

use crate::domain::ENTRY_POINT;

use super::error::ExecutionError;

/// A parsed script that exposes exactly one `rendermind_action(context)`.
pub struct CompiledScript {
    ast: AST,
}

impl CompiledScript {
    /// Parse `source` and check the entry-point contract.
    pub fn compile(engine: &Engine, source: &str) -> Result<Self, ExecutionError> {
        let ast = engine
            .compile(source)
            .map_err(|e| ExecutionError::Contract(format!("script does not compile: {e}")))?;
        check_entry_point(&ast)?;
        check_top_level(&ast)?;
        Ok(Self { ast })
    }

    pub fn ast(&self) -> &AST {
        &self.ast
    }
}

fn check_entry_point(ast: &AST) -> Result<(), ExecutionError> {
    let arities: Vec<usize> = ast
        .iter_functions()
        .filter(|f| f.name == ENTRY_POINT)
        .map(|f| f.params.len())
        .collect();
    match arities.as_slice() {
        [1] => Ok(()),
        [] => Err(ExecutionError::Contract(format!(
            "no `{ENTRY_POINT}(context)` function defined"
        ))),
        [n] => Err(ExecutionError::Contract(format!(
            "`{ENTRY_POINT}` must take exactly one argument, found {n}"
        ))),
        many => Err(ExecutionError::Contract(format!(
            "`{ENTRY_POINT}` defined {} times; expected exactly one",
            many.len()
        ))),
    }
}

/// Calling the entry point evaluates the top level first, so only imports
/// may live there.
fn check_top_level(ast: &AST) -> Result<(), ExecutionError> {
    let stray = ast
        .statements()
        .iter()
        .find(|stmt| !matches!(stmt, Stmt::Import(..) | Stmt::Noop(..)));
    match stray {
        None => Ok(()),
        Some(stmt) => Err(ExecutionError::Contract(format!(
            "only imports may appear outside `{ENTRY_POINT}` (line {})",
            stmt.position().line().unwrap_or_default()
        ))),
    }
}
