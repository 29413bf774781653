//! Folding ranges and selection ranges.

use crate::ast::{Block, CaseBranch, Module, Stmt};
use crate::lexer::{Position, Span};
use crate::resolver::ResolvedProgram;

use super::support::{module_for_file, name_span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldingRange {
    pub start_line: usize,
    pub end_line: usize,
}

/// One region per routine, record, test, module, and each block-bearing
/// control structure.
pub fn folding_ranges(program: &ResolvedProgram, file: &str) -> Vec<FoldingRange> {
    let Some(module) = module_for_file(program, file) else {
        return Vec::new();
    };

    let mut ranges = vec![FoldingRange {
        start_line: module.position.line,
        end_line: module.end_line,
    }];

    for t in &module.types {
        if matches!(t.body, crate::ast::TypeBody::Record(_)) {
            ranges.push(FoldingRange {
                start_line: t.position.line,
                end_line: t.end_line,
            });
        }
    }

    for r in &module.routines {
        ranges.push(FoldingRange {
            start_line: r.position.line,
            end_line: r.end_line,
        });
        if let Some(body) = &r.body {
            fold_block(body, &mut ranges);
        }
    }

    for test in &module.tests {
        ranges.push(FoldingRange {
            start_line: test.position.line,
            end_line: test.end_line,
        });
        fold_block(&test.body, &mut ranges);
    }

    if let Some(body) = &module.entry_body {
        fold_block(body, &mut ranges);
    }

    ranges.retain(|r| r.end_line > r.start_line);
    ranges
}

fn fold_block(block: &Block, out: &mut Vec<FoldingRange>) {
    for stmt in &block.statements {
        fold_stmt(stmt, out);
    }
}

fn fold_stmt(stmt: &Stmt, out: &mut Vec<FoldingRange>) {
    if let Some(end_line) = stmt.end_line() {
        out.push(FoldingRange {
            start_line: stmt.position().line,
            end_line,
        });
    }

    match stmt {
        Stmt::Block(b) => fold_block(b, out),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            fold_block(then_branch, out);
            if let Some(e) = else_branch {
                fold_block(e, out);
            }
        }
        Stmt::While { body, .. } | Stmt::Repeat { body, .. } => fold_block(body, out),
        Stmt::For { body, .. } => fold_block(body, out),
        Stmt::Case {
            branches,
            else_branch,
            ..
        } => {
            for branch in branches {
                fold_case_branch(branch, out);
            }
            if let Some(e) = else_branch {
                fold_block(e, out);
            }
        }
        Stmt::Try {
            body,
            except,
            finally,
            ..
        } => {
            fold_block(body, out);
            if let Some(e) = except {
                fold_block(e, out);
            }
            if let Some(f) = finally {
                fold_block(f, out);
            }
        }
        Stmt::Assignment { .. }
        | Stmt::Return { .. }
        | Stmt::New { .. }
        | Stmt::Dispose { .. }
        | Stmt::SetLength { .. }
        | Stmt::Expr(_) => {}
    }
}

fn fold_case_branch(branch: &CaseBranch, out: &mut Vec<FoldingRange>) {
    fold_block(&branch.body, out);
}

/// A node's enclosing range together with its immediate parent, outermost
/// first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRange {
    pub range: Span,
    /// The next range inward; `None` at the innermost node.
    pub inner: Option<Box<SelectionRange>>,
}

pub fn selection_range(program: &ResolvedProgram, file: &str, position: Position) -> Option<SelectionRange> {
    let module = module_for_file(program, file)?;
    let mut chain = vec![full_span(module.position, module.end_line)];
    collect_enclosing(module, position, &mut chain);

    if let Some(id) = super::support::symbol_at_position(program, file, position) {
        let sym = program.symbols.get(id);
        chain.push(name_span(position, sym.name.chars().count().max(1)));
    }

    build_chain(&mut chain)
}

fn full_span(position: Position, end_line: usize) -> Span {
    Span::new(position, Position::new(end_line, 1))
}

fn contains(position: Position, start_line: usize, end_line: usize) -> bool {
    position.line >= start_line && position.line <= end_line
}

fn collect_enclosing(module: &Module, position: Position, chain: &mut Vec<Span>) {
    for t in &module.types {
        if contains(position, t.position.line, t.end_line) {
            chain.push(full_span(t.position, t.end_line));
        }
    }
    for r in &module.routines {
        if contains(position, r.position.line, r.end_line) {
            chain.push(full_span(r.position, r.end_line));
            if let Some(body) = &r.body {
                collect_block(body, position, chain);
            }
        }
    }
    for test in &module.tests {
        if contains(position, test.position.line, test.end_line) {
            chain.push(full_span(test.position, test.end_line));
            collect_block(&test.body, position, chain);
        }
    }
    if let Some(body) = &module.entry_body {
        if contains(position, body.position.line, body.end_line) {
            collect_block(body, position, chain);
        }
    }
}

fn collect_block(block: &Block, position: Position, chain: &mut Vec<Span>) {
    for stmt in &block.statements {
        let Some(end_line) = stmt.end_line() else { continue };
        if !contains(position, stmt.position().line, end_line) {
            continue;
        }
        chain.push(full_span(stmt.position(), end_line));
        match stmt {
            Stmt::Block(b) => collect_block(b, position, chain),
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_block(then_branch, position, chain);
                if let Some(e) = else_branch {
                    collect_block(e, position, chain);
                }
            }
            Stmt::While { body, .. } | Stmt::Repeat { body, .. } | Stmt::For { body, .. } => {
                collect_block(body, position, chain);
            }
            Stmt::Case {
                branches,
                else_branch,
                ..
            } => {
                for branch in branches {
                    collect_block(&branch.body, position, chain);
                }
                if let Some(e) = else_branch {
                    collect_block(e, position, chain);
                }
            }
            Stmt::Try {
                body,
                except,
                finally,
                ..
            } => {
                collect_block(body, position, chain);
                if let Some(e) = except {
                    collect_block(e, position, chain);
                }
                if let Some(f) = finally {
                    collect_block(f, position, chain);
                }
            }
            _ => {}
        }
    }
}

/// `spans` arrives outermost-first (module, then each enclosing node in
/// descent order, innermost last). Builds the linked list head-first from
/// the outermost span, each node's `inner` pointing one level further in
///.
fn build_chain(spans: &mut Vec<Span>) -> Option<SelectionRange> {
    let innermost = spans.pop()?;
    let mut node = SelectionRange {
        range: innermost,
        inner: None,
    };
    while let Some(span) = spans.pop() {
        node = SelectionRange {
            range: span,
            inner: Some(Box::new(node)),
        };
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::support::fixtures;

    const SOURCE: &str = "module exe Main;\n\
routine Add(const a: Integer; const b: Integer): Integer;\n\
begin\n\
  if a > b then\n\
  begin\n\
    return a;\n\
  end\n\
  else\n\
  begin\n\
    return b;\n\
  end\n\
end\n\
begin\n\
end\n";

    #[test]
    fn folding_ranges_are_well_formed() {
        let (program, main) = fixtures::build(SOURCE);
        let ranges = folding_ranges(&program, &main);
        assert!(!ranges.is_empty());
        for r in &ranges {
            assert!(r.end_line > r.start_line);
        }
    }

    #[test]
    fn single_line_record_yields_no_degenerate_range() {
        let src = "module exe M;\ntype T = record X: Integer; end;\nbegin\nend\n";
        let (program, main) = fixtures::build(src);
        let ranges = folding_ranges(&program, &main);
        for r in &ranges {
            assert!(r.end_line > r.start_line, "degenerate range at line {}", r.start_line);
        }
    }

    #[test]
    fn selection_range_expands_from_innermost_to_outermost() {
        let (program, main) = fixtures::build(SOURCE);
        let chain = selection_range(&program, &main, Position::new(6, 12)).unwrap();
        // Outermost first: the module range must contain every inner one.
        let mut current = &chain;
        let mut lines = Vec::new();
        loop {
            lines.push((current.range.start.line, current.range.end.line));
            match &current.inner {
                Some(inner) => current = inner,
                None => break,
            }
        }
        for pair in lines.windows(2) {
            assert!(pair[0].0 <= pair[1].0 && pair[0].1 >= pair[1].1);
        }
    }
}
