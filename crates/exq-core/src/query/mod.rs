//! Compiled intermediate form of a pattern.
//!
//! `QueryNode` mirrors the Go node taxonomy with one variant per modeled
//! kind; rendering to a tree-sitter query fragment is a single recursive
//! writer dispatching over the variants. Unmodeled kinds degrade to
//! [`QueryNode::Unknown`], which renders a tagged placeholder instead of
//! failing.
//!
//! Every `#eq?` predicate binds a capture name unique within the rendered
//! pattern (`@name0`, `@field1`, ...). The query engine evaluates same-named
//! captures conjunctively across one pattern, so reusing a capture name for
//! two different expected texts would make the pattern unmatchable.

use std::fmt;

mod build;

pub use build::{build_node, PatternContext, WILDCARD_PREFIX};

/// Capture name appended to every compiled query so execution can identify
/// the matched node.
pub const ROOT_CAPTURE: &str = "x";

/// One compiled pattern node. Children are compiled eagerly, top-down; the
/// tree is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    // -------- Expressions --------
    Ident {
        name: String,
        wildcard: bool,
    },
    BasicLit {
        value: String,
    },
    Bool {
        value: bool,
    },
    Call {
        fun: Box<QueryNode>,
    },
    Selector {
        operand: Box<QueryNode>,
        field: String,
    },
    Binary {
        left: Box<QueryNode>,
        op: String,
        right: Box<QueryNode>,
    },
    Composite {
        typ: Option<Box<QueryNode>>,
        elements: Vec<QueryNode>,
    },
    FuncLit {
        typ: Option<Box<QueryNode>>,
    },

    // -------- Types --------
    ArrayType {
        length: Option<Box<QueryNode>>,
        element: Option<Box<QueryNode>>,
    },
    MapType {
        key: Option<Box<QueryNode>>,
        value: Option<Box<QueryNode>>,
    },
    ChanType {
        value: Option<Box<QueryNode>>,
    },
    StructType {
        fields: Option<Box<QueryNode>>,
    },
    FuncType {
        params: Option<Box<QueryNode>>,
        results: Option<Box<QueryNode>>,
    },

    // -------- Declarations and specs --------
    Field {
        names: Vec<QueryNode>,
        typ: Option<Box<QueryNode>>,
        tag: Option<Box<QueryNode>>,
    },
    FieldList {
        fields: Vec<QueryNode>,
    },
    GenDecl {
        specs: Vec<QueryNode>,
    },
    TypeSpec {
        name: Option<Box<QueryNode>>,
        typ: Option<Box<QueryNode>>,
    },
    ValueSpec {
        names: Vec<QueryNode>,
        typ: Option<Box<QueryNode>>,
        values: Vec<QueryNode>,
    },
    FuncDecl {
        name: Option<Box<QueryNode>>,
        params: Option<Box<QueryNode>>,
        results: Option<Box<QueryNode>>,
        body: Option<Box<QueryNode>>,
    },
    Package {
        name: String,
    },

    // -------- Statements --------
    Block {
        stmts: Vec<QueryNode>,
    },
    If {
        init: Option<Box<QueryNode>>,
        cond: Option<Box<QueryNode>>,
        cons: Option<Box<QueryNode>>,
        alt: Option<Box<QueryNode>>,
    },
    Range {
        key: Option<Box<QueryNode>>,
        value: Option<Box<QueryNode>>,
        expr: Option<Box<QueryNode>>,
        body: Option<Box<QueryNode>>,
    },
    Switch {
        init: Option<Box<QueryNode>>,
        value: Option<Box<QueryNode>>,
        body: Option<Box<QueryNode>>,
    },
    TypeSwitch {
        init: Option<Box<QueryNode>>,
        assign: Option<Box<QueryNode>>,
        body: Option<Box<QueryNode>>,
    },
    Select {
        body: Option<Box<QueryNode>>,
    },
    Send {
        channel: Option<Box<QueryNode>>,
        value: Option<Box<QueryNode>>,
    },
    Branch {
        label: Option<Box<QueryNode>>,
    },
    Labeled {
        label: Option<Box<QueryNode>>,
        stmt: Option<Box<QueryNode>>,
    },
    Defer {
        call: Box<QueryNode>,
    },
    Go {
        call: Box<QueryNode>,
    },
    IncDec {
        expr: Box<QueryNode>,
    },
    Return {
        results: Vec<QueryNode>,
    },
    Assign {
        left: Vec<QueryNode>,
        right: Vec<QueryNode>,
    },

    // -------- Fallback --------
    Unknown {
        kind: String,
    },
}

/// Top-level compilation entry point: render the node and append the root
/// capture label.
pub fn compile_query(node: &QueryNode) -> String {
    format!("{node} @{ROOT_CAPTURE}")
}

/// Instance-scoped counter handing out pattern-unique capture names.
#[derive(Debug, Default)]
struct CaptureCounter(usize);

impl CaptureCounter {
    fn next(&mut self, prefix: &str) -> String {
        let name = format!("{prefix}{}", self.0);
        self.0 += 1;
        name
    }
}

fn write_eq(
    f: &mut fmt::Formatter<'_>,
    caps: &mut CaptureCounter,
    prefix: &str,
    text: &str,
) -> fmt::Result {
    let cap = caps.next(prefix);
    write!(f, "@{cap} (#eq? @{cap} \"{text}\")")
}

fn write_list(
    f: &mut fmt::Formatter<'_>,
    caps: &mut CaptureCounter,
    items: &[QueryNode],
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        item.write_query(f, caps)?;
    }
    Ok(())
}

fn write_comma_list(
    f: &mut fmt::Formatter<'_>,
    caps: &mut CaptureCounter,
    items: &[QueryNode],
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        item.write_query(f, caps)?;
    }
    Ok(())
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_query(f, &mut CaptureCounter::default())
    }
}

impl QueryNode {
    fn write_query(&self, f: &mut fmt::Formatter<'_>, caps: &mut CaptureCounter) -> fmt::Result {
        match self {
            QueryNode::Ident { name, wildcard } => {
                if *wildcard {
                    write!(f, "(identifier)")
                } else {
                    write!(f, "(identifier) ")?;
                    write_eq(f, caps, "name", name)
                }
            }
            QueryNode::BasicLit { value } => {
                write!(f, "(literal) ")?;
                write_eq(f, caps, "value", value)
            }
            QueryNode::Bool { value } => {
                if *value {
                    write!(f, "(true)")
                } else {
                    write!(f, "(false)")
                }
            }
            QueryNode::Call { fun } => {
                // Arguments are matched as present but unconstrained; only
                // the callee is compiled precisely.
                write!(f, "(call_expression function: ")?;
                fun.write_query(f, caps)?;
                write!(f, " arguments: (argument_list))")
            }
            QueryNode::Selector { operand, field } => {
                write!(f, "(selector_expression operand: ")?;
                operand.write_query(f, caps)?;
                write!(f, " field: (field_identifier) ")?;
                write_eq(f, caps, "field", field)?;
                write!(f, ")")
            }
            QueryNode::Binary { left, op, right } => {
                write!(f, "(binary_expression left: ")?;
                left.write_query(f, caps)?;
                write!(f, " operator: \"{op}\" right: ")?;
                right.write_query(f, caps)?;
                write!(f, ")")
            }
            QueryNode::Composite { typ, elements } => {
                write!(f, "(composite_literal")?;
                if let Some(typ) = typ {
                    write!(f, " type: ")?;
                    typ.write_query(f, caps)?;
                }
                if !elements.is_empty() {
                    write!(f, " elements: (")?;
                    write_list(f, caps, elements)?;
                    write!(f, ")")?;
                }
                write!(f, ")")
            }
            QueryNode::FuncLit { typ } => {
                write!(f, "(function_literal")?;
                if let Some(typ) = typ {
                    write!(f, " type: ")?;
                    typ.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::ArrayType { length, element } => {
                write!(f, "(array_type")?;
                if let Some(length) = length {
                    write!(f, " length: ")?;
                    length.write_query(f, caps)?;
                }
                if let Some(element) = element {
                    write!(f, " element: ")?;
                    element.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::MapType { key, value } => {
                write!(f, "(map_type")?;
                if let Some(key) = key {
                    write!(f, " key: ")?;
                    key.write_query(f, caps)?;
                }
                if let Some(value) = value {
                    write!(f, " value: ")?;
                    value.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::ChanType { value } => {
                write!(f, "(channel_type")?;
                if let Some(value) = value {
                    write!(f, " value: ")?;
                    value.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::StructType { fields } => {
                write!(f, "(struct_type")?;
                if let Some(fields) = fields {
                    write!(f, " fields: ")?;
                    fields.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::FuncType { params, results } => {
                write!(f, "(function_type")?;
                if let Some(params) = params {
                    write!(f, " parameters: ")?;
                    params.write_query(f, caps)?;
                }
                if let Some(results) = results {
                    write!(f, " results: ")?;
                    results.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::Field { names, typ, tag } => {
                write!(f, "(field_declaration")?;
                if !names.is_empty() {
                    write!(f, " names: (")?;
                    write_list(f, caps, names)?;
                    write!(f, ")")?;
                }
                if let Some(typ) = typ {
                    write!(f, " type: ")?;
                    typ.write_query(f, caps)?;
                }
                if let Some(tag) = tag {
                    write!(f, " tag: ")?;
                    tag.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::FieldList { fields } => {
                write!(f, "(field_list")?;
                for field in fields {
                    write!(f, " ")?;
                    field.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::GenDecl { specs } => {
                write!(f, "(generic_declaration ")?;
                write_list(f, caps, specs)?;
                write!(f, ")")
            }
            QueryNode::TypeSpec { name, typ } => {
                write!(f, "(type_spec")?;
                if let Some(name) = name {
                    write!(f, " name: ")?;
                    name.write_query(f, caps)?;
                }
                if let Some(typ) = typ {
                    write!(f, " type: ")?;
                    typ.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::ValueSpec { names, typ, values } => {
                write!(f, "(value_spec")?;
                if !names.is_empty() {
                    write!(f, " names: (")?;
                    write_list(f, caps, names)?;
                    write!(f, ")")?;
                }
                if let Some(typ) = typ {
                    write!(f, " type: ")?;
                    typ.write_query(f, caps)?;
                }
                if !values.is_empty() {
                    write!(f, " values: (")?;
                    write_list(f, caps, values)?;
                    write!(f, ")")?;
                }
                write!(f, ")")
            }
            QueryNode::FuncDecl {
                name,
                params,
                results,
                body,
            } => {
                write!(f, "(function_declaration")?;
                if let Some(name) = name {
                    write!(f, " name: ")?;
                    name.write_query(f, caps)?;
                }
                if let Some(params) = params {
                    write!(f, " parameters: ")?;
                    params.write_query(f, caps)?;
                }
                if let Some(results) = results {
                    write!(f, " results: ")?;
                    results.write_query(f, caps)?;
                }
                if let Some(body) = body {
                    write!(f, " body: ")?;
                    // A body that is exactly one return statement is emitted
                    // without the block wrapper to keep queries short.
                    match body.as_ref() {
                        QueryNode::Block { stmts }
                            if stmts.len() == 1
                                && matches!(stmts[0], QueryNode::Return { .. }) =>
                        {
                            stmts[0].write_query(f, caps)?;
                        }
                        other => {
                            write!(f, "(block")?;
                            if let QueryNode::Block { stmts } = other {
                                for stmt in stmts {
                                    write!(f, " ")?;
                                    stmt.write_query(f, caps)?;
                                }
                            } else {
                                write!(f, " ")?;
                                other.write_query(f, caps)?;
                            }
                            write!(f, ")")?;
                        }
                    }
                }
                write!(f, ")")
            }
            QueryNode::Package { name } => {
                write!(f, "(source_file package_name: (identifier) ")?;
                write_eq(f, caps, "name", name)?;
                write!(f, ")")
            }
            QueryNode::Block { stmts } => {
                write!(f, "(block")?;
                for stmt in stmts {
                    write!(f, " ")?;
                    stmt.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::If {
                init,
                cond,
                cons,
                alt,
            } => {
                write!(f, "(if_statement")?;
                if let Some(init) = init {
                    write!(f, " initializer: ")?;
                    init.write_query(f, caps)?;
                }
                if let Some(cond) = cond {
                    write!(f, " condition: ")?;
                    cond.write_query(f, caps)?;
                }
                if let Some(cons) = cons {
                    write!(f, " consequence: ")?;
                    cons.write_query(f, caps)?;
                }
                if let Some(alt) = alt {
                    write!(f, " alternative: ")?;
                    alt.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::Range {
                key,
                value,
                expr,
                body,
            } => {
                write!(f, "(range_statement")?;
                if let Some(key) = key {
                    write!(f, " key: ")?;
                    key.write_query(f, caps)?;
                }
                if let Some(value) = value {
                    write!(f, " value: ")?;
                    value.write_query(f, caps)?;
                }
                if let Some(expr) = expr {
                    write!(f, " expression: ")?;
                    expr.write_query(f, caps)?;
                }
                if let Some(body) = body {
                    write!(f, " body: ")?;
                    body.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::Switch { init, value, body } => {
                write!(f, "(switch_statement")?;
                if let Some(init) = init {
                    write!(f, " initializer: ")?;
                    init.write_query(f, caps)?;
                }
                if let Some(value) = value {
                    write!(f, " value: ")?;
                    value.write_query(f, caps)?;
                }
                if let Some(body) = body {
                    write!(f, " body: ")?;
                    body.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::TypeSwitch { init, assign, body } => {
                write!(f, "(type_switch_statement")?;
                if let Some(init) = init {
                    write!(f, " initializer: ")?;
                    init.write_query(f, caps)?;
                }
                if let Some(assign) = assign {
                    write!(f, " assign: ")?;
                    assign.write_query(f, caps)?;
                }
                if let Some(body) = body {
                    write!(f, " body: ")?;
                    body.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::Select { body } => {
                write!(f, "(select_statement")?;
                if let Some(body) = body {
                    write!(f, " body: ")?;
                    body.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::Send { channel, value } => {
                write!(f, "(send_statement")?;
                if let Some(channel) = channel {
                    write!(f, " channel: ")?;
                    channel.write_query(f, caps)?;
                }
                if let Some(value) = value {
                    write!(f, " value: ")?;
                    value.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::Branch { label } => {
                write!(f, "(branch_statement")?;
                if let Some(label) = label {
                    write!(f, " label: ")?;
                    label.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::Labeled { label, stmt } => {
                write!(f, "(labeled_statement")?;
                if let Some(label) = label {
                    write!(f, " label: ")?;
                    label.write_query(f, caps)?;
                }
                if let Some(stmt) = stmt {
                    write!(f, " statement: ")?;
                    stmt.write_query(f, caps)?;
                }
                write!(f, ")")
            }
            QueryNode::Defer { call } => {
                write!(f, "(defer_statement expression: ")?;
                call.write_query(f, caps)?;
                write!(f, ")")
            }
            QueryNode::Go { call } => {
                write!(f, "(go_statement expression: ")?;
                call.write_query(f, caps)?;
                write!(f, ")")
            }
            QueryNode::IncDec { expr } => {
                write!(f, "(inc_dec_statement expression: ")?;
                expr.write_query(f, caps)?;
                write!(f, ")")
            }
            QueryNode::Return { results } => {
                write!(f, "(return_statement")?;
                if !results.is_empty() {
                    write!(f, " (expression_list ")?;
                    for (i, result) in results.iter().enumerate() {
                        if i > 0 {
                            write!(f, " ")?;
                        }
                        // Returned identifiers bind to a value capture;
                        // booleans render as literal fragments.
                        match result {
                            QueryNode::Ident { name, .. } if name == "true" => {
                                write!(f, "(true)")?;
                            }
                            QueryNode::Ident { name, .. } => {
                                write!(f, "(identifier) ")?;
                                write_eq(f, caps, "value", name)?;
                            }
                            other => other.write_query(f, caps)?,
                        }
                    }
                    write!(f, ")")?;
                }
                write!(f, ")")
            }
            QueryNode::Assign { left, right } => {
                write!(f, "(assignment_expression left: ")?;
                write_comma_list(f, caps, left)?;
                write!(f, " right: ")?;
                write_comma_list(f, caps, right)?;
                write!(f, ")")
            }
            QueryNode::Unknown { kind } => {
                write!(f, "({kind})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> QueryNode {
        QueryNode::Ident {
            name: name.to_string(),
            wildcard: false,
        }
    }

    #[test]
    fn test_ident_render() {
        assert_eq!(
            ident("foo").to_string(),
            r#"(identifier) @name0 (#eq? @name0 "foo")"#
        );
        let wild = QueryNode::Ident {
            name: "foo".to_string(),
            wildcard: true,
        };
        assert_eq!(wild.to_string(), "(identifier)");
    }

    #[test]
    fn test_call_arguments_unconstrained() {
        let call = QueryNode::Call {
            fun: Box::new(ident("f")),
        };
        assert_eq!(
            call.to_string(),
            r#"(call_expression function: (identifier) @name0 (#eq? @name0 "f") arguments: (argument_list))"#
        );
    }

    #[test]
    fn test_selector_render() {
        let sel = QueryNode::Selector {
            operand: Box::new(ident("e")),
            field: "Inst".to_string(),
        };
        assert_eq!(
            sel.to_string(),
            r#"(selector_expression operand: (identifier) @name0 (#eq? @name0 "e") field: (field_identifier) @field1 (#eq? @field1 "Inst"))"#
        );
    }

    #[test]
    fn test_binary_render() {
        let bin = QueryNode::Binary {
            left: Box::new(ident("x")),
            op: ">=".to_string(),
            right: Box::new(QueryNode::BasicLit {
                value: "10".to_string(),
            }),
        };
        assert_eq!(
            bin.to_string(),
            r#"(binary_expression left: (identifier) @name0 (#eq? @name0 "x") operator: ">=" right: (literal) @value1 (#eq? @value1 "10"))"#
        );
    }

    #[test]
    fn test_capture_names_unique_per_pattern() {
        // Two identifiers with different spellings must not share a capture
        // name: same-named captures are checked conjunctively across the
        // whole pattern, so a shared name could never satisfy both
        // predicates.
        let bin = QueryNode::Binary {
            left: Box::new(ident("a")),
            op: "+".to_string(),
            right: Box::new(ident("b")),
        };
        assert_eq!(
            bin.to_string(),
            r#"(binary_expression left: (identifier) @name0 (#eq? @name0 "a") operator: "+" right: (identifier) @name1 (#eq? @name1 "b"))"#
        );
    }

    #[test]
    fn test_return_bare_and_boolean() {
        let bare = QueryNode::Return { results: vec![] };
        assert_eq!(bare.to_string(), "(return_statement)");

        let boolean = QueryNode::Return {
            results: vec![QueryNode::Bool { value: true }],
        };
        assert_eq!(boolean.to_string(), "(return_statement (expression_list (true)))");
    }

    #[test]
    fn test_return_identifier_uses_value_capture() {
        let ret = QueryNode::Return {
            results: vec![ident("err")],
        };
        assert_eq!(
            ret.to_string(),
            r#"(return_statement (expression_list (identifier) @value0 (#eq? @value0 "err")))"#
        );
    }

    #[test]
    fn test_func_decl_single_return_unwraps_block() {
        let decl = QueryNode::FuncDecl {
            name: Some(Box::new(ident("Example"))),
            params: None,
            results: None,
            body: Some(Box::new(QueryNode::Block {
                stmts: vec![QueryNode::Return { results: vec![] }],
            })),
        };
        assert_eq!(
            decl.to_string(),
            r#"(function_declaration name: (identifier) @name0 (#eq? @name0 "Example") body: (return_statement))"#
        );
    }

    #[test]
    fn test_func_decl_single_non_return_keeps_block() {
        let decl = QueryNode::FuncDecl {
            name: Some(Box::new(ident("Example"))),
            params: None,
            results: None,
            body: Some(Box::new(QueryNode::Block {
                stmts: vec![QueryNode::IncDec {
                    expr: Box::new(ident("n")),
                }],
            })),
        };
        assert_eq!(
            decl.to_string(),
            r#"(function_declaration name: (identifier) @name0 (#eq? @name0 "Example") body: (block (inc_dec_statement expression: (identifier) @name1 (#eq? @name1 "n"))))"#
        );
    }

    #[test]
    fn test_func_decl_multi_statement_body_keeps_block() {
        let decl = QueryNode::FuncDecl {
            name: Some(Box::new(ident("Example"))),
            params: None,
            results: None,
            body: Some(Box::new(QueryNode::Block {
                stmts: vec![
                    QueryNode::IncDec {
                        expr: Box::new(ident("n")),
                    },
                    QueryNode::Return { results: vec![] },
                ],
            })),
        };
        let rendered = decl.to_string();
        assert!(rendered.contains("body: (block (inc_dec_statement"));
        assert!(rendered.ends_with("(return_statement)))"));
    }

    #[test]
    fn test_unknown_renders_kind_placeholder() {
        let unknown = QueryNode::Unknown {
            kind: "for_statement".to_string(),
        };
        assert_eq!(unknown.to_string(), "(for_statement)");
    }

    #[test]
    fn test_compile_appends_root_capture() {
        assert_eq!(
            compile_query(&QueryNode::Return { results: vec![] }),
            "(return_statement) @x"
        );
    }
}
