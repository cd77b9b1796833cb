//! Lowering from a parsed snippet's CST into [`QueryNode`] trees.
//!
//! Construction is a single recursive walk. Identifier nodes are the only
//! place wildcard state is consulted: an identifier is anonymized either by
//! the `_asq_` name prefix or by consuming a marked interval from the
//! tracker. Everything else lowers structurally.

use tree_sitter::Node;

use crate::intervals::WildcardIntervals;
use crate::query::QueryNode;

/// Identifier-name escape: any identifier spelled with this prefix compiles
/// to an anonymous `(identifier)` without consuming an interval.
pub const WILDCARD_PREFIX: &str = "_asq_";

/// Per-pattern state threaded through the lowering walk.
#[derive(Debug, Default)]
pub struct PatternContext {
    intervals: WildcardIntervals,
}

impl PatternContext {
    pub fn new(intervals: WildcardIntervals) -> Self {
        Self { intervals }
    }

    /// Decide whether an identifier at the given byte span compiles as a
    /// wildcard. The name prefix wins without touching the tracker.
    fn is_wildcard(&mut self, name: &str, start: usize, end: usize) -> bool {
        if name.starts_with(WILDCARD_PREFIX) {
            return true;
        }
        self.intervals.consume_wildcard(start, end, true)
    }
}

fn text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

fn named_non_comment(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let children: Vec<_> = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect();
    children
}

fn build_field(
    node: Node<'_>,
    field: &str,
    source: &str,
    ctx: &mut PatternContext,
) -> Option<Box<QueryNode>> {
    node.child_by_field_name(field)
        .map(|child| Box::new(build_node(child, source, ctx)))
}

fn build_expression_list(node: Option<Node<'_>>, source: &str, ctx: &mut PatternContext) -> Vec<QueryNode> {
    match node {
        Some(list) if list.kind() == "expression_list" => named_non_comment(list)
            .into_iter()
            .map(|c| build_node(c, source, ctx))
            .collect(),
        Some(single) => vec![build_node(single, source, ctx)],
        None => Vec::new(),
    }
}

fn build_ident(node: Node<'_>, source: &str, ctx: &mut PatternContext) -> QueryNode {
    let name = text(node, source).to_string();
    let wildcard = ctx.is_wildcard(&name, node.start_byte(), node.end_byte());
    QueryNode::Ident { name, wildcard }
}

/// Label references never anonymize.
fn build_label(node: Node<'_>, source: &str) -> QueryNode {
    QueryNode::Ident {
        name: text(node, source).to_string(),
        wildcard: false,
    }
}

/// A `result` field that is a bare type stands for one unnamed result; wrap
/// it the way a declared result list lowers so both render identically.
fn build_results(
    node: Node<'_>,
    source: &str,
    ctx: &mut PatternContext,
) -> Option<Box<QueryNode>> {
    let result = node.child_by_field_name("result")?;
    if result.kind() == "parameter_list" {
        return Some(Box::new(build_node(result, source, ctx)));
    }
    let typ = Box::new(build_node(result, source, ctx));
    Some(Box::new(QueryNode::FieldList {
        fields: vec![QueryNode::Field {
            names: Vec::new(),
            typ: Some(typ),
            tag: None,
        }],
    }))
}

/// Case-bearing statements keep their cases as placeholder children inside a
/// synthetic block so the statement's shape survives lowering.
fn build_case_body(node: Node<'_>, source: &str, ctx: &mut PatternContext) -> Option<Box<QueryNode>> {
    let stmts: Vec<QueryNode> = named_non_comment(node)
        .into_iter()
        .filter(|c| c.kind().ends_with("_case"))
        .map(|c| build_node(c, source, ctx))
        .collect();
    if stmts.is_empty() {
        None
    } else {
        Some(Box::new(QueryNode::Block { stmts }))
    }
}

/// Lower one CST node. Unmodeled kinds become [`QueryNode::Unknown`] rather
/// than an error so a pattern never fails to compile.
pub fn build_node(node: Node<'_>, source: &str, ctx: &mut PatternContext) -> QueryNode {
    match node.kind() {
        "identifier" | "field_identifier" | "type_identifier" | "package_identifier" => {
            build_ident(node, source, ctx)
        }
        "expression_statement" | "literal_element" | "parenthesized_expression" => {
            match named_non_comment(node).into_iter().next() {
                Some(inner) => build_node(inner, source, ctx),
                None => QueryNode::Unknown {
                    kind: node.kind().to_string(),
                },
            }
        }
        "call_expression" => {
            let fun = node
                .child_by_field_name("function")
                .map(|f| Box::new(build_node(f, source, ctx)))
                .unwrap_or_else(|| {
                    Box::new(QueryNode::Unknown {
                        kind: "identifier".to_string(),
                    })
                });
            QueryNode::Call { fun }
        }
        "selector_expression" => {
            let operand = node
                .child_by_field_name("operand")
                .map(|o| Box::new(build_node(o, source, ctx)))
                .unwrap_or_else(|| {
                    Box::new(QueryNode::Unknown {
                        kind: "identifier".to_string(),
                    })
                });
            let field = node
                .child_by_field_name("field")
                .map(|f| text(f, source).to_string())
                .unwrap_or_default();
            QueryNode::Selector { operand, field }
        }
        "binary_expression" => {
            let left = build_field(node, "left", source, ctx).unwrap_or_else(|| {
                Box::new(QueryNode::Unknown {
                    kind: "identifier".to_string(),
                })
            });
            let op = node
                .child_by_field_name("operator")
                .map(|o| text(o, source).to_string())
                .unwrap_or_default();
            let right = build_field(node, "right", source, ctx).unwrap_or_else(|| {
                Box::new(QueryNode::Unknown {
                    kind: "identifier".to_string(),
                })
            });
            QueryNode::Binary { left, op, right }
        }
        "int_literal"
        | "float_literal"
        | "imaginary_literal"
        | "rune_literal"
        | "interpreted_string_literal"
        | "raw_string_literal" => QueryNode::BasicLit {
            value: text(node, source).to_string(),
        },
        "true" => QueryNode::Bool { value: true },
        "false" => QueryNode::Bool { value: false },
        "composite_literal" => {
            let typ = build_field(node, "type", source, ctx);
            let elements = node
                .child_by_field_name("body")
                .map(|body| {
                    named_non_comment(body)
                        .into_iter()
                        .map(|e| build_node(e, source, ctx))
                        .collect()
                })
                .unwrap_or_default();
            QueryNode::Composite { typ, elements }
        }
        "func_literal" => {
            let params = build_field(node, "parameters", source, ctx);
            let results = build_results(node, source, ctx);
            QueryNode::FuncLit {
                typ: Some(Box::new(QueryNode::FuncType { params, results })),
            }
        }
        "array_type" => QueryNode::ArrayType {
            length: build_field(node, "length", source, ctx),
            element: build_field(node, "element", source, ctx),
        },
        "slice_type" => QueryNode::ArrayType {
            length: None,
            element: build_field(node, "element", source, ctx),
        },
        "map_type" => QueryNode::MapType {
            key: build_field(node, "key", source, ctx),
            value: build_field(node, "value", source, ctx),
        },
        "channel_type" => QueryNode::ChanType {
            value: build_field(node, "value", source, ctx),
        },
        "struct_type" => {
            let fields = named_non_comment(node)
                .into_iter()
                .find(|c| c.kind() == "field_declaration_list")
                .map(|list| Box::new(build_node(list, source, ctx)));
            QueryNode::StructType { fields }
        }
        "function_type" => QueryNode::FuncType {
            params: build_field(node, "parameters", source, ctx),
            results: build_results(node, source, ctx),
        },
        "parameter_list" | "field_declaration_list" => {
            let fields = named_non_comment(node)
                .into_iter()
                .map(|c| build_node(c, source, ctx))
                .collect();
            QueryNode::FieldList { fields }
        }
        "parameter_declaration" | "variadic_parameter_declaration" | "field_declaration" => {
            let mut cursor = node.walk();
            let names: Vec<QueryNode> = node
                .children_by_field_name("name", &mut cursor)
                .map(|n| build_ident(n, source, ctx))
                .collect();
            QueryNode::Field {
                names,
                typ: build_field(node, "type", source, ctx),
                tag: build_field(node, "tag", source, ctx),
            }
        }
        "var_declaration" | "const_declaration" | "type_declaration" => {
            let specs = named_non_comment(node)
                .into_iter()
                .map(|c| build_node(c, source, ctx))
                .collect();
            QueryNode::GenDecl { specs }
        }
        "var_spec" | "const_spec" => {
            let mut cursor = node.walk();
            let names: Vec<QueryNode> = node
                .children_by_field_name("name", &mut cursor)
                .map(|n| build_ident(n, source, ctx))
                .collect();
            let typ = build_field(node, "type", source, ctx);
            let values = build_expression_list(node.child_by_field_name("value"), source, ctx);
            QueryNode::ValueSpec { names, typ, values }
        }
        "type_spec" => QueryNode::TypeSpec {
            name: build_field(node, "name", source, ctx),
            typ: build_field(node, "type", source, ctx),
        },
        "function_declaration" | "method_declaration" => {
            // A signature with no parameters and no results drops out of the
            // query entirely; an empty parameter list still lowers when a
            // result type forces the signature to appear.
            let params_node = node.child_by_field_name("parameters");
            let signature_empty = params_node
                .map(|p| named_non_comment(p).is_empty())
                .unwrap_or(true)
                && node.child_by_field_name("result").is_none();
            let name = build_field(node, "name", source, ctx);
            let (params, results) = if signature_empty {
                (None, None)
            } else {
                (
                    params_node.map(|p| Box::new(build_node(p, source, ctx))),
                    build_results(node, source, ctx),
                )
            };
            QueryNode::FuncDecl {
                name,
                params,
                results,
                body: build_field(node, "body", source, ctx),
            }
        }
        "source_file" => {
            let name = named_non_comment(node)
                .into_iter()
                .find(|c| c.kind() == "package_clause")
                .and_then(|clause| {
                    named_non_comment(clause)
                        .into_iter()
                        .find(|c| c.kind() == "package_identifier")
                })
                .map(|ident| text(ident, source).to_string())
                .unwrap_or_default();
            QueryNode::Package { name }
        }
        "block" => {
            let stmts = named_non_comment(node)
                .into_iter()
                .map(|c| build_node(c, source, ctx))
                .collect();
            QueryNode::Block { stmts }
        }
        "if_statement" => QueryNode::If {
            init: build_field(node, "initializer", source, ctx),
            cond: build_field(node, "condition", source, ctx),
            cons: build_field(node, "consequence", source, ctx),
            alt: build_field(node, "alternative", source, ctx),
        },
        "for_statement" => {
            let range = named_non_comment(node)
                .into_iter()
                .find(|c| c.kind() == "range_clause");
            match range {
                Some(clause) => {
                    let mut vars = build_expression_list(
                        clause.child_by_field_name("left"),
                        source,
                        ctx,
                    )
                    .into_iter();
                    let key = vars.next().map(Box::new);
                    let value = vars.next().map(Box::new);
                    QueryNode::Range {
                        key,
                        value,
                        expr: build_field(clause, "right", source, ctx),
                        body: build_field(node, "body", source, ctx),
                    }
                }
                None => QueryNode::Unknown {
                    kind: "for_statement".to_string(),
                },
            }
        }
        "expression_switch_statement" => QueryNode::Switch {
            init: build_field(node, "initializer", source, ctx),
            value: build_field(node, "value", source, ctx),
            body: build_case_body(node, source, ctx),
        },
        "type_switch_statement" => {
            let assign = match node.child_by_field_name("alias") {
                Some(alias) => {
                    let left = build_expression_list(Some(alias), source, ctx);
                    let right = build_expression_list(node.child_by_field_name("value"), source, ctx);
                    Some(Box::new(QueryNode::Assign { left, right }))
                }
                None => build_field(node, "value", source, ctx),
            };
            QueryNode::TypeSwitch {
                init: build_field(node, "initializer", source, ctx),
                assign,
                body: build_case_body(node, source, ctx),
            }
        }
        "select_statement" => QueryNode::Select {
            body: build_case_body(node, source, ctx),
        },
        "send_statement" => QueryNode::Send {
            channel: build_field(node, "channel", source, ctx),
            value: build_field(node, "value", source, ctx),
        },
        "break_statement" | "continue_statement" | "goto_statement" => {
            let label = named_non_comment(node)
                .into_iter()
                .find(|c| c.kind() == "label_name")
                .map(|l| Box::new(build_label(l, source)));
            QueryNode::Branch { label }
        }
        "labeled_statement" => {
            let label = node
                .child_by_field_name("label")
                .map(|l| Box::new(build_label(l, source)));
            let stmt = named_non_comment(node)
                .into_iter()
                .find(|c| c.kind() != "label_name")
                .map(|s| Box::new(build_node(s, source, ctx)));
            QueryNode::Labeled { label, stmt }
        }
        "defer_statement" => {
            let call = named_non_comment(node)
                .into_iter()
                .next()
                .map(|c| Box::new(build_node(c, source, ctx)))
                .unwrap_or_else(|| {
                    Box::new(QueryNode::Unknown {
                        kind: "call_expression".to_string(),
                    })
                });
            QueryNode::Defer { call }
        }
        "go_statement" => {
            let call = named_non_comment(node)
                .into_iter()
                .next()
                .map(|c| Box::new(build_node(c, source, ctx)))
                .unwrap_or_else(|| {
                    Box::new(QueryNode::Unknown {
                        kind: "call_expression".to_string(),
                    })
                });
            QueryNode::Go { call }
        }
        "inc_statement" | "dec_statement" => {
            let expr = named_non_comment(node)
                .into_iter()
                .next()
                .map(|c| Box::new(build_node(c, source, ctx)))
                .unwrap_or_else(|| {
                    Box::new(QueryNode::Unknown {
                        kind: "identifier".to_string(),
                    })
                });
            QueryNode::IncDec { expr }
        }
        "return_statement" => {
            let results = build_expression_list(
                named_non_comment(node).into_iter().next(),
                source,
                ctx,
            );
            QueryNode::Return { results }
        }
        "assignment_statement" | "short_var_declaration" => QueryNode::Assign {
            left: build_expression_list(node.child_by_field_name("left"), source, ctx),
            right: build_expression_list(node.child_by_field_name("right"), source, ctx),
        },
        other => QueryNode::Unknown {
            kind: other.to_string(),
        },
    }
}
