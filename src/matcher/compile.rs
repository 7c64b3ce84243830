//! Compiler / Matcher façade (C7): validates and walks a selector tree,
//! wiring C2–C6 into one `Matcher`.
//!
//! Grounded in `query.rs::Query::from_json`/`matches` (the public
//! compile-then-match shape), generalized from a thin untyped JSON wrapper
//! into a real AST-producing compiler, and in `query/operators.rs`'s
//! per-operator `match` arms for each operator's operand validation.

use super::ast::{
    BranchedNode, DocumentNode, ElementNode, ExprCmpOp, ExprNode, MatchResult, NearMode, NearSpec,
    RangeOp, WhereFn,
};
use super::document;
use crate::error::{Result, SelectorError};
use crate::geo;
use crate::structural;
use crate::{log_debug, log_trace, log_warn};
use bson::{Bson, Document};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of callbacks `$where` may reference by name. The typed
/// alternative Design Notes recommend in place of evaluating user-supplied
/// source text: a selector names a callback (`{"$where": "isAdult"}`), the
/// caller supplies the actual closure out of band.
#[derive(Clone, Default)]
pub struct WhereRegistry(HashMap<String, WhereFn>);

impl WhereRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, f: impl Fn(&Document) -> bool + Send + Sync + 'static) {
        self.0.insert(name.into(), Arc::new(f));
    }

    fn get(&self, name: &str) -> Option<&WhereFn> {
        self.0.get(name)
    }
}

/// A compiled selector: owns the AST and the introspection flags a caller
/// (an external planner, sort key generator, or positional-update resolver)
/// needs without re-walking the selector.
pub struct Matcher {
    root: DocumentNode,
    is_simple: bool,
    has_where: bool,
    has_geo_query: bool,
    paths: Vec<String>,
}

impl Matcher {
    /// Compiles a mapping/scalar-`_id`/falsy selector with no `$where`
    /// callbacks registered. Selectors containing `$where` fail to compile
    /// with `OperatorContextError`; use [`Matcher::compile_with`] instead.
    pub fn compile(selector: &Bson) -> Result<Matcher> {
        Self::compile_with(selector, &WhereRegistry::default())
    }

    pub fn compile_with(selector: &Bson, registry: &WhereRegistry) -> Result<Matcher> {
        log_debug!("compiling selector: {:?}", selector);
        let mut ctx = CompileCtx::new(registry);
        let root = match normalize_top_level(selector)? {
            TopLevel::AlwaysFalse => DocumentNode::NothingMatches,
            TopLevel::Document(doc) => compile_document(&doc, true, false, &mut ctx)?,
        };
        log_trace!(
            "compiled selector: is_simple={} has_where={} has_geo_query={} paths={:?}",
            ctx.is_simple,
            ctx.has_where,
            ctx.has_geo_query,
            ctx.paths
        );
        Ok(Matcher {
            root,
            is_simple: ctx.is_simple,
            has_where: ctx.has_where,
            has_geo_query: ctx.has_geo_query,
            paths: ctx.paths,
        })
    }

    /// Compiles the "selector is a callable predicate" shape of §3, which
    /// has no `bson::Bson` representation.
    pub fn compile_callable(f: impl Fn(&Document) -> bool + Send + Sync + 'static) -> Matcher {
        Matcher {
            root: DocumentNode::Callable(Arc::new(f)),
            is_simple: false,
            has_where: true,
            has_geo_query: false,
            paths: vec![String::new()],
        }
    }

    pub fn matches(&self, doc: &Document) -> MatchResult {
        let mut result = document::evaluate(&self.root, doc);
        if !result.matched {
            result.array_indices = None;
            result.distance = None;
        }
        log_trace!("documentMatches -> matched={} distance={:?}", result.matched, result.distance);
        result
    }

    pub fn has_geo_query(&self) -> bool {
        self.has_geo_query
    }

    pub fn has_where(&self) -> bool {
        self.has_where
    }

    pub fn is_simple(&self) -> bool {
        self.is_simple
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

struct CompileCtx<'a> {
    is_simple: bool,
    has_where: bool,
    has_geo_query: bool,
    paths: Vec<String>,
    registry: &'a WhereRegistry,
}

impl<'a> CompileCtx<'a> {
    fn new(registry: &'a WhereRegistry) -> Self {
        CompileCtx {
            is_simple: true,
            has_where: false,
            has_geo_query: false,
            paths: Vec::new(),
            registry,
        }
    }

    fn record_empty_path(&mut self) {
        if !self.paths.iter().any(|p| p.is_empty()) {
            self.paths.push(String::new());
        }
    }
}

enum TopLevel {
    AlwaysFalse,
    Document(Document),
}

fn is_falsy(v: &Bson) -> bool {
    matches!(v, Bson::Null)
        || matches!(v, Bson::Boolean(false))
        || matches!(v, Bson::Int32(0) | Bson::Int64(0))
        || matches!(v, Bson::Double(n) if *n == 0.0)
        || matches!(v, Bson::String(s) if s.is_empty())
}

fn normalize_top_level(selector: &Bson) -> Result<TopLevel> {
    match selector {
        Bson::Document(d) => {
            if d.len() == 1 {
                if let Some(id) = d.get("_id") {
                    if is_falsy(id) {
                        return Ok(TopLevel::AlwaysFalse);
                    }
                }
            }
            Ok(TopLevel::Document(d.clone()))
        }
        Bson::Null => Ok(TopLevel::AlwaysFalse),
        Bson::Boolean(false) => Ok(TopLevel::AlwaysFalse),
        scalar if structural::selector_is_id(scalar) => {
            let mut d = Document::new();
            d.insert("_id", scalar.clone());
            Ok(TopLevel::Document(d))
        }
        _ => Err(SelectorError::InvalidSelectorShape(
            "selector must be a mapping, or a scalar usable as an _id shorthand".into(),
        )),
    }
}

/// Compiles a mapping selector (§4.7). `in_elem_match` suppresses path
/// recording (4.4.1: an `$elemMatch` document matcher's field paths are not
/// part of the top-level referenced-paths set).
fn compile_document(
    map: &Document,
    is_root: bool,
    in_elem_match: bool,
    ctx: &mut CompileCtx,
) -> Result<DocumentNode> {
    let mut children = Vec::new();
    for (key, value) in map.iter() {
        if let Some(op) = key.strip_prefix('$') {
            children.push(compile_logical_operator(op, key, value, ctx)?);
        } else {
            let matcher = compile_value_selector(value, is_root, ctx)?;
            if !in_elem_match {
                ctx.paths.push(key.clone());
            }
            children.push(DocumentNode::Field {
                path: key.clone(),
                matcher,
            });
        }
    }
    Ok(DocumentNode::And(children))
}

fn compile_logical_operator(
    op: &str,
    full_key: &str,
    value: &Bson,
    ctx: &mut CompileCtx,
) -> Result<DocumentNode> {
    match op {
        "and" => compile_logical_array(value, "and", ctx),
        "or" => compile_logical_array(value, "or", ctx),
        "nor" => compile_logical_array(value, "nor", ctx),
        "comment" => {
            ctx.is_simple = false;
            Ok(DocumentNode::AlwaysTrue)
        }
        "expr" => {
            ctx.is_simple = false;
            Ok(DocumentNode::Expr(compile_expr(value)?))
        }
        "where" => {
            let name = value.as_str().ok_or_else(|| {
                SelectorError::InvalidSelectorShape(
                    "$where must name a callback registered via WhereRegistry".into(),
                )
            })?;
            let f = ctx
                .registry
                .get(name)
                .cloned()
                .ok_or_else(|| SelectorError::OperatorContextError(format!("no $where callback registered as '{name}'")))?;
            ctx.has_where = true;
            ctx.is_simple = false;
            ctx.record_empty_path();
            Ok(DocumentNode::Where(f))
        }
        _ => Err(SelectorError::UnknownOperator(full_key.to_string())),
    }
}

fn compile_logical_array(value: &Bson, kind: &str, ctx: &mut CompileCtx) -> Result<DocumentNode> {
    let arr = value.as_array().filter(|a| !a.is_empty()).ok_or_else(|| {
        SelectorError::InvalidSelectorShape(format!("${kind} operand must be a non-empty array"))
    })?;
    ctx.is_simple = false;
    let mut children = Vec::with_capacity(arr.len());
    for item in arr {
        let sub = item.as_document().ok_or_else(|| {
            SelectorError::InvalidSelectorShape(format!("${kind} elements must be mappings"))
        })?;
        // §4.6: $near is root-only. A child of $and/$or/$nor is never the
        // root, even when the logical operator itself sits at the root.
        children.push(compile_document(sub, false, false, ctx)?);
    }
    Ok(match kind {
        "and" => DocumentNode::And(children),
        "or" => DocumentNode::Or(children),
        "nor" => DocumentNode::Nor(children),
        _ => unreachable!("compile_logical_array called with unknown kind"),
    })
}

/// The value-selector compiler (C7 helper, §4.8): compiles the value
/// associated with one field path.
fn compile_value_selector(value: &Bson, is_root: bool, ctx: &mut CompileCtx) -> Result<BranchedNode> {
    match value {
        Bson::RegularExpression(re) => {
            ctx.is_simple = false;
            Ok(BranchedNode::Element(ElementNode::RegexLiteral {
                pattern: re.pattern.clone(),
                options: re.options.clone(),
            }))
        }
        Bson::Document(map) if !map.is_empty() && structural::is_operator_mapping(map, false) => {
            compile_operator_mapping(map, is_root, ctx)
        }
        other => Ok(BranchedNode::Element(ElementNode::Equality(other.clone()))),
    }
}

fn compile_operator_mapping(map: &Document, is_root: bool, ctx: &mut CompileCtx) -> Result<BranchedNode> {
    let mut children = Vec::new();

    for (op, operand) in map.iter() {
        match op.as_str() {
            "$eq" => children.push(BranchedNode::Element(ElementNode::Equality(operand.clone()))),

            "$ne" => {
                if matches!(operand, Bson::Document(_)) {
                    ctx.is_simple = false;
                }
                children.push(BranchedNode::Not(Box::new(BranchedNode::Element(
                    ElementNode::Equality(operand.clone()),
                ))));
            }

            "$lt" | "$lte" | "$gt" | "$gte" => {
                if matches!(operand, Bson::Array(_)) {
                    return Err(SelectorError::OperatorOperandTypeError(format!(
                        "{op} operand must not be an array"
                    )));
                }
                if !matches!(operand, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) {
                    ctx.is_simple = false;
                }
                let range_op = match op.as_str() {
                    "$lt" => RangeOp::Lt,
                    "$lte" => RangeOp::Lte,
                    "$gt" => RangeOp::Gt,
                    _ => RangeOp::Gte,
                };
                children.push(BranchedNode::Element(ElementNode::Range(range_op, operand.clone())));
            }

            "$in" => children.push(BranchedNode::Element(ElementNode::In(compile_in_list(
                operand, "$in", ctx,
            )?))),

            "$nin" => children.push(BranchedNode::Not(Box::new(BranchedNode::Element(
                ElementNode::In(compile_in_list(operand, "$nin", ctx)?),
            )))),

            "$mod" => {
                let arr = operand
                    .as_array()
                    .filter(|a| a.len() == 2)
                    .ok_or_else(|| SelectorError::OperatorOperandTypeError("$mod requires a 2-element array".into()))?;
                let divisor = crate::compare::as_f64(&arr[0])
                    .ok_or_else(|| SelectorError::OperatorOperandTypeError("$mod divisor must be numeric".into()))?;
                let remainder = crate::compare::as_f64(&arr[1])
                    .ok_or_else(|| SelectorError::OperatorOperandTypeError("$mod remainder must be numeric".into()))?;
                ctx.is_simple = false;
                children.push(BranchedNode::Element(ElementNode::Mod(divisor, remainder)));
            }

            "$size" => {
                ctx.is_simple = false;
                children.push(BranchedNode::Element(ElementNode::Size(coerce_size_operand(operand)?)));
            }

            "$type" => {
                let code = operand
                    .as_i32()
                    .or_else(|| operand.as_i64().map(|v| v as i32))
                    .ok_or_else(|| SelectorError::OperatorOperandTypeError("$type operand must be a BSON type code".into()))?;
                ctx.is_simple = false;
                children.push(BranchedNode::Element(ElementNode::TypeCode(code)));
            }

            "$regex" => {
                let (pattern, inline_opts) = match operand {
                    Bson::String(s) => (s.clone(), String::new()),
                    Bson::RegularExpression(re) => (re.pattern.clone(), re.options.clone()),
                    _ => {
                        return Err(SelectorError::OperatorOperandTypeError(
                            "$regex operand must be a string or regex".into(),
                        ))
                    }
                };
                let options = match map.get_str("$options") {
                    Ok(s) => s.to_string(),
                    Err(_) => {
                        log_debug!("no sibling $options for $regex, falling back to inline flags '{inline_opts}'");
                        inline_opts
                    }
                };
                validate_regex_options(&options)?;
                ctx.is_simple = false;
                children.push(BranchedNode::Element(ElementNode::RegexLiteral { pattern, options }));
            }

            "$options" => {
                if !map.contains_key("$regex") {
                    return Err(SelectorError::OperatorContextError("$options without sibling $regex".into()));
                }
                // Consumed by the $regex arm above; compiles to nothing of its own.
            }

            "$elemMatch" => {
                let inner = operand.as_document().ok_or_else(|| {
                    SelectorError::OperatorOperandTypeError("$elemMatch operand must be a mapping".into())
                })?;
                ctx.is_simple = false;
                if !inner.is_empty() && structural::is_operator_mapping(inner, false) {
                    let branched = compile_value_selector(operand, false, ctx)?;
                    children.push(BranchedNode::Element(ElementNode::ElemMatchValue(Box::new(branched))));
                } else {
                    let doc_node = compile_document(inner, false, true, ctx)?;
                    children.push(BranchedNode::Element(ElementNode::ElemMatchDoc(Box::new(doc_node))));
                }
            }

            "$not" => {
                let is_valid_operand = matches!(operand, Bson::RegularExpression(_))
                    || matches!(operand, Bson::Document(d) if structural::is_operator_mapping(d, false));
                if !is_valid_operand {
                    return Err(SelectorError::OperatorOperandTypeError(
                        "$not requires a regex or an operator mapping operand".into(),
                    ));
                }
                ctx.is_simple = false;
                let inner = compile_value_selector(operand, false, ctx)?;
                children.push(BranchedNode::Not(Box::new(inner)));
            }

            "$exists" => {
                ctx.is_simple = false;
                children.push(BranchedNode::Exists(!is_falsy(operand)));
            }

            "$all" => {
                let arr = operand.as_array().filter(|a| !a.is_empty()).ok_or_else(|| {
                    SelectorError::OperatorOperandTypeError("$all operand must be a non-empty array".into())
                })?;
                ctx.is_simple = false;
                let mut subs = Vec::with_capacity(arr.len());
                for item in arr {
                    if let Bson::Document(d) = item {
                        if structural::is_operator_mapping(d, false) {
                            return Err(SelectorError::OperatorOperandTypeError(
                                "$all elements must not be operator mappings".into(),
                            ));
                        }
                    }
                    subs.push(compile_value_selector(item, false, ctx)?);
                }
                children.push(BranchedNode::And(subs));
            }

            "$near" => {
                if !is_root {
                    return Err(SelectorError::OperatorContextError(
                        "$near is only allowed directly under a top-level field".into(),
                    ));
                }
                ctx.is_simple = false;
                ctx.has_geo_query = true;
                children.push(BranchedNode::Near(compile_near(operand, map)?));
            }

            "$maxDistance" => {
                if !map.contains_key("$near") {
                    return Err(SelectorError::OperatorContextError("$maxDistance without sibling $near".into()));
                }
                // Consumed by the $near arm above.
            }

            other => {
                log_warn!("unknown operator '{}' in selector", other);
                return Err(SelectorError::UnknownOperator(other.to_string()));
            }
        }
    }

    Ok(BranchedNode::And(children))
}

fn compile_in_list(operand: &Bson, op_name: &str, ctx: &mut CompileCtx) -> Result<Vec<ElementNode>> {
    let arr = operand
        .as_array()
        .ok_or_else(|| SelectorError::OperatorOperandTypeError(format!("{op_name} operand must be an array")))?;
    let mut elements = Vec::with_capacity(arr.len());
    for item in arr {
        if let Bson::Document(d) = item {
            if structural::is_operator_mapping(d, false) {
                return Err(SelectorError::OperatorOperandTypeError(format!(
                    "{op_name} cannot contain operator mappings"
                )));
            }
            ctx.is_simple = false;
        }
        elements.push(compile_in_element(item));
    }
    Ok(elements)
}

fn compile_in_element(item: &Bson) -> ElementNode {
    match item {
        Bson::RegularExpression(re) => ElementNode::RegexLiteral {
            pattern: re.pattern.clone(),
            options: re.options.clone(),
        },
        other => ElementNode::Equality(other.clone()),
    }
}

/// §4.4: a non-number `$size` operand coerces to 0 (a never-matching size,
/// since no array has negative length) when it is a string; any other
/// non-number operand is a genuine compile error (§9 Open Question).
fn coerce_size_operand(operand: &Bson) -> Result<i64> {
    match operand {
        Bson::Int32(n) => Ok(*n as i64),
        Bson::Int64(n) => Ok(*n),
        Bson::Double(n) if n.fract() == 0.0 => Ok(*n as i64),
        Bson::String(_) => Ok(0),
        _ => Err(SelectorError::OperatorOperandTypeError(
            "$size operand must be an integer".into(),
        )),
    }
}

fn validate_regex_options(options: &str) -> Result<()> {
    for flag in options.chars() {
        if !matches!(flag, 'i' | 'm' | 'g') {
            return Err(SelectorError::OperatorOperandTypeError(format!(
                "unsupported regex option '{flag}'"
            )));
        }
    }
    Ok(())
}

fn compile_near(operand: &Bson, siblings: &Document) -> Result<NearSpec> {
    if let Bson::Document(d) = operand {
        if let Ok(geometry) = d.get_document("$geometry") {
            let max_distance = d
                .get("$maxDistance")
                .and_then(crate::compare::as_f64)
                .unwrap_or(f64::MAX);
            return Ok(NearSpec {
                mode: NearMode::GeoJson {
                    geometry: geometry.clone(),
                },
                max_distance,
            });
        }
    }
    let center = geo::coerce_pair(operand).ok_or_else(|| {
        SelectorError::OperatorOperandTypeError(
            "$near operand must be a coordinate pair or a {$geometry: ...} mapping".into(),
        )
    })?;
    let max_distance = siblings
        .get("$maxDistance")
        .and_then(crate::compare::as_f64)
        .unwrap_or(f64::MAX);
    Ok(NearSpec {
        mode: NearMode::Pair { center },
        max_distance,
    })
}

fn compile_expr(value: &Bson) -> Result<ExprNode> {
    match value {
        Bson::String(s) if s.starts_with('$') => Ok(ExprNode::FieldRef(s[1..].to_string())),
        Bson::Document(d) if d.len() == 1 => {
            let (op, operand) = d.iter().next().unwrap();
            match op.as_str() {
                "$eq" | "$ne" | "$gt" | "$gte" | "$lt" | "$lte" => {
                    let arr = operand.as_array().filter(|a| a.len() == 2).ok_or_else(|| {
                        SelectorError::OperatorOperandTypeError(format!("{op} requires a 2-element array"))
                    })?;
                    let lhs = compile_expr(&arr[0])?;
                    let rhs = compile_expr(&arr[1])?;
                    let cmp_op = match op.as_str() {
                        "$eq" => ExprCmpOp::Eq,
                        "$ne" => ExprCmpOp::Ne,
                        "$gt" => ExprCmpOp::Gt,
                        "$gte" => ExprCmpOp::Gte,
                        "$lt" => ExprCmpOp::Lt,
                        _ => ExprCmpOp::Lte,
                    };
                    Ok(ExprNode::Cmp(cmp_op, Box::new(lhs), Box::new(rhs)))
                }
                "$and" => Ok(ExprNode::And(compile_expr_array(operand)?)),
                "$or" => Ok(ExprNode::Or(compile_expr_array(operand)?)),
                "$not" => Ok(ExprNode::Not(Box::new(compile_expr(operand)?))),
                other => Err(SelectorError::UnknownOperator(other.to_string())),
            }
        }
        literal => Ok(ExprNode::Literal(literal.clone())),
    }
}

fn compile_expr_array(value: &Bson) -> Result<Vec<ExprNode>> {
    let arr = value
        .as_array()
        .ok_or_else(|| SelectorError::OperatorOperandTypeError("expected an array of expressions".into()))?;
    arr.iter().map(compile_expr).collect()
}
