//! Structural AST dump.
//!
//! Renders parsed modules as a nested key/value tree for `--show-ast`.
//! The shape is stable enough to eyeball and to assert against:
//!
//! ```text
//! {
//!   "ROOT": [
//!     { "MODULE[main]": [ { "BINARY[+]": { "lhs": "FLOAT[1.0]", ... } } ] }
//!   ]
//! }
//! ```

use serde_json::{json, Value};

use arxc_par::{Expr, Item, Module};

/// Renders the modules of one compilation as pretty-printed JSON.
pub fn emit_ast(modules: &[Module]) -> String {
    let root: Vec<Value> = modules.iter().map(module_value).collect();
    let tree = json!({ "ROOT": root });
    serde_json::to_string_pretty(&tree).unwrap_or_default()
}

fn module_value(module: &Module) -> Value {
    let nodes: Vec<Value> = module.nodes.iter().map(item_value).collect();
    json!({ (format!("MODULE[{}]", module.name)): nodes })
}

fn item_value(item: &Item) -> Value {
    match item {
        Item::Function(func) => {
            let args: Vec<Value> = func
                .proto
                .params
                .iter()
                .map(|p| Value::String(format!("VARIABLE[{}:{}]", p.name, p.ty)))
                .collect();
            json!({
                (format!("FUNCTION[{}]", func.proto.name)): {
                    "args": args,
                    "body": block_value(&func.body.nodes),
                }
            })
        }
        Item::Extern(proto) => {
            let args: Vec<Value> = proto
                .params
                .iter()
                .map(|p| Value::String(format!("VARIABLE[{}:{}]", p.name, p.ty)))
                .collect();
            json!({ (format!("PROTOTYPE[{}]", proto.name)): { "args": args } })
        }
        Item::Expr(expr) => expr_value(expr),
    }
}

fn block_value(nodes: &[Expr]) -> Value {
    Value::Array(nodes.iter().map(expr_value).collect())
}

fn expr_value(expr: &Expr) -> Value {
    match expr {
        Expr::Float(e) => Value::String(format!("FLOAT[{:?}]", e.value)),
        Expr::Variable(e) => Value::String(format!("VARIABLE[{}:{}]", e.name, e.ty)),
        Expr::Unary(e) => json!({ (format!("UNARY[{}]", e.op)): expr_value(&e.operand) }),
        Expr::Binary(e) => json!({
            (format!("BINARY[{}]", e.op)): {
                "lhs": expr_value(&e.lhs),
                "rhs": expr_value(&e.rhs),
            }
        }),
        Expr::Call(e) => {
            let args: Vec<Value> = e.args.iter().map(expr_value).collect();
            json!({ (format!("CALL[{}]", e.callee)): { "args": args } })
        }
        Expr::If(e) => {
            if e.else_block.is_empty() {
                json!({
                    "IF-STMT": {
                        "CONDITION": expr_value(&e.cond),
                        "THEN": block_value(&e.then_block.nodes),
                    }
                })
            } else {
                json!({
                    "IF-STMT": {
                        "CONDITION": expr_value(&e.cond),
                        "THEN": block_value(&e.then_block.nodes),
                        "ELSE": block_value(&e.else_block.nodes),
                    }
                })
            }
        }
        Expr::For(e) => json!({
            "FOR-STMT": {
                "start": expr_value(&e.start),
                "end": expr_value(&e.end),
                "step": expr_value(&e.step),
                "body": block_value(&e.body.nodes),
            }
        }),
        Expr::Var(e) => {
            let bindings: Vec<Value> = e
                .bindings
                .iter()
                .map(|(name, init)| json!({ (name.as_str()): expr_value(init) }))
                .collect();
            json!({ "VAR": { "bindings": bindings, "body": expr_value(&e.body) } })
        }
        Expr::Return(e) => json!({ "RETURN": expr_value(&e.value) }),
        Expr::Block(e) => block_value(&e.nodes),
    }
}
