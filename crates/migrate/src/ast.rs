//! In-memory program representation.
//!
//! A [`SourceUnit`] is one class: imports, fields and functions whose
//! bodies are flat statement lists over a small expression language.
//! Units are read from JSON (`*.unit.json`) and printed as Java-like
//! text.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Name {
        name: String,
    },
    /// Printed verbatim: `"text"`, `42`, `Foo.class`.
    Literal {
        value: String,
    },
    Call {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        receiver: Option<Box<Expr>>,
        method: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    New {
        #[serde(rename = "type")]
        type_name: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
}

/// One step from an expression to a sub-expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Receiver,
    Arg(usize),
}

impl Expr {
    pub fn name(name: &str) -> Expr {
        Expr::Name {
            name: name.to_string(),
        }
    }

    pub fn lit(value: &str) -> Expr {
        Expr::Literal {
            value: value.to_string(),
        }
    }

    pub fn call(receiver: Expr, method: &str, args: Vec<Expr>) -> Expr {
        Expr::Call {
            receiver: Some(Box::new(receiver)),
            method: method.to_string(),
            args,
        }
    }

    pub fn new_object(type_name: &str, args: Vec<Expr>) -> Expr {
        Expr::New {
            type_name: type_name.to_string(),
            args,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Expr::Name { name } => Some(name),
            _ => None,
        }
    }

    pub fn args(&self) -> &[Expr] {
        match self {
            Expr::Call { args, .. } | Expr::New { args, .. } => args,
            _ => &[],
        }
    }

    pub fn child(&self, slot: Slot) -> Option<&Expr> {
        match (self, slot) {
            (Expr::Call { receiver, .. }, Slot::Receiver) => receiver.as_deref(),
            (Expr::Call { args, .. } | Expr::New { args, .. }, Slot::Arg(i)) => args.get(i),
            _ => None,
        }
    }

    fn child_mut(&mut self, slot: Slot) -> Option<&mut Expr> {
        match (self, slot) {
            (Expr::Call { receiver, .. }, Slot::Receiver) => receiver.as_deref_mut(),
            (Expr::Call { args, .. } | Expr::New { args, .. }, Slot::Arg(i)) => args.get_mut(i),
            _ => None,
        }
    }

    pub fn at(&self, path: &[Slot]) -> Option<&Expr> {
        path.iter().try_fold(self, |e, slot| e.child(*slot))
    }

    pub fn at_mut(&mut self, path: &[Slot]) -> Option<&mut Expr> {
        let mut current = self;
        for slot in path {
            current = current.child_mut(*slot)?;
        }
        Some(current)
    }

    /// Paths of every call and object creation, innermost first.
    pub fn call_paths(&self) -> Vec<Vec<Slot>> {
        let mut out = Vec::new();
        self.collect_paths(&mut Vec::new(), &mut out);
        out
    }

    fn collect_paths(&self, prefix: &mut Vec<Slot>, out: &mut Vec<Vec<Slot>>) {
        match self {
            Expr::Call { receiver, args, .. } => {
                if let Some(r) = receiver {
                    prefix.push(Slot::Receiver);
                    r.collect_paths(prefix, out);
                    prefix.pop();
                }
                for (i, a) in args.iter().enumerate() {
                    prefix.push(Slot::Arg(i));
                    a.collect_paths(prefix, out);
                    prefix.pop();
                }
                out.push(prefix.clone());
            }
            Expr::New { args, .. } => {
                for (i, a) in args.iter().enumerate() {
                    prefix.push(Slot::Arg(i));
                    a.collect_paths(prefix, out);
                    prefix.pop();
                }
                out.push(prefix.clone());
            }
            Expr::Name { .. } | Expr::Literal { .. } => {}
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", a)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Name { name } => write!(f, "{}", name),
            Expr::Literal { value } => write!(f, "{}", value),
            Expr::Call {
                receiver,
                method,
                args,
            } => {
                if let Some(r) = receiver {
                    write!(f, "{}.", r)?;
                }
                write!(f, "{}(", method)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Expr::New { type_name, args } => {
                write!(f, "new {}(", type_name)?;
                write_args(f, args)?;
                write!(f, ")")
            }
        }
    }
}

// ── Statements and declarations ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stmt {
    Local {
        #[serde(rename = "type")]
        type_name: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init: Option<Expr>,
    },
    Expr {
        expr: Expr,
    },
    Return {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Expr>,
    },
}

impl Stmt {
    pub fn local(type_name: &str, name: &str, init: Expr) -> Stmt {
        Stmt::Local {
            type_name: type_name.to_string(),
            name: name.to_string(),
            init: Some(init),
        }
    }

    /// The statement's top-level expression.
    pub fn root(&self) -> Option<&Expr> {
        match self {
            Stmt::Local { init, .. } => init.as_ref(),
            Stmt::Expr { expr } => Some(expr),
            Stmt::Return { value } => value.as_ref(),
        }
    }

    pub fn root_mut(&mut self) -> Option<&mut Expr> {
        match self {
            Stmt::Local { init, .. } => init.as_mut(),
            Stmt::Expr { expr } => Some(expr),
            Stmt::Return { value } => value.as_mut(),
        }
    }

    /// Whether the value of the root expression is used.
    pub fn uses_value(&self) -> bool {
        !matches!(self, Stmt::Expr { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default = "void")]
    pub return_type: String,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

fn void() -> String {
    "void".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    pub class: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub functions: Vec<Function>,
}

// ── Type names ───────────────────────────────────────────────────────

/// Type name as written in source: leading package segments dropped.
/// `okhttp3.Request.Builder` prints as `Request.Builder`.
pub fn simple_name(type_name: &str) -> &str {
    let mut rest = type_name;
    while let Some((head, tail)) = rest.split_once('.') {
        if head.starts_with(|c: char| c.is_ascii_lowercase()) && !head.contains('<') {
            rest = tail;
        } else {
            break;
        }
    }
    rest
}

/// Import needed to use `type_name`, if it lives in a package.
pub fn import_of(type_name: &str) -> Option<String> {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let mut parts = Vec::new();
    for segment in base.split('.') {
        parts.push(segment);
        if segment.starts_with(|c: char| c.is_ascii_uppercase()) {
            break;
        }
    }
    if parts.len() < 2 || !parts[parts.len() - 1].starts_with(|c: char| c.is_ascii_uppercase()) {
        return None;
    }
    Some(parts.join("."))
}

// ── Printing ─────────────────────────────────────────────────────────

fn write_stmt(out: &mut String, stmt: &Stmt, indent: &str) {
    out.push_str(indent);
    match stmt {
        Stmt::Local {
            type_name,
            name,
            init: Some(init),
        } => out.push_str(&format!("{} {} = {};", type_name, name, init)),
        Stmt::Local {
            type_name, name, ..
        } => out.push_str(&format!("{} {};", type_name, name)),
        Stmt::Expr { expr } => out.push_str(&format!("{};", expr)),
        Stmt::Return { value: Some(v) } => out.push_str(&format!("return {};", v)),
        Stmt::Return { value: None } => out.push_str("return;"),
    }
    out.push('\n');
}

/// Render a unit as Java source.
pub fn render_java(unit: &SourceUnit) -> String {
    let mut out = String::new();
    if let Some(package) = &unit.package {
        out.push_str(&format!("package {};\n\n", package));
    }
    for import in &unit.imports {
        out.push_str(&format!("import {};\n", import));
    }
    if !unit.imports.is_empty() {
        out.push('\n');
    }
    out.push_str(&format!("public class {} {{\n", unit.class));
    for field in &unit.fields {
        let modifier = if field.is_static {
            "private static "
        } else {
            "private "
        };
        match &field.init {
            Some(init) => out.push_str(&format!(
                "    {}{} {} = {};\n",
                modifier, field.type_name, field.name, init
            )),
            None => out.push_str(&format!(
                "    {}{} {};\n",
                modifier, field.type_name, field.name
            )),
        }
    }
    for function in &unit.functions {
        out.push('\n');
        let params: Vec<String> = function
            .params
            .iter()
            .map(|p| format!("{} {}", p.type_name, p.name))
            .collect();
        out.push_str(&format!(
            "    public {} {}({}) {{\n",
            function.return_type,
            function.name,
            params.join(", ")
        ));
        for stmt in &function.body {
            write_stmt(&mut out, stmt, "        ");
        }
        out.push_str("    }\n");
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_chain() -> Expr {
        // client.newCall(request.build()).execute()
        Expr::call(
            Expr::call(
                Expr::name("client"),
                "newCall",
                vec![Expr::call(Expr::name("request"), "build", vec![])],
            ),
            "execute",
            vec![],
        )
    }

    #[test]
    fn prints_chains() {
        assert_eq!(
            make_chain().to_string(),
            "client.newCall(request.build()).execute()"
        );
        let created = Expr::new_object("HttpGet", vec![Expr::name("url")]);
        assert_eq!(created.to_string(), "new HttpGet(url)");
    }

    #[test]
    fn call_paths_are_innermost_first() {
        let paths = make_chain().call_paths();
        assert_eq!(
            paths,
            vec![
                vec![Slot::Receiver, Slot::Arg(0)],
                vec![Slot::Receiver],
                vec![],
            ]
        );
        let chain = make_chain();
        let inner = chain.at(&[Slot::Receiver, Slot::Arg(0)]).unwrap();
        assert_eq!(inner.to_string(), "request.build()");
    }

    #[test]
    fn at_mut_replaces_subtree() {
        let mut chain = make_chain();
        *chain.at_mut(&[Slot::Receiver, Slot::Arg(0)]).unwrap() = Expr::name("built");
        assert_eq!(chain.to_string(), "client.newCall(built).execute()");
    }

    #[test]
    fn type_names() {
        assert_eq!(simple_name("okhttp3.Request.Builder"), "Request.Builder");
        assert_eq!(simple_name("org.slf4j.Logger"), "Logger");
        assert_eq!(simple_name("List<Node1>"), "List<Node1>");
        assert_eq!(simple_name("long"), "long");
        assert_eq!(
            import_of("okhttp3.Request.Builder").as_deref(),
            Some("okhttp3.Request")
        );
        assert_eq!(import_of("java.io.InputStream").as_deref(), Some("java.io.InputStream"));
        assert_eq!(import_of("String"), None);
        assert_eq!(import_of("long"), None);
    }

    #[test]
    fn unit_json_round_trips_through_printer() {
        let unit: SourceUnit = serde_json::from_value(serde_json::json!({
            "package": "demo",
            "imports": ["org.apache.log4j.Logger"],
            "class": "Service",
            "fields": [{
                "type": "Logger", "name": "log", "static": true,
                "init": {"kind": "call", "receiver": {"kind": "name", "name": "Logger"},
                         "method": "getLogger", "args": [{"kind": "literal", "value": "\"svc\""}]}
            }],
            "functions": [{
                "name": "run",
                "body": [{"kind": "expr", "expr": {"kind": "call",
                    "receiver": {"kind": "name", "name": "log"},
                    "method": "info", "args": [{"kind": "literal", "value": "\"hi\""}]}}]
            }]
        }))
        .unwrap();
        let text = render_java(&unit);
        assert!(text.contains("import org.apache.log4j.Logger;"));
        assert!(text.contains("private static Logger log = Logger.getLogger(\"svc\");"));
        assert!(text.contains("public void run() {"));
        assert!(text.contains("        log.info(\"hi\");"));
    }
}
