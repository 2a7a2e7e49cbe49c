use crate::{exception::CodeLoc, expressions::Expr};

/// A function defined by script code with `fn name(params) = body`.
///
/// Stored in the global environment behind an `Arc`, so calls and introspection
/// share one definition. The original source text and any `##` doc comment lines
/// are kept for `show-source` and `object-info`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserFunction {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
    /// Exact source text of the definition.
    pub source: String,
    /// Joined `##` comment lines directly above the definition.
    pub doc: Option<String>,
    /// Where the definition starts.
    pub location: CodeLoc,
}

impl UserFunction {
    /// Parameter list in call-site form, e.g. `(a, b)`.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("({})", self.params.join(", "))
    }
}
