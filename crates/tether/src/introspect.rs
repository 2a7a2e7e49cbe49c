//! Symbol search and documentation lookup over builtin types and user functions.
//!
//! Symbols are written `Type`, `Type.class_method`, `Type#instance_method`,
//! `Type::CONSTANT`, or a bare user function name.

use std::{collections::VecDeque, sync::Arc};

use ahash::AHashSet;
use serde::Serialize;
use strum::{Display, IntoStaticStr};

use crate::{
    builtins::{NativeFn, NativeLocation, TypeDef, TypeKind, Visibility, types},
    docstring::Docstring,
    function::UserFunction,
    runtime::Runtime,
};

/// Read-only query service behind `search-doc` and `object-info`.
pub trait Introspector {
    /// Fully qualified names starting with `prefix`.
    ///
    /// The sequence is lazy and finite; each call starts a fresh walk.
    fn search<'a>(&'a self, prefix: &'a str) -> Box<dyn Iterator<Item = String> + 'a>;

    /// Resolves `symbol`, preferring a type over a method of the same name.
    fn describe(&self, symbol: &str) -> Option<ObjectInfo>;
}

/// Metadata about a resolved symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ObjectInfo {
    Type(TypeInfo),
    Method(MethodInfo),
}

impl ObjectInfo {
    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            Self::Type(info) => &info.symbol,
            Self::Method(info) => &info.symbol,
        }
    }

    #[must_use]
    pub fn doc(&self) -> &Docstring {
        match self {
            Self::Type(info) => &info.doc,
            Self::Method(info) => &info.doc,
        }
    }

    /// `(file, line)` where the symbol is defined.
    #[must_use]
    pub fn source_location(&self) -> (&str, u32) {
        let (file, line) = match self {
            Self::Type(info) => &info.source_location,
            Self::Method(info) => &info.source_location,
        };
        (file, *line)
    }
}

/// Own and inherited member names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Members {
    pub new: Vec<String>,
    pub old: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TypeInfo {
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: TypeKind,
    pub source_location: (String, u32),
    pub superclass: Option<String>,
    pub included_modules: Vec<String>,
    pub methods: Members,
    pub instance_methods: Members,
    /// Builtin types are native and have no script source.
    pub source: Option<String>,
    pub doc: Docstring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Native,
    Tether,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MethodInfo {
    pub symbol: String,
    /// Always `"method"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub source_location: (String, u32),
    pub language: Language,
    pub visibility: Visibility,
    pub signature: String,
    pub source: Option<String>,
    pub doc: Docstring,
}

impl MethodInfo {
    fn native(symbol: String, func: &NativeFn) -> Self {
        Self {
            symbol,
            kind: "method",
            source_location: location(func.location),
            language: Language::Native,
            visibility: func.visibility,
            signature: func.signature.to_owned(),
            source: None,
            doc: Docstring::parse(func.doc),
        }
    }

    fn user(function: &UserFunction) -> Self {
        Self {
            symbol: function.name.clone(),
            kind: "method",
            source_location: (function.location.file.clone(), function.location.line),
            language: Language::Tether,
            visibility: Visibility::Private,
            signature: function.signature(),
            source: Some(function.source.clone()),
            doc: Docstring::parse(function.doc.as_deref().unwrap_or_default()),
        }
    }
}

fn location(location: NativeLocation) -> (String, u32) {
    (location.file.to_owned(), location.line)
}

fn type_info(def: &'static TypeDef) -> TypeInfo {
    let split = |own: Vec<&str>, all: Vec<&str>| Members {
        old: all.iter().filter(|name| !own.contains(*name)).map(ToString::to_string).collect(),
        new: own.into_iter().map(str::to_owned).collect(),
    };
    TypeInfo {
        symbol: def.name.to_owned(),
        kind: def.kind,
        source_location: location(def.location),
        superclass: def.superclass.map(str::to_owned),
        included_modules: def.included_modules().map(|module| module.name.to_owned()).collect(),
        methods: split(def.class_method_names(false), def.class_method_names(true)),
        instance_methods: split(def.public_instance_methods(false), def.public_instance_methods(true)),
        source: None,
        doc: Docstring::parse(def.doc),
    }
}

/// [`Introspector`] over the builtin type table plus a runtime's user functions.
#[derive(Debug, Clone)]
pub struct SymbolIndex {
    runtime: Runtime,
}

impl SymbolIndex {
    #[must_use]
    pub fn new(runtime: Runtime) -> Self {
        Self { runtime }
    }
}

impl Introspector for SymbolIndex {
    fn search<'a>(&'a self, prefix: &'a str) -> Box<dyn Iterator<Item = String> + 'a> {
        Box::new(Search::new(prefix, self.runtime.functions()))
    }

    fn describe(&self, symbol: &str) -> Option<ObjectInfo> {
        let symbol = symbol.trim();
        if let Some(def) = types().get(symbol) {
            return Some(ObjectInfo::Type(type_info(def)));
        }
        if let Some((type_name, method)) = symbol.split_once('#') {
            let def = types().get(type_name)?;
            if let Some(func) = def.find_method(method) {
                return Some(ObjectInfo::Method(MethodInfo::native(format!("{type_name}#{method}"), func)));
            }
            // user functions are private methods of Object, so every type has them
            return self
                .runtime
                .function(method)
                .map(|function| ObjectInfo::Method(MethodInfo::user(&function)));
        }
        if let Some((type_name, method)) = symbol.split_once('.') {
            let def = types().get(type_name)?;
            let func = def.find_class_method(method)?;
            return Some(ObjectInfo::Method(MethodInfo::native(format!("{type_name}.{method}"), func)));
        }
        if let Some(function) = self.runtime.function(symbol) {
            return Some(ObjectInfo::Method(MethodInfo::user(&function)));
        }
        let func = types().kernel.find_class_method(symbol)?;
        Some(ObjectInfo::Method(MethodInfo::native(format!("Kernel.{symbol}"), func)))
    }
}

/// Lazy walk over the type tree rooted at `Object`.
///
/// Every type is visited at most once. A type's members are only generated when
/// the type can contain a match, i.e. its name and the prefix agree on their
/// common length; the root is always expanded since it contains every type.
struct Search<'a> {
    prefix: &'a str,
    pending: VecDeque<String>,
    stack: Vec<&'static TypeDef>,
    visited: AHashSet<&'static str>,
    functions: std::vec::IntoIter<Arc<UserFunction>>,
}

impl<'a> Search<'a> {
    fn new(prefix: &'a str, functions: Vec<Arc<UserFunction>>) -> Self {
        let root = &types().object;
        Self {
            prefix,
            pending: VecDeque::from([root.name.to_owned()]),
            stack: vec![root],
            visited: AHashSet::from([root.name]),
            functions: functions.into_iter(),
        }
    }

    fn expand(&mut self, def: &'static TypeDef) {
        let is_root = std::ptr::eq(def, &types().object);
        if is_root {
            // the root's children are all other types, queued in table order
            for child in types().all().into_iter().rev() {
                if self.visited.insert(child.name) {
                    self.stack.push(child);
                }
            }
            for child in types().all().into_iter().skip(1) {
                self.pending.push_back(child.name.to_owned());
            }
        }
        if !is_root && !compatible(def.name, self.prefix) {
            return;
        }
        let name = def.name;
        self.pending
            .extend(def.class_methods.iter().map(|func| format!("{name}.{}", func.name)));
        self.pending.extend(
            def.instance_methods
                .iter()
                .filter(|func| func.visibility == Visibility::Public)
                .map(|func| format!("{name}#{}", func.name)),
        );
        self.pending
            .extend(def.constants.iter().map(|constant| format!("{name}::{}", constant.name)));
    }
}

/// True when one string is a prefix of the other.
fn compatible(name: &str, prefix: &str) -> bool {
    name.starts_with(prefix) || prefix.starts_with(name)
}

impl Iterator for Search<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(candidate) = self.pending.pop_front() {
                if candidate.starts_with(self.prefix) {
                    return Some(candidate);
                }
                continue;
            }
            if let Some(def) = self.stack.pop() {
                self.expand(def);
                continue;
            }
            let function = self.functions.next()?;
            if function.name.starts_with(self.prefix) {
                return Some(function.name.clone());
            }
        }
    }
}
