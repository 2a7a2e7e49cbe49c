//! `Enumerable`, `List` and `Map`.
//!
//! Collections are values: `push`, `store` and friends return a new collection and
//! leave the receiver untouched. Functions passed to iteration methods receive one
//! element at a time; a two-parameter function applied to a `[key, value]` pair gets
//! the pair spread into its parameters.

use std::cmp::Ordering;

use indexmap::IndexMap;

use super::{
    Arity, TypeDef, TypeKind, arithmetic, callable_arg, int_arg, len_value, list_arg, normalize_index, str_arg,
};
use crate::{
    exception::{ExcKind, Exception, RunResult},
    expressions::BinOp,
    interp::Interp,
    value::{Callable, Value},
};

/// The elements iterated by `Enumerable` methods: list items, or map entries as
/// `[key, value]` pairs.
fn entries(receiver: &Value) -> RunResult<Vec<Value>> {
    match receiver {
        Value::List(items) => Ok(items.clone()),
        Value::Map(map) => Ok(map
            .iter()
            .map(|(key, value)| Value::List(vec![Value::Str(key.clone()), value.clone()]))
            .collect()),
        other => Err(Exception::type_error(format!("{} is not enumerable", other.type_name()))),
    }
}

fn apply(interp: &mut Interp<'_>, f: &Callable, entry: &Value) -> RunResult<Value> {
    if let Value::List(pair) = entry
        && pair.len() == 2
        && f.arity() == (2, Some(2))
    {
        return interp.call(f, pair.clone());
    }
    interp.call(f, vec![entry.clone()])
}

/// Sorts by `key`, surfacing the first failed comparison.
fn sort_keyed(mut keyed: Vec<(Value, Value)>) -> RunResult<Vec<Value>> {
    let mut failure = None;
    keyed.sort_by(|(a, _), (b, _)| {
        a.compare(b).unwrap_or_else(|err| {
            failure.get_or_insert(err);
            Ordering::Equal
        })
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(keyed.into_iter().map(|(_, item)| item).collect()),
    }
}

fn extreme(receiver: &Value, wanted: Ordering) -> RunResult<Value> {
    let mut best: Option<Value> = None;
    for item in entries(receiver)? {
        best = match best {
            Some(current) if item.compare(&current)? != wanted => Some(current),
            _ => Some(item),
        };
    }
    Ok(best.unwrap_or(Value::Nil))
}

// ============================================================================
// Enumerable
// ============================================================================

pub(super) fn enumerable() -> TypeDef {
    TypeDef {
        doc: "Iteration over the elements of a collection.\n\n\
              Included by List and Map. Map elements are `[key, value]` pairs.\n\
              @example\n  [1, 2, 3].map(fn_double)\n  {a: 1}.map(f) # f receives (key, value) when it takes two parameters",
        instance_methods: vec![
            native!(
                "map",
                "(f)",
                Arity::exact(1),
                enumerable_map,
                "Applies +f+ to each element.\n@param [Function] f\n@return [List]",
            ),
            native!(
                "select",
                "(f)",
                Arity::exact(1),
                enumerable_select,
                "Elements for which +f+ returns a truthy value.\n@return [List]",
            ),
            native!(
                "reject",
                "(f)",
                Arity::exact(1),
                enumerable_reject,
                "Elements for which +f+ returns a falsy value.\n@return [List]",
            ),
            native!(
                "find",
                "(f)",
                Arity::exact(1),
                enumerable_find,
                "First element for which +f+ is truthy.\n@return [Object, nil]",
            ),
            native!(
                "reduce",
                "(initial, f)",
                Arity::exact(2),
                enumerable_reduce,
                "Folds the elements with +f+, starting from +initial+.\n\
                 @param [Object] initial\n\
                 @param [Function] f called as `f(accumulator, element)`\n\
                 @return [Object]",
            ),
            native!(
                "each",
                "(f)",
                Arity::exact(1),
                enumerable_each,
                "Calls +f+ with each element.\n@return [Object] the receiver",
            ),
            native!(
                "each_with_index",
                "(f)",
                Arity::exact(1),
                enumerable_each_with_index,
                "Calls `f(element, index)` for each element.\n@return [Object] the receiver",
            ),
            native!(
                "count",
                "(f = nil)",
                Arity::range(0, 1),
                enumerable_count,
                "Number of elements, or of elements for which +f+ is truthy.\n@return [Integer]",
            ),
            native!("include?", "(value)", Arity::exact(1), enumerable_include, "@return [Boolean]"),
            native!("min", "()", Arity::exact(0), enumerable_min, "Smallest element, nil when empty.\n@return [Object]"),
            native!("max", "()", Arity::exact(0), enumerable_max, "Largest element, nil when empty.\n@return [Object]"),
            native!("sum", "()", Arity::exact(0), enumerable_sum, "Adds the elements to 0.\n@return [Numeric]"),
            native!(
                "sort_by",
                "(f)",
                Arity::exact(1),
                enumerable_sort_by,
                "Sorts by the key +f+ computes for each element.\n@return [List]",
            ),
            native!("all?", "(f = nil)", Arity::range(0, 1), enumerable_all, "@return [Boolean]"),
            native!("any?", "(f = nil)", Arity::range(0, 1), enumerable_any, "@return [Boolean]"),
            native!("none?", "(f = nil)", Arity::range(0, 1), enumerable_none, "@return [Boolean]"),
            native!("to_a", "()", Arity::exact(0), enumerable_to_a, "The elements as a list.\n@return [List]"),
        ],
        ..TypeDef::new("Enumerable", TypeKind::Module, here!())
    }
}

fn enumerable_map(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let f = callable_arg(&args[0])?;
    let mut out = Vec::new();
    for entry in entries(receiver)? {
        out.push(apply(interp, f, &entry)?);
    }
    Ok(Value::List(out))
}

fn filter(interp: &mut Interp<'_>, receiver: &Value, f: &Value, keep: bool) -> RunResult<Vec<Value>> {
    let f = callable_arg(f)?;
    let mut out = Vec::new();
    for entry in entries(receiver)? {
        if apply(interp, f, &entry)?.truthy() == keep {
            out.push(entry);
        }
    }
    Ok(out)
}

fn enumerable_select(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    filter(interp, receiver, &args[0], true).map(Value::List)
}

fn enumerable_reject(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    filter(interp, receiver, &args[0], false).map(Value::List)
}

fn enumerable_find(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let f = callable_arg(&args[0])?;
    for entry in entries(receiver)? {
        if apply(interp, f, &entry)?.truthy() {
            return Ok(entry);
        }
    }
    Ok(Value::Nil)
}

fn enumerable_reduce(interp: &mut Interp<'_>, receiver: &Value, mut args: Vec<Value>) -> RunResult<Value> {
    let f = callable_arg(&args[1])?.clone();
    let mut accumulator = args.swap_remove(0);
    for entry in entries(receiver)? {
        accumulator = interp.call(&f, vec![accumulator, entry])?;
    }
    Ok(accumulator)
}

fn enumerable_each(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let f = callable_arg(&args[0])?;
    for entry in entries(receiver)? {
        apply(interp, f, &entry)?;
    }
    Ok(receiver.clone())
}

fn enumerable_each_with_index(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let f = callable_arg(&args[0])?;
    for (index, entry) in entries(receiver)?.into_iter().enumerate() {
        interp.call(f, vec![entry, len_value(index)])?;
    }
    Ok(receiver.clone())
}

/// Counts elements matching `f`, or all elements when no function is given.
fn matching(interp: &mut Interp<'_>, receiver: &Value, args: &[Value]) -> RunResult<(usize, usize)> {
    let items = entries(receiver)?;
    let total = items.len();
    let Some(f) = args.first().filter(|f| !matches!(f, Value::Nil)) else {
        return Ok((items.iter().filter(|item| item.truthy()).count(), total));
    };
    let f = callable_arg(f)?;
    let mut hits = 0;
    for entry in &items {
        if apply(interp, f, entry)?.truthy() {
            hits += 1;
        }
    }
    Ok((hits, total))
}

fn enumerable_count(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    if args.is_empty() {
        return Ok(len_value(entries(receiver)?.len()));
    }
    let (hits, _) = matching(interp, receiver, &args)?;
    Ok(len_value(hits))
}

fn enumerable_include(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(entries(receiver)?.contains(&args[0])))
}

fn enumerable_min(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    extreme(receiver, Ordering::Less)
}

fn enumerable_max(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    extreme(receiver, Ordering::Greater)
}

fn enumerable_sum(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    entries(receiver)?
        .iter()
        .try_fold(Value::Int(0), |total, item| arithmetic(BinOp::Add, &total, item))
}

fn enumerable_sort_by(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let f = callable_arg(&args[0])?;
    let mut keyed = Vec::new();
    for entry in entries(receiver)? {
        keyed.push((apply(interp, f, &entry)?, entry));
    }
    sort_keyed(keyed).map(Value::List)
}

fn enumerable_all(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let (hits, total) = matching(interp, receiver, &args)?;
    Ok(Value::Bool(hits == total))
}

fn enumerable_any(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let (hits, _) = matching(interp, receiver, &args)?;
    Ok(Value::Bool(hits > 0))
}

fn enumerable_none(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let (hits, _) = matching(interp, receiver, &args)?;
    Ok(Value::Bool(hits == 0))
}

fn enumerable_to_a(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    entries(receiver).map(Value::List)
}

// ============================================================================
// List
// ============================================================================

pub(super) fn list() -> TypeDef {
    TypeDef {
        includes: &["Enumerable"],
        doc: "An ordered sequence of values.\n\n\
              `xs[i]` returns nil past either end; negative indexes count from the end.\n\
              @see Enumerable",
        instance_methods: vec![
            native!("length", "()", Arity::exact(0), list_length, "@return [Integer]"),
            native!("size", "()", Arity::exact(0), list_length, "Alias of #length.\n@return [Integer]"),
            native!("empty?", "()", Arity::exact(0), list_is_empty, "@return [Boolean]"),
            native!(
                "first",
                "(count = nil)",
                Arity::range(0, 1),
                list_first,
                "The first element, or the first +count+ elements.\n@return [Object]",
            ),
            native!(
                "last",
                "(count = nil)",
                Arity::range(0, 1),
                list_last,
                "The last element, or the last +count+ elements.\n@return [Object]",
            ),
            native!(
                "push",
                "(*values)",
                Arity::at_least(1),
                list_push,
                "A new list with +values+ appended.\n\
                 @return [List]\n\
                 @example\n  let xs = [1]\n  xs.push(2) # => [1, 2]\n  xs         # => [1]",
            ),
            native!("concat", "(other)", Arity::exact(1), list_concat, "@param [List] other\n@return [List]"),
            native!("at", "(index)", Arity::exact(1), list_at, "Same as `xs[index]`.\n@return [Object, nil]"),
            native!(
                "fetch",
                "(index, default = nil)",
                Arity::range(1, 2),
                list_fetch,
                "Element at +index+.\n\
                 @raise [IndexError] if +index+ is out of range and no default is given\n\
                 @return [Object]",
            ),
            native!(
                "join",
                "(separator = \"\")",
                Arity::range(0, 1),
                list_join,
                "Joins the string forms of the elements.\n@return [String]",
            ),
            native!("reverse", "()", Arity::exact(0), list_reverse, "@return [List]"),
            native!(
                "sort",
                "()",
                Arity::exact(0),
                list_sort,
                "Sorted copy.\n@raise [ArgumentError] if two elements cannot be compared\n@return [List]",
            ),
            native!("uniq", "()", Arity::exact(0), list_uniq, "Removes duplicates, keeping first occurrences.\n@return [List]"),
            native!("flatten", "()", Arity::exact(0), list_flatten, "Splices nested lists recursively.\n@return [List]"),
            native!("compact", "()", Arity::exact(0), list_compact, "Removes nils.\n@return [List]"),
            native!("take", "(count)", Arity::exact(1), list_take, "@return [List]"),
            native!("drop", "(count)", Arity::exact(1), list_drop, "@return [List]"),
            native!("index", "(value)", Arity::exact(1), list_index, "@return [Integer, nil]"),
            native!("delete", "(value)", Arity::exact(1), list_delete, "A copy without any element equal to +value+.\n@return [List]"),
            native!(
                "slice",
                "(start, length)",
                Arity::exact(2),
                list_slice,
                "Up to +length+ elements starting at +start+.\n@return [List, nil]",
            ),
            native!(
                "zip",
                "(other)",
                Arity::exact(1),
                list_zip,
                "Pairs up elements with those of +other+, padding with nil.\n@return [List<List>]",
            ),
            native!(
                "to_h",
                "()",
                Arity::exact(0),
                list_to_h,
                "Builds a map from `[key, value]` pairs.\n@raise [TypeError] on elements that are not string-keyed pairs\n@return [Map]",
            ),
        ],
        ..TypeDef::new("List", TypeKind::Class, here!())
    }
}

fn this(receiver: &Value) -> RunResult<&[Value]> {
    list_arg(receiver)
}

fn count_arg(value: &Value) -> RunResult<usize> {
    usize::try_from(int_arg(value)?).map_err(|_| Exception::argument_error("negative count"))
}

fn list_length(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(len_value(this(receiver)?.len()))
}

fn list_is_empty(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(this(receiver)?.is_empty()))
}

fn list_first(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let items = this(receiver)?;
    match args.first() {
        None | Some(Value::Nil) => Ok(items.first().cloned().unwrap_or(Value::Nil)),
        Some(count) => Ok(Value::List(items.iter().take(count_arg(count)?).cloned().collect())),
    }
}

fn list_last(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let items = this(receiver)?;
    match args.first() {
        None | Some(Value::Nil) => Ok(items.last().cloned().unwrap_or(Value::Nil)),
        Some(count) => {
            let count = count_arg(count)?.min(items.len());
            Ok(Value::List(items[items.len() - count..].to_vec()))
        }
    }
}

fn list_push(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let mut items = this(receiver)?.to_vec();
    items.extend(args);
    Ok(Value::List(items))
}

fn list_concat(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    arithmetic(BinOp::Add, receiver, &Value::List(list_arg(&args[0])?.to_vec()))
}

pub(crate) fn list_get(items: &[Value], index: i64) -> Value {
    normalize_index(index, items.len()).map_or(Value::Nil, |position| items[position].clone())
}

fn list_at(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(list_get(this(receiver)?, int_arg(&args[0])?))
}

fn list_fetch(_: &mut Interp<'_>, receiver: &Value, mut args: Vec<Value>) -> RunResult<Value> {
    let items = this(receiver)?;
    let index = int_arg(&args[0])?;
    if let Some(position) = normalize_index(index, items.len()) {
        return Ok(items[position].clone());
    }
    if args.len() == 2 {
        return Ok(args.swap_remove(1));
    }
    Err(Exception::new(
        ExcKind::IndexError,
        format!("index {index} outside of list bounds: -{0}...{0}", items.len()),
    ))
}

fn join_into(items: &[Value], separator: &str, out: &mut String) {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push_str(separator);
        }
        match item {
            Value::List(nested) => join_into(nested, separator, out),
            other => out.push_str(&other.to_string()),
        }
    }
}

fn list_join(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let separator = match args.first() {
        Some(separator) => str_arg(separator)?,
        None => "",
    };
    let mut out = String::new();
    join_into(this(receiver)?, separator, &mut out);
    Ok(Value::Str(out))
}

fn list_reverse(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::List(this(receiver)?.iter().rev().cloned().collect()))
}

fn list_sort(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    let keyed = this(receiver)?.iter().map(|item| (item.clone(), item.clone())).collect();
    sort_keyed(keyed).map(Value::List)
}

fn list_uniq(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in this(receiver)? {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    Ok(Value::List(out))
}

fn flatten_into(items: &[Value], out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::List(nested) => flatten_into(nested, out),
            other => out.push(other.clone()),
        }
    }
}

fn list_flatten(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    let mut out = Vec::new();
    flatten_into(this(receiver)?, &mut out);
    Ok(Value::List(out))
}

fn list_compact(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::List(
        this(receiver)?.iter().filter(|item| !matches!(item, Value::Nil)).cloned().collect(),
    ))
}

fn list_take(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let count = count_arg(&args[0])?;
    Ok(Value::List(this(receiver)?.iter().take(count).cloned().collect()))
}

fn list_drop(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let count = count_arg(&args[0])?;
    Ok(Value::List(this(receiver)?.iter().skip(count).cloned().collect()))
}

fn list_index(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(this(receiver)?
        .iter()
        .position(|item| *item == args[0])
        .map_or(Value::Nil, len_value))
}

fn list_delete(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::List(
        this(receiver)?.iter().filter(|item| **item != args[0]).cloned().collect(),
    ))
}

fn list_slice(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let items = this(receiver)?;
    let start = int_arg(&args[0])?;
    let Ok(length) = usize::try_from(int_arg(&args[1])?) else {
        return Ok(Value::Nil);
    };
    let start = if start == items.len() as i64 {
        Some(items.len())
    } else {
        normalize_index(start, items.len())
    };
    Ok(start.map_or(Value::Nil, |start| {
        Value::List(items[start..].iter().take(length).cloned().collect())
    }))
}

fn list_zip(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let other = list_arg(&args[0])?;
    Ok(Value::List(
        this(receiver)?
            .iter()
            .enumerate()
            .map(|(index, item)| Value::List(vec![item.clone(), other.get(index).cloned().unwrap_or(Value::Nil)]))
            .collect(),
    ))
}

fn list_to_h(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    let mut map = IndexMap::new();
    for item in this(receiver)? {
        match item {
            Value::List(pair) if pair.len() == 2 => {
                map.insert(str_arg(&pair[0])?.to_owned(), pair[1].clone());
            }
            other => {
                return Err(Exception::type_error(format!(
                    "wrong element type {} (expected a [key, value] pair)",
                    other.type_name()
                )));
            }
        }
    }
    Ok(Value::Map(map))
}

// ============================================================================
// Map
// ============================================================================

pub(super) fn map() -> TypeDef {
    TypeDef {
        includes: &["Enumerable"],
        doc: "String keys mapped to values, in insertion order.\n\n\
              `m[key]` returns nil for missing keys; `fetch` raises instead.",
        instance_methods: vec![
            native!("keys", "()", Arity::exact(0), map_keys, "@return [List<String>]"),
            native!("values", "()", Arity::exact(0), map_values, "@return [List]"),
            native!("length", "()", Arity::exact(0), map_length, "Number of entries.\n@return [Integer]"),
            native!("size", "()", Arity::exact(0), map_length, "Alias of #length.\n@return [Integer]"),
            native!("empty?", "()", Arity::exact(0), map_is_empty, "@return [Boolean]"),
            native!("key?", "(key)", Arity::exact(1), map_has_key, "@param [String] key\n@return [Boolean]"),
            native!(
                "include?",
                "(key)",
                Arity::exact(1),
                map_has_key,
                "Alias of #key?; overrides Enumerable#include?.\n@return [Boolean]",
            ),
            native!(
                "fetch",
                "(key, default = nil)",
                Arity::range(1, 2),
                map_fetch,
                "Value stored under +key+.\n\
                 @raise [KeyError] if the key is missing and no default is given\n\
                 @return [Object]",
            ),
            native!(
                "store",
                "(key, value)",
                Arity::exact(2),
                map_store,
                "A new map with +key+ set to +value+.\n@return [Map]",
            ),
            native!("delete", "(key)", Arity::exact(1), map_delete, "A new map without +key+.\n@return [Map]"),
            native!(
                "merge",
                "(other)",
                Arity::exact(1),
                map_merge,
                "A new map with the entries of +other+ added, replacing existing keys.\n@return [Map]",
            ),
            native!(
                "select",
                "(f)",
                Arity::exact(1),
                map_select,
                "Entries for which `f(key, value)` is truthy.\n@return [Map]",
            ),
            native!(
                "reject",
                "(f)",
                Arity::exact(1),
                map_reject,
                "Entries for which `f(key, value)` is falsy.\n@return [Map]",
            ),
            native!(
                "invert",
                "()",
                Arity::exact(0),
                map_invert,
                "Swaps keys and values; values are converted with `to_s`.\n@return [Map]",
            ),
        ],
        ..TypeDef::new("Map", TypeKind::Class, here!())
    }
}

fn this_map(receiver: &Value) -> RunResult<&IndexMap<String, Value>> {
    match receiver {
        Value::Map(map) => Ok(map),
        other => Err(Exception::type_error(format!(
            "no implicit conversion of {} into Map",
            other.type_name()
        ))),
    }
}

fn map_keys(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::List(this_map(receiver)?.keys().map(|key| Value::Str(key.clone())).collect()))
}

fn map_values(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::List(this_map(receiver)?.values().cloned().collect()))
}

fn map_length(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(len_value(this_map(receiver)?.len()))
}

fn map_is_empty(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(this_map(receiver)?.is_empty()))
}

fn map_has_key(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(match &args[0] {
        Value::Str(key) => this_map(receiver)?.contains_key(key),
        _ => false,
    }))
}

fn map_fetch(_: &mut Interp<'_>, receiver: &Value, mut args: Vec<Value>) -> RunResult<Value> {
    let key = str_arg(&args[0])?;
    if let Some(value) = this_map(receiver)?.get(key) {
        return Ok(value.clone());
    }
    if args.len() == 2 {
        return Ok(args.swap_remove(1));
    }
    Err(Exception::new(ExcKind::KeyError, format!("key not found: {key:?}")))
}

fn map_store(_: &mut Interp<'_>, receiver: &Value, mut args: Vec<Value>) -> RunResult<Value> {
    let mut map = this_map(receiver)?.clone();
    let value = args.swap_remove(1);
    map.insert(str_arg(&args[0])?.to_owned(), value);
    Ok(Value::Map(map))
}

fn map_delete(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let mut map = this_map(receiver)?.clone();
    map.shift_remove(str_arg(&args[0])?);
    Ok(Value::Map(map))
}

fn map_merge(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let mut map = this_map(receiver)?.clone();
    map.extend(this_map(&args[0])?.iter().map(|(key, value)| (key.clone(), value.clone())));
    Ok(Value::Map(map))
}

fn pairs_to_map(pairs: Vec<Value>) -> Value {
    Value::Map(
        pairs
            .into_iter()
            .filter_map(|pair| match pair {
                Value::List(mut pair) if pair.len() == 2 => {
                    let value = pair.pop()?;
                    match pair.pop()? {
                        Value::Str(key) => Some((key, value)),
                        _ => None,
                    }
                }
                _ => None,
            })
            .collect(),
    )
}

fn map_select(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    filter(interp, receiver, &args[0], true).map(pairs_to_map)
}

fn map_reject(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    filter(interp, receiver, &args[0], false).map(pairs_to_map)
}

fn map_invert(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Map(
        this_map(receiver)?
            .iter()
            .map(|(key, value)| (value.to_string(), Value::Str(key.clone())))
            .collect(),
    ))
}
