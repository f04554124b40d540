use std::cmp::Ordering;
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::object::{Key, Object};

type BuiltinResult = Result<Rc<Object>, RuntimeError>;

/// How many arguments a builtin accepts.
enum Arity {
    Exact(usize),
    Between(usize, usize),
    AtLeast(usize),
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Builtin {
    // I/O
    Print,
    Println,
    Input,

    // Type functions
    Len,
    Type,
    Str,
    Int,
    Float,

    // Array functions
    Range,
    Push,
    Pop,
    First,
    Last,
    Rest,
    Sorted,
    Reversed,
    Join,

    // Dict functions
    Keys,
    Values,

    // Math functions
    Abs,
    Min,
    Max,
    Sum,

    // String functions
    Split,
    Upper,
    Lower,
    Strip,
    Replace,

    // Utility
    Contains,
}

impl Builtin {
    pub const ALL: [Builtin; 29] = [
        Builtin::Print,
        Builtin::Println,
        Builtin::Input,
        Builtin::Len,
        Builtin::Type,
        Builtin::Str,
        Builtin::Int,
        Builtin::Float,
        Builtin::Range,
        Builtin::Push,
        Builtin::Pop,
        Builtin::First,
        Builtin::Last,
        Builtin::Rest,
        Builtin::Sorted,
        Builtin::Reversed,
        Builtin::Join,
        Builtin::Keys,
        Builtin::Values,
        Builtin::Abs,
        Builtin::Min,
        Builtin::Max,
        Builtin::Sum,
        Builtin::Split,
        Builtin::Upper,
        Builtin::Lower,
        Builtin::Strip,
        Builtin::Replace,
        Builtin::Contains,
    ];

    pub fn lookup(name: &str) -> Option<Builtin> {
        Builtin::ALL
            .into_iter()
            .find(|builtin| builtin.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Println => "println",
            Builtin::Input => "input",
            Builtin::Len => "len",
            Builtin::Type => "type",
            Builtin::Str => "str",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Range => "range",
            Builtin::Push => "push",
            Builtin::Pop => "pop",
            Builtin::First => "first",
            Builtin::Last => "last",
            Builtin::Rest => "rest",
            Builtin::Sorted => "sorted",
            Builtin::Reversed => "reversed",
            Builtin::Join => "join",
            Builtin::Keys => "keys",
            Builtin::Values => "values",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Sum => "sum",
            Builtin::Split => "split",
            Builtin::Upper => "upper",
            Builtin::Lower => "lower",
            Builtin::Strip => "strip",
            Builtin::Replace => "replace",
            Builtin::Contains => "contains",
        }
    }

    fn arity(&self) -> Arity {
        match self {
            Builtin::Print | Builtin::Println => Arity::AtLeast(0),
            Builtin::Input => Arity::Between(0, 1),
            Builtin::Range => Arity::Between(1, 3),
            Builtin::Join | Builtin::Split => Arity::Between(1, 2),
            Builtin::Min | Builtin::Max => Arity::AtLeast(1),
            Builtin::Push | Builtin::Contains => Arity::Exact(2),
            Builtin::Replace => Arity::Exact(3),
            _ => Arity::Exact(1),
        }
    }

    fn check_arity(&self, got: usize) -> Result<(), RuntimeError> {
        let message = match self.arity() {
            Arity::Exact(expected) if got != expected => format!(
                "{}() takes {} argument(s) but got {}",
                self.name(),
                expected,
                got
            ),
            Arity::Between(low, high) if got < low || got > high => format!(
                "{}() takes {} to {} arguments but got {}",
                self.name(),
                low,
                high,
                got
            ),
            Arity::AtLeast(low) if got < low => format!(
                "{}() takes at least {} argument(s) but got {}",
                self.name(),
                low,
                got
            ),
            _ => return Ok(()),
        };

        Err(RuntimeError::arity_error(message))
    }

    /// Check the argument count and dispatch. Errors come back without a
    /// position; the evaluator stamps the call site on.
    pub fn apply(&self, args: Vec<Rc<Object>>) -> BuiltinResult {
        self.check_arity(args.len())?;

        match self {
            Builtin::Print => builtin_print(&args, false),
            Builtin::Println => builtin_print(&args, true),
            Builtin::Input => builtin_input(&args),
            Builtin::Len => builtin_len(&args),
            Builtin::Type => Ok(Rc::new(Object::String(args[0].typename().to_string()))),
            Builtin::Str => Ok(Rc::new(Object::String(args[0].to_string()))),
            Builtin::Int => builtin_int(&args),
            Builtin::Float => builtin_float(&args),
            Builtin::Range => builtin_range(&args),
            Builtin::Push => builtin_push(&args),
            Builtin::Pop => builtin_pop(&args),
            Builtin::First => builtin_first(&args),
            Builtin::Last => builtin_last(&args),
            Builtin::Rest => builtin_rest(&args),
            Builtin::Sorted => builtin_sorted(&args),
            Builtin::Reversed => builtin_reversed(&args),
            Builtin::Join => builtin_join(&args),
            Builtin::Keys => builtin_keys(&args),
            Builtin::Values => builtin_values(&args),
            Builtin::Abs => builtin_abs(&args),
            Builtin::Min => builtin_min_max(&args, Ordering::Less, "min"),
            Builtin::Max => builtin_min_max(&args, Ordering::Greater, "max"),
            Builtin::Sum => builtin_sum(&args),
            Builtin::Split => builtin_split(&args),
            Builtin::Upper => builtin_string_transform(&args, "upper", |s| s.to_uppercase()),
            Builtin::Lower => builtin_string_transform(&args, "lower", |s| s.to_lowercase()),
            Builtin::Strip => builtin_string_transform(&args, "strip", |s| s.trim().to_string()),
            Builtin::Replace => builtin_replace(&args),
            Builtin::Contains => builtin_contains(&args),
        }
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<builtin {}>", self.name())
    }
}

fn builtin_print(args: &[Rc<Object>], newline: bool) -> BuiltinResult {
    let rendered = args
        .iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<String>>()
        .join(" ");

    let mut stdout = io::stdout();
    let result = if newline {
        writeln!(stdout, "{}", rendered)
    } else {
        write!(stdout, "{}", rendered).and_then(|_| stdout.flush())
    };
    // A broken stdout is not a language-level error
    let _ = result;

    Ok(Rc::new(Object::Null))
}

fn builtin_input(args: &[Rc<Object>]) -> BuiltinResult {
    if let Some(prompt) = args.first() {
        let mut stdout = io::stdout();
        let _ = write!(stdout, "{}", prompt).and_then(|_| stdout.flush());
    }

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|err| RuntimeError::value_error(format!("input() failed: {}", err)))?;

    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }

    Ok(Rc::new(Object::String(line)))
}

fn builtin_len(args: &[Rc<Object>]) -> BuiltinResult {
    let length = match &*args[0] {
        Object::String(s) => s.chars().count(),
        Object::Array(arr) => arr.borrow().len(),
        Object::Dict(dict) => dict.borrow().len(),
        other => {
            return Err(RuntimeError::type_error(format!(
                "len() not supported for `{}`",
                other.typename()
            )))
        }
    };

    Ok(Rc::new(Object::Integer(length as i64)))
}

fn builtin_int(args: &[Rc<Object>]) -> BuiltinResult {
    let value = match &*args[0] {
        Object::Integer(value) => *value,
        Object::Float(value) => *value as i64,
        Object::Boolean(value) => *value as i64,
        Object::String(s) => match s.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                return Err(RuntimeError::value_error(format!(
                    "cannot convert '{}' to int",
                    s
                )))
            }
        },
        other => {
            return Err(RuntimeError::type_error(format!(
                "cannot convert `{}` to int",
                other.typename()
            )))
        }
    };

    Ok(Rc::new(Object::Integer(value)))
}

fn builtin_float(args: &[Rc<Object>]) -> BuiltinResult {
    let value = match &*args[0] {
        Object::Integer(value) => *value as f64,
        Object::Float(value) => *value,
        Object::Boolean(value) => *value as i64 as f64,
        Object::String(s) => match s.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                return Err(RuntimeError::value_error(format!(
                    "cannot convert '{}' to float",
                    s
                )))
            }
        },
        other => {
            return Err(RuntimeError::type_error(format!(
                "cannot convert `{}` to float",
                other.typename()
            )))
        }
    };

    Ok(Rc::new(Object::Float(value)))
}

fn builtin_range(args: &[Rc<Object>]) -> BuiltinResult {
    let bound = |arg: &Rc<Object>| match **arg {
        Object::Integer(value) => Ok(value),
        _ => Err(RuntimeError::type_error(format!(
            "range() requires integer arguments, got `{}`",
            arg.typename()
        ))),
    };

    let (start, stop, step) = match args {
        [stop] => (0, bound(stop)?, 1),
        [start, stop] => (bound(start)?, bound(stop)?, 1),
        [start, stop, step] => (bound(start)?, bound(stop)?, bound(step)?),
        // check_arity has already rejected anything else
        _ => return Ok(Rc::new(Object::Null)),
    };

    if step == 0 {
        return Err(RuntimeError::value_error("range() step must not be zero"));
    }

    let mut elements = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        elements.push(Rc::new(Object::Integer(current)));
        current += step;
    }

    Ok(Rc::new(Object::array(elements)))
}

fn expect_array<'a>(
    arg: &'a Rc<Object>,
    builtin: &str,
) -> Result<&'a std::cell::RefCell<Vec<Rc<Object>>>, RuntimeError> {
    match &**arg {
        Object::Array(arr) => Ok(arr.as_ref()),
        other => Err(RuntimeError::type_error(format!(
            "{}() requires an array, got `{}`",
            builtin,
            other.typename()
        ))),
    }
}

fn expect_string<'a>(arg: &'a Rc<Object>, builtin: &str) -> Result<&'a str, RuntimeError> {
    match &**arg {
        Object::String(s) => Ok(s),
        other => Err(RuntimeError::type_error(format!(
            "{}() requires a string, got `{}`",
            builtin,
            other.typename()
        ))),
    }
}

fn builtin_push(args: &[Rc<Object>]) -> BuiltinResult {
    let arr = expect_array(&args[0], "push")?;
    arr.borrow_mut().push(Rc::clone(&args[1]));

    // The (mutated) array itself, so pushes can chain
    Ok(Rc::clone(&args[0]))
}

fn builtin_pop(args: &[Rc<Object>]) -> BuiltinResult {
    let arr = expect_array(&args[0], "pop")?;
    match arr.borrow_mut().pop() {
        Some(value) => Ok(value),
        None => Err(RuntimeError::index_error("pop() on empty array")),
    }
}

fn builtin_first(args: &[Rc<Object>]) -> BuiltinResult {
    let arr = expect_array(&args[0], "first")?;
    match arr.borrow().first() {
        Some(value) => Ok(Rc::clone(value)),
        None => Err(RuntimeError::index_error("first() on empty array")),
    }
}

fn builtin_last(args: &[Rc<Object>]) -> BuiltinResult {
    let arr = expect_array(&args[0], "last")?;
    match arr.borrow().last() {
        Some(value) => Ok(Rc::clone(value)),
        None => Err(RuntimeError::index_error("last() on empty array")),
    }
}

fn builtin_rest(args: &[Rc<Object>]) -> BuiltinResult {
    let arr = expect_array(&args[0], "rest")?;
    let rest: Vec<Rc<Object>> = arr.borrow().iter().skip(1).map(Rc::clone).collect();
    Ok(Rc::new(Object::array(rest)))
}

fn builtin_sorted(args: &[Rc<Object>]) -> BuiltinResult {
    let arr = expect_array(&args[0], "sorted")?;
    let mut elements = arr.borrow().clone();

    if elements
        .iter()
        .all(|e| matches!(**e, Object::Integer(_) | Object::Float(_)))
    {
        elements.sort_by(|a, b| {
            number_value(a)
                .partial_cmp(&number_value(b))
                .unwrap_or(Ordering::Equal)
        });
    } else if elements.iter().all(|e| matches!(**e, Object::String(_))) {
        elements.sort_by(|a, b| string_value(a).cmp(string_value(b)));
    } else {
        return Err(RuntimeError::type_error(
            "sorted() requires an array of numbers or an array of strings",
        ));
    }

    Ok(Rc::new(Object::array(elements)))
}

fn builtin_reversed(args: &[Rc<Object>]) -> BuiltinResult {
    let arr = expect_array(&args[0], "reversed")?;
    let mut elements = arr.borrow().clone();
    elements.reverse();
    Ok(Rc::new(Object::array(elements)))
}

fn builtin_join(args: &[Rc<Object>]) -> BuiltinResult {
    let arr = expect_array(&args[0], "join")?;
    let separator = match args.get(1) {
        Some(sep) => expect_string(sep, "join")?.to_string(),
        None => String::new(),
    };

    let mut parts = Vec::new();
    for element in arr.borrow().iter() {
        match &**element {
            Object::String(s) => parts.push(s.clone()),
            other => {
                return Err(RuntimeError::type_error(format!(
                    "join() requires an array of strings, found `{}`",
                    other.typename()
                )))
            }
        }
    }

    Ok(Rc::new(Object::String(parts.join(&separator))))
}

fn builtin_keys(args: &[Rc<Object>]) -> BuiltinResult {
    match &*args[0] {
        Object::Dict(dict) => {
            let keys: Vec<Rc<Object>> = dict
                .borrow()
                .entries()
                .iter()
                .map(|(key, _)| Rc::new(key.to_object()))
                .collect();
            Ok(Rc::new(Object::array(keys)))
        }
        other => Err(RuntimeError::type_error(format!(
            "keys() requires a dict, got `{}`",
            other.typename()
        ))),
    }
}

fn builtin_values(args: &[Rc<Object>]) -> BuiltinResult {
    match &*args[0] {
        Object::Dict(dict) => {
            let values: Vec<Rc<Object>> = dict
                .borrow()
                .entries()
                .iter()
                .map(|(_, value)| Rc::clone(value))
                .collect();
            Ok(Rc::new(Object::array(values)))
        }
        other => Err(RuntimeError::type_error(format!(
            "values() requires a dict, got `{}`",
            other.typename()
        ))),
    }
}

fn builtin_abs(args: &[Rc<Object>]) -> BuiltinResult {
    match &*args[0] {
        Object::Integer(value) => Ok(Rc::new(Object::Integer(value.wrapping_abs()))),
        Object::Float(value) => Ok(Rc::new(Object::Float(value.abs()))),
        other => Err(RuntimeError::type_error(format!(
            "abs() requires a number, got `{}`",
            other.typename()
        ))),
    }
}

fn builtin_min_max(args: &[Rc<Object>], keep: Ordering, name: &str) -> BuiltinResult {
    // A single array argument means "over its elements"
    let candidates: Vec<Rc<Object>> = match (args.len(), &*args[0]) {
        (1, Object::Array(arr)) => arr.borrow().clone(),
        _ => args.to_vec(),
    };

    if candidates.is_empty() {
        return Err(RuntimeError::value_error(format!(
            "{}() of an empty array",
            name
        )));
    }

    let mut best: Option<Rc<Object>> = None;
    for candidate in candidates {
        if !matches!(*candidate, Object::Integer(_) | Object::Float(_)) {
            return Err(RuntimeError::type_error(format!(
                "{}() requires numeric arguments, got `{}`",
                name,
                candidate.typename()
            )));
        }

        best = match best {
            None => Some(candidate),
            Some(current) => {
                let comparison = number_value(&candidate)
                    .partial_cmp(&number_value(&current))
                    .unwrap_or(Ordering::Equal);
                if comparison == keep {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }

    // `best` is always set: the empty case returned above
    match best {
        Some(value) => Ok(value),
        None => Ok(Rc::new(Object::Null)),
    }
}

fn builtin_sum(args: &[Rc<Object>]) -> BuiltinResult {
    let arr = expect_array(&args[0], "sum")?;

    let mut int_total: i64 = 0;
    let mut float_total: f64 = 0.0;
    let mut saw_float = false;

    for element in arr.borrow().iter() {
        match &**element {
            Object::Integer(value) => {
                int_total = int_total.wrapping_add(*value);
                float_total += *value as f64;
            }
            Object::Float(value) => {
                saw_float = true;
                float_total += *value;
            }
            other => {
                return Err(RuntimeError::type_error(format!(
                    "sum() requires an array of numbers, found `{}`",
                    other.typename()
                )))
            }
        }
    }

    if saw_float {
        Ok(Rc::new(Object::Float(float_total)))
    } else {
        Ok(Rc::new(Object::Integer(int_total)))
    }
}

fn builtin_split(args: &[Rc<Object>]) -> BuiltinResult {
    let s = expect_string(&args[0], "split")?;

    let parts: Vec<Rc<Object>> = match args.get(1) {
        Some(sep) => {
            let sep = expect_string(sep, "split")?;
            if sep.is_empty() {
                return Err(RuntimeError::value_error(
                    "split() separator must not be empty",
                ));
            }
            s.split(sep)
                .map(|part| Rc::new(Object::String(part.to_string())))
                .collect()
        }
        // Without a separator, split on runs of whitespace
        None => s
            .split_whitespace()
            .map(|part| Rc::new(Object::String(part.to_string())))
            .collect(),
    };

    Ok(Rc::new(Object::array(parts)))
}

fn builtin_string_transform(
    args: &[Rc<Object>],
    name: &str,
    transform: fn(&str) -> String,
) -> BuiltinResult {
    let s = expect_string(&args[0], name)?;
    Ok(Rc::new(Object::String(transform(s))))
}

fn builtin_replace(args: &[Rc<Object>]) -> BuiltinResult {
    let s = expect_string(&args[0], "replace")?;
    let old = expect_string(&args[1], "replace")?;
    let new = expect_string(&args[2], "replace")?;

    Ok(Rc::new(Object::String(s.replace(old, new))))
}

fn builtin_contains(args: &[Rc<Object>]) -> BuiltinResult {
    let found = match &*args[0] {
        Object::String(s) => match &*args[1] {
            Object::String(needle) => s.contains(needle.as_str()),
            other => {
                return Err(RuntimeError::type_error(format!(
                    "contains() on a string requires a string, got `{}`",
                    other.typename()
                )))
            }
        },
        Object::Array(arr) => arr.borrow().iter().any(|e| e.equals(&args[1])),
        Object::Dict(dict) => match Key::from_object(&args[1]) {
            Some(key) => dict.borrow().contains_key(&key),
            None => {
                return Err(RuntimeError::type_error(format!(
                    "unhashable dict key: `{}`",
                    args[1].typename()
                )))
            }
        },
        other => {
            return Err(RuntimeError::type_error(format!(
                "contains() requires a string, array, or dict, got `{}`",
                other.typename()
            )))
        }
    };

    Ok(Rc::new(Object::Boolean(found)))
}

fn number_value(obj: &Object) -> f64 {
    match obj {
        Object::Integer(value) => *value as f64,
        Object::Float(value) => *value,
        _ => 0.0,
    }
}

fn string_value(obj: &Object) -> &str {
    match obj {
        Object::String(value) => value,
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::builtin::Builtin;
    use crate::object::{Dict, Key, Object};

    fn int(value: i64) -> Rc<Object> {
        Rc::new(Object::Integer(value))
    }

    fn string(value: &str) -> Rc<Object> {
        Rc::new(Object::String(value.to_string()))
    }

    fn array(elements: Vec<Rc<Object>>) -> Rc<Object> {
        Rc::new(Object::array(elements))
    }

    #[test]
    fn lookup_knows_every_builtin() {
        assert_eq!(Builtin::lookup("len"), Some(Builtin::Len));
        assert_eq!(Builtin::lookup("println"), Some(Builtin::Println));
        assert_eq!(Builtin::lookup("lenn"), None);
    }

    #[test]
    fn len_counts_code_points() {
        let result = Builtin::Len.apply(vec![string("héllo")]).unwrap();
        assert_eq!(*result, Object::Integer(5));
    }

    #[test]
    fn len_arity_and_type_errors() {
        let err = Builtin::Len.apply(vec![]).unwrap_err();
        assert_eq!(err.name(), "ArityError");

        let err = Builtin::Len.apply(vec![int(1)]).unwrap_err();
        assert_eq!(err.name(), "TypeError");
    }

    #[test]
    fn type_tags() {
        let tests = vec![
            (int(1), "int"),
            (Rc::new(Object::Float(1.5)), "float"),
            (Rc::new(Object::Boolean(true)), "bool"),
            (string("x"), "string"),
            (Rc::new(Object::Null), "null"),
            (array(vec![]), "array"),
            (Rc::new(Object::Builtin(Builtin::Len)), "builtin"),
        ];

        for (arg, expected) in tests {
            let result = Builtin::Type.apply(vec![arg]).unwrap();
            assert_eq!(*result, Object::String(expected.to_string()));
        }
    }

    #[test]
    fn int_conversions() {
        assert_eq!(*Builtin::Int.apply(vec![string("42")]).unwrap(), Object::Integer(42));
        assert_eq!(*Builtin::Int.apply(vec![string("-7")]).unwrap(), Object::Integer(-7));
        assert_eq!(
            *Builtin::Int.apply(vec![Rc::new(Object::Float(3.9))]).unwrap(),
            Object::Integer(3)
        );
        assert_eq!(
            *Builtin::Int.apply(vec![Rc::new(Object::Float(-3.9))]).unwrap(),
            Object::Integer(-3)
        );
        assert_eq!(
            *Builtin::Int.apply(vec![Rc::new(Object::Boolean(true))]).unwrap(),
            Object::Integer(1)
        );

        let err = Builtin::Int.apply(vec![string("abc")]).unwrap_err();
        assert_eq!(err.name(), "ValueError");

        let err = Builtin::Int.apply(vec![array(vec![])]).unwrap_err();
        assert_eq!(err.name(), "TypeError");
    }

    #[test]
    fn float_conversions() {
        assert_eq!(
            *Builtin::Float.apply(vec![string("2.5")]).unwrap(),
            Object::Float(2.5)
        );
        assert_eq!(*Builtin::Float.apply(vec![int(2)]).unwrap(), Object::Float(2.0));

        let err = Builtin::Float.apply(vec![string("2.5x")]).unwrap_err();
        assert_eq!(err.name(), "ValueError");
    }

    #[test]
    fn str_uses_display_form() {
        assert_eq!(
            *Builtin::Str.apply(vec![Rc::new(Object::Null)]).unwrap(),
            Object::String("null".to_string())
        );
        assert_eq!(
            *Builtin::Str.apply(vec![Rc::new(Object::Boolean(true))]).unwrap(),
            Object::String("true".to_string())
        );
        assert_eq!(
            *Builtin::Str
                .apply(vec![array(vec![int(1), string("x")])])
                .unwrap(),
            Object::String("[1, \"x\"]".to_string())
        );
    }

    #[test]
    fn range_variants() {
        let result = Builtin::Range.apply(vec![int(3)]).unwrap();
        assert_eq!(*result, *array(vec![int(0), int(1), int(2)]));

        let result = Builtin::Range.apply(vec![int(2), int(5)]).unwrap();
        assert_eq!(*result, *array(vec![int(2), int(3), int(4)]));

        let result = Builtin::Range.apply(vec![int(5), int(0), int(-2)]).unwrap();
        assert_eq!(*result, *array(vec![int(5), int(3), int(1)]));

        // Start meeting or passing stop yields an empty array
        let result = Builtin::Range.apply(vec![int(5), int(5)]).unwrap();
        assert_eq!(*result, *array(vec![]));

        let err = Builtin::Range.apply(vec![int(0), int(5), int(0)]).unwrap_err();
        assert_eq!(err.name(), "ValueError");
    }

    #[test]
    fn push_mutates_and_returns_the_same_array() {
        let arr = array(vec![int(1)]);
        let result = Builtin::Push.apply(vec![Rc::clone(&arr), int(2)]).unwrap();

        assert_eq!(*arr, *array(vec![int(1), int(2)]));
        assert!(matches!(
            (&*result, &*arr),
            (Object::Array(a), Object::Array(b)) if Rc::ptr_eq(a, b)
        ));
    }

    #[test]
    fn pop_and_empty_pop() {
        let arr = array(vec![int(1), int(2)]);
        let result = Builtin::Pop.apply(vec![Rc::clone(&arr)]).unwrap();
        assert_eq!(*result, Object::Integer(2));
        assert_eq!(*arr, *array(vec![int(1)]));

        let err = Builtin::Pop.apply(vec![array(vec![])]).unwrap_err();
        assert_eq!(err.name(), "IndexError");
    }

    #[test]
    fn first_last_rest() {
        let arr = array(vec![int(1), int(2), int(3)]);
        assert_eq!(
            *Builtin::First.apply(vec![Rc::clone(&arr)]).unwrap(),
            Object::Integer(1)
        );
        assert_eq!(
            *Builtin::Last.apply(vec![Rc::clone(&arr)]).unwrap(),
            Object::Integer(3)
        );
        assert_eq!(
            *Builtin::Rest.apply(vec![Rc::clone(&arr)]).unwrap(),
            *array(vec![int(2), int(3)])
        );
        assert_eq!(*Builtin::Rest.apply(vec![array(vec![])]).unwrap(), *array(vec![]));
    }

    #[test]
    fn sorted_returns_a_new_array() {
        let arr = array(vec![int(3), int(1), int(2)]);
        let result = Builtin::Sorted.apply(vec![Rc::clone(&arr)]).unwrap();

        assert_eq!(*result, *array(vec![int(1), int(2), int(3)]));
        // The argument is untouched
        assert_eq!(*arr, *array(vec![int(3), int(1), int(2)]));
    }

    #[test]
    fn sorted_strings_and_mixed() {
        let result = Builtin::Sorted
            .apply(vec![array(vec![string("pear"), string("apple")])])
            .unwrap();
        assert_eq!(*result, *array(vec![string("apple"), string("pear")]));

        let err = Builtin::Sorted
            .apply(vec![array(vec![int(1), string("a")])])
            .unwrap_err();
        assert_eq!(err.name(), "TypeError");
    }

    #[test]
    fn join_requires_all_strings() {
        let result = Builtin::Join
            .apply(vec![array(vec![string("a"), string("b")]), string("-")])
            .unwrap();
        assert_eq!(*result, Object::String("a-b".to_string()));

        let err = Builtin::Join
            .apply(vec![array(vec![string("a"), int(1)]), string("-")])
            .unwrap_err();
        assert_eq!(err.name(), "TypeError");
    }

    #[test]
    fn keys_and_values_in_insertion_order() {
        let mut dict = Dict::new();
        dict.insert(Key::String("a".into()), int(1));
        dict.insert(Key::String("b".into()), int(2));
        let dict = Rc::new(Object::dict(dict));

        let keys = Builtin::Keys.apply(vec![Rc::clone(&dict)]).unwrap();
        assert_eq!(*keys, *array(vec![string("a"), string("b")]));

        let values = Builtin::Values.apply(vec![dict]).unwrap();
        assert_eq!(*values, *array(vec![int(1), int(2)]));
    }

    #[test]
    fn min_max_over_args_or_array() {
        assert_eq!(
            *Builtin::Min.apply(vec![int(3), int(1), int(2)]).unwrap(),
            Object::Integer(1)
        );
        assert_eq!(
            *Builtin::Max.apply(vec![array(vec![int(3), int(1), int(2)])]).unwrap(),
            Object::Integer(3)
        );
        // Int/float mixing keeps the original element
        assert_eq!(
            *Builtin::Min
                .apply(vec![int(2), Rc::new(Object::Float(1.5))])
                .unwrap(),
            Object::Float(1.5)
        );

        let err = Builtin::Min.apply(vec![array(vec![])]).unwrap_err();
        assert_eq!(err.name(), "ValueError");

        let err = Builtin::Max.apply(vec![string("a")]).unwrap_err();
        assert_eq!(err.name(), "TypeError");
    }

    #[test]
    fn sum_keeps_ints_int() {
        assert_eq!(
            *Builtin::Sum.apply(vec![array(vec![int(1), int(2), int(3)])]).unwrap(),
            Object::Integer(6)
        );
        assert_eq!(
            *Builtin::Sum
                .apply(vec![array(vec![int(1), Rc::new(Object::Float(0.5))])])
                .unwrap(),
            Object::Float(1.5)
        );
        assert_eq!(*Builtin::Sum.apply(vec![array(vec![])]).unwrap(), Object::Integer(0));
    }

    #[test]
    fn string_builtins() {
        assert_eq!(
            *Builtin::Upper.apply(vec![string("hi there")]).unwrap(),
            Object::String("HI THERE".to_string())
        );
        assert_eq!(
            *Builtin::Lower.apply(vec![string("Hi There")]).unwrap(),
            Object::String("hi there".to_string())
        );
        assert_eq!(
            *Builtin::Strip.apply(vec![string("  x  ")]).unwrap(),
            Object::String("x".to_string())
        );
        assert_eq!(
            *Builtin::Replace
                .apply(vec![string("a-b-c"), string("-"), string("+")])
                .unwrap(),
            Object::String("a+b+c".to_string())
        );
    }

    #[test]
    fn split_variants() {
        assert_eq!(
            *Builtin::Split.apply(vec![string("a,b,c"), string(",")]).unwrap(),
            *array(vec![string("a"), string("b"), string("c")])
        );
        assert_eq!(
            *Builtin::Split.apply(vec![string("  a  b ")]).unwrap(),
            *array(vec![string("a"), string("b")])
        );

        let err = Builtin::Split.apply(vec![string("ab"), string("")]).unwrap_err();
        assert_eq!(err.name(), "ValueError");
    }

    #[test]
    fn contains_on_each_container() {
        assert_eq!(
            *Builtin::Contains.apply(vec![string("hello"), string("ell")]).unwrap(),
            Object::Boolean(true)
        );
        assert_eq!(
            *Builtin::Contains
                .apply(vec![array(vec![int(1), int(2)]), Rc::new(Object::Float(2.0))])
                .unwrap(),
            Object::Boolean(true)
        );

        let mut dict = Dict::new();
        dict.insert(Key::String("a".into()), int(1));
        assert_eq!(
            *Builtin::Contains
                .apply(vec![Rc::new(Object::dict(dict)), string("a")])
                .unwrap(),
            Object::Boolean(true)
        );

        let err = Builtin::Contains.apply(vec![int(1), int(1)]).unwrap_err();
        assert_eq!(err.name(), "TypeError");
    }
}
