use std::{cell::RefCell, fmt, fmt::Display, rc::Rc};

use kira_parser::ast::{BlockExpression, IdentifierLiteral};

use crate::{builtin::Builtin, environment::Environment};

#[derive(Debug)]
pub enum Object {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Null,
    /// Shared by reference: aliases observe each other's mutations
    Array(Rc<RefCell<Vec<Rc<Object>>>>),
    /// Shared by reference, insertion-order preserving
    Dict(Rc<RefCell<Dict>>),
    Function(Function),
    Builtin(Builtin),
}

impl Object {
    pub fn array(elements: Vec<Rc<Object>>) -> Object {
        Object::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn dict(dict: Dict) -> Object {
        Object::Dict(Rc::new(RefCell::new(dict)))
    }

    pub fn typename(&self) -> &'static str {
        use Object::*;

        match self {
            Integer(_) => "int",
            Float(_) => "float",
            Boolean(_) => "bool",
            String(_) => "string",
            Null => "null",
            Array(_) => "array",
            Dict(_) => "dict",
            Function(_) => "function",
            Builtin(_) => "builtin",
        }
    }

    /// The boolean projection used by conditionals and `and`/`or`/`not`:
    /// `false`, `null`, `0`, `0.0`, `""`, `[]` and `{}` are falsy.
    pub fn is_truthy(&self) -> bool {
        use Object::*;

        match self {
            Boolean(value) => *value,
            Null => false,
            Integer(value) => *value != 0,
            Float(value) => *value != 0.0,
            String(value) => !value.is_empty(),
            Array(elements) => !elements.borrow().is_empty(),
            Dict(dict) => !dict.borrow().is_empty(),
            _ => true,
        }
    }

    /// Language-level `==`: cross-type numerics compare by value
    /// (`1 == 1.0`), containers compare element-wise, any other cross-type
    /// pair is unequal, and functions never compare equal.
    pub fn equals(&self, other: &Object) -> bool {
        use Object::*;

        match (self, other) {
            (Integer(a), Integer(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Integer(a), Float(b)) | (Float(b), Integer(a)) => *a as f64 == *b,
            (Boolean(a), Boolean(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Null, Null) => true,
            (Array(a), Array(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Dict(a), Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                // Order-insensitive: same keys, equal values
                a.len() == b.len()
                    && a.entries()
                        .iter()
                        .all(|(key, value)| match b.get(key) {
                            Some(other_value) => value.equals(&other_value),
                            None => false,
                        })
            }
            (Builtin(a), Builtin(b)) => a == b,
            _ => false,
        }
    }

    /// Converts the given value to a string in the format of a code object.
    ///
    /// Use this anywhere a programmer expects to see the code-version of a
    /// value (e.g. in the REPL).
    /// # Examples
    /// ```rust
    /// use kira_interpreter::object::Object;
    ///
    /// let obj = Object::String("hello world".to_string());
    ///
    /// assert_eq!(obj.to_code_string(), "\"hello world\"");
    /// ```
    pub fn to_code_string(&self) -> String {
        match self {
            Object::String(value) => format!("\"{}\"", escape_string(value)),
            value => value.to_string(),
        }
    }
}

/// Structural equality, used by tests; language `==` lives in [`Object::equals`].
impl PartialEq for Object {
    fn eq(&self, other: &Object) -> bool {
        use Object::*;

        match (self, other) {
            (Integer(a), Integer(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Boolean(a), Boolean(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Null, Null) => true,
            (Array(a), Array(b)) => *a.borrow() == *b.borrow(),
            (Dict(a), Dict(b)) => *a.borrow() == *b.borrow(),
            (Builtin(a), Builtin(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Object {
    /// The display form used by `print` and `str()`: strings render raw,
    /// container elements render in code form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Object::*;

        match self {
            Integer(value) => write!(f, "{}", value),
            Float(value) => write!(f, "{}", ryu::Buffer::new().format(*value)),
            Boolean(value) => write!(f, "{}", value),
            String(value) => write!(f, "{}", value),
            Null => write!(f, "null"),
            Array(elements) => {
                let elements: Vec<std::string::String> = elements
                    .borrow()
                    .iter()
                    .map(|e| e.to_code_string())
                    .collect();
                write!(f, "[{}]", elements.join(", "))
            }
            Dict(dict) => write!(f, "{}", *dict.borrow()),
            Function(func) => write!(f, "{}", func),
            Builtin(builtin) => write!(f, "{}", builtin),
        }
    }
}

/// A dict key: the hashable scalars.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Key {
    Integer(i64),
    Boolean(bool),
    String(String),
}

impl Key {
    /// Convert a value to a key, if the value is hashable.
    pub fn from_object(obj: &Object) -> Option<Key> {
        match obj {
            Object::Integer(value) => Some(Key::Integer(*value)),
            Object::Boolean(value) => Some(Key::Boolean(*value)),
            Object::String(value) => Some(Key::String(value.clone())),
            _ => None,
        }
    }

    pub fn to_object(&self) -> Object {
        match self {
            Key::Integer(value) => Object::Integer(*value),
            Key::Boolean(value) => Object::Boolean(*value),
            Key::String(value) => Object::String(value.clone()),
        }
    }
}

impl Display for Key {
    /// Code form; used inside dict display and in `KeyError` messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Integer(value) => write!(f, "{}", value),
            Key::Boolean(value) => write!(f, "{}", value),
            Key::String(value) => write!(f, "\"{}\"", escape_string(value)),
        }
    }
}

/// An insertion-order preserving map. Lookups scan the entry list, which is
/// plenty for the dict sizes a script language sees.
#[derive(Debug, Default, PartialEq)]
pub struct Dict {
    entries: Vec<(Key, Rc<Object>)>,
}

impl Dict {
    pub fn new() -> Dict {
        Dict {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Key) -> Option<Rc<Object>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| Rc::clone(value))
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert or overwrite; an overwritten key keeps its original position.
    pub fn insert(&mut self, key: Key, value: Rc<Object>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn entries(&self) -> &[(Key, Rc<Object>)] {
        &self.entries
    }
}

impl Display for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .entries
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value.to_code_string()))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

pub struct Function {
    /// Set for `fn name(...)` declarations, `None` for anonymous literals
    pub name: Option<String>,
    pub parameters: Vec<IdentifierLiteral>,
    pub body: Rc<BlockExpression>,
    /// The lexical environment active at definition, shared by reference
    pub env: Rc<RefCell<Environment>>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The captured environment may contain this function; keep it out of
        // the debug output
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<fn {}>", name),
            None => write!(f, "<fn>"),
        }
    }
}

fn escape_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use kira_parser::ast::BlockExpression;

    use crate::builtin::Builtin;
    use crate::environment::Environment;
    use crate::object::{Dict, Function, Key, Object};

    #[test]
    fn display_forms() {
        assert_eq!(Object::Integer(42).to_string(), "42");
        assert_eq!(Object::Float(1.0).to_string(), "1.0");
        assert_eq!(Object::Float(3.75).to_string(), "3.75");
        assert_eq!(Object::Boolean(true).to_string(), "true");
        assert_eq!(Object::Null.to_string(), "null");
        assert_eq!(Object::String("hi".into()).to_string(), "hi");
        assert_eq!(Object::String("hi".into()).to_code_string(), "\"hi\"");
        assert_eq!(
            Object::String("a\"b\nc".into()).to_code_string(),
            "\"a\\\"b\\nc\""
        );
    }

    #[test]
    fn array_display_quotes_elements() {
        let arr = Object::array(vec![
            Rc::new(Object::Integer(1)),
            Rc::new(Object::String("two".into())),
        ]);
        assert_eq!(arr.to_string(), "[1, \"two\"]");
    }

    #[test]
    fn dict_display_keeps_insertion_order() {
        let mut dict = Dict::new();
        dict.insert(Key::String("b".into()), Rc::new(Object::Integer(2)));
        dict.insert(Key::String("a".into()), Rc::new(Object::Integer(1)));
        dict.insert(Key::String("b".into()), Rc::new(Object::Integer(9)));

        assert_eq!(Object::dict(dict).to_string(), "{\"b\": 9, \"a\": 1}");
    }

    #[test]
    fn truthiness() {
        assert!(!Object::Boolean(false).is_truthy());
        assert!(!Object::Null.is_truthy());
        assert!(!Object::Integer(0).is_truthy());
        assert!(!Object::Float(0.0).is_truthy());
        assert!(!Object::String("".into()).is_truthy());
        assert!(!Object::array(vec![]).is_truthy());
        assert!(!Object::dict(Dict::new()).is_truthy());

        assert!(Object::Integer(-1).is_truthy());
        assert!(Object::String(" ".into()).is_truthy());
        assert!(Object::array(vec![Rc::new(Object::Null)]).is_truthy());
    }

    #[test]
    fn cross_type_equality() {
        assert!(Object::Integer(1).equals(&Object::Float(1.0)));
        assert!(Object::Float(2.5).equals(&Object::Float(2.5)));
        assert!(!Object::Integer(1).equals(&Object::String("1".into())));
        assert!(!Object::Boolean(true).equals(&Object::Integer(1)));
        assert!(Object::Null.equals(&Object::Null));
    }

    #[test]
    fn array_equality_is_element_wise() {
        let a = Object::array(vec![Rc::new(Object::Integer(1)), Rc::new(Object::Float(2.0))]);
        let b = Object::array(vec![Rc::new(Object::Integer(1)), Rc::new(Object::Integer(2))]);
        assert!(a.equals(&b));

        let c = Object::array(vec![Rc::new(Object::Integer(1))]);
        assert!(!a.equals(&c));
    }

    #[test]
    fn builtin_equality_is_by_builtin() {
        assert!(Object::Builtin(Builtin::Len).equals(&Object::Builtin(Builtin::Len)));
        assert!(!Object::Builtin(Builtin::Len).equals(&Object::Builtin(Builtin::Push)));
        assert!(!Object::Builtin(Builtin::Len).equals(&Object::Integer(1)));
    }

    #[test]
    fn functions_never_compare_equal() {
        let function = make_function();

        assert!(!function.equals(&make_function()));
        // Not even to themselves
        assert!(!function.equals(&function));
        assert!(!function.equals(&Object::Builtin(Builtin::Len)));
    }

    fn make_function() -> Object {
        Object::Function(Function {
            name: None,
            parameters: Vec::new(),
            body: Rc::new(BlockExpression {
                statements: Vec::new(),
            }),
            env: Rc::new(RefCell::new(Environment::new())),
        })
    }

    #[test]
    fn dict_equality_ignores_order() {
        let mut first = Dict::new();
        first.insert(Key::String("a".into()), Rc::new(Object::Integer(1)));
        first.insert(Key::String("b".into()), Rc::new(Object::Integer(2)));

        let mut second = Dict::new();
        second.insert(Key::String("b".into()), Rc::new(Object::Integer(2)));
        second.insert(Key::String("a".into()), Rc::new(Object::Integer(1)));

        assert!(Object::dict(first).equals(&Object::dict(second)));
    }
}
