use std::{cell::RefCell, rc::Rc};

use kira_parser::ast::{
    AssignExpression, AssignTarget, BlockExpression, DictLiteral, Expression, ForStatement,
    IfExpression, InfixExpression, Program, Statement, WhileStatement,
};
use kira_parser::position::Position;
use kira_parser::token::Token;

use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::object::{Dict, Function, Key, Object};

/// Call-depth guard: deep enough for real programs, shallow enough that the
/// host stack is never at risk.
const MAX_CALL_DEPTH: usize = 500;

/// A non-local exit unwinding through the tree walk: a `return` on its way to
/// the call boundary, `break`/`continue` on their way to the enclosing loop,
/// or a runtime error on its way to the driver.
#[derive(Debug)]
pub enum Signal {
    Return(Rc<Object>),
    Break,
    Continue,
    Error(RuntimeError),
}

impl From<RuntimeError> for Signal {
    fn from(err: RuntimeError) -> Signal {
        Signal::Error(err)
    }
}

type Flow = Result<Rc<Object>, Signal>;

fn raise(err: RuntimeError, pos: Position) -> Signal {
    Signal::Error(err.at(pos))
}

pub struct Evaluator {
    env: Rc<RefCell<Environment>>,
    call_depth: usize,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::new_with_env(Environment::new_global())
    }

    pub fn new_with_env(env: Rc<RefCell<Environment>>) -> Self {
        Evaluator { env, call_depth: 0 }
    }

    pub fn eval(&mut self, prog: &Program) -> Result<Rc<Object>, RuntimeError> {
        let mut result = Rc::new(Object::Null);

        for stmt in &prog.statements {
            match self.eval_statement(stmt) {
                Ok(value) => result = value,
                // A top-level return ends the program with its value
                Err(Signal::Return(value)) => return Ok(value),
                Err(Signal::Error(err)) => return Err(err),
                // The parser rejects break/continue outside of loops
                Err(Signal::Break) | Err(Signal::Continue) => break,
            }
        }

        Ok(result)
    }

    /// Expression statements evaluate to their value; every other statement
    /// evaluates to null, which is what makes the block-value rule fall out
    /// of "value of the last statement".
    fn eval_statement(&mut self, stmt: &Statement) -> Flow {
        match stmt {
            Statement::Expression { expression } => self.eval_expression(expression),

            Statement::Let { name, value, pos } => {
                let value = self.eval_expression(value)?;
                self.env
                    .borrow_mut()
                    .define(name, value, true)
                    .map_err(|err| raise(err, *pos))?;
                Ok(Rc::new(Object::Null))
            }

            Statement::Const { name, value, pos } => {
                let value = self.eval_expression(value)?;
                self.env
                    .borrow_mut()
                    .define(name, value, false)
                    .map_err(|err| raise(err, *pos))?;
                Ok(Rc::new(Object::Null))
            }

            Statement::Function(decl) => {
                let function = Object::Function(Function {
                    name: Some(decl.name.clone()),
                    parameters: decl.parameters.clone(),
                    body: Rc::clone(&decl.body),
                    // The defining frame itself, shared by reference, so the
                    // body sees the binding made right below and can recurse
                    env: Rc::clone(&self.env),
                });
                self.env
                    .borrow_mut()
                    .define(&decl.name, Rc::new(function), true)
                    .map_err(|err| raise(err, decl.pos))?;
                Ok(Rc::new(Object::Null))
            }

            Statement::Return { value, .. } => {
                let value = match value {
                    Some(expression) => self.eval_expression(expression)?,
                    None => Rc::new(Object::Null),
                };
                Err(Signal::Return(value))
            }

            Statement::While(stmt) => self.eval_while_statement(stmt),
            Statement::For(stmt) => self.eval_for_statement(stmt),

            Statement::Break { .. } => Err(Signal::Break),
            Statement::Continue { .. } => Err(Signal::Continue),
        }
    }

    fn eval_while_statement(&mut self, stmt: &WhileStatement) -> Flow {
        loop {
            let condition = self.eval_expression(&stmt.condition)?;
            if !condition.is_truthy() {
                break;
            }

            match self.eval_block(&stmt.body) {
                Ok(_) => {}
                Err(Signal::Break) => break,
                Err(Signal::Continue) => {}
                Err(signal) => return Err(signal),
            }
        }

        Ok(Rc::new(Object::Null))
    }

    fn eval_for_statement(&mut self, stmt: &ForStatement) -> Flow {
        let iterable = self.eval_expression(&stmt.iterable)?;

        // The iterable is evaluated once and its elements snapshotted, so
        // body mutations cannot upset the iteration
        let items: Vec<Rc<Object>> = match &*iterable {
            Object::Array(elements) => elements.borrow().clone(),
            Object::String(s) => s
                .chars()
                .map(|c| Rc::new(Object::String(c.to_string())))
                .collect(),
            // Dicts iterate their keys in insertion order
            Object::Dict(dict) => dict
                .borrow()
                .entries()
                .iter()
                .map(|(key, _)| Rc::new(key.to_object()))
                .collect(),
            other => {
                return Err(raise(
                    RuntimeError::type_error(format!(
                        "cannot iterate over `{}`",
                        other.typename()
                    )),
                    stmt.pos,
                ))
            }
        };

        let previous = Rc::clone(&self.env);
        for item in items {
            // Fresh scope per iteration: closures made in the body capture
            // that iteration's binding
            let mut frame = Environment::new_enclosed(Rc::clone(&previous));
            frame.bind(&stmt.variable, item);
            self.env = Rc::new(RefCell::new(frame));

            let outcome = self.eval_statements(&stmt.body.statements);
            self.env = Rc::clone(&previous);

            match outcome {
                Ok(_) => {}
                Err(Signal::Break) => break,
                Err(Signal::Continue) => {}
                Err(signal) => return Err(signal),
            }
        }

        Ok(Rc::new(Object::Null))
    }

    /// Evaluate a block in a fresh child scope. The block's value is that of
    /// its final statement when that statement is an expression, else null.
    fn eval_block(&mut self, block: &BlockExpression) -> Flow {
        let previous = Rc::clone(&self.env);
        self.env = Rc::new(RefCell::new(Environment::new_enclosed(Rc::clone(
            &previous,
        ))));

        let result = self.eval_statements(&block.statements);

        self.env = previous;
        result
    }

    fn eval_statements(&mut self, statements: &[Statement]) -> Flow {
        let mut result = Rc::new(Object::Null);
        for stmt in statements {
            result = self.eval_statement(stmt)?;
        }
        Ok(result)
    }

    fn eval_expression(&mut self, expr: &Expression) -> Flow {
        match expr {
            Expression::Integer(value) => Ok(Rc::new(Object::Integer(*value))),
            Expression::Float(value) => Ok(Rc::new(Object::Float(*value))),
            Expression::Boolean(value) => Ok(Rc::new(Object::Boolean(*value))),
            Expression::String(value) => Ok(Rc::new(Object::String(value.clone()))),
            Expression::Null => Ok(Rc::new(Object::Null)),

            Expression::Identifier(ident) => match self.env.borrow().get(&ident.name) {
                Some(value) => Ok(value),
                None => Err(raise(
                    RuntimeError::name_error(format!("undefined variable '{}'", ident.name)),
                    ident.pos,
                )),
            },

            Expression::Prefix(prefix) => {
                let right = self.eval_expression(&prefix.right)?;
                eval_prefix_expression(&prefix.operator, right, prefix.pos)
            }

            Expression::Infix(infix) => {
                // Short-circuiting operators evaluate their own operands
                if infix.operator == Token::And || infix.operator == Token::Or {
                    return self.eval_logical_expression(infix);
                }

                let left = self.eval_expression(&infix.left)?;
                let right = self.eval_expression(&infix.right)?;
                eval_infix_expression(&infix.operator, &left, &right, infix.pos)
            }

            Expression::Assign(assign) => self.eval_assign_expression(assign),

            Expression::Block(block) => self.eval_block(block),
            Expression::If(if_expr) => self.eval_if_expression(if_expr),

            Expression::Array(arr) => {
                let mut elements = Vec::with_capacity(arr.elements.len());
                for element in &arr.elements {
                    elements.push(self.eval_expression(element)?);
                }
                Ok(Rc::new(Object::array(elements)))
            }

            Expression::Dict(dict) => self.eval_dict_literal(dict),

            Expression::Index(index) => {
                let object = self.eval_expression(&index.object)?;
                let key = self.eval_expression(&index.index)?;
                eval_index_expression(&object, &key, index.pos)
            }

            Expression::Function(func) => Ok(Rc::new(Object::Function(Function {
                name: None,
                parameters: func.parameters.clone(),
                body: Rc::clone(&func.body),
                env: Rc::clone(&self.env),
            }))),

            Expression::Call(call) => {
                let function = self.eval_expression(&call.function)?;
                let mut args = Vec::with_capacity(call.arguments.len());
                for argument in &call.arguments {
                    args.push(self.eval_expression(argument)?);
                }
                self.apply_function(&function, args, call.pos)
            }
        }
    }

    fn eval_logical_expression(&mut self, infix: &InfixExpression) -> Flow {
        let left = self.eval_expression(&infix.left)?;

        // `and`/`or` yield the deciding operand itself, not a coerced bool
        match infix.operator {
            Token::And if !left.is_truthy() => Ok(left),
            Token::Or if left.is_truthy() => Ok(left),
            _ => self.eval_expression(&infix.right),
        }
    }

    fn eval_if_expression(&mut self, if_expr: &IfExpression) -> Flow {
        let condition = self.eval_expression(&if_expr.condition)?;

        if condition.is_truthy() {
            self.eval_block(&if_expr.consequence)
        } else if let Some(alternative) = &if_expr.alternative {
            self.eval_expression(alternative)
        } else {
            Ok(Rc::new(Object::Null))
        }
    }

    fn eval_dict_literal(&mut self, literal: &DictLiteral) -> Flow {
        let mut dict = Dict::new();

        // Pairs evaluate in source order, key before value; a repeated key
        // overwrites but keeps its first position
        for (key_expr, value_expr) in &literal.pairs {
            let key_obj = self.eval_expression(key_expr)?;
            let key = match Key::from_object(&key_obj) {
                Some(key) => key,
                None => {
                    return Err(raise(
                        RuntimeError::type_error(format!(
                            "unhashable dict key: `{}`",
                            key_obj.typename()
                        )),
                        literal.pos,
                    ))
                }
            };

            let value = self.eval_expression(value_expr)?;
            dict.insert(key, value);
        }

        Ok(Rc::new(Object::dict(dict)))
    }

    fn eval_assign_expression(&mut self, assign: &AssignExpression) -> Flow {
        match &assign.target {
            AssignTarget::Identifier(ident) => {
                let value = match compound_operator(&assign.operator) {
                    None => self.eval_expression(&assign.value)?,
                    Some(op) => {
                        // Read-modify-write: the target is read before the
                        // right-hand side runs
                        let current = match self.env.borrow().get(&ident.name) {
                            Some(value) => value,
                            None => {
                                return Err(raise(
                                    RuntimeError::name_error(format!(
                                        "undefined variable '{}'",
                                        ident.name
                                    )),
                                    ident.pos,
                                ))
                            }
                        };
                        let rhs = self.eval_expression(&assign.value)?;
                        eval_infix_expression(&op, &current, &rhs, assign.pos)?
                    }
                };

                self.env
                    .borrow_mut()
                    .assign(&ident.name, Rc::clone(&value))
                    .map_err(|err| raise(err, assign.pos))?;

                // An assignment evaluates to the assigned value
                Ok(value)
            }

            AssignTarget::Index(index) => {
                let object = self.eval_expression(&index.object)?;
                let key = self.eval_expression(&index.index)?;

                let value = match compound_operator(&assign.operator) {
                    None => self.eval_expression(&assign.value)?,
                    Some(op) => {
                        let current = eval_index_expression(&object, &key, index.pos)?;
                        let rhs = self.eval_expression(&assign.value)?;
                        eval_infix_expression(&op, &current, &rhs, assign.pos)?
                    }
                };

                assign_index(&object, &key, Rc::clone(&value), index.pos)?;
                Ok(value)
            }
        }
    }

    fn apply_function(
        &mut self,
        function: &Rc<Object>,
        args: Vec<Rc<Object>>,
        pos: Position,
    ) -> Flow {
        match &**function {
            Object::Function(func) => {
                if args.len() != func.parameters.len() {
                    return Err(raise(
                        RuntimeError::arity_error(format!(
                            "{} expected {} argument(s) but got {}",
                            func,
                            func.parameters.len(),
                            args.len()
                        )),
                        pos,
                    ));
                }

                if self.call_depth >= MAX_CALL_DEPTH {
                    return Err(raise(
                        RuntimeError::recursion_error("maximum call depth exceeded"),
                        pos,
                    ));
                }

                // Fresh frame enclosed by the closure's captured environment,
                // not the caller's
                let mut scoped_env = Environment::new_enclosed(Rc::clone(&func.env));
                for (parameter, value) in func.parameters.iter().zip(args) {
                    scoped_env.bind(&parameter.name, value);
                }

                // Remember the caller's environment for when the call exits
                let current_env = Rc::clone(&self.env);
                self.env = Rc::new(RefCell::new(scoped_env));
                self.call_depth += 1;

                let result = self.eval_statements(&func.body.statements);

                self.call_depth -= 1;
                self.env = current_env;

                match result {
                    // `return` is consumed at the call boundary; falling off
                    // the end yields the body's value (implicit return)
                    Err(Signal::Return(value)) => Ok(value),
                    other => other,
                }
            }

            // Builtins check their own contracts
            Object::Builtin(builtin) => match builtin.apply(args) {
                Ok(value) => Ok(value),
                Err(err) => Err(raise(err, pos)),
            },

            other => Err(raise(
                RuntimeError::type_error(format!("`{}` is not callable", other.typename())),
                pos,
            )),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}

/// `+=` and `-=` desugar to the matching infix operator.
fn compound_operator(operator: &Token) -> Option<Token> {
    match operator {
        Token::PlusEqual => Some(Token::Plus),
        Token::MinusEqual => Some(Token::Minus),
        _ => None,
    }
}

fn eval_prefix_expression(operator: &Token, right: Rc<Object>, pos: Position) -> Flow {
    match operator {
        Token::Not => Ok(Rc::new(Object::Boolean(!right.is_truthy()))),
        Token::Minus => match &*right {
            Object::Integer(value) => Ok(Rc::new(Object::Integer(value.wrapping_neg()))),
            Object::Float(value) => Ok(Rc::new(Object::Float(-value))),
            other => Err(raise(
                RuntimeError::type_error(format!(
                    "unsupported operand type for -: `{}`",
                    other.typename()
                )),
                pos,
            )),
        },
        Token::Plus => match &*right {
            Object::Integer(_) | Object::Float(_) => Ok(right),
            other => Err(raise(
                RuntimeError::type_error(format!(
                    "unsupported operand type for +: `{}`",
                    other.typename()
                )),
                pos,
            )),
        },
        // The parser only produces the three operators above in prefix position
        operator => Err(raise(
            RuntimeError::type_error(format!("unknown prefix operator {}", operator)),
            pos,
        )),
    }
}

fn eval_infix_expression(
    operator: &Token,
    left: &Rc<Object>,
    right: &Rc<Object>,
    pos: Position,
) -> Flow {
    // Equality is defined for every pair of values and never errors
    match operator {
        Token::EqualEqual => return Ok(Rc::new(Object::Boolean(left.equals(right)))),
        Token::BangEqual => return Ok(Rc::new(Object::Boolean(!left.equals(right)))),
        _ => {}
    }

    match (&**left, &**right) {
        (Object::Integer(l), Object::Integer(r)) => eval_integer_infix(operator, *l, *r, pos),
        (Object::Float(l), Object::Float(r)) => eval_float_infix(operator, *l, *r, pos),
        (Object::Float(l), Object::Integer(r)) => eval_float_infix(operator, *l, *r as f64, pos),
        (Object::Integer(l), Object::Float(r)) => eval_float_infix(operator, *l as f64, *r, pos),
        (Object::String(l), Object::String(r)) => eval_string_infix(operator, l, r, pos),
        (Object::Array(l), Object::Array(r)) if *operator == Token::Plus => {
            // Concatenation into a new array; neither operand is mutated
            let mut elements = l.borrow().clone();
            elements.extend(r.borrow().iter().map(Rc::clone));
            Ok(Rc::new(Object::array(elements)))
        }
        (l, r) => Err(raise(
            RuntimeError::type_error(format!(
                "unsupported operand type(s) for {}: `{}` and `{}`",
                operator,
                l.typename(),
                r.typename()
            )),
            pos,
        )),
    }
}

fn eval_integer_infix(operator: &Token, left: i64, right: i64, pos: Position) -> Flow {
    let result = match operator {
        // Arithmetic wraps on overflow (64-bit two's complement)
        Token::Plus => Object::Integer(left.wrapping_add(right)),
        Token::Minus => Object::Integer(left.wrapping_sub(right)),
        Token::Star => Object::Integer(left.wrapping_mul(right)),

        // True division: `/` always yields a float
        Token::Slash => {
            if right == 0 {
                return Err(raise(RuntimeError::zero_division("division by zero"), pos));
            }
            Object::Float(left as f64 / right as f64)
        }

        // Truncated toward zero
        Token::Percent => {
            if right == 0 {
                return Err(raise(RuntimeError::zero_division("modulo by zero"), pos));
            }
            Object::Integer(left.wrapping_rem(right))
        }

        // Int base with a non-negative int exponent stays an int; a negative
        // exponent forces a float
        Token::StarStar => {
            if right >= 0 {
                let exponent = u32::try_from(right).unwrap_or(u32::MAX);
                Object::Integer(left.wrapping_pow(exponent))
            } else {
                Object::Float((left as f64).powf(right as f64))
            }
        }

        Token::LessThan => Object::Boolean(left < right),
        Token::LessEqual => Object::Boolean(left <= right),
        Token::GreaterThan => Object::Boolean(left > right),
        Token::GreaterEqual => Object::Boolean(left >= right),

        operator => {
            return Err(raise(
                RuntimeError::type_error(format!(
                    "unsupported operand type(s) for {}: `int` and `int`",
                    operator
                )),
                pos,
            ))
        }
    };

    Ok(Rc::new(result))
}

fn eval_float_infix(operator: &Token, left: f64, right: f64, pos: Position) -> Flow {
    let result = match operator {
        Token::Plus => Object::Float(left + right),
        Token::Minus => Object::Float(left - right),
        Token::Star => Object::Float(left * right),

        Token::Slash => {
            if right == 0.0 {
                return Err(raise(RuntimeError::zero_division("division by zero"), pos));
            }
            Object::Float(left / right)
        }

        Token::Percent => {
            if right == 0.0 {
                return Err(raise(RuntimeError::zero_division("modulo by zero"), pos));
            }
            Object::Float(left % right)
        }

        Token::StarStar => Object::Float(left.powf(right)),

        Token::LessThan => Object::Boolean(left < right),
        Token::LessEqual => Object::Boolean(left <= right),
        Token::GreaterThan => Object::Boolean(left > right),
        Token::GreaterEqual => Object::Boolean(left >= right),

        operator => {
            return Err(raise(
                RuntimeError::type_error(format!(
                    "unsupported operand type(s) for {}: `float` and `float`",
                    operator
                )),
                pos,
            ))
        }
    };

    Ok(Rc::new(result))
}

fn eval_string_infix(operator: &Token, left: &str, right: &str, pos: Position) -> Flow {
    let result = match operator {
        Token::Plus => Object::String(left.to_owned() + right),

        // Lexicographic comparison
        Token::LessThan => Object::Boolean(left < right),
        Token::LessEqual => Object::Boolean(left <= right),
        Token::GreaterThan => Object::Boolean(left > right),
        Token::GreaterEqual => Object::Boolean(left >= right),

        operator => {
            return Err(raise(
                RuntimeError::type_error(format!(
                    "unsupported operand type(s) for {}: `string` and `string`",
                    operator
                )),
                pos,
            ))
        }
    };

    Ok(Rc::new(result))
}

fn eval_index_expression(object: &Rc<Object>, key: &Rc<Object>, pos: Position) -> Flow {
    match &**object {
        Object::Array(elements) => match &**key {
            Object::Integer(index) => {
                let elements = elements.borrow();
                // Negative indices are not supported
                if *index < 0 || *index as usize >= elements.len() {
                    return Err(raise(
                        RuntimeError::index_error(format!(
                            "array index out of bounds: {} (length {})",
                            index,
                            elements.len()
                        )),
                        pos,
                    ));
                }
                Ok(Rc::clone(&elements[*index as usize]))
            }
            other => Err(raise(
                RuntimeError::type_error(format!(
                    "array index must be an int, got `{}`",
                    other.typename()
                )),
                pos,
            )),
        },

        Object::String(s) => match &**key {
            Object::Integer(index) => {
                // Indexing yields a one-character string, by code point
                let c = if *index < 0 {
                    None
                } else {
                    s.chars().nth(*index as usize)
                };
                match c {
                    Some(c) => Ok(Rc::new(Object::String(c.to_string()))),
                    None => Err(raise(
                        RuntimeError::index_error(format!("string index out of bounds: {}", index)),
                        pos,
                    )),
                }
            }
            other => Err(raise(
                RuntimeError::type_error(format!(
                    "string index must be an int, got `{}`",
                    other.typename()
                )),
                pos,
            )),
        },

        Object::Dict(dict) => match Key::from_object(key) {
            Some(key) => match dict.borrow().get(&key) {
                Some(value) => Ok(value),
                None => Err(raise(
                    RuntimeError::key_error(format!("key not found: {}", key)),
                    pos,
                )),
            },
            None => Err(raise(
                RuntimeError::type_error(format!("unhashable dict key: `{}`", key.typename())),
                pos,
            )),
        },

        other => Err(raise(
            RuntimeError::type_error(format!(
                "index operator not supported for `{}`",
                other.typename()
            )),
            pos,
        )),
    }
}

fn assign_index(
    object: &Rc<Object>,
    key: &Rc<Object>,
    value: Rc<Object>,
    pos: Position,
) -> Result<(), Signal> {
    match &**object {
        Object::Array(elements) => match &**key {
            Object::Integer(index) => {
                let mut elements = elements.borrow_mut();
                if *index < 0 || *index as usize >= elements.len() {
                    return Err(raise(
                        RuntimeError::index_error(format!(
                            "array index out of bounds: {} (length {})",
                            index,
                            elements.len()
                        )),
                        pos,
                    ));
                }
                elements[*index as usize] = value;
                Ok(())
            }
            other => Err(raise(
                RuntimeError::type_error(format!(
                    "array index must be an int, got `{}`",
                    other.typename()
                )),
                pos,
            )),
        },

        // Dicts insert or overwrite
        Object::Dict(dict) => match Key::from_object(key) {
            Some(key) => {
                dict.borrow_mut().insert(key, value);
                Ok(())
            }
            None => Err(raise(
                RuntimeError::type_error(format!("unhashable dict key: `{}`", key.typename())),
                pos,
            )),
        },

        other => Err(raise(
            RuntimeError::type_error(format!(
                "`{}` does not support index assignment",
                other.typename()
            )),
            pos,
        )),
    }
}
