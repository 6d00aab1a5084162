//! Core dictionary words.
//!
//! Every word reports failures as a returned error line and leaves the stack
//! no worse than the pops it already performed; interpretation continues
//! afterwards.

use super::value::{
    collect_array, format_value, pop, pop_block, pop_number, Stack, Value,
};
use super::{Output, State, Word};
use crate::world::World;

pub fn install_core_words(dictionary: &super::Dictionary) {
    dictionary.insert("+", Word::Builtin(w_add));
    dictionary.insert("-", Word::Builtin(w_sub));
    dictionary.insert("*", Word::Builtin(w_mul));
    dictionary.insert("/", Word::Builtin(w_div));
    dictionary.insert("dup", Word::Builtin(w_dup));
    dictionary.insert("drop", Word::Builtin(w_drop));
    dictionary.insert("swap", Word::Builtin(w_swap));
    dictionary.insert(":", Word::Builtin(w_colon));
    dictionary.insert(";", Word::Builtin(w_semicolon));
    dictionary.insert("[", Word::Builtin(w_array_start));
    dictionary.insert("]", Word::Builtin(w_array_end));
    dictionary.insert("{", Word::Builtin(w_block_start));
    dictionary.insert("}", Word::Builtin(w_block_end));
    dictionary.insert("exec", Word::Builtin(w_exec));
    dictionary.insert("backtick", Word::Builtin(w_backtick));
    dictionary.insert("set", Word::Builtin(w_set));
    dictionary.insert("get", Word::Builtin(w_get));
    dictionary.insert("print-stack", Word::Builtin(w_print_stack));
    dictionary.insert("print-array", Word::Builtin(w_print_array));
    dictionary.insert(".", Word::Builtin(w_dot));
}

fn binary_number_op(stack: &mut Stack, op: fn(f64, f64) -> f64) -> Result<Output, String> {
    if stack.len() < 2 {
        return Err("stack underflow".to_string());
    }
    let b = pop_number(stack)?;
    let a = match pop_number(stack) {
        Ok(a) => a,
        Err(e) => {
            stack.push(Value::Number(b));
            return Err(e);
        }
    };
    stack.push(Value::Number(op(a, b)));
    Ok(Output::new())
}

fn w_add(_world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    binary_number_op(stack, |a, b| a + b)
}

fn w_sub(_world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    binary_number_op(stack, |a, b| a - b)
}

fn w_mul(_world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    binary_number_op(stack, |a, b| a * b)
}

fn w_div(_world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    binary_number_op(stack, |a, b| a / b)
}

fn w_dup(_world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let top = stack.last().cloned().ok_or("stack underflow")?;
    stack.push(top);
    Ok(Output::new())
}

fn w_drop(_world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    pop(stack)?;
    Ok(Output::new())
}

fn w_swap(_world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    if stack.len() < 2 {
        return Err("stack underflow".to_string());
    }
    let len = stack.len();
    stack.swap(len - 1, len - 2);
    Ok(Output::new())
}

fn w_colon(_world: &mut World, _stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    if state.compiling {
        return Err("nested definitions not allowed".to_string());
    }
    state.compiling = true;
    state.current_word = None;
    state.current_definition.clear();
    Ok(Output::new())
}

fn w_semicolon(_world: &mut World, _stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    if !state.compiling {
        return Err("not in compilation mode".to_string());
    }
    let Some(name) = state.current_word.take() else {
        return Err("no word name provided".to_string());
    };
    let definition = std::mem::take(&mut state.current_definition);
    state.dictionary.insert(name, Word::User(definition));
    state.compiling = false;
    Ok(Output::new())
}

fn w_array_start(_world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    stack.push(Value::ArrayMarker);
    Ok(Output::new())
}

fn w_array_end(_world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let items = collect_array(stack).map_err(|e| format!("Error creating array: {e}"))?;
    stack.push(Value::Array(items));
    Ok(Output::new())
}

fn w_block_start(_world: &mut World, _stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    state.collecting_block = true;
    state.current_definition.clear();
    Ok(Output::new())
}

// Only reachable outside a collection: the interpreter consumes the closing
// brace of an open block itself.
fn w_block_end(_world: &mut World, _stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    Err("not in quoted block mode".to_string())
}

fn w_exec(world: &mut World, stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    let tokens = pop_block(stack)?;
    Ok(super::interpret(&tokens.join(" "), stack, state, world))
}

fn w_backtick(_world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let tokens = pop_block(stack)?;
    let wrapped = tokens.into_iter().map(|t| format!("`{t}`")).collect();
    stack.push(Value::Block(wrapped));
    Ok(Output::new())
}

fn w_set(_world: &mut World, stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    if stack.len() < 2 {
        return Err("stack underflow".to_string());
    }
    if !matches!(
        stack[stack.len() - 2],
        Value::Text(_) | Value::Symbol(_)
    ) {
        return Err("name must be a string".to_string());
    }
    let value = pop(stack)?;
    let name = match pop(stack)? {
        Value::Text(name) | Value::Symbol(name) => name,
        _ => unreachable!(),
    };
    state.globals.set(name, value);
    Ok(Output::new())
}

fn w_get(_world: &mut World, stack: &mut Stack, state: &mut State) -> Result<Output, String> {
    let name = match stack.last() {
        None => return Err("stack underflow".to_string()),
        Some(Value::Text(name) | Value::Symbol(name)) => name.clone(),
        Some(_) => return Err("name must be a string".to_string()),
    };
    let Some(value) = state.globals.get(&name) else {
        return Err(format!("undefined variable: {name}"));
    };
    stack.pop();
    stack.push(value);
    Ok(Output::new())
}

fn w_print_stack(_world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    if stack.is_empty() {
        return Ok(vec!["<empty stack>".to_string()]);
    }
    let lines: Vec<String> = stack.iter().rev().map(format_value).collect();
    Ok(vec![lines.join("\n")])
}

fn w_print_array(_world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    match stack.last() {
        None => Err("stack underflow".to_string()),
        Some(Value::Array(_)) => {
            let Some(Value::Array(items)) = stack.pop() else {
                unreachable!()
            };
            let elements: Vec<String> = items.iter().map(format_value).collect();
            Ok(vec![format!("[ {} ]", elements.join(" "))])
        }
        Some(_) => Err("top item is not an array".to_string()),
    }
}

fn w_dot(_world: &mut World, stack: &mut Stack, _state: &mut State) -> Result<Output, String> {
    let item = pop(stack)?;
    Ok(vec![format_value(&item)])
}
