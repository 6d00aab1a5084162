//! The stack interpreter.
//!
//! Input is tokenized, then each token is dispatched through a fixed rule
//! order: block collection, word compilation, `$` carry-through, dictionary
//! lookup, number, string literal, symbol literal. The first matching rule
//! wins; an unknown word halts interpretation and reports it.
//!
//! Built-in words may re-enter [`interpret`]: `exec`, user-defined words and
//! several world words synthesise source and run it against the caller's
//! stack and state. The interpreter is strictly synchronous.

pub mod dictionary;
pub mod sigil;
pub mod tokenizer;
pub mod value;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::world::World;
use self::tokenizer::tokenize;
use self::value::{Stack, Value};

/// Output lines accumulated during interpretation.
pub type Output = Vec<String>;

/// A built-in word. Errors become a single output line; the word then
/// no-ops and interpretation continues.
pub type BuiltinFn = fn(&mut World, &mut Stack, &mut State) -> Result<Output, String>;

/// A dictionary entry: native code, or the token list of a colon-definition
/// replayed through the interpreter when invoked.
#[derive(Clone)]
pub enum Word {
    Builtin(BuiltinFn),
    User(Vec<String>),
}

/// Name → word mapping, shared between the global state and every head's
/// state. User definitions made anywhere are visible everywhere, matching
/// the live-coding model: the dictionary is process-wide.
#[derive(Clone, Default)]
pub struct Dictionary {
    words: Arc<RwLock<HashMap<String, Word>>>,
}

impl Dictionary {
    pub fn get(&self, name: &str) -> Option<Word> {
        self.words.read().get(name).cloned()
    }

    pub fn insert(&self, name: impl Into<String>, word: Word) {
        self.words.write().insert(name.into(), word);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.words.read().contains_key(name)
    }
}

/// Named global variables, process-shared like the dictionary.
#[derive(Clone, Default)]
pub struct Globals {
    values: Arc<RwLock<HashMap<String, Value>>>,
}

impl Globals {
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.read().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.values.write().insert(name.into(), value);
    }
}

/// Interpreter state. Cloning shares the dictionary and globals but copies
/// the parse-mode flags, so each head carries its own compilation context.
#[derive(Clone)]
pub struct State {
    pub dictionary: Dictionary,
    pub globals: Globals,
    pub compiling: bool,
    pub collecting_block: bool,
    pub current_word: Option<String>,
    pub current_definition: Vec<String>,
}

impl State {
    /// A fresh state with the core dictionary installed.
    pub fn initial() -> Self {
        let state = Self {
            dictionary: Dictionary::default(),
            globals: Globals::default(),
            compiling: false,
            collecting_block: false,
            current_word: None,
            current_definition: Vec::new(),
        };
        dictionary::install_core_words(&state.dictionary);
        state
    }
}

fn is_delimited(token: &str, delim: char) -> bool {
    token.len() >= 2 && token.starts_with(delim) && token.ends_with(delim)
}

/// Run `input` against the given stack and state, returning output lines.
pub fn interpret(input: &str, stack: &mut Stack, state: &mut State, world: &mut World) -> Output {
    let mut output = Output::new();
    let mut block_depth = 0usize;

    for token in tokenize(input) {
        // Collecting a quoted block: everything is literal until the brace
        // that closes the outermost level.
        if state.collecting_block {
            if token == "{" {
                block_depth += 1;
            } else if token == "}" {
                if block_depth == 0 {
                    let tokens = std::mem::take(&mut state.current_definition);
                    stack.push(Value::Block(tokens));
                    state.collecting_block = false;
                    continue;
                }
                block_depth -= 1;
            }
            state.current_definition.push(token);
            continue;
        }

        // Compiling: first token names the word, the rest accumulate until
        // `;`, which falls through to its dictionary entry below.
        if state.compiling {
            if state.current_word.is_none() {
                state.current_word = Some(token);
                continue;
            }
            if token != ";" {
                state.current_definition.push(token);
                continue;
            }
        }

        // Unexpanded sigils are carried as literal markers; the head path
        // rewrites them before interpretation ever sees them.
        if token.starts_with('$') {
            stack.push(Value::Symbol(token));
            continue;
        }

        if let Some(word) = state.dictionary.get(&token) {
            match word {
                Word::Builtin(run) => match run(world, stack, state) {
                    Ok(mut lines) => output.append(&mut lines),
                    Err(line) => output.push(line),
                },
                Word::User(tokens) => {
                    let mut lines = interpret(&tokens.join(" "), stack, state, world);
                    output.append(&mut lines);
                }
            }
            continue;
        }

        if let Ok(number) = token.parse::<f64>() {
            stack.push(Value::Number(number));
            continue;
        }

        if is_delimited(&token, '"') || is_delimited(&token, '`') {
            stack.push(Value::Text(token[1..token.len() - 1].to_string()));
            continue;
        }

        if let Some(rest) = token.strip_prefix('\'') {
            stack.push(Value::Symbol(rest.to_string()));
            continue;
        }

        output.push(format!("Unknown word: {token}"));
        return output;
    }

    output
}
