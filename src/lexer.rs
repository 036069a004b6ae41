//! Splits an input line into words, honouring quotes and parameter references.

use thiserror::Error;

/// A part of a word: either literal text or a reference to a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordPart {
    /// Literal text that requires no further processing.
    Literal(String),
    /// Parameter reference in the form `$NAME` or `${NAME}`. Holds the name.
    ParamSubst(String),
}

/// A single shell word made of one or more parts.
pub type Word = Vec<WordPart>;

/// Errors that can occur while splitting a line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    #[error("unfinished quote")]
    UnfinishedQuote,
    /// A closing brace for `${...}` was not found.
    #[error("unfinished parameter substitution")]
    UnfinishedParamSubst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    current_word: Word,
    buffer: String,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            current_word: Vec::new(),
            buffer: String::new(),
        }
    }

    fn make_words(mut self) -> Result<Vec<Word>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch)?,
                LexingState::ReadingWord => self.handle_word(ch, &mut out)?,
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch)?,
            }
        }

        if matches!(
            self.state,
            LexingState::ReadingSingleQuote | LexingState::ReadingDoubleQuote
        ) {
            return Err(LexingError::UnfinishedQuote);
        }

        self.finish_word(&mut out);
        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn handle_start(&mut self, ch: char) -> Result<(), LexingError> {
        match ch {
            ' ' | '\t' => {}
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '$' => {
                self.state = LexingState::ReadingWord;
                self.read_param()?;
            }
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
        Ok(())
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<Word>) -> Result<(), LexingError> {
        match ch {
            ' ' | '\t' => {
                self.finish_word(out);
                self.state = LexingState::Start;
            }
            '\'' => {
                self.push_literal(false);
                self.state = LexingState::ReadingSingleQuote;
            }
            '"' => {
                self.push_literal(false);
                self.state = LexingState::ReadingDoubleQuote;
            }
            '$' => self.read_param()?,
            c => self.buffer.push(c),
        }
        Ok(())
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => {
                // keeps '' as an explicit empty word
                self.push_literal(true);
                self.state = LexingState::ReadingWord;
            }
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) -> Result<(), LexingError> {
        match ch {
            '"' => {
                self.push_literal(true);
                self.state = LexingState::ReadingWord;
            }
            '$' => self.read_param()?,
            c => self.buffer.push(c),
        }
        Ok(())
    }

    /// Called right after a `$`. Reads `NAME` or `{NAME}`; a lone `$` stays literal.
    fn read_param(&mut self) -> Result<(), LexingError> {
        if self.peek_char() == Some('{') {
            self.read_char();
            let mut name = String::new();
            loop {
                match self.read_char() {
                    Some('}') => break,
                    Some(c) => name.push(c),
                    None => return Err(LexingError::UnfinishedParamSubst),
                }
            }
            self.push_literal(false);
            self.current_word.push(WordPart::ParamSubst(name));
            return Ok(());
        }

        let mut name = String::new();
        while let Some(c) = self.peek_char() {
            let valid = if name.is_empty() {
                c.is_alphabetic() || c == '_'
            } else {
                c.is_alphanumeric() || c == '_'
            };
            if !valid {
                break;
            }
            name.push(c);
            self.read_char();
        }

        if name.is_empty() {
            self.buffer.push('$');
        } else {
            self.push_literal(false);
            self.current_word.push(WordPart::ParamSubst(name));
        }
        Ok(())
    }

    /// Move the buffer into the current word as a literal part.
    fn push_literal(&mut self, keep_empty: bool) {
        if !self.buffer.is_empty() || keep_empty {
            self.current_word
                .push(WordPart::Literal(std::mem::take(&mut self.buffer)));
        }
    }

    fn finish_word(&mut self, out: &mut Vec<Word>) {
        self.push_literal(false);
        if !self.current_word.is_empty() {
            out.push(std::mem::take(&mut self.current_word));
        }
    }
}

/// Split a command line into words.
///
/// Unquoted spaces and tabs separate words. Single quotes keep their content verbatim,
/// double quotes keep it verbatim except for `$NAME` / `${NAME}` references.
pub fn split_into_words(line: &str) -> Result<Vec<Word>, LexingError> {
    LexingFSM::new(line).make_words()
}
