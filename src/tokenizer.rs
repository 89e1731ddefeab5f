//! Field/row state machine.
//!
//! [`Syntax::step`] is a pure function from (state, input) to the next state
//! plus at most two events. The reader owns the buffers and drives it one
//! character or line break at a time.

use std::borrow::Cow;

use crate::diagnostics::DiagnosticKind;
use crate::dialect::Dialect;
use crate::line_source::LineEnding;

/// Position of the tokenizer inside the current field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldState {
    /// At a field boundary: start of a row or just after a delimiter.
    #[default]
    AfterField,
    /// Inside a field that did not start with a quote.
    Unquoted,
    /// Inside a quoted field.
    Quoted,
    /// Saw a quote inside a quoted field: either a close or the first half
    /// of an escaped quote.
    QuotedSawQuote,
    /// The previous character was the escape character.
    Escaped { quoted: bool },
}

/// One unit of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Char(char),
    /// End of a physical line. Inside quotes the terminator is kept as
    /// written. With `fold` set, a break outside quotes is kept as data
    /// (as `\n`) instead of ending the row.
    LineBreak { ending: LineEnding, fold: bool },
    EndOfInput,
}

/// Something the driver has to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Append a character to the current field.
    Append(char),
    /// The current field opened with a quote.
    OpenQuote,
    /// The current field is complete.
    EndField,
    /// The current field and the row are complete.
    EndRow,
    /// A line break was folded into the current field.
    Fold,
    /// A dialect violation in the current field.
    Warn(DiagnosticKind),
}

/// Result of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: FieldState,
    events: [Option<Event>; 2],
}

impl Transition {
    const fn to(next: FieldState) -> Self {
        Self {
            next,
            events: [None, None],
        }
    }

    const fn with(next: FieldState, event: Event) -> Self {
        Self {
            next,
            events: [Some(event), None],
        }
    }

    const fn with_both(next: FieldState, first: Event, second: Event) -> Self {
        Self {
            next,
            events: [Some(first), Some(second)],
        }
    }

    /// Append a line terminator verbatim.
    const fn line_break(next: FieldState, ending: LineEnding) -> Self {
        match ending {
            LineEnding::Lf => Self::with(next, Event::Append('\n')),
            LineEnding::Cr => Self::with(next, Event::Append('\r')),
            LineEnding::CrLf => Self::with_both(next, Event::Append('\r'), Event::Append('\n')),
        }
    }

    /// Emitted events, in order.
    pub fn events(&self) -> impl Iterator<Item = Event> + '_ {
        self.events.iter().flatten().copied()
    }
}

/// The characters that drive tokenizing, taken from a [`Dialect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Syntax {
    pub delimiter: char,
    pub quote: Option<char>,
    pub escape: Option<char>,
}

impl Syntax {
    pub fn from_dialect(dialect: &Dialect) -> Self {
        Self {
            delimiter: dialect.delimiter,
            quote: dialect.quote.char(),
            escape: dialect.escape,
        }
    }

    #[inline]
    fn is_quote(&self, c: char) -> bool {
        self.quote == Some(c)
    }

    #[inline]
    fn is_escape(&self, c: char) -> bool {
        self.escape == Some(c)
    }

    /// Advance the state machine by one input.
    pub fn step(&self, state: FieldState, input: Input) -> Transition {
        use FieldState::*;

        match (state, input) {
            (Escaped { quoted }, Input::Char(c)) => {
                Transition::with(if quoted { Quoted } else { Unquoted }, Event::Append(c))
            }
            (Escaped { quoted }, Input::LineBreak { ending, .. }) => {
                Transition::line_break(if quoted { Quoted } else { Unquoted }, ending)
            }
            (Escaped { .. }, Input::EndOfInput) => Transition::with_both(
                AfterField,
                Event::Warn(DiagnosticKind::DanglingEscape),
                Event::EndRow,
            ),

            (AfterField, Input::Char(c)) if self.is_quote(c) => {
                Transition::with(Quoted, Event::OpenQuote)
            }
            (AfterField | Unquoted, Input::Char(c)) if c == self.delimiter => {
                Transition::with(AfterField, Event::EndField)
            }
            (AfterField | Unquoted, Input::Char(c)) if self.is_escape(c) => {
                Transition::to(Escaped { quoted: false })
            }
            (Unquoted, Input::Char(c)) if self.is_quote(c) => Transition::with_both(
                Unquoted,
                Event::Warn(DiagnosticKind::QuoteInUnquotedField),
                Event::Append(c),
            ),
            (AfterField | Unquoted, Input::Char(c)) => Transition::with(Unquoted, Event::Append(c)),
            (AfterField | Unquoted | QuotedSawQuote, Input::LineBreak { fold: true, .. }) => {
                Transition::with_both(Unquoted, Event::Fold, Event::Append('\n'))
            }
            (AfterField | Unquoted | QuotedSawQuote, Input::LineBreak { fold: false, .. })
            | (AfterField | Unquoted | QuotedSawQuote, Input::EndOfInput) => {
                Transition::with(AfterField, Event::EndRow)
            }

            (Quoted, Input::Char(c)) if self.is_quote(c) => Transition::to(QuotedSawQuote),
            (Quoted, Input::Char(c)) if self.is_escape(c) => {
                Transition::to(Escaped { quoted: true })
            }
            (Quoted, Input::Char(c)) => Transition::with(Quoted, Event::Append(c)),
            (Quoted, Input::LineBreak { ending, .. }) => Transition::line_break(Quoted, ending),
            (Quoted, Input::EndOfInput) => Transition::with_both(
                AfterField,
                Event::Warn(DiagnosticKind::UnclosedQuote),
                Event::EndRow,
            ),

            (QuotedSawQuote, Input::Char(c)) if self.is_quote(c) => {
                Transition::with(Quoted, Event::Append(c))
            }
            (QuotedSawQuote, Input::Char(c)) if c == self.delimiter => {
                Transition::with(AfterField, Event::EndField)
            }
            (QuotedSawQuote, Input::Char(c)) => Transition::with_both(
                Unquoted,
                Event::Warn(DiagnosticKind::CharacterAfterQuote),
                Event::Append(c),
            ),
        }
    }

    /// Quote a value so that tokenizing it with this syntax yields the value
    /// unchanged. Values that need no quoting are returned as-is.
    pub fn quote_field<'a>(&self, value: &'a str) -> Cow<'a, str> {
        let Some(quote) = self.quote else {
            return Cow::Borrowed(value);
        };
        let needs_quotes = value.starts_with(char::is_whitespace)
            || value.ends_with(char::is_whitespace)
            || value.chars().any(|c| {
                c == self.delimiter || c == quote || c == '\n' || c == '\r' || self.is_escape(c)
            });
        if !needs_quotes {
            return Cow::Borrowed(value);
        }

        let mut quoted = String::with_capacity(value.len() + 2);
        quoted.push(quote);
        for c in value.chars() {
            if c == quote {
                quoted.push(quote);
            } else if self.is_escape(c) {
                quoted.push(c);
            }
            quoted.push(c);
        }
        quoted.push(quote);
        Cow::Owned(quoted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Quote;

    fn syntax() -> Syntax {
        Syntax::from_dialect(&Dialect::default())
    }

    fn lf(fold: bool) -> Input {
        Input::LineBreak {
            ending: LineEnding::Lf,
            fold,
        }
    }

    /// Run one line through the machine and collect fields and warnings.
    fn run(syntax: &Syntax, text: &str) -> (Vec<String>, Vec<DiagnosticKind>) {
        let mut state = FieldState::AfterField;
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut warnings = Vec::new();
        let inputs = text.chars().map(Input::Char).chain([Input::EndOfInput]);
        for input in inputs {
            let transition = syntax.step(state, input);
            state = transition.next;
            for event in transition.events() {
                match event {
                    Event::Append(c) => current.push(c),
                    Event::EndField | Event::EndRow => fields.push(std::mem::take(&mut current)),
                    Event::Warn(kind) => warnings.push(kind),
                    Event::OpenQuote | Event::Fold => {}
                }
            }
        }
        (fields, warnings)
    }

    #[test]
    fn test_plain_split() {
        let (fields, warnings) = run(&syntax(), "a,b,,c");
        assert_eq!(fields, vec!["a", "b", "", "c"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_quoted_delimiter_and_escaped_quote() {
        let (fields, _) = run(&syntax(), r#""a,b","say ""hi""",c"#);
        assert_eq!(fields, vec!["a,b", r#"say "hi""#, "c"]);
    }

    #[test]
    fn test_character_after_closing_quote() {
        let (fields, warnings) = run(&syntax(), r#""ab"cd,e"#);
        assert_eq!(fields, vec!["abcd", "e"]);
        assert_eq!(warnings, vec![DiagnosticKind::CharacterAfterQuote]);
    }

    #[test]
    fn test_quote_inside_unquoted_field() {
        let (fields, warnings) = run(&syntax(), r#"5" disk,x"#);
        assert_eq!(fields, vec![r#"5" disk"#, "x"]);
        assert_eq!(warnings, vec![DiagnosticKind::QuoteInUnquotedField]);
    }

    #[test]
    fn test_unclosed_quote_at_end() {
        let (fields, warnings) = run(&syntax(), r#"a,"open"#);
        assert_eq!(fields, vec!["a", "open"]);
        assert_eq!(warnings, vec![DiagnosticKind::UnclosedQuote]);
    }

    #[test]
    fn test_escape_character() {
        let dialect = Dialect {
            escape: Some('\\'),
            quote: Quote::None,
            ..Dialect::default()
        };
        let (fields, _) = run(&Syntax::from_dialect(&dialect), r"a\,b,c\\d");
        assert_eq!(fields, vec!["a,b", r"c\d"]);
    }

    #[test]
    fn test_line_break_inside_quotes_is_data() {
        let s = syntax();
        let t = s.step(FieldState::Quoted, lf(false));
        assert_eq!(t.next, FieldState::Quoted);
        assert_eq!(t.events().collect::<Vec<_>>(), vec![Event::Append('\n')]);
    }

    #[test]
    fn test_quoted_line_break_kept_as_written() {
        let s = syntax();
        let crlf = Input::LineBreak {
            ending: LineEnding::CrLf,
            fold: false,
        };
        let t = s.step(FieldState::Quoted, crlf);
        assert_eq!(
            t.events().collect::<Vec<_>>(),
            vec![Event::Append('\r'), Event::Append('\n')]
        );

        let cr = Input::LineBreak {
            ending: LineEnding::Cr,
            fold: true,
        };
        let t = s.step(FieldState::Quoted, cr);
        assert_eq!(t.next, FieldState::Quoted);
        assert_eq!(t.events().collect::<Vec<_>>(), vec![Event::Append('\r')]);
    }

    #[test]
    fn test_fold_only_outside_quotes() {
        let s = syntax();
        let t = s.step(FieldState::Unquoted, lf(true));
        assert_eq!(
            t.events().collect::<Vec<_>>(),
            vec![Event::Fold, Event::Append('\n')]
        );
        let t = s.step(FieldState::Unquoted, lf(false));
        assert_eq!(t.events().collect::<Vec<_>>(), vec![Event::EndRow]);
    }

    #[test]
    fn test_no_quote_dialect_keeps_quotes() {
        let dialect = Dialect {
            quote: Quote::None,
            ..Dialect::default()
        };
        let (fields, warnings) = run(&Syntax::from_dialect(&dialect), r#""a","b""#);
        assert_eq!(fields, vec![r#""a""#, r#""b""#]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_quote_field() {
        let s = syntax();
        assert_eq!(s.quote_field("plain"), "plain");
        assert_eq!(s.quote_field("a,b"), r#""a,b""#);
        assert_eq!(s.quote_field("say \"hi\""), r#""say ""hi""""#);
        assert_eq!(s.quote_field("two\nlines"), "\"two\nlines\"");
    }
}
