use logos::Logos;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
pub enum LexerError {
    #[default]
    #[error("unrecognized input")]
    UnknownToken,
}

/// A single lexeme of a command line, borrowed from the line itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Logos)]
#[logos(skip r"[ \t\r\n\f]+", error = LexerError)]
pub enum Token<'a> {
    #[token("|")]
    Pipe,
    #[token("<")]
    RedirIn,
    #[token(">")]
    RedirOut,
    /// Only produced for the line-level marker; a standalone `&` elsewhere
    /// is rejected by the parser.
    #[token("&")]
    Background,

    #[regex(r"[^ \t\r\n\f|<>]+", |lex| lex.slice())]
    Word(&'a str),
}

impl Token<'_> {
    pub fn symbol(&self) -> Option<char> {
        match self {
            Self::Pipe => Some('|'),
            Self::RedirIn => Some('<'),
            Self::RedirOut => Some('>'),
            Self::Background => Some('&'),
            Self::Word(_) => None,
        }
    }
}

/// Splits a trailing `&` (and the whitespace around it) off a line.
pub fn strip_background(line: &str) -> (&str, bool) {
    let trimmed = line.trim_end();
    match trimmed.strip_suffix('&') {
        Some(rest) => (rest.trim_end(), true),
        None => (trimmed, false),
    }
}

/// Tokenizes a whole line. When the line ends in `&`, the marker is removed
/// before lexing and reported as one [`Token::Background`] at the end.
pub fn tokenize(line: &str) -> Result<Vec<Token<'_>>, LexerError> {
    let (body, background) = strip_background(line);

    let mut tokens = Token::lexer(body).collect::<Result<Vec<_>, _>>()?;

    if background {
        tokens.push(Token::Background);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_spaces_and_tabs() {
        let tokens = tokenize("ls  -la\t/tmp\n").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Word("ls"), Token::Word("-la"), Token::Word("/tmp")]
        );
    }

    #[test]
    fn classifies_operators() {
        let tokens = tokenize("sort < in.txt | uniq > out.txt").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("sort"),
                Token::RedirIn,
                Token::Word("in.txt"),
                Token::Pipe,
                Token::Word("uniq"),
                Token::RedirOut,
                Token::Word("out.txt"),
            ]
        );
    }

    #[test]
    fn operators_split_words_without_whitespace() {
        let tokens = tokenize("ls|wc -l>count").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("ls"),
                Token::Pipe,
                Token::Word("wc"),
                Token::Word("-l"),
                Token::RedirOut,
                Token::Word("count"),
            ]
        );
    }

    #[test]
    fn trailing_ampersand_becomes_background_marker() {
        assert_eq!(
            tokenize("sleep 1 &").unwrap(),
            vec![Token::Word("sleep"), Token::Word("1"), Token::Background]
        );
        assert_eq!(
            tokenize("sleep 1&  \n").unwrap(),
            vec![Token::Word("sleep"), Token::Word("1"), Token::Background]
        );
    }

    #[test]
    fn embedded_ampersand_stays_in_word() {
        assert_eq!(
            tokenize("echo a&b").unwrap(),
            vec![Token::Word("echo"), Token::Word("a&b")]
        );
    }

    #[test]
    fn standalone_ampersand_mid_line_is_reported() {
        assert_eq!(
            tokenize("sleep 1 & echo").unwrap(),
            vec![
                Token::Word("sleep"),
                Token::Word("1"),
                Token::Background,
                Token::Word("echo"),
            ]
        );
    }

    #[test]
    fn empty_line_yields_nothing() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize(" \t \n").unwrap().is_empty());
    }

    #[test]
    fn strip_background_keeps_inner_text() {
        assert_eq!(strip_background("  make all  & "), ("  make all", true));
        assert_eq!(strip_background("make all\n"), ("make all", false));
    }
}
