use thiserror::Error;

use crate::cmd::execution_plan::{CommandSpec, Pipeline};

use self::token::{LexerError, Token};

pub mod token;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("failed to tokenize command: {0}")]
    Lexer(#[from] LexerError),
    #[error("expected a filename after `{0}`")]
    MissingRedirectTarget(char),
    #[error("missing command around `|`")]
    EmptyCommand,
    #[error("unexpected token `{0}`")]
    UnexpectedToken(char),
    #[error("`{0}` is only allowed on the {1} command of a pipeline")]
    MisplacedRedirect(char, &'static str),
}

/// Parses one input line into a pipeline.
///
/// Returns `Ok(None)` for blank lines. Words are kept verbatim; expansion
/// happens later, right before execution.
pub fn parse_line(line: &str) -> Result<Option<Pipeline>, SyntaxError> {
    let mut tokens = token::tokenize(line)?;

    let background = matches!(tokens.last(), Some(Token::Background));
    if background {
        tokens.pop();
    }

    if tokens.is_empty() {
        return if background {
            Err(SyntaxError::UnexpectedToken('&'))
        } else {
            Ok(None)
        };
    }

    let mut stages = Vec::new();
    let mut current = CommandSpec::default();
    let mut tokens = tokens.into_iter().peekable();

    while let Some(token) = tokens.next() {
        match token {
            Token::Word(word) => current.argv.push(word.to_owned()),
            Token::Pipe => stages.push(complete(&mut current)?),
            Token::RedirIn | Token::RedirOut => {
                let target = match tokens.next_if(|next| matches!(next, Token::Word(_))) {
                    Some(Token::Word(target)) => target.to_owned(),
                    _ => {
                        return Err(SyntaxError::MissingRedirectTarget(
                            token.symbol().unwrap_or_default(),
                        ))
                    }
                };

                if token == Token::RedirIn {
                    current.input = Some(target);
                } else {
                    current.output = Some(target);
                }
            }
            Token::Background => return Err(SyntaxError::UnexpectedToken('&')),
        }
    }

    stages.push(complete(&mut current)?);

    let last = stages.len() - 1;
    for (idx, stage) in stages.iter().enumerate() {
        if idx > 0 && stage.input.is_some() {
            return Err(SyntaxError::MisplacedRedirect('<', "first"));
        }
        if idx < last && stage.output.is_some() {
            return Err(SyntaxError::MisplacedRedirect('>', "last"));
        }
    }

    let (text, _) = token::strip_background(line);

    Ok(Some(Pipeline {
        stages,
        background,
        text: text.trim().to_owned(),
    }))
}

fn complete(current: &mut CommandSpec) -> Result<CommandSpec, SyntaxError> {
    let spec = std::mem::take(current);

    if spec.argv.is_empty() {
        return Err(SyntaxError::EmptyCommand);
    }

    Ok(spec)
}
