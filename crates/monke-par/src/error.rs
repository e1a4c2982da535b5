use monke_lex::TokenKind;
use thiserror::Error;

/// A single parse failure. The parser keeps collecting these instead of
/// aborting (spec §4.2/§7: "parsing continues past errors when possible").
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("no prefix parse function for {0:?} found")]
    NoPrefixParseFn(TokenKind),

    #[error("expected next token to be {expected:?}, got {got:?} instead")]
    ExpectedPeek {
        expected: TokenKind,
        got: TokenKind,
    },

    #[error("could not parse {0:?} as integer")]
    InvalidInteger(String),

    #[error("could not parse {0:?} as boolean")]
    InvalidBoolean(String),
}
