use core::fmt;

use bitflags::bitflags;

/// The kinds of token a [`JsonReader`](crate::JsonReader) can peek.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    BeginArray,
    EndArray,
    BeginObject,
    EndObject,
    String,
    Number,
    True,
    False,
    Null,
    /// Nothing but whitespace remains after the top-level value.
    EndOfInput,
}

impl Token {
    pub const ALL: [Token; 10] = [
        Self::BeginArray,
        Self::EndArray,
        Self::BeginObject,
        Self::EndObject,
        Self::String,
        Self::Number,
        Self::True,
        Self::False,
        Self::Null,
        Self::EndOfInput,
    ];

    /// The singleton set containing this token.
    #[inline]
    pub const fn set(self) -> TokenSet {
        match self {
            Self::BeginArray => TokenSet::BEGIN_ARRAY,
            Self::EndArray => TokenSet::END_ARRAY,
            Self::BeginObject => TokenSet::BEGIN_OBJECT,
            Self::EndObject => TokenSet::END_OBJECT,
            Self::String => TokenSet::STRING,
            Self::Number => TokenSet::NUMBER,
            Self::True => TokenSet::TRUE,
            Self::False => TokenSet::FALSE,
            Self::Null => TokenSet::NULL,
            Self::EndOfInput => TokenSet::END_OF_INPUT,
        }
    }

    /// The literal spelling of fixed tokens.
    #[inline]
    pub const fn literal(self) -> Option<&'static str> {
        match self {
            Self::BeginArray => Some("["),
            Self::EndArray => Some("]"),
            Self::BeginObject => Some("{"),
            Self::EndObject => Some("}"),
            Self::True => Some("true"),
            Self::False => Some("false"),
            Self::Null => Some("null"),
            Self::String | Self::Number | Self::EndOfInput => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.literal() {
            Some(literal) => write!(f, "`{literal}`"),
            None => f.write_str(match self {
                Self::String => "string",
                Self::Number => "number",
                _ => "end of input",
            }),
        }
    }
}

bitflags! {
    /// A set of [`Token`]s, used to report what would have been acceptable.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct TokenSet: u16 {
        const BEGIN_ARRAY  = 1 << 0;
        const END_ARRAY    = 1 << 1;
        const BEGIN_OBJECT = 1 << 2;
        const END_OBJECT   = 1 << 3;
        const STRING       = 1 << 4;
        const NUMBER       = 1 << 5;
        const TRUE         = 1 << 6;
        const FALSE        = 1 << 7;
        const NULL         = 1 << 8;
        const END_OF_INPUT = 1 << 9;

        const BOOLEAN = Self::TRUE.bits() | Self::FALSE.bits();
    }
}

impl TokenSet {
    #[inline]
    pub const fn contains_token(self, token: Token) -> bool {
        self.contains(token.set())
    }

    /// Tokens of this set, in declaration order.
    pub fn tokens(self) -> impl Iterator<Item = Token> {
        Token::ALL.into_iter().filter(move |t| self.contains_token(*t))
    }
}

impl From<Token> for TokenSet {
    #[inline]
    fn from(token: Token) -> Self {
        token.set()
    }
}

impl fmt::Display for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens = self.tokens();
        match tokens.next() {
            None => f.write_str("nothing"),
            Some(first) => {
                write!(f, "{first}")?;
                for token in tokens {
                    write!(f, " or {token}")?;
                }
                Ok(())
            }
        }
    }
}
