use std::fmt;

/// Represents a token within a fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// An identifier (keywords are identifiers too).
    Ident(&'a str),
    /// A borrowed string.
    Str(&'a str),
    /// An allocated string.
    String(String),
    /// A number
    Number(f64),
    /// A plus (`+`) operator.
    Plus,
    /// A minus (`-`) operator.
    Minus,
    /// A mul (`*`) operator.
    Mul,
    /// A div (`/`) operator.
    Div,
    /// A mod (`%`) operator.
    Mod,
    /// The increment operator (`++`)
    Increment,
    /// The decrement operator (`--`)
    Decrement,
    /// The assignment operator (`=`)
    Assign,
    /// `+=` operator
    PlusAssign,
    /// `-=` operator
    MinusAssign,
    /// `*=` operator
    MulAssign,
    /// `/=` operator
    DivAssign,
    /// `%=` operator
    ModAssign,
    /// `==` operator
    Eq,
    /// `!=` operator
    Ne,
    /// `===` operator
    StrictEq,
    /// `!==` operator
    StrictNe,
    /// `>` operator
    Gt,
    /// `>=` operator
    Gte,
    /// `<` operator
    Lt,
    /// `<=` operator
    Lte,
    /// `&&` operator
    And,
    /// `||` operator
    Or,
    /// `??` operator
    Nullish,
    /// `!` operator
    Bang,
    /// `?` of the conditional operator
    Question,
    /// The colon operator (`:`)
    Colon,
    /// A dot operator (`.`)
    Dot,
    /// The comma operator (`,`)
    Comma,
    /// A semicolon (`;`)
    Semicolon,
    /// Open Bracket
    BracketOpen,
    /// Close Bracket
    BracketClose,
    /// Open Parenthesis
    ParenOpen,
    /// Close Parenthesis
    ParenClose,
    /// Open Brace
    BraceOpen,
    /// Close Brace
    BraceClose,
}

impl<'a> Token<'a> {
    /// Is this a brace that opens or closes a block?
    pub fn is_brace(&self) -> bool {
        matches!(self, Token::BraceOpen | Token::BraceClose)
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "`{name}`"),
            Token::Str(_) | Token::String(_) => f.write_str("string"),
            Token::Number(_) => f.write_str("number"),
            Token::Plus => f.write_str("`+`"),
            Token::Minus => f.write_str("`-`"),
            Token::Mul => f.write_str("`*`"),
            Token::Div => f.write_str("`/`"),
            Token::Mod => f.write_str("`%`"),
            Token::Increment => f.write_str("`++`"),
            Token::Decrement => f.write_str("`--`"),
            Token::Assign => f.write_str("`=`"),
            Token::PlusAssign => f.write_str("`+=`"),
            Token::MinusAssign => f.write_str("`-=`"),
            Token::MulAssign => f.write_str("`*=`"),
            Token::DivAssign => f.write_str("`/=`"),
            Token::ModAssign => f.write_str("`%=`"),
            Token::Eq => f.write_str("`==`"),
            Token::Ne => f.write_str("`!=`"),
            Token::StrictEq => f.write_str("`===`"),
            Token::StrictNe => f.write_str("`!==`"),
            Token::Gt => f.write_str("`>`"),
            Token::Gte => f.write_str("`>=`"),
            Token::Lt => f.write_str("`<`"),
            Token::Lte => f.write_str("`<=`"),
            Token::And => f.write_str("`&&`"),
            Token::Or => f.write_str("`||`"),
            Token::Nullish => f.write_str("`??`"),
            Token::Bang => f.write_str("`!`"),
            Token::Question => f.write_str("`?`"),
            Token::Colon => f.write_str("`:`"),
            Token::Dot => f.write_str("`.`"),
            Token::Comma => f.write_str("`,`"),
            Token::Semicolon => f.write_str("`;`"),
            Token::BracketOpen => f.write_str("`[`"),
            Token::BracketClose => f.write_str("`]`"),
            Token::ParenOpen => f.write_str("`(`"),
            Token::ParenClose => f.write_str("`)`"),
            Token::BraceOpen => f.write_str("`{`"),
            Token::BraceClose => f.write_str("`}`"),
        }
    }
}
