//! Operator tables shared by the parser and the patcher.

/// Binary operators, after word forms (`is`, `and`, ...) are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// `%%`
    FloorMod,
    /// `//`
    FloorDiv,
    /// `**`
    Exp,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    And,
    Or,
    /// Binary `?`.
    Exists,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    In,
    NotIn,
    Of,
    NotOf,
    InstanceOf,
    NotInstanceOf,
}

/// Binding strength; higher binds tighter.
pub type Precedence = u8;

impl BinaryOperator {
    /// Resolve operator text (symbolic or word form).
    pub fn from_text(text: &str) -> Option<BinaryOperator> {
        use BinaryOperator::*;
        Some(match text {
            "+" => Add,
            "-" => Sub,
            "*" => Mul,
            "/" => Div,
            "%" => Mod,
            "%%" => FloorMod,
            "//" => FloorDiv,
            "**" => Exp,
            "&" => BitAnd,
            "|" => BitOr,
            "^" => BitXor,
            "<<" => Shl,
            ">>" => Shr,
            ">>>" => UShr,
            "&&" | "and" => And,
            "||" | "or" => Or,
            "?" => Exists,
            "==" | "is" => Eq,
            "!=" | "isnt" => NotEq,
            "<" => Lt,
            ">" => Gt,
            "<=" => LtEq,
            ">=" => GtEq,
            "in" => In,
            "of" => Of,
            "instanceof" => InstanceOf,
            _ => return None,
        })
    }

    /// Operator of a compound assignment (`+=` gives `Add`, `or=` gives `Or`).
    pub fn from_compound_assign(text: &str) -> Option<BinaryOperator> {
        match text {
            "or=" => Some(BinaryOperator::Or),
            "and=" => Some(BinaryOperator::And),
            "?=" => Some(BinaryOperator::Exists),
            _ => BinaryOperator::from_text(text.strip_suffix('=')?),
        }
    }

    /// JavaScript spelling, for operators that map one-to-one.
    pub fn js_text(self) -> Option<&'static str> {
        use BinaryOperator::*;
        Some(match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            Exp => "**",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            Shl => "<<",
            Shr => ">>",
            UShr => ">>>",
            And => "&&",
            Or => "||",
            Eq => "===",
            NotEq => "!==",
            Lt => "<",
            Gt => ">",
            LtEq => "<=",
            GtEq => ">=",
            InstanceOf => "instanceof",
            FloorMod | FloorDiv | Exists | In | NotIn | Of | NotOf | NotInstanceOf => return None,
        })
    }

    pub fn precedence(self) -> Precedence {
        use BinaryOperator::*;
        match self {
            Exists => 1,
            Or => 2,
            And => 3,
            BitOr => 4,
            BitXor => 5,
            BitAnd => 6,
            Eq | NotEq | Lt | Gt | LtEq | GtEq => 7,
            In | NotIn | Of | NotOf | InstanceOf | NotInstanceOf => 8,
            Shl | Shr | UShr => 9,
            Add | Sub => 10,
            Mul | Div | Mod | FloorMod | FloorDiv => 11,
            Exp => 12,
        }
    }

    pub fn is_right_associative(self) -> bool {
        self == BinaryOperator::Exp
    }

    /// Operators that can be chained (`a < b < c`).
    pub fn is_comparison(self) -> bool {
        use BinaryOperator::*;
        matches!(self, Eq | NotEq | Lt | Gt | LtEq | GtEq)
    }

    /// The `not`-prefixed form (`not in`, `not of`, `not instanceof`).
    pub fn negated_word_form(self) -> Option<BinaryOperator> {
        use BinaryOperator::*;
        match self {
            In => Some(NotIn),
            Of => Some(NotOf),
            InstanceOf => Some(NotInstanceOf),
            _ => None,
        }
    }

    /// Operator with the opposite truth value, when negation is exact.
    ///
    /// Ordering comparisons are only inverted when `loose` is set because
    /// `NaN` makes `!(a < b)` and `a >= b` differ.
    pub fn inverse(self, loose: bool) -> Option<BinaryOperator> {
        use BinaryOperator::*;
        match self {
            Eq => Some(NotEq),
            NotEq => Some(Eq),
            In => Some(NotIn),
            NotIn => Some(In),
            Of => Some(NotOf),
            NotOf => Some(Of),
            InstanceOf => Some(NotInstanceOf),
            NotInstanceOf => Some(InstanceOf),
            Lt if loose => Some(GtEq),
            Gt if loose => Some(LtEq),
            LtEq if loose => Some(Gt),
            GtEq if loose => Some(Lt),
            _ => None,
        }
    }
}

/// Prefix and postfix unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// `!` or `not`.
    Not,
    Neg,
    Plus,
    BitNot,
    Typeof,
    Delete,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl UnaryOperator {
    pub fn from_prefix_text(text: &str) -> Option<UnaryOperator> {
        use UnaryOperator::*;
        Some(match text {
            "!" | "not" => Not,
            "-" => Neg,
            "+" => Plus,
            "~" => BitNot,
            "typeof" => Typeof,
            "delete" => Delete,
            "++" => PreIncrement,
            "--" => PreDecrement,
            _ => return None,
        })
    }

    pub fn js_text(self) -> &'static str {
        use UnaryOperator::*;
        match self {
            Not => "!",
            Neg => "-",
            Plus => "+",
            BitNot => "~",
            Typeof => "typeof ",
            Delete => "delete ",
            PreIncrement | PostIncrement => "++",
            PreDecrement | PostDecrement => "--",
        }
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOperator::PostIncrement | UnaryOperator::PostDecrement)
    }
}
