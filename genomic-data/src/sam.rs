/// forward vs. backward(reverse) alignment reads
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Strand {
    Forward,
    Backward,
}

impl Strand {
    /// `+`/`-` as found in nanopolish and bed files; `.` and anything
    /// else is treated as forward
    pub fn from_symbol(symbol: &str) -> Self {
        match symbol.trim() {
            "-" => Strand::Backward,
            _ => Strand::Forward,
        }
    }

    pub fn from_is_reverse(is_reverse: bool) -> Self {
        if is_reverse {
            Strand::Backward
        } else {
            Strand::Forward
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let x: Box<str> = (*self).into();
        write!(f, "{}", x)
    }
}

impl From<Strand> for Box<str> {
    fn from(strand: Strand) -> Self {
        match strand {
            Strand::Forward => Box::from("+"),
            Strand::Backward => Box::from("-"),
        }
    }
}
