use coffer_common::Amount;

use crate::{LedgerError, LedgerResult};

/// `a * b / c` rounded down, failing on overflow or a zero divisor
pub fn mul_div(a: Amount, b: Amount, c: Amount) -> LedgerResult<Amount> {
    if c == 0 {
        return Err(LedgerError::InvalidOperation("Division by zero".into()));
    }
    a.checked_mul(b)
        .map(|product| product / c)
        .ok_or_else(|| LedgerError::Overflow(format!("{} * {} does not fit", a, b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_floors() {
        assert_eq!(mul_div(10, 7, 22).unwrap(), 3);
        assert_eq!(mul_div(22, 10, 22).unwrap(), 10);
        assert!(mul_div(1, 1, 0).is_err());
        assert!(matches!(mul_div(Amount::MAX, 2, 1), Err(LedgerError::Overflow(_))));
    }
}
