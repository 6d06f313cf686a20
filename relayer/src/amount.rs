//! Display formatting for USDC amounts
//!
//! Amounts travel as decimal strings in the token's smallest unit. These
//! helpers only render them for logs and API responses.

/// USDC token decimals
pub const USDC_DECIMALS: u32 = 6;

fn with_commas(whole: u128) -> String {
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Render a smallest-unit amount as whole USDC, rounded half up to
/// `frac_digits` places, with thousands separators and no trailing zeros.
///
/// Input that is not a non-negative integer is returned unchanged.
pub fn format_usdc_amount(raw: &str, frac_digits: u32) -> String {
    let units: u128 = match raw.trim().parse() {
        Ok(units) => units,
        Err(_) => return raw.to_string(),
    };

    let frac_digits = frac_digits.min(USDC_DECIMALS);
    let drop = 10u128.pow(USDC_DECIMALS - frac_digits);
    let scaled = match units.checked_add(drop / 2) {
        Some(rounded) => rounded / drop,
        None => units / drop,
    };

    let scale = 10u128.pow(frac_digits);
    let whole = with_commas(scaled / scale);
    if frac_digits == 0 {
        return whole;
    }

    let fraction = format!("{:0width$}", scaled % scale, width = frac_digits as usize);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole
    } else {
        format!("{}.{}", whole, fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formats_whole_and_fractional_amounts() {
        assert_eq!(format_usdc_amount("2500000", 6), "2.5");
        assert_eq!(format_usdc_amount("1000000", 6), "1");
        assert_eq!(format_usdc_amount("1", 6), "0.000001");
        assert_eq!(format_usdc_amount("0", 2), "0");
    }

    #[test]
    fn test_groups_thousands() {
        assert_eq!(format_usdc_amount("1234567000000", 2), "1,234,567");
        assert_eq!(format_usdc_amount("999999000000", 0), "999,999");
        assert_eq!(format_usdc_amount("100000000", 2), "100");
    }

    #[test]
    fn test_rounds_half_up() {
        assert_eq!(format_usdc_amount("1005000", 2), "1.01");
        assert_eq!(format_usdc_amount("1004999", 2), "1");
        assert_eq!(format_usdc_amount("999999999", 2), "1,000");
    }

    #[test]
    fn test_non_numeric_input_passes_through() {
        assert_eq!(format_usdc_amount("ten", 2), "ten");
        assert_eq!(format_usdc_amount("-5", 2), "-5");
    }
}
