//! Display formatting for conversion results.

/// Values at or above this magnitude are printed in exponent form.
const LARGE_THRESHOLD: f64 = 1e15;
/// Non-zero values below this magnitude are printed in exponent form.
const SMALL_THRESHOLD: f64 = 1e-9;
/// Significant digits an f64 carries without representation noise.
const MAX_SIGNIFICANT: usize = 15;

/// Renders numbers as short, stable strings.
///
/// Values are rounded to `precision` decimal places (or, below 1, to
/// `precision` significant digits so small results never collapse to zero),
/// never exceeding 15 significant digits in total, then trailing zeros and a dangling decimal point are removed. Very large
/// and very small magnitudes switch to exponent notation such as `1.5e15`.
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    precision: usize,
}

impl Default for Formatter {
    fn default() -> Self {
        Self { precision: 6 }
    }
}

impl Formatter {
    pub fn new(precision: usize) -> Self {
        Self {
            precision: precision.clamp(1, 15),
        }
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return value.to_string();
        }
        if value == 0.0 {
            return "0".to_string();
        }

        let magnitude = value.abs();
        if magnitude >= LARGE_THRESHOLD || magnitude < SMALL_THRESHOLD {
            return self.format_exponent(value);
        }

        let decimals = if magnitude < 1.0 {
            // keep `precision` significant digits below 1
            let leading_zeros = (-magnitude.log10().floor()) as usize;
            self.precision + leading_zeros - 1
        } else {
            // digits past the 15th significant one are binary noise
            let integer_digits = magnitude.log10().floor() as usize + 1;
            self.precision.min(MAX_SIGNIFICANT.saturating_sub(integer_digits))
        };

        let text = format!("{value:.decimals$}");
        let trimmed = trim_fraction(&text);
        if trimmed == "-0" {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    }

    fn format_exponent(&self, value: f64) -> String {
        let digits = self.precision - 1;
        let text = format!("{value:.digits$e}");
        match text.split_once('e') {
            Some((mantissa, exponent)) => format!("{}e{exponent}", trim_fraction(mantissa)),
            None => text,
        }
    }
}

/// Strips trailing zeros after a decimal point, then the point itself.
fn trim_fraction(text: &str) -> &str {
    if !text.contains('.') {
        return text;
    }
    text.trim_end_matches('0').trim_end_matches('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(value: f64) -> String {
        Formatter::default().format(value)
    }

    #[test]
    fn test_integers_have_no_trailing_zeros() {
        assert_eq!(fmt(2.0), "2");
        assert_eq!(fmt(0.0), "0");
        assert_eq!(fmt(-0.0), "0");
        assert_eq!(fmt(100.0), "100");
        assert_eq!(fmt(-40.0), "-40");
    }

    #[test]
    fn test_float_noise_is_neutralized() {
        assert_eq!(fmt(0.1 + 0.2), "0.3");
        assert_eq!(fmt(1.0000000000000002), "1");
        assert_eq!(fmt(0.7 * 3.0), "2.1");
    }

    #[test]
    fn test_rounds_to_precision() {
        assert_eq!(fmt(0.621371192237334), "0.621371");
        assert_eq!(fmt(3.14159265), "3.141593");
        assert_eq!(fmt(12345.6789), "12345.6789");
        assert_eq!(Formatter::new(2).format(3.14159), "3.14");
    }

    #[test]
    fn test_large_values_drop_representation_noise() {
        assert_eq!(fmt((0.1 + 0.2) * 1e11), "30000000000");
        assert_eq!(fmt(2638827906662.399902), "2638827906662.4");
        assert_eq!(fmt(272155421999.999969), "272155422000");
        assert_eq!(fmt(123456789012.345678), "123456789012.346");
        assert_eq!(fmt(-98765432109876.5), "-98765432109876.5");
        assert_eq!(Formatter::new(15).format(1234.5678), "1234.5678");
    }

    #[test]
    fn test_small_values_keep_significant_digits() {
        assert_eq!(fmt(0.000123456789), "0.000123457");
        assert_eq!(fmt(1e-8), "0.00000001");
        assert_eq!(fmt(-0.00025), "-0.00025");
    }

    #[test]
    fn test_extreme_magnitudes_use_exponent() {
        assert_eq!(fmt(1e15), "1e15");
        assert_eq!(fmt(8e15), "8e15");
        assert_eq!(fmt(1.2345678e20), "1.23457e20");
        assert_eq!(fmt(1.5e-10), "1.5e-10");
        assert_eq!(fmt(-2.5e-12), "-2.5e-12");
        assert_eq!(fmt(999999999999999.0), "999999999999999");
    }

    #[test]
    fn test_non_finite_values() {
        assert_eq!(fmt(f64::INFINITY), "inf");
        assert_eq!(fmt(f64::NEG_INFINITY), "-inf");
        assert_eq!(fmt(f64::NAN), "NaN");
    }
}
