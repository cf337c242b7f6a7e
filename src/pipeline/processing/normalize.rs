//! Pure canonicalization of raw field values. Every function here is
//! deterministic, side-effect free, and total over its documented failure
//! cases.

use crate::domain::{FieldValue, RejectReason};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

/// The region codes the business recognizes. Anything else is rejected,
/// never defaulted.
pub const KNOWN_REGION_CODES: [&str; 3] = ["1", "2", "4"];

/// Canonical material numbers are exactly this many digits, zero-padded.
pub const MATERIAL_WIDTH: usize = 8;

static PERIOD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}\.\d{2}$").unwrap());

fn normalization_failure(field: &str, value: &FieldValue) -> RejectReason {
    RejectReason::Normalization {
        field: field.to_string(),
        raw: render(value),
    }
}

fn render(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => s.clone(),
        FieldValue::Number(n) => n.to_string(),
        FieldValue::Missing => "<missing>".to_string(),
    }
}

fn text_of(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Text(s) => Some(s.trim().to_string()),
        // Integral floats render without the fractional part, so a numeric
        // cell holding 12345.0 coerces to "12345".
        FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
            Some(format!("{}", *n as i64))
        }
        FieldValue::Number(n) => Some(n.to_string()),
        FieldValue::Missing => None,
    }
}

/// Canonicalize a material number: coerce to string, strip the trailing `.0`
/// float artifact spreadsheets produce, drop everything that is not a digit,
/// zero-pad to 8. Empty results and overflows (>8 digits) fail rather than
/// truncate, so canonical keys stay collision-free.
pub fn normalize_material_number(value: &FieldValue) -> Result<String, RejectReason> {
    let raw = text_of(value).ok_or_else(|| normalization_failure("material_number", value))?;
    let stripped = raw.strip_suffix(".0").unwrap_or(&raw);
    let digits: String = stripped.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || digits.len() > MATERIAL_WIDTH {
        return Err(normalization_failure("material_number", value));
    }
    Ok(format!("{:0>width$}", digits, width = MATERIAL_WIDTH))
}

/// Accept only strings already shaped `YYYY.MM`; the year is the leading four
/// characters. No free-form date parsing.
pub fn normalize_period(value: &FieldValue) -> Result<(String, i32), RejectReason> {
    let raw = match value {
        FieldValue::Text(s) => s.trim().to_string(),
        _ => return Err(normalization_failure("period", value)),
    };
    if !PERIOD_RE.is_match(&raw) {
        return Err(normalization_failure("period", value));
    }
    let year: i32 = raw[..4]
        .parse()
        .map_err(|_| normalization_failure("period", value))?;
    Ok((raw, year))
}

/// Exact membership in the known region code set. Unknown codes are a
/// rejection, never a silent default.
pub fn normalize_region_code(value: &FieldValue) -> Result<String, RejectReason> {
    let raw = text_of(value).ok_or_else(|| RejectReason::UnknownRegion("<missing>".to_string()))?;
    if KNOWN_REGION_CODES.contains(&raw.as_str()) {
        Ok(raw)
    } else {
        Err(RejectReason::UnknownRegion(raw))
    }
}

/// A forecast YEAR cell: integral number or digit string, four digits.
pub fn normalize_year(value: &FieldValue) -> Result<i32, RejectReason> {
    let year = match value {
        FieldValue::Text(s) => s
            .trim()
            .parse::<i32>()
            .map_err(|_| normalization_failure("year", value))?,
        FieldValue::Number(n) if n.fract() == 0.0 => *n as i32,
        _ => return Err(normalization_failure("year", value)),
    };
    if (1000..=9999).contains(&year) {
        Ok(year)
    } else {
        Err(normalization_failure("year", value))
    }
}

/// Forecast rows carry a year only; their canonical period is January of that
/// year, matching the grain the loader has always used.
pub fn forecast_period(year: i32) -> String {
    format!("{year}.01")
}

/// Parse a metric cell into an exact decimal at scale 2. Negative values and
/// values with more than two fractional digits are invalid.
pub fn parse_decimal(field: &str, value: &FieldValue) -> Result<Decimal, RejectReason> {
    let invalid = || RejectReason::InvalidDecimal(field.to_string());
    let parsed = match value {
        FieldValue::Text(s) => s.trim().parse::<Decimal>().map_err(|_| invalid())?,
        FieldValue::Number(n) => Decimal::try_from(*n).map_err(|_| invalid())?,
        FieldValue::Missing => return Err(invalid()),
    };
    if parsed.is_sign_negative() || parsed.normalize().scale() > 2 {
        return Err(invalid());
    }
    let mut rescaled = parsed;
    rescaled.rescale(2);
    Ok(rescaled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_material_number_strips_float_artifact() {
        assert_eq!(
            normalize_material_number(&text("12345.0")).unwrap(),
            "00012345"
        );
    }

    #[test]
    fn test_material_number_from_numeric_cell() {
        assert_eq!(
            normalize_material_number(&FieldValue::Number(12345.0)).unwrap(),
            "00012345"
        );
    }

    #[test]
    fn test_material_number_pads_and_keeps_digits_only() {
        assert_eq!(normalize_material_number(&text(" 42 ")).unwrap(), "00000042");
        assert_eq!(
            normalize_material_number(&text("AB-1234")).unwrap(),
            "00001234"
        );
        assert_eq!(
            normalize_material_number(&text("99999999")).unwrap(),
            "99999999"
        );
    }

    #[test]
    fn test_material_number_overflow_fails() {
        let err = normalize_material_number(&text("123456789")).unwrap_err();
        assert!(matches!(err, RejectReason::Normalization { ref field, .. } if field == "material_number"));
    }

    #[test]
    fn test_material_number_without_digits_fails() {
        assert!(normalize_material_number(&text("N/A")).is_err());
        assert!(normalize_material_number(&FieldValue::Missing).is_err());
    }

    #[test]
    fn test_period_round_trips_year() {
        let (period, year) = normalize_period(&text("2024.03")).unwrap();
        assert_eq!(period, "2024.03");
        assert_eq!(year, 2024);
    }

    #[test]
    fn test_period_rejects_other_shapes() {
        assert!(normalize_period(&text("2024-03")).is_err());
        assert!(normalize_period(&text("202403")).is_err());
        assert!(normalize_period(&text("2024.3")).is_err());
        assert!(normalize_period(&text("03.2024x")).is_err());
        assert!(normalize_period(&FieldValue::Number(2024.03)).is_err());
        assert!(normalize_period(&FieldValue::Missing).is_err());
    }

    #[test]
    fn test_region_codes_exact_match_only() {
        assert_eq!(normalize_region_code(&text("1")).unwrap(), "1");
        assert_eq!(normalize_region_code(&text("4")).unwrap(), "4");
        assert_eq!(
            normalize_region_code(&FieldValue::Number(2.0)).unwrap(),
            "2"
        );
        let err = normalize_region_code(&text("3")).unwrap_err();
        assert_eq!(err, RejectReason::UnknownRegion("3".to_string()));
        assert!(normalize_region_code(&text("EMEA")).is_err());
    }

    #[test]
    fn test_year_accepts_text_and_integral_numbers() {
        assert_eq!(normalize_year(&text("2024")).unwrap(), 2024);
        assert_eq!(normalize_year(&FieldValue::Number(2024.0)).unwrap(), 2024);
        assert!(normalize_year(&text("24")).is_err());
        assert!(normalize_year(&FieldValue::Number(2024.5)).is_err());
    }

    #[test]
    fn test_forecast_period_is_january() {
        assert_eq!(forecast_period(2024), "2024.01");
    }

    #[test]
    fn test_parse_decimal_rescales_to_two_places() {
        let value = parse_decimal("GROSS_SALES", &text("100")).unwrap();
        assert_eq!(value.to_string(), "100.00");
        let value = parse_decimal("GROSS_SALES", &FieldValue::Number(100.5)).unwrap();
        assert_eq!(value.to_string(), "100.50");
    }

    #[test]
    fn test_parse_decimal_rejects_bad_values() {
        assert_eq!(
            parse_decimal("NET_SALES", &text("-5.00")).unwrap_err(),
            RejectReason::InvalidDecimal("NET_SALES".to_string())
        );
        assert!(parse_decimal("NET_SALES", &text("1.234")).is_err());
        assert!(parse_decimal("NET_SALES", &text("abc")).is_err());
        assert!(parse_decimal("NET_SALES", &FieldValue::Missing).is_err());
    }
}
