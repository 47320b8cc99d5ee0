// src/dsire/extract.rs
//! Heuristic mining of incentive amounts out of narrative text.

use once_cell::sync::Lazy;
use regex::Regex;

/// A number found in narrative text.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountHit {
    pub amount: f64,
    pub units: &'static str,
    pub qualifier: Option<&'static str>,
}

static PER_KW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$([\d,]+(?:\.\d+)?)\s*/\s*kW\b").expect("$/kW regex should compile")
});
static PER_KWH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$([\d,]+(?:\.\d+)?)\s*/\s*kWh\b").expect("$/kWh regex should compile")
});
static PER_W: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$([\d,]+(?:\.\d+)?)\s*/\s*W\b").expect("$/W regex should compile")
});
static PERCENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,3}(?:\.\d+)?)\s*%\s*(?:of|towards|rebate|incentive|credit)?")
        .expect("percent regex should compile")
});
static CAP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:up to|maximum(?: incentive)?|cap)\s*\$([\d,]+(?:\.\d+)?)")
        .expect("cap regex should compile")
});

/// Families in scan order: pattern, units, qualifier.
static FAMILIES: Lazy<[(&'static Regex, &'static str, Option<&'static str>); 5]> =
    Lazy::new(|| {
        [
            (&*PER_KW, "$/kW", None),
            (&*PER_KWH, "$/kWh", None),
            (&*PER_W, "$/W", None),
            (&*PERCENT, "%", None),
            (&*CAP, "USD", Some("cap")),
        ]
    });

/// `"2,500.00"` → `2500.0`. `None` when nothing numeric remains.
fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

/// Every amount any family finds in `text`, grouped by family in scan order.
/// Families are independent, so one phrase may produce several hits.
pub fn extract_amounts(text: &str) -> Vec<AmountHit> {
    let mut hits = Vec::new();
    for &(re, units, qualifier) in FAMILIES.iter() {
        for caps in re.captures_iter(text) {
            if let Some(amount) = caps.get(1).and_then(|m| parse_amount(m.as_str())) {
                hits.push(AmountHit {
                    amount,
                    units,
                    qualifier,
                });
            }
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(amount: f64, units: &'static str, qualifier: Option<&'static str>) -> AmountHit {
        AmountHit {
            amount,
            units,
            qualifier,
        }
    }

    #[test]
    fn rebate_with_cap() {
        let hits = extract_amounts("Rebate of $0.50/W up to $2,500 maximum incentive");
        assert!(hits.contains(&hit(0.50, "$/W", None)));
        assert!(hits.contains(&hit(2500.0, "USD", Some("cap"))));
    }

    #[test]
    fn unit_families_do_not_bleed() {
        let hits = extract_amounts("$0.10 / kWh for output, $300/KW of capacity");
        assert_eq!(
            hits,
            vec![hit(300.0, "$/kW", None), hit(0.10, "$/kWh", None)]
        );
    }

    #[test]
    fn percentages_and_caps() {
        let hits = extract_amounts("30% of installed cost, maximum $1,000,000.50; 12.5 % credit");
        assert_eq!(
            hits,
            vec![
                hit(30.0, "%", None),
                hit(12.5, "%", None),
                hit(1_000_000.50, "USD", Some("cap")),
            ]
        );
    }

    #[test]
    fn nothing_to_find() {
        assert!(extract_amounts("Contact the utility for details.").is_empty());
        assert!(extract_amounts("").is_empty());
        // a bare comma is captured but is not a number
        assert!(extract_amounts("up to $, varies").is_empty());
    }

    #[test]
    fn same_input_same_hits() {
        let text = "$1.25/W, up to $5,000; 25% rebate";
        assert_eq!(extract_amounts(text), extract_amounts(text));
    }
}
