//! Prompt context formatting for retrieved setups
//! One fixed-shape line per setup (~30 token-equivalents each). Only
//! normalized scalar fields are echoed - never free text from the stored
//! analysis - so the context stays within budget regardless of how long the
//! source snippets are. The count cap upstream bounds total size.

use super::filter::SimilarSetupWithDetails;

/// Render ranked setups into a compact text block, one line each:
/// `1. BUY setup (Quality: 8) - Entry: 1.0850, R:R 1:2.6, Order: limit`
/// Missing fields render as N/A. Empty input yields an empty string so the
/// caller can omit the past-setups section of the outer prompt entirely.
pub fn format_similar_setups(setups: &[SimilarSetupWithDetails]) -> String {
    setups
        .iter()
        .enumerate()
        .map(|(index, setup)| {
            let direction = non_empty_or_na(setup.direction.as_deref());
            let quality = setup
                .quality_score
                .map(format_quality)
                .unwrap_or_else(|| "N/A".to_string());
            let entry = non_empty_or_na(setup.entry_price.as_deref());
            let risk_reward = non_empty_or_na(setup.risk_reward_ratio.as_deref());
            let order_type = non_empty_or_na(setup.order_type.as_deref());

            format!(
                "{}. {} setup (Quality: {}) - Entry: {}, R:R {}, Order: {}",
                index + 1,
                direction,
                quality,
                entry,
                risk_reward,
                order_type
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn non_empty_or_na(value: Option<&str>) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => "N/A".to_string(),
    }
}

/// Whole scores print without a decimal point, matching how the generator
/// reports them (8 rather than 8.0); fractional scores keep one decimal.
fn format_quality(score: f32) -> String {
    if score.fract() == 0.0 {
        format!("{:.0}", score)
    } else {
        format!("{:.1}", score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn setup(
        direction: Option<&str>,
        quality: Option<f32>,
        entry: Option<&str>,
    ) -> SimilarSetupWithDetails {
        SimilarSetupWithDetails {
            trade_setup_id: Uuid::new_v4(),
            direction: direction.map(String::from),
            entry_price: entry.map(String::from),
            quality_score: quality,
            risk_reward_ratio: Some("1:2.6".to_string()),
            order_type: Some("limit".to_string()),
            similarity: Some(0.9),
        }
    }

    #[test]
    fn test_single_line_shape() {
        let setups = vec![setup(Some("BUY"), Some(8.0), Some("1.0850"))];
        let out = format_similar_setups(&setups);
        assert_eq!(
            out,
            "1. BUY setup (Quality: 8) - Entry: 1.0850, R:R 1:2.6, Order: limit"
        );
    }

    #[test]
    fn test_fractional_quality_keeps_one_decimal() {
        let setups = vec![setup(Some("SELL"), Some(7.5), Some("42150"))];
        let out = format_similar_setups(&setups);
        assert!(out.contains("(Quality: 7.5)"));
    }

    #[test]
    fn test_missing_fields_render_as_na() {
        let mut s = setup(None, None, None);
        s.risk_reward_ratio = Some("".to_string());
        s.order_type = None;
        let out = format_similar_setups(&[s]);
        assert_eq!(out, "1. N/A setup (Quality: N/A) - Entry: N/A, R:R N/A, Order: N/A");
    }

    #[test]
    fn test_empty_input_yields_empty_string() {
        assert_eq!(format_similar_setups(&[]), "");
    }

    #[test]
    fn test_line_count_and_ordinals_follow_input_order() {
        let setups = vec![
            setup(Some("BUY"), Some(9.0), Some("1.10")),
            setup(Some("SELL"), Some(8.0), Some("1.20")),
            setup(Some("BUY"), Some(7.0), Some("1.30")),
        ];
        let out = format_similar_setups(&setups);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("1. BUY"));
        assert!(lines[1].starts_with("2. SELL"));
        assert!(lines[2].starts_with("3. BUY"));
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let setups = vec![
            setup(Some("BUY"), Some(8.5), Some("1.0850")),
            setup(Some("SELL"), Some(7.0), Some("42150")),
        ];
        let first = format_similar_setups(&setups);
        let second = format_similar_setups(&setups);
        assert_eq!(first, second);
    }
}
