use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Shown when a delivered answer carries no text.
pub const GENERIC_FAILURE_TEXT: &str =
    "Sorry, I couldn't generate a response right now. Please try again.";

pub const IMAGE_TEMPLATES: [&str; 3] = [
    "Based on your image, I can see some concerning signs. This appears to be a nutrient deficiency. I recommend testing your soil pH and applying a balanced fertilizer. Also ensure proper drainage and watering schedule.",
    "Looking at your plant photo, the yellowing leaves suggest nitrogen deficiency or overwatering. Check soil drainage and consider applying nitrogen-rich fertilizer. Remove affected leaves to prevent disease spread.",
    "From the image, this looks like a fungal infection. Remove infected plant parts immediately, improve air circulation, and apply organic fungicide. Avoid overhead watering to prevent spread.",
];

pub const TEXT_TEMPLATES: [&str; 3] = [
    "That's a great question! For healthy crop growth, maintain proper soil moisture, ensure adequate sunlight, and monitor for pests regularly. Consider crop rotation to maintain soil health.",
    "For optimal yields, focus on soil preparation, proper seed spacing, timely irrigation, and integrated pest management. Regular monitoring is key to successful farming.",
    "Weather conditions greatly affect crop health. During monsoon, ensure proper drainage. In dry seasons, implement drip irrigation. Always match your farming practices to local climate patterns.",
];

/// Source of locally synthesized answers.
pub trait ResponseTemplates: Send {
    fn pick(&mut self, has_image: bool) -> String;
}

/// Uniform pick from the fixed advice pools.
pub struct CannedResponses<R> {
    rng: R,
}

impl CannedResponses<StdRng> {
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible selection order for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> CannedResponses<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> ResponseTemplates for CannedResponses<R> {
    fn pick(&mut self, has_image: bool) -> String {
        let pool = if has_image {
            &IMAGE_TEMPLATES
        } else {
            &TEXT_TEMPLATES
        };
        pool[self.rng.gen_range(0..pool.len())].to_string()
    }
}

/// Text to show for a delivered answer.
pub fn delivered_text(raw: &str) -> String {
    if raw.trim().is_empty() {
        GENERIC_FAILURE_TEXT.to_string()
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_from_pool_matching_image_flag() {
        let mut templates = CannedResponses::seeded(7);

        for _ in 0..20 {
            assert!(IMAGE_TEMPLATES.contains(&templates.pick(true).as_str()));
            assert!(TEXT_TEMPLATES.contains(&templates.pick(false).as_str()));
        }
    }

    #[test]
    fn same_seed_gives_same_sequence() {
        let mut left = CannedResponses::seeded(42);
        let mut right = CannedResponses::seeded(42);

        let left_picks = (0..10).map(|i| left.pick(i % 2 == 0)).collect::<Vec<_>>();
        let right_picks = (0..10).map(|i| right.pick(i % 2 == 0)).collect::<Vec<_>>();

        assert_eq!(left_picks, right_picks);
    }

    #[test]
    fn blank_delivery_becomes_generic_failure() {
        assert_eq!(delivered_text(""), GENERIC_FAILURE_TEXT);
        assert_eq!(delivered_text(" \n\t"), GENERIC_FAILURE_TEXT);
        assert_eq!(delivered_text("Add nitrogen fertilizer"), "Add nitrogen fertilizer");
    }
}
