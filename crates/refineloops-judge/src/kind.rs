use serde::{Deserialize, Serialize};

/// The closed set of evaluator kinds.
///
/// Declaration order is the canonical iteration order used wherever results
/// are flattened, so keep new kinds appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeKind {
    Aesthetic,
    BrandFit,
    Technical,
    Usability,
}

impl JudgeKind {
    pub const ALL: [JudgeKind; 4] = [
        JudgeKind::Aesthetic,
        JudgeKind::BrandFit,
        JudgeKind::Technical,
        JudgeKind::Usability,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JudgeKind::Aesthetic => "aesthetic",
            JudgeKind::BrandFit => "brand_fit",
            JudgeKind::Technical => "technical",
            JudgeKind::Usability => "usability",
        }
    }

    /// What this judge is asked to look at
    pub fn focus(&self) -> &'static str {
        match self {
            JudgeKind::Aesthetic => "visual quality: balance, color harmony, typography and simplicity",
            JudgeKind::BrandFit => "how well the design expresses the brand and stands out from competitors",
            JudgeKind::Technical => "SVG correctness, scalability and file efficiency",
            JudgeKind::Usability => "legibility and rendering across sizes, contrasts and monochrome use",
        }
    }
}

impl std::fmt::Display for JudgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JudgeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "aesthetic" | "aesthetics" | "visual" => Ok(JudgeKind::Aesthetic),
            "brand_fit" | "brand" | "brandfit" => Ok(JudgeKind::BrandFit),
            "technical" | "tech" => Ok(JudgeKind::Technical),
            "usability" | "accessibility" => Ok(JudgeKind::Usability),
            _ => Err(format!("Unknown judge kind: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_display() {
        for kind in JudgeKind::ALL {
            assert_eq!(kind.to_string().parse::<JudgeKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!("Brand-Fit".parse::<JudgeKind>().unwrap(), JudgeKind::BrandFit);
        assert_eq!("accessibility".parse::<JudgeKind>().unwrap(), JudgeKind::Usability);
        assert!("color".parse::<JudgeKind>().is_err());
    }

    #[test]
    fn test_kind_order_follows_declaration() {
        let mut kinds = vec![JudgeKind::Usability, JudgeKind::Aesthetic, JudgeKind::Technical];
        kinds.sort();
        assert_eq!(
            kinds,
            vec![JudgeKind::Aesthetic, JudgeKind::Technical, JudgeKind::Usability]
        );
    }
}
