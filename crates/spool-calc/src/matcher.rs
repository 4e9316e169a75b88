//! 模型比對
//!
//! 依訂單商品名稱與規格文字，從產品目錄中選出最合適的模型。

use spool_core::{fuzzy_contains, Model, PartRequirement};

/// 模型比對器
#[derive(Debug, Clone, Copy)]
pub struct ModelMatcher<'a> {
    catalog: &'a [Model],
}

impl<'a> ModelMatcher<'a> {
    pub fn new(catalog: &'a [Model]) -> Self {
        Self { catalog }
    }

    /// 名稱或別名與商品名稱相互包含的模型（依目錄順序）
    pub fn name_candidates(&self, item: &str) -> Vec<&'a Model> {
        self.catalog
            .iter()
            .filter(|m| {
                fuzzy_contains(&m.name, item) || m.aliases.iter().any(|a| fuzzy_contains(a, item))
            })
            .collect()
    }

    /// 找出最合適的模型
    ///
    /// 多個候選時依序比對：變體名稱、外購零件名稱，最後回退到基本款或第一個候選。
    pub fn find_model(&self, item: &str, variant: Option<&str>) -> Option<&'a Model> {
        let candidates = self.name_candidates(item);

        let resolved = match candidates.as_slice() {
            [] => None,
            [only] => Some(*only),
            _ => Some(Self::disambiguate(&candidates, variant)),
        };

        match resolved {
            Some(model) => tracing::debug!(
                "商品 {:?} 對應模型 {} {}",
                item,
                model.name,
                model.variant_name
            ),
            None => tracing::debug!("商品 {:?} 找不到對應模型", item),
        }

        resolved
    }

    fn disambiguate(candidates: &[&'a Model], variant: Option<&str>) -> &'a Model {
        let variant = variant.map(str::trim).filter(|v| !v.is_empty());

        if let Some(variant) = variant {
            let by_variant = candidates
                .iter()
                .copied()
                .find(|m| !m.variant_name.trim().is_empty() && fuzzy_contains(&m.variant_name, variant));
            if let Some(model) = by_variant {
                return model;
            }

            let by_part = candidates.iter().copied().find(|m| {
                m.external_parts
                    .iter()
                    .any(|p| fuzzy_contains(&p.name, variant))
            });
            if let Some(model) = by_part {
                return model;
            }
        }

        candidates
            .iter()
            .copied()
            .find(|m| m.is_base())
            .unwrap_or(candidates[0])
    }

    /// 完成時是否需要詢問實際使用的外購零件
    ///
    /// 解析到的模型沒有外購零件，但同名家族中有其他變體帶外購零件時成立。
    pub fn needs_part_choice(&self, item: &str, variant: Option<&str>) -> bool {
        let Some(model) = self.find_model(item, variant) else {
            return false;
        };
        if !model.external_parts.is_empty() {
            return false;
        }

        self.family(model)
            .any(|sibling| !sibling.external_parts.is_empty())
    }

    /// 同名家族中出現過的外購零件（名稱不重複）
    pub fn part_choices(&self, item: &str) -> Vec<&'a PartRequirement> {
        let mut choices: Vec<&'a PartRequirement> = Vec::new();
        for model in self.name_candidates(item) {
            for part in &model.external_parts {
                if !choices.iter().any(|c| c.name.eq_ignore_ascii_case(&part.name)) {
                    choices.push(part);
                }
            }
        }
        choices
    }

    fn family(&self, model: &'a Model) -> impl Iterator<Item = &'a Model> {
        let name = model.name.trim().to_lowercase();
        let catalog = self.catalog;
        catalog
            .iter()
            .filter(move |m| m.name.trim().to_lowercase() == name && !std::ptr::eq(*m, model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn catalog() -> Vec<Model> {
        vec![
            Model::new("Lamp"),
            Model::new("Lamp").with_variant_name("Small"),
            Model::new("Hourglass Sconce").with_alias("Wall Sconce"),
            Model::new("Hourglass Sconce").with_external_part("Plug-in Cord", 1),
            Model::new("Hourglass Sconce").with_external_part("Hard-Wired Kit", 1),
            Model::new("Coaster Set").with_variant_name("Round"),
            Model::new("Coaster Set").with_variant_name("Square"),
        ]
    }

    #[test]
    fn test_variant_name_match() {
        let catalog = catalog();
        let matcher = ModelMatcher::new(&catalog);

        let model = matcher.find_model("Lamp", Some("Small Edition")).unwrap();
        assert_eq!(model.variant_name, "Small");

        // 沒有規格文字時回退到基本款
        let model = matcher.find_model("Lamp", None).unwrap();
        assert_eq!(model.variant_name, "");
    }

    #[rstest]
    #[case("Modern Hourglass Sconce", Some("Plug-in"), Some("Plug-in Cord"))]
    #[case("Modern Hourglass Sconce", Some("Hard-Wired"), Some("Hard-Wired Kit"))]
    #[case("Modern Hourglass Sconce", Some("Battery"), None)]
    #[case("Wall Sconce", None, None)]
    fn test_external_part_match(
        #[case] item: &str,
        #[case] variant: Option<&str>,
        #[case] part: Option<&str>,
    ) {
        let catalog = catalog();
        let matcher = ModelMatcher::new(&catalog);
        let model = matcher.find_model(item, variant).unwrap();

        assert_eq!(model.name, "Hourglass Sconce");
        assert_eq!(
            model.external_parts.first().map(|p| p.name.as_str()),
            part
        );
    }

    #[test]
    fn test_no_base_falls_back_to_first() {
        let catalog = catalog();
        let matcher = ModelMatcher::new(&catalog);
        let model = matcher.find_model("Coaster Set", Some("Hexagon")).unwrap();
        assert_eq!(model.variant_name, "Round");
    }

    #[test]
    fn test_no_match() {
        let catalog = catalog();
        let matcher = ModelMatcher::new(&catalog);
        assert!(matcher.find_model("Planter", None).is_none());
        assert!(matcher.find_model("   ", None).is_none());
    }

    #[test]
    fn test_single_candidate_ignores_variant() {
        let catalog = vec![Model::new("Vase").with_variant_name("Tall")];
        let matcher = ModelMatcher::new(&catalog);
        let model = matcher.find_model("Spiral Vase", Some("Short")).unwrap();
        assert_eq!(model.variant_name, "Tall");
    }

    #[test]
    fn test_needs_part_choice() {
        let catalog = catalog();
        let matcher = ModelMatcher::new(&catalog);

        // 基本款沒有外購零件，但同家族有
        assert!(matcher.needs_part_choice("Hourglass Sconce", Some("Blue")));
        // 已明確對應到帶零件的變體
        assert!(!matcher.needs_part_choice("Hourglass Sconce", Some("Plug-in")));
        // 家族內都沒有外購零件
        assert!(!matcher.needs_part_choice("Lamp", None));
        assert!(!matcher.needs_part_choice("Planter", None));

        let choices = matcher.part_choices("Hourglass Sconce");
        assert_eq!(choices.len(), 2);
        assert_eq!(choices[0].name, "Plug-in Cord");
    }

    proptest! {
        #[test]
        fn prop_matcher_is_deterministic(item in "[A-Za-z ]{0,16}", variant in proptest::option::of("[A-Za-z ]{0,10}")) {
            let catalog = catalog();
            let matcher = ModelMatcher::new(&catalog);
            let first = matcher.find_model(&item, variant.as_deref()).map(|m| m as *const Model);
            let second = matcher.find_model(&item, variant.as_deref()).map(|m| m as *const Model);
            prop_assert_eq!(first, second);
        }
    }
}
