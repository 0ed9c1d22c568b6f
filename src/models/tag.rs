use std::collections::BTreeSet;

use crate::models::project::Project;

/// Where a category is shown: the main filter row or the "More filters" drawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Primary,
    Secondary,
}

#[derive(Debug)]
pub struct TagOption {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug)]
pub enum Options {
    Static(&'static [TagOption]),
    /// Values are whatever tags with this category's prefix exist in the data
    Dynamic,
}

#[derive(Debug)]
pub struct FilterCategory {
    pub key: &'static str,
    pub label: &'static str,
    pub phase: Phase,
    pub options: Options,
}

/// A `{value, label}` pair ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOption {
    pub value: String,
    pub label: String,
}

const fn option(value: &'static str, label: &'static str) -> TagOption {
    TagOption { value, label }
}

pub static FILTER_CATEGORIES: &[FilterCategory] = &[
    FilterCategory {
        key: "type",
        label: "Project Type",
        phase: Phase::Primary,
        options: Options::Static(&[
            option("type:amigurumi", "Amigurumi"),
            option("type:wearable", "Wearable"),
            option("type:accessory", "Accessory"),
            option("type:home-decor", "Home Décor"),
            option("type:baby", "Baby & Kids"),
            option("type:bag", "Bags & Pouches"),
            option("type:blanket", "Blanket & Throw"),
            option("type:holiday", "Holiday & Seasonal"),
        ]),
    },
    FilterCategory {
        key: "skill",
        label: "Skill Level",
        phase: Phase::Primary,
        options: Options::Static(&[
            option("skill:beginner", "Beginner"),
            option("skill:easy", "Easy"),
            option("skill:intermediate", "Intermediate"),
            option("skill:advanced", "Advanced"),
        ]),
    },
    FilterCategory {
        key: "weight",
        label: "Yarn Weight",
        phase: Phase::Primary,
        options: Options::Static(&[
            option("weight:lace", "Lace (0)"),
            option("weight:fingering", "Fingering (1)"),
            option("weight:sport", "Sport (2)"),
            option("weight:dk", "DK (3)"),
            option("weight:worsted", "Worsted (4)"),
            option("weight:bulky", "Bulky (5)"),
            option("weight:super-bulky", "Super Bulky (6)"),
        ]),
    },
    FilterCategory {
        key: "color",
        label: "Color Palette",
        phase: Phase::Primary,
        options: Options::Static(&[
            option("color:pastel", "Pastel"),
            option("color:neutral", "Neutral / Earth"),
            option("color:bright", "Bright & Bold"),
            option("color:monochrome", "Monochrome"),
            option("color:multicolor", "Multicolor"),
            option("color:dark", "Dark / Moody"),
        ]),
    },
    FilterCategory {
        key: "occasion",
        label: "Occasion",
        phase: Phase::Primary,
        options: Options::Static(&[
            option("occasion:giftable", "Giftable"),
            option("occasion:everyday", "Everyday"),
            option("occasion:seasonal", "Seasonal"),
            option("occasion:baby-shower", "Baby Shower"),
            option("occasion:wedding", "Wedding"),
            option("occasion:party", "Party & Celebration"),
        ]),
    },
    FilterCategory {
        key: "size",
        label: "Size",
        phase: Phase::Secondary,
        options: Options::Static(&[
            option("size:mini", "Mini / Keychain"),
            option("size:small", "Small"),
            option("size:medium", "Medium"),
            option("size:large", "Large"),
            option("size:oversized", "Oversized"),
        ]),
    },
    FilterCategory {
        key: "construction",
        label: "Construction Method",
        phase: Phase::Secondary,
        options: Options::Static(&[
            option("construction:flat", "Worked Flat"),
            option("construction:in-the-round", "In the Round"),
            option("construction:granny-square", "Granny Square"),
            option("construction:motif", "Motif / Join-as-you-go"),
            option("construction:tapestry", "Tapestry / Colorwork"),
        ]),
    },
    FilterCategory {
        key: "fiber",
        label: "Fiber Type",
        phase: Phase::Secondary,
        options: Options::Static(&[
            option("fiber:acrylic", "Acrylic"),
            option("fiber:cotton", "Cotton"),
            option("fiber:wool", "Wool"),
            option("fiber:alpaca", "Alpaca"),
            option("fiber:blend", "Blend"),
            option("fiber:recycled", "Recycled / Eco"),
        ]),
    },
    FilterCategory {
        key: "time",
        label: "Time to Make",
        phase: Phase::Secondary,
        options: Options::Static(&[
            option("time:under-1h", "Under 1 Hour"),
            option("time:1-3h", "1–3 Hours"),
            option("time:half-day", "Half Day"),
            option("time:full-day", "Full Day"),
            option("time:weekend", "Weekend Project"),
            option("time:multi-week", "Multi-Week"),
        ]),
    },
    FilterCategory {
        key: "collection",
        label: "Collection",
        phase: Phase::Secondary,
        options: Options::Dynamic,
    },
    FilterCategory {
        key: "pattern",
        label: "Pattern Type",
        phase: Phase::Secondary,
        options: Options::Static(&[
            option("pattern:free", "Free Pattern"),
            option("pattern:paid", "Paid Pattern"),
            option("pattern:no-pattern", "No Pattern"),
        ]),
    },
];

impl FilterCategory {
    pub fn owns(&self, tag: &str) -> bool {
        tag.strip_prefix(self.key)
            .is_some_and(|rest| rest.starts_with(':'))
    }

    /// Options for display. Dynamic categories are derived from `projects` on every call.
    pub fn resolve_options(&self, projects: &[Project]) -> Vec<ResolvedOption> {
        match self.options {
            Options::Static(options) => options
                .iter()
                .map(|o| ResolvedOption {
                    value: o.value.to_string(),
                    label: o.label.to_string(),
                })
                .collect(),
            Options::Dynamic => {
                let values: BTreeSet<&str> = projects
                    .iter()
                    .flat_map(|p| &p.tags)
                    .filter(|tag| self.owns(tag))
                    .map(String::as_str)
                    .collect();

                values
                    .into_iter()
                    .map(|value| ResolvedOption {
                        value: value.to_string(),
                        label: label_for_tag(value),
                    })
                    .collect()
            }
        }
    }
}

pub fn categories_in(phase: Phase) -> impl Iterator<Item = &'static FilterCategory> {
    FILTER_CATEGORIES.iter().filter(move |c| c.phase == phase)
}

pub fn find_category(key: &str) -> Option<&'static FilterCategory> {
    FILTER_CATEGORIES.iter().find(|c| c.key == key)
}

pub fn category_for_tag(tag: &str) -> Option<&'static FilterCategory> {
    FILTER_CATEGORIES.iter().find(|c| c.owns(tag))
}

/// Human-readable label for a tag.
///
/// Declared option labels win. Otherwise the part after the first `:` is
/// capitalized, and a tag without a value part is returned as is.
pub fn label_for_tag(tag: &str) -> String {
    let declared = FILTER_CATEGORIES.iter().find_map(|c| match c.options {
        Options::Static(options) => options.iter().find(|o| o.value == tag),
        Options::Dynamic => None,
    });
    if let Some(option) = declared {
        return option.label.to_string();
    }

    match tag.split_once(':') {
        Some((_, rest)) if !rest.is_empty() => capitalize(rest),
        _ => tag.to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A project's tags grouped by declared category, in taxonomy order.
pub struct TagGroups {
    /// (category label, option labels)
    pub groups: Vec<(&'static str, Vec<String>)>,
    /// Tags whose prefix is not a declared category
    pub other: Vec<String>,
}

pub fn group_tags(tags: &[String]) -> TagGroups {
    let groups = FILTER_CATEGORIES
        .iter()
        .filter_map(|category| {
            let labels: Vec<String> = tags
                .iter()
                .filter(|tag| category.owns(tag))
                .map(|tag| label_for_tag(tag))
                .collect();
            (!labels.is_empty()).then_some((category.label, labels))
        })
        .collect();

    let other = tags
        .iter()
        .filter(|tag| category_for_tag(tag).is_none())
        .cloned()
        .collect();

    TagGroups { groups, other }
}

/// Distinct tags across all projects, sorted.
pub fn extract_all_tags(projects: &[Project]) -> Vec<String> {
    let tags: BTreeSet<&String> = projects.iter().flat_map(|p| &p.tags).collect();
    tags.into_iter().cloned().collect()
}
